//! Configuration types for the installer

use crate::aws::credentials::CredentialSpec;
use crate::instance_spec::VmParams;
use std::path::PathBuf;

/// Local files the installer reads and writes
#[derive(Debug, Clone, PartialEq, Eq, garde::Validate)]
pub struct ArtifactPaths {
    /// Compose template the runner service is merged into
    #[garde(skip)]
    pub compose_template: PathBuf,
    /// Merged compose file, shipped to the VM
    #[garde(skip)]
    pub compose: PathBuf,
    /// Runner pool file, shipped to the VM
    #[garde(skip)]
    pub pool: PathBuf,
    /// Runner environment file, shipped to the VM
    #[garde(skip)]
    pub env: PathBuf,
}

/// Runtime behavior flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeFlags {
    /// Write `vm.tf` instead of calling the EC2 API
    pub dry_run: bool,
}

/// Configuration for one installer run
///
/// Composed of focused sub-configs; validated as a whole before anything
/// touches the filesystem or AWS.
#[derive(Debug, Clone, garde::Validate)]
pub struct InstallerConfig {
    #[garde(dive)]
    pub credentials: CredentialSpec,
    #[garde(dive)]
    pub vm: VmParams,
    #[garde(dive)]
    pub artifacts: ArtifactPaths,
    #[garde(skip)]
    pub flags: RuntimeFlags,
}
