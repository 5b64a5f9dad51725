//! Instance provisioning strategies
//!
//! Two interchangeable [`Provisioner`]s consume the same [`InstanceSpec`]:
//!
//! - [`DirectProvisioner`]: one synchronous `RunInstances` call
//! - [`TerraformExporter`]: writes an equivalent `vm.tf`, no network calls
//!
//! Exactly one is selected per run by [`ProvisionMode`].

mod direct;
mod export;

pub use direct::DirectProvisioner;
pub use export::{ProviderSettings, TerraformExporter};

use crate::aws::ec2::LaunchedInstance;
use crate::instance_spec::InstanceSpec;
use anyhow::Result;
use std::path::PathBuf;

/// Which strategy materializes the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionMode {
    /// Call the EC2 API
    Direct,
    /// Emit a Terraform file
    Export,
}

impl ProvisionMode {
    /// `--dry-run` exports instead of launching
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            ProvisionMode::Export
        } else {
            ProvisionMode::Direct
        }
    }
}

/// What a provisioner produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// An instance was created
    Launched(LaunchedInstance),
    /// A declarative config file was written
    Exported { path: PathBuf },
}

/// Materialize one instance from a spec
#[allow(async_fn_in_trait)] // Internal use only
pub trait Provisioner {
    async fn provision(&self, spec: &InstanceSpec) -> Result<ProvisionOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_dry_run() {
        assert_eq!(ProvisionMode::from_dry_run(true), ProvisionMode::Export);
        assert_eq!(ProvisionMode::from_dry_run(false), ProvisionMode::Direct);
    }
}
