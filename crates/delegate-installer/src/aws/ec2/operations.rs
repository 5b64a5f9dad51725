//! EC2 operations trait for testing

use super::Ec2Client;
use super::types::LaunchedInstance;
use crate::instance_spec::InstanceSpec;
use anyhow::Result;

/// Trait for EC2 operations that can be mocked in tests.
///
/// The direct provisioner is written against this trait so its behavior can
/// be checked without hitting real AWS.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait Ec2Operations: Send + Sync {
    /// Launch exactly one instance described by `spec`
    async fn run_instance(&self, spec: &InstanceSpec) -> Result<LaunchedInstance>;
}

impl Ec2Operations for Ec2Client {
    async fn run_instance(&self, spec: &InstanceSpec) -> Result<LaunchedInstance> {
        Ec2Client::run_instance(self, spec).await
    }
}
