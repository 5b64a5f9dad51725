//! Direct provisioning through the EC2 API

use super::{ProvisionOutcome, Provisioner};
use crate::aws::ec2::Ec2Operations;
use crate::instance_spec::InstanceSpec;
use anyhow::{Context, Result};
use tracing::info;

/// Launches the instance with a single `RunInstances` call.
///
/// Not transactional: a failed call is returned to the caller untouched,
/// nothing is retried and nothing is cleaned up.
pub struct DirectProvisioner<E> {
    ec2: E,
}

impl<E: Ec2Operations> DirectProvisioner<E> {
    pub fn new(ec2: E) -> Self {
        Self { ec2 }
    }
}

impl<E: Ec2Operations> Provisioner for DirectProvisioner<E> {
    async fn provision(&self, spec: &InstanceSpec) -> Result<ProvisionOutcome> {
        let launched = self
            .ec2
            .run_instance(spec)
            .await
            .context("failed to create VM")?;

        info!(
            instance_id = %launched.instance_id,
            instance_type = %launched.instance_type,
            private_ip = ?launched.private_ip,
            state = ?launched.state,
            "created the vm"
        );

        Ok(ProvisionOutcome::Launched(launched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::ec2::{InstanceId, LaunchedInstance, MockEc2Operations};
    use crate::instance_spec::VmParams;
    use crate::user_data::UserDataDocument;
    use delegate_common::tags::TAG_NAME;

    fn spec() -> InstanceSpec {
        let params = VmParams {
            image: "ami-123".to_string(),
            instance_type: "t3.medium".to_string(),
            subnet: String::new(),
            ..Default::default()
        };
        InstanceSpec::build(&params, UserDataDocument::new("#cloud-config\n"))
    }

    fn launched() -> LaunchedInstance {
        LaunchedInstance {
            instance_id: InstanceId::new("i-0abc"),
            instance_type: "t3.medium".to_string(),
            private_ip: Some("10.0.0.5".to_string()),
            state: Some("pending".to_string()),
        }
    }

    #[tokio::test]
    async fn test_provision_launches_once() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_run_instance()
            .withf(|spec: &InstanceSpec| {
                spec.image == "ami-123" && spec.subnet.is_none() && spec.tags.contains_key(TAG_NAME)
            })
            .times(1)
            .returning(|_| Ok(launched()));

        let outcome = DirectProvisioner::new(ec2).provision(&spec()).await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::Launched(launched()));
    }

    #[tokio::test]
    async fn test_provision_surfaces_api_error_without_retry() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_run_instance()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("UnauthorizedOperation: not allowed")));

        let err = DirectProvisioner::new(ec2)
            .provision(&spec())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to create VM");
        assert!(format!("{err:#}").contains("UnauthorizedOperation"));
    }
}
