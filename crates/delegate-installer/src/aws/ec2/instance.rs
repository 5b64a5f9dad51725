//! RunInstances request construction and the launch call

use super::Ec2Client;
use super::types::{InstanceId, LaunchedInstance};
use crate::instance_spec::InstanceSpec;
use anyhow::{Context, Result};
use aws_sdk_ec2::operation::run_instances::builders::RunInstancesFluentBuilder;
use aws_sdk_ec2::types::{
    BlockDeviceMapping, EbsBlockDevice, IamInstanceProfileSpecification,
    InstanceNetworkInterfaceSpecification, InstanceType, ResourceType, Tag, TagSpecification,
    VolumeType,
};
use std::collections::BTreeMap;
use tracing::{error, info};

/// One tag specification scoped to the instance resource
pub fn tag_specification(tags: &BTreeMap<String, String>) -> TagSpecification {
    tags.iter()
        .fold(
            TagSpecification::builder().resource_type(ResourceType::Instance),
            |builder, (key, value)| builder.tags(Tag::builder().key(key).value(value).build()),
        )
        .build()
}

/// Single network interface (device 0) carrying subnet, groups and the
/// public-IP flag; `None` when the spec has no network settings.
pub fn network_interface(spec: &InstanceSpec) -> Option<InstanceNetworkInterfaceSpecification> {
    if !spec.has_network_settings() {
        return None;
    }

    let groups = (!spec.security_groups.is_empty()).then(|| spec.security_groups.clone());

    Some(
        InstanceNetworkInterfaceSpecification::builder()
            .device_index(0)
            .associate_public_ip_address(spec.allocate_public_ip)
            .delete_on_termination(true)
            .set_subnet_id(spec.subnet.clone())
            .set_groups(groups)
            .build(),
    )
}

/// IAM instance profile by name, only when one is configured
pub fn iam_instance_profile(spec: &InstanceSpec) -> Option<IamInstanceProfileSpecification> {
    spec.iam_profile
        .as_deref()
        .map(|name| IamInstanceProfileSpecification::builder().name(name).build())
}

/// Root volume mapping, only when a root device is configured
pub fn block_device_mapping(spec: &InstanceSpec) -> Option<BlockDeviceMapping> {
    let root = spec.root_device.as_ref()?;

    let ebs = EbsBlockDevice::builder()
        .delete_on_termination(true)
        .set_volume_type(root.volume_type.as_deref().map(VolumeType::from))
        .set_volume_size(root.volume_size_gb)
        .set_iops(root.volume_iops)
        .build();

    Some(
        BlockDeviceMapping::builder()
            .device_name(&root.device_name)
            .ebs(ebs)
            .build(),
    )
}

impl Ec2Client {
    /// Assemble the `RunInstances` request for `spec` without sending it.
    pub fn run_instances_request(&self, spec: &InstanceSpec) -> RunInstancesFluentBuilder {
        self.client
            .run_instances()
            .image_id(&spec.image)
            .instance_type(InstanceType::from(spec.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .user_data(spec.user_data.to_base64())
            .tag_specifications(tag_specification(&spec.tags))
            .set_key_name(spec.key_pair_name.clone())
            .set_iam_instance_profile(iam_instance_profile(spec))
            .set_network_interfaces(network_interface(spec).map(|ni| vec![ni]))
            .set_block_device_mappings(block_device_mapping(spec).map(|bdm| vec![bdm]))
    }

    /// Launch the delegate instance with a single `RunInstances` call.
    ///
    /// No retries and no compensating terminate on failure: the error is
    /// returned as-is with context.
    pub async fn run_instance(&self, spec: &InstanceSpec) -> Result<LaunchedInstance> {
        info!(
            image = %spec.image,
            instance_type = %spec.instance_type,
            subnet = ?spec.subnet,
            iam_profile = ?spec.iam_profile,
            "Launching delegate instance"
        );

        let response = match self.run_instances_request(spec).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "aws: [provision] failed to create VM");
                return Err(e).context("Failed to launch instance");
            }
        };

        let instance = response
            .instances()
            .first()
            .context("No instance returned")?;

        let instance_id = instance.instance_id().context("No instance ID")?;

        info!(instance_id = %instance_id, "Instance launched");

        Ok(LaunchedInstance {
            instance_id: InstanceId::new(instance_id),
            instance_type: spec.instance_type.clone(),
            private_ip: instance.private_ip_address().map(str::to_string),
            state: instance
                .state()
                .and_then(|s| s.name())
                .map(|n| n.as_str().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance_spec::{InstanceSpec, VmParams};
    use crate::user_data::UserDataDocument;
    use aws_sdk_ec2::config::{BehaviorVersion, Region};

    fn offline_client() -> Ec2Client {
        let config = aws_sdk_ec2::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        Ec2Client::from_client(aws_sdk_ec2::Client::from_conf(config))
    }

    fn spec(params: VmParams) -> InstanceSpec {
        InstanceSpec::build(&params, UserDataDocument::new("#cloud-config\n"))
    }

    fn base_params() -> VmParams {
        VmParams {
            image: "ami-123".to_string(),
            instance_type: "t3.medium".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_request_runs_exactly_one_instance() {
        let spec = spec(base_params());
        let request = offline_client().run_instances_request(&spec);
        let input = request.as_input();

        assert_eq!(input.get_min_count(), &Some(1));
        assert_eq!(input.get_max_count(), &Some(1));
        assert_eq!(input.get_image_id().as_deref(), Some("ami-123"));
        assert_eq!(
            input.get_user_data().as_deref(),
            Some(spec.user_data.to_base64().as_str())
        );
    }

    #[test]
    fn test_request_omits_unset_optionals() {
        let spec = spec(base_params());
        let request = offline_client().run_instances_request(&spec);
        let input = request.as_input();

        assert!(input.get_key_name().is_none());
        assert!(input.get_subnet_id().is_none());
        assert!(input.get_security_group_ids().is_none());
        assert!(input.get_iam_instance_profile().is_none());
        assert!(input.get_network_interfaces().is_none());
        assert!(input.get_block_device_mappings().is_none());
    }

    #[test]
    fn test_request_includes_set_optionals() {
        let spec = spec(VmParams {
            key_pair_name: "delegate".to_string(),
            subnet: "subnet-1".to_string(),
            security_groups: vec!["sg-1".to_string()],
            iam_profile: "delegate-profile".to_string(),
            device_name: "/dev/xvda".to_string(),
            volume_size_gb: 40,
            ..base_params()
        });
        let request = offline_client().run_instances_request(&spec);
        let input = request.as_input();

        assert_eq!(input.get_key_name().as_deref(), Some("delegate"));
        // Subnet travels on the network interface, never top-level
        assert!(input.get_subnet_id().is_none());
        let interfaces = input.get_network_interfaces().as_ref().unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].subnet_id(), Some("subnet-1"));
        assert_eq!(
            input
                .get_iam_instance_profile()
                .as_ref()
                .and_then(|p| p.name()),
            Some("delegate-profile")
        );
        assert_eq!(input.get_block_device_mappings().as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_tag_specification_scoped_to_instance() {
        let mut tags = BTreeMap::new();
        tags.insert("Name".to_string(), "harness-cie-delegate".to_string());
        tags.insert("team".to_string(), "ci".to_string());

        let tag_spec = tag_specification(&tags);
        assert_eq!(tag_spec.resource_type(), Some(&ResourceType::Instance));
        let keys: Vec<_> = tag_spec.tags().iter().filter_map(|t| t.key()).collect();
        assert_eq!(keys, vec!["Name", "team"]);
    }

    #[test]
    fn test_network_interface() {
        assert!(network_interface(&spec(base_params())).is_none());

        let ni = network_interface(&spec(VmParams {
            security_groups: vec!["sg-1".to_string(), "sg-2".to_string()],
            allocate_public_ip: true,
            ..base_params()
        }))
        .unwrap();
        assert_eq!(ni.device_index(), Some(0));
        assert_eq!(ni.associate_public_ip_address(), Some(true));
        assert_eq!(ni.subnet_id(), None);
        assert_eq!(ni.groups(), ["sg-1".to_string(), "sg-2".to_string()]);

        let ni = network_interface(&spec(VmParams {
            subnet: "subnet-9".to_string(),
            ..base_params()
        }))
        .unwrap();
        assert_eq!(ni.subnet_id(), Some("subnet-9"));
        assert_eq!(ni.associate_public_ip_address(), Some(false));
        assert!(ni.groups().is_empty());
    }

    #[test]
    fn test_block_device_mapping() {
        assert!(block_device_mapping(&spec(base_params())).is_none());

        let bdm = block_device_mapping(&spec(VmParams {
            device_name: "/dev/sda1".to_string(),
            volume_type: "io1".to_string(),
            volume_size_gb: 100,
            volume_iops: 3000,
            ..base_params()
        }))
        .unwrap();
        assert_eq!(bdm.device_name(), Some("/dev/sda1"));
        let ebs = bdm.ebs().unwrap();
        assert_eq!(ebs.volume_type(), Some(&VolumeType::Io1));
        assert_eq!(ebs.volume_size(), Some(100));
        assert_eq!(ebs.iops(), Some(3000));
    }
}
