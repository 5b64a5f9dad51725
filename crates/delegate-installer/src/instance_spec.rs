//! Provider-agnostic description of the delegate instance
//!
//! [`InstanceSpec::build`] is the single place VM parameters are normalised.
//! Both provisioning strategies read optional attributes only through the
//! spec, so an attribute omitted here is omitted from the API call and from
//! the Terraform file alike.

use crate::user_data::UserDataDocument;
use delegate_common::merge_tags;
use std::collections::BTreeMap;

/// Raw VM parameters as configured; empty strings and zeroes mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, garde::Validate)]
pub struct VmParams {
    #[garde(length(min = 1))]
    pub image: String,
    #[garde(length(min = 1))]
    pub instance_type: String,
    #[garde(skip)]
    pub key_pair_name: String,
    #[garde(skip)]
    pub subnet: String,
    #[garde(skip)]
    pub security_groups: Vec<String>,
    #[garde(skip)]
    pub allocate_public_ip: bool,
    #[garde(skip)]
    pub iam_profile: String,
    #[garde(skip)]
    pub tags: BTreeMap<String, String>,
    #[garde(skip)]
    pub device_name: String,
    #[garde(skip)]
    pub volume_type: String,
    #[garde(range(min = 0))]
    pub volume_size_gb: i32,
    #[garde(range(min = 0))]
    pub volume_iops: i32,
}

/// Root EBS volume settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDevice {
    pub device_name: String,
    pub volume_type: Option<String>,
    pub volume_size_gb: Option<i32>,
    pub volume_iops: Option<i32>,
}

/// Normalised instance description consumed by every provisioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    pub image: String,
    pub instance_type: String,
    pub key_pair_name: Option<String>,
    pub subnet: Option<String>,
    pub security_groups: Vec<String>,
    pub allocate_public_ip: bool,
    pub iam_profile: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub user_data: UserDataDocument,
    pub root_device: Option<RootDevice>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn positive(value: i32) -> Option<i32> {
    (value > 0).then_some(value)
}

impl InstanceSpec {
    /// Compose a spec from `params`. Never mutates `params`.
    pub fn build(params: &VmParams, user_data: UserDataDocument) -> Self {
        let root_device = non_empty(&params.device_name).map(|device_name| RootDevice {
            device_name,
            volume_type: non_empty(&params.volume_type),
            volume_size_gb: positive(params.volume_size_gb),
            volume_iops: positive(params.volume_iops),
        });

        Self {
            image: params.image.clone(),
            instance_type: params.instance_type.clone(),
            key_pair_name: non_empty(&params.key_pair_name),
            subnet: non_empty(&params.subnet),
            security_groups: params
                .security_groups
                .iter()
                .filter_map(|g| non_empty(g))
                .collect(),
            allocate_public_ip: params.allocate_public_ip,
            iam_profile: non_empty(&params.iam_profile),
            tags: merge_tags(&params.tags),
            user_data,
            root_device,
        }
    }

    /// Whether a network interface has to be described at all.
    ///
    /// With no subnet, no groups and no public IP request the account's
    /// default VPC placement applies and nothing is sent.
    pub fn has_network_settings(&self) -> bool {
        self.subnet.is_some() || !self.security_groups.is_empty() || self.allocate_public_ip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_data::render_cloud_config;
    use delegate_common::tags::{TAG_NAME, TAG_NAME_VALUE};

    fn user_data() -> UserDataDocument {
        UserDataDocument::new(render_cloud_config("YQ==", "Yg==", "Yw=="))
    }

    fn params() -> VmParams {
        VmParams {
            image: "ami-123".to_string(),
            instance_type: "t3.large".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_spec_omits_optionals() {
        let spec = InstanceSpec::build(&params(), user_data());
        assert_eq!(spec.key_pair_name, None);
        assert_eq!(spec.subnet, None);
        assert_eq!(spec.iam_profile, None);
        assert!(spec.security_groups.is_empty());
        assert_eq!(spec.root_device, None);
        assert!(!spec.has_network_settings());
        assert_eq!(spec.tags.len(), 1);
        assert_eq!(spec.tags[TAG_NAME], TAG_NAME_VALUE);
    }

    #[test]
    fn test_reserved_name_overrides_caller() {
        let mut p = params();
        p.tags.insert("Name".to_string(), "custom".to_string());
        p.tags.insert("owner".to_string(), "ci".to_string());

        let spec = InstanceSpec::build(&p, user_data());
        assert_eq!(spec.tags[TAG_NAME], TAG_NAME_VALUE);
        assert_eq!(spec.tags["owner"], "ci");
        assert_eq!(p.tags["Name"], "custom");

        // Building twice from the same params yields the same tags
        let again = InstanceSpec::build(&p, user_data());
        assert_eq!(spec.tags, again.tags);
    }

    #[test]
    fn test_optionals_included_when_set() {
        let p = VmParams {
            key_pair_name: "delegate-key".to_string(),
            subnet: "subnet-1".to_string(),
            security_groups: vec!["sg-1".to_string(), " ".to_string(), "sg-2".to_string()],
            iam_profile: "delegate-profile".to_string(),
            ..params()
        };

        let spec = InstanceSpec::build(&p, user_data());
        assert_eq!(spec.key_pair_name.as_deref(), Some("delegate-key"));
        assert_eq!(spec.subnet.as_deref(), Some("subnet-1"));
        assert_eq!(spec.security_groups, vec!["sg-1", "sg-2"]);
        assert_eq!(spec.iam_profile.as_deref(), Some("delegate-profile"));
        assert!(spec.has_network_settings());
    }

    #[test]
    fn test_public_ip_alone_needs_network_settings() {
        let p = VmParams {
            allocate_public_ip: true,
            ..params()
        };
        assert!(InstanceSpec::build(&p, user_data()).has_network_settings());
    }

    #[test]
    fn test_root_device_requires_device_name() {
        let mut p = VmParams {
            volume_type: "gp3".to_string(),
            volume_size_gb: 50,
            ..params()
        };
        assert_eq!(InstanceSpec::build(&p, user_data()).root_device, None);

        p.device_name = "/dev/sda1".to_string();
        let root = InstanceSpec::build(&p, user_data()).root_device.unwrap();
        assert_eq!(root.device_name, "/dev/sda1");
        assert_eq!(root.volume_type.as_deref(), Some("gp3"));
        assert_eq!(root.volume_size_gb, Some(50));
        assert_eq!(root.volume_iops, None);
    }

    #[test]
    fn test_validation() {
        use garde::Validate;
        assert!(params().validate().is_ok());
        assert!(VmParams::default().validate().is_err());
    }
}
