//! Legacy pool definition schema
//!
//! One YAML document per pool. Every field defaults when absent and unknown
//! keys are ignored, so partially filled documents still decode.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyPoolEntry {
    pub name: String,
    pub min_pool_size: i64,
    pub max_pool_size: i64,
    pub init_script: String,
    pub platform: LegacyPlatform,
    pub account: LegacyAccount,
    pub instance: LegacyInstance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyPlatform {
    pub os: String,
    pub arch: String,
    pub variant: String,
    pub version: String,
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyAccount {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub region: String,
}

impl std::fmt::Debug for LegacyAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyAccount")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyInstance {
    pub ami: String,
    pub tags: BTreeMap<String, String>,
    pub iam_profile_arn: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub user: String,
    pub private_key: String,
    pub public_key: String,
    /// Older files spell it `userdata`
    #[serde(alias = "userdata")]
    pub user_data: String,
    pub disk: LegacyDisk,
    pub network: LegacyNetwork,
    pub device: LegacyDevice,
    pub id: String,
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyDisk {
    pub size: i64,
    #[serde(rename = "type")]
    pub disk_type: String,
    pub iops: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyNetwork {
    pub vpc: String,
    pub vpc_security_groups: Vec<String>,
    pub security_groups: Vec<String>,
    pub subnet_id: String,
    pub private_ip: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyDevice {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_defaults() {
        let entry: LegacyPoolEntry = serde_yaml::from_str("name: pool1\n").unwrap();
        assert_eq!(entry.name, "pool1");
        assert_eq!(entry.min_pool_size, 0);
        assert!(entry.instance.tags.is_empty());
        assert!(!entry.instance.network.private_ip);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let entry: LegacyPoolEntry =
            serde_yaml::from_str("name: pool1\nmystery: 42\ninstance:\n  extra: true\n").unwrap();
        assert_eq!(entry.name, "pool1");
    }

    #[test]
    fn test_userdata_alias() {
        let entry: LegacyPoolEntry =
            serde_yaml::from_str("instance:\n  userdata: echo hi\n").unwrap();
        assert_eq!(entry.instance.user_data, "echo hi");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let account = LegacyAccount {
            access_key_secret: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{account:?}").contains("hunter2"));
    }
}
