//! Current pool file schema, as read by the AWS runner
//!
//! Every field is serialized, including empty ones, so a migrated file shows
//! the operator exactly which settings still need filling in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written to every migrated file
pub const POOL_FILE_VERSION: &str = "1";

/// Provider type of every migrated pool
pub const AMAZON: &str = "amazon";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolFile {
    pub version: String,
    pub instances: Vec<CurrentPoolEntry>,
}

impl PoolFile {
    pub fn new(instances: Vec<CurrentPoolEntry>) -> Self {
        Self {
            version: POOL_FILE_VERSION.to_string(),
            instances,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPoolEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub pool_type: String,
    /// Instances kept warm
    pub pool: i64,
    /// Upper bound on instances
    pub limit: i64,
    pub platform: Platform,
    pub spec: AmazonSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    pub variant: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmazonSpec {
    pub account: AmazonAccount,
    pub ami: String,
    pub size: String,
    pub network: AmazonNetwork,
    pub iam_profile_arn: String,
    pub tags: BTreeMap<String, String>,
    pub device_name: String,
    pub user_data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmazonAccount {
    pub region: String,
    pub key_pair_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmazonNetwork {
    pub vpc: String,
    pub vpc_security_groups: Vec<String>,
    pub security_groups: Vec<String>,
    pub subnet_id: String,
    pub private_ip: bool,
}
