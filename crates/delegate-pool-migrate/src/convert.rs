//! Legacy to current entry conversion

use crate::current::{AMAZON, AmazonAccount, AmazonNetwork, AmazonSpec, CurrentPoolEntry, Platform};
use crate::legacy::LegacyPoolEntry;

/// Convert one legacy entry. Total and pure.
///
/// Account credentials, instance login and key material, explicit id/ip,
/// disk settings and the init script have no place in the new schema and
/// are dropped. The account region is dropped too and the key pair name has
/// no legacy source; both are written empty.
pub fn convert(entry: &LegacyPoolEntry) -> CurrentPoolEntry {
    let instance = &entry.instance;
    let network = &instance.network;

    CurrentPoolEntry {
        name: entry.name.clone(),
        pool_type: AMAZON.to_string(),
        pool: entry.min_pool_size,
        limit: entry.max_pool_size,
        platform: Platform {
            os: entry.platform.os.clone(),
            arch: entry.platform.arch.clone(),
            variant: entry.platform.variant.clone(),
            version: entry.platform.version.clone(),
        },
        spec: AmazonSpec {
            account: AmazonAccount {
                region: String::new(),
                key_pair_name: String::new(),
            },
            ami: instance.ami.clone(),
            size: instance.instance_type.clone(),
            network: AmazonNetwork {
                vpc: network.vpc.clone(),
                vpc_security_groups: network.vpc_security_groups.clone(),
                security_groups: network.security_groups.clone(),
                subnet_id: network.subnet_id.clone(),
                private_ip: network.private_ip,
            },
            iam_profile_arn: instance.iam_profile_arn.clone(),
            tags: instance.tags.clone(),
            device_name: instance.device.name.clone(),
            user_data: instance.user_data.clone(),
        },
    }
}
