//! Default configuration values shared between the installer and the migrator
//!
//! These constants are the single source for CLI defaults and for the
//! fixed output file names written as side effects.

use std::time::Duration;

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default STS session name used when assuming a role
pub const DEFAULT_ASSUME_ROLE_SESSION_NAME: &str = "drone-s3";

/// Lifetime of the temporary credentials obtained through assume-role (1 hour)
pub const ASSUME_ROLE_SESSION_LENGTH: Duration = Duration::from_secs(60 * 60);

/// Default delegate AMI
pub const DEFAULT_IMAGE: &str = "ami-00517afdd8df42285";

/// Default delegate instance type
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.medium";

/// Compose template the delegate stack is merged from
pub const DEFAULT_COMPOSE_TEMPLATE: &str = "config/harness-delegate.yml";

/// Merged compose file, shipped to the VM
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Runner pool definition, shipped to the VM
pub const DEFAULT_POOL_FILE: &str = "config/.drone_pool.yml";

/// Runner environment file, shipped to the VM and loaded locally
pub const DEFAULT_ENV_FILE: &str = "config/.env";

/// Terraform file written by the export strategy
pub const TERRAFORM_FILE: &str = "vm.tf";

/// Legacy pool file read by the migrator
pub const DEFAULT_LEGACY_POOL_FILE: &str = "pool.yml";

/// Migrated pool file written by the migrator
pub const MIGRATED_POOL_FILE: &str = "update_pool.yaml";
