//! Shared AWS configuration context
//!
//! Holds the SDK config produced by credential resolution so the service
//! clients built from it all share the same authentication handle.

use aws_config::SdkConfig;
use std::sync::Arc;

/// Resolved AWS configuration for creating service clients.
///
/// Built by [`crate::aws::credentials::resolve`]; never loaded implicitly, so
/// every client in a run authenticates exactly as the credential chain
/// decided.
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Wrap an already-loaded SDK config.
    pub fn from_config(config: SdkConfig, region: impl Into<String>) -> Self {
        Self {
            config: Arc::new(config),
            region: region.into(),
        }
    }

    /// Get the underlying SDK config for direct client construction.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Get the region string.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Create an EC2 client from this context.
    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
