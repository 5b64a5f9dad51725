//! EC2 instance launching

mod instance;
mod operations;
mod types;

pub use instance::{block_device_mapping, iam_instance_profile, network_interface, tag_specification};
pub use operations::Ec2Operations;
pub use types::{InstanceId, LaunchedInstance};

#[cfg(test)]
pub use operations::MockEc2Operations;

use crate::aws::context::AwsContext;
use aws_sdk_ec2::Client;

/// EC2 client for launching the delegate instance
pub struct Ec2Client {
    pub(crate) client: Client,
}

impl Ec2Client {
    /// Create an EC2 client from a resolved AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Wrap an existing SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}
