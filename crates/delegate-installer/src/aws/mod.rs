//! AWS client modules for the installer
//!
//! - credentials: base identity plus optional user role, resolved once
//! - context: the resolved SDK config shared by every client
//! - ec2: the single `RunInstances` call
//! - error: SDK error classification for user-facing hints

pub mod context;
pub mod credentials;
pub mod ec2;
pub mod error;

pub use context::AwsContext;
pub use credentials::{CredentialError, CredentialSpec, resolve};
pub use ec2::{Ec2Client, Ec2Operations, InstanceId, LaunchedInstance};
pub use error::{AwsError, classify_anyhow_error, classify_aws_error};
