//! delegate-installer: provision a CI delegate VM on EC2
//!
//! Builds cloud-init user data from the local compose, pool and env files,
//! then either launches the instance through the EC2 API or writes an
//! equivalent Terraform file.

pub mod aws;
pub mod compose;
pub mod config;
pub mod instance_spec;
pub mod provision;
pub mod user_data;
