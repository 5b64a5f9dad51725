//! delegate-common - Shared constants and helpers
//!
//! This crate holds the pieces shared by the installer and the pool
//! migrator, without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values and fixed file names
//! - [`tags`]: Reserved instance tag schema and tag merging

pub mod defaults;
pub mod tags;

pub use tags::merge_tags;
