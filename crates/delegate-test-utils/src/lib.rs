//! Shared test utilities for the delegate crates
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection for ignored integration tests
//! - [`fixtures`]: on-disk artifact sets and legacy pool documents

pub mod aws;
pub mod fixtures;

// Re-export commonly used items
pub use aws::get_test_region;
pub use fixtures::{ArtifactFixture, legacy_pool_document};
