//! EC2 types

/// Strongly-typed EC2 instance ID (`i-...`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        InstanceId(id.into())
    }
}

/// Launched instance info, as returned by `RunInstances`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedInstance {
    pub instance_id: InstanceId,
    pub instance_type: String,
    pub private_ip: Option<String>,
    /// Instance state at launch time (usually "pending")
    pub state: Option<String>,
}
