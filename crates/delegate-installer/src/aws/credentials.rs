//! AWS credential resolution
//!
//! A [`CredentialSpec`] is resolved in two stages:
//!
//! 1. A base identity, picked by the first resolver in [`RESOLVER_CHAIN`]
//!    that applies: static key pair, then assume-role, then the ambient
//!    provider chain (environment, profile, instance metadata).
//! 2. Optionally, a user role assumed on top of the base identity, so an
//!    operator can authenticate as one identity and act as another.
//!
//! Planning is pure ([`CredentialPlan::from_spec`]); only [`resolve`] touches
//! the SDK.

use super::context::AwsContext;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use delegate_common::defaults::{ASSUME_ROLE_SESSION_LENGTH, DEFAULT_ASSUME_ROLE_SESSION_NAME};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Provider name attached to static credentials
const STATIC_PROVIDER_NAME: &str = "delegate-installer";

/// Declarative description of how to authenticate against AWS.
///
/// Every field except `region` is optional; empty strings count as unset.
#[derive(Clone, PartialEq, Eq, garde::Validate)]
pub struct CredentialSpec {
    #[garde(skip)]
    pub access_key: Option<String>,
    #[garde(skip)]
    pub secret_key: Option<String>,
    #[garde(skip)]
    pub assume_role_arn: Option<String>,
    #[garde(length(min = 1))]
    pub assume_role_session_name: String,
    #[garde(skip)]
    pub user_role_arn: Option<String>,
    #[garde(length(min = 1))]
    pub region: String,
}

impl CredentialSpec {
    /// Spec that falls back to the ambient identity in `region`
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            access_key: None,
            secret_key: None,
            assume_role_arn: None,
            assume_role_session_name: DEFAULT_ASSUME_ROLE_SESSION_NAME.to_string(),
            user_role_arn: None,
            region: region.into(),
        }
    }

    /// Set a static access key pair
    pub fn with_static(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the role to assume for the base identity
    pub fn with_assume_role(mut self, role_arn: impl Into<String>) -> Self {
        self.assume_role_arn = Some(role_arn.into());
        self
    }

    /// Set the STS session name
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.assume_role_session_name = session_name.into();
        self
    }

    /// Set the role to act as once the base identity is resolved
    pub fn with_user_role(mut self, role_arn: impl Into<String>) -> Self {
        self.user_role_arn = Some(role_arn.into());
        self
    }
}

impl std::fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSpec")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("assume_role_arn", &self.assume_role_arn)
            .field("assume_role_session_name", &self.assume_role_session_name)
            .field("user_role_arn", &self.user_role_arn)
            .field("region", &self.region)
            .finish()
    }
}

/// The base authentication mode selected for a run
#[derive(Clone, PartialEq, Eq)]
pub enum BaseCredentials {
    /// Static access key pair
    Static {
        access_key: String,
        secret_key: String,
    },
    /// Temporary credentials from STS, refreshed by the provider on expiry
    AssumeRole {
        role_arn: String,
        session_name: String,
        session_length: Duration,
    },
    /// Whatever the default provider chain finds on the host
    Ambient,
}

impl BaseCredentials {
    /// Short name of the mode for logging
    pub fn mode(&self) -> &'static str {
        match self {
            BaseCredentials::Static { .. } => "static",
            BaseCredentials::AssumeRole { .. } => "assume-role",
            BaseCredentials::Ambient => "ambient",
        }
    }
}

impl std::fmt::Debug for BaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseCredentials::Static { access_key, .. } => f
                .debug_struct("Static")
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .finish(),
            BaseCredentials::AssumeRole {
                role_arn,
                session_name,
                session_length,
            } => f
                .debug_struct("AssumeRole")
                .field("role_arn", role_arn)
                .field("session_name", session_name)
                .field("session_length", session_length)
                .finish(),
            BaseCredentials::Ambient => f.write_str("Ambient"),
        }
    }
}

/// A resolver either claims the spec or reports "not applicable" with `None`.
pub type Resolver = fn(&CredentialSpec) -> Option<BaseCredentials>;

/// Base-identity resolvers in precedence order. The last one always applies.
pub const RESOLVER_CHAIN: &[Resolver] = &[static_pair, assume_role, ambient];

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Static pair, only when both halves are present
pub fn static_pair(spec: &CredentialSpec) -> Option<BaseCredentials> {
    let access_key = non_empty(&spec.access_key)?;
    let secret_key = non_empty(&spec.secret_key)?;
    Some(BaseCredentials::Static {
        access_key: access_key.to_string(),
        secret_key: secret_key.to_string(),
    })
}

/// Assume-role for one hour
pub fn assume_role(spec: &CredentialSpec) -> Option<BaseCredentials> {
    let role_arn = non_empty(&spec.assume_role_arn)?;
    Some(BaseCredentials::AssumeRole {
        role_arn: role_arn.to_string(),
        session_name: spec.assume_role_session_name.clone(),
        session_length: ASSUME_ROLE_SESSION_LENGTH,
    })
}

/// Ambient host identity
pub fn ambient(_spec: &CredentialSpec) -> Option<BaseCredentials> {
    Some(BaseCredentials::Ambient)
}

/// The fully planned resolution: base identity plus optional user role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPlan {
    pub base: BaseCredentials,
    pub user_role_arn: Option<String>,
    pub session_name: String,
    pub region: String,
}

impl CredentialPlan {
    /// Walk [`RESOLVER_CHAIN`] and record the optional second stage.
    pub fn from_spec(spec: &CredentialSpec) -> Self {
        let base = RESOLVER_CHAIN
            .iter()
            .find_map(|resolver| resolver(spec))
            .unwrap_or(BaseCredentials::Ambient);

        Self {
            base,
            user_role_arn: non_empty(&spec.user_role_arn).map(str::to_string),
            session_name: spec.assume_role_session_name.clone(),
            region: spec.region.clone(),
        }
    }
}

/// Credential resolution errors
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Region is empty
    #[error("AWS region cannot be empty")]
    EmptyRegion,

    /// Region contains characters no AWS region has
    #[error("invalid AWS region '{0}'")]
    InvalidRegion(String),
}

/// Reject regions that can never produce a working session
pub fn validate_region(region: &str) -> Result<(), CredentialError> {
    if region.is_empty() {
        return Err(CredentialError::EmptyRegion);
    }
    let valid = region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid || region.starts_with('-') || region.ends_with('-') {
        return Err(CredentialError::InvalidRegion(region.to_string()));
    }
    Ok(())
}

/// Resolve `spec` into an [`AwsContext`] ready for client construction.
///
/// Nothing remote is created here; assume-role providers fetch their
/// temporary credentials lazily on first use.
pub async fn resolve(spec: &CredentialSpec) -> Result<AwsContext, CredentialError> {
    validate_region(&spec.region)?;
    let plan = CredentialPlan::from_spec(spec);

    info!(
        mode = plan.base.mode(),
        region = %plan.region,
        user_role = ?plan.user_role_arn,
        "Resolving AWS credentials"
    );

    let region = Region::new(plan.region.clone());
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());

    match &plan.base {
        BaseCredentials::Static {
            access_key,
            secret_key,
        } => {
            loader = loader.credentials_provider(Credentials::new(
                access_key.as_str(),
                secret_key.as_str(),
                None,
                None,
                STATIC_PROVIDER_NAME,
            ));
        }
        BaseCredentials::AssumeRole {
            role_arn,
            session_name,
            session_length,
        } => {
            let provider = AssumeRoleProvider::builder(role_arn.as_str())
                .session_name(session_name.as_str())
                .session_length(*session_length)
                .region(region.clone())
                .build()
                .await;
            loader = loader.credentials_provider(provider);
        }
        BaseCredentials::Ambient => {
            warn!("AWS key and/or secret not provided (falling back to ec2 instance profile)");
        }
    }

    let mut config = loader.load().await;

    if plan.base == BaseCredentials::Ambient {
        check_ambient(&config).await;
    }

    if let Some(user_role) = &plan.user_role_arn {
        debug!(role_arn = %user_role, "Assuming user role over base identity");
        config = with_user_role(config, user_role, &plan.session_name).await;
    }

    Ok(AwsContext::from_config(config, plan.region))
}

/// Layer an assume-role provider for `role_arn` over `config`'s credentials.
async fn with_user_role(config: SdkConfig, role_arn: &str, session_name: &str) -> SdkConfig {
    let provider = AssumeRoleProvider::builder(role_arn)
        .session_name(session_name)
        .configure(&config)
        .build()
        .await;

    config
        .into_builder()
        .credentials_provider(SharedCredentialsProvider::new(provider))
        .build()
}

/// Load ambient credentials once so a broken chain is reported up front.
///
/// This costs one round trip through the default chain (IMDS on EC2) per
/// ambient run. The result only decides whether to warn; the chain may still
/// work at call time.
async fn check_ambient(config: &SdkConfig) {
    let Some(provider) = config.credentials_provider() else {
        warn!("No ambient AWS credential provider available");
        return;
    };

    match provider.provide_credentials().await {
        Ok(_) => debug!("Ambient AWS credentials available"),
        Err(e) => warn!(error = %e, "Could not load ambient AWS credentials"),
    }
}
