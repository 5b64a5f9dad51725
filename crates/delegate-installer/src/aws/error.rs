//! AWS error classification
//!
//! Maps EC2 error codes (via `.code()`, not Debug-string matching where
//! avoidable) onto a few categories so the CLI can print a useful hint next
//! to the verbatim AWS message. Classification never changes control flow:
//! every remote failure is fatal and surfaced as-is.

use thiserror::Error;

/// AWS error categories relevant to launching the delegate
#[derive(Debug, Error)]
pub enum AwsError {
    /// Credentials missing, expired, or not allowed to run instances
    #[error("AWS authorization failed: {message}")]
    Unauthorized { message: String },

    /// A referenced resource (AMI, subnet, key pair, group, profile) does not exist
    #[error("Referenced resource not found: {message}")]
    NotFound { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is an authorization error
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AwsError::Unauthorized { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AwsError::Unauthorized { .. } => suggestion_for_code("UnauthorizedOperation"),
            AwsError::NotFound { .. } => Some(
                "Check the AMI, subnet, key pair, security groups and IAM profile exist in this region."
                    .to_string(),
            ),
            AwsError::Throttled => suggestion_for_code("RequestLimitExceeded"),
            AwsError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            AwsError::Sdk { code: None, .. } => None,
        }
    }
}

/// Error codes for authorization failures
const UNAUTHORIZED_CODES: &[&str] = &[
    "AuthFailure",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "ExpiredToken",
    "AccessDenied",
];

/// Error codes for references to resources that do not exist
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidAMIID.NotFound",
    "InvalidAMIID.Malformed",
    "InvalidSubnetID.NotFound",
    "InvalidKeyPair.NotFound",
    "InvalidGroup.NotFound",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if UNAUTHORIZED_CODES.contains(&c) => AwsError::Unauthorized { message },
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some("InvalidParameterValue") if message.contains("iamInstanceProfile") => {
            AwsError::NotFound { message }
        }
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an error from an anyhow::Error by extracting the AWS error code.
///
/// Walks the error chain looking for a `RunInstances` SDK error. Returns
/// `None` when the chain holds no AWS error at all (e.g. a local I/O error).
pub fn classify_anyhow_error(error: &anyhow::Error) -> Option<AwsError> {
    use aws_sdk_ec2::error::{ProvideErrorMetadata, SdkError};
    use aws_sdk_ec2::operation::run_instances::RunInstancesError;

    error.chain().find_map(|cause| {
        cause
            .downcast_ref::<SdkError<RunInstancesError>>()
            .map(|e| classify_aws_error(e.code(), e.message()))
    })
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "UnauthorizedOperation",
        "Check the access key, assumed role or instance profile is allowed ec2:RunInstances.",
    ),
    (
        "InsufficientInstanceCapacity",
        "Try a different availability zone or instance type.",
    ),
    (
        "InstanceLimitExceeded",
        "Request a service limit increase via AWS Service Quotas console.",
    ),
    (
        "VcpuLimitExceeded",
        "Request a service limit increase via AWS Service Quotas console.",
    ),
    (
        "Unsupported",
        "This instance type may not be available in this region/AZ.",
    ),
    (
        "RequestLimitExceeded",
        "AWS API rate limit hit. Wait a moment and run the installer again.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
