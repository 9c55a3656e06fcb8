//! Pure classification of cloud control-plane failures.
//!
//! The AWS CLI reports service errors on stderr as
//! `An error occurred (<Code>) when calling the <Operation> operation: <message>`.
//! The code decides whether a retry can help.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::error::ProviderError;

static AWS_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"An error occurred \(([^)]+)\) when calling the (\w+) operation(?: \([^)]*\))?: (.*)")
        .expect("valid regex")
});

/// Error codes caused by throttling or a momentarily unhealthy service.
const THROTTLING_CODES: &[&str] = &[
    "RequestLimitExceeded",
    "Throttling",
    "ThrottlingException",
    "InternalError",
    "InternalFailure",
    "ServiceUnavailable",
    "Unavailable",
];

/// Error codes caused by eventual consistency: a freshly created resource
/// is not yet visible to every API endpoint.
const EVENTUAL_CONSISTENCY_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidVolume.NotFound",
    "InvalidSnapshot.NotFound",
];

/// Whether a provider error code is worth retrying.
#[must_use]
pub fn is_transient_code(code: &str) -> bool {
    THROTTLING_CODES.contains(&code) || EVENTUAL_CONSISTENCY_CODES.contains(&code)
}

/// Classify a failed AWS CLI invocation from its stderr.
///
/// Output that does not carry a service error code (missing binary,
/// credentials problems reported by the CLI itself, ...) is `Other`.
#[must_use]
pub fn classify_cli_error(operation: &str, stderr: &str) -> ProviderError {
    let Some(caps) = AWS_ERROR_RE.captures(stderr) else {
        let message = stderr.trim();
        return ProviderError::other(
            operation,
            if message.is_empty() { "no error output" } else { message },
        );
    };
    let code = caps[1].to_string();
    let operation = caps[2].to_string();
    let message = caps[3].trim().to_string();
    if is_transient_code(&code) {
        ProviderError::Transient {
            operation,
            code,
            message,
        }
    } else {
        ProviderError::Rejected {
            operation,
            code,
            message,
        }
    }
}
