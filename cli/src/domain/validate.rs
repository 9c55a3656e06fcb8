//! Pure input validation: no I/O, no async.

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

static IMAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^ami-[0-9a-f]{8}([0-9a-f]{9})?$").expect("valid regex")
});

static REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d$").expect("valid regex")
});

/// Validates a machine image id (`ami-` followed by 8 or 17 hex digits).
///
/// # Errors
///
/// Returns an error if the id is malformed.
pub fn validate_image_id(id: &str) -> Result<()> {
    anyhow::ensure!(
        IMAGE_ID_RE.is_match(id),
        "invalid image id '{id}': expected ami- followed by 8 or 17 hex digits"
    );
    Ok(())
}

/// Validates a region name such as `eu-west-1`.
///
/// # Errors
///
/// Returns an error if the name is malformed.
pub fn validate_region(region: &str) -> Result<()> {
    anyhow::ensure!(
        REGION_RE.is_match(region),
        "invalid region '{region}': expected a name like eu-west-1"
    );
    Ok(())
}

/// Validates that an availability zone belongs to a region
/// (`eu-west-1b` is the zone `b` of `eu-west-1`).
///
/// # Errors
///
/// Returns an error if the zone is not `<region><letter>`.
pub fn validate_zone(region: &str, zone: &str) -> Result<()> {
    let suffix = zone.strip_prefix(region).unwrap_or_default();
    anyhow::ensure!(
        suffix.len() == 1 && suffix.chars().all(|c| c.is_ascii_lowercase()),
        "availability zone '{zone}' is not in region '{region}'"
    );
    Ok(())
}
