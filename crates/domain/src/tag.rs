//! Registry tag naming conventions.
//!
//! - environment tag: `{tag}-{environment}`, e.g. `v1.2.0-prod`
//! - latest tag: `latest-{environment}`
//! - rollback tag: `v{MAJOR}.{MINOR}.{PATCH}-{environment}-rollback-{N}`

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use floe_core::{AppError, AppResult};
use regex::Regex;

const ROLLBACK_TAG_PATTERN: &str = r"^v\d+\.\d+\.\d+-[a-z]+-rollback-\d+$";
const SEMANTIC_VERSION_PATTERN: &str = r"^v(\d+)\.(\d+)\.(\d+)$";

static ROLLBACK_TAG_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(ROLLBACK_TAG_PATTERN).ok());
static SEMANTIC_VERSION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(SEMANTIC_VERSION_PATTERN).ok());

/// Returns the tag marking `tag` as promoted to `environment`.
#[must_use]
pub fn environment_tag(tag: &str, environment: &str) -> String {
    format!("{tag}-{environment}")
}

/// Returns the convenience tag tracking the newest artifact in `environment`.
#[must_use]
pub fn latest_tag(environment: &str) -> String {
    format!("latest-{environment}")
}

/// Returns whether `value` is a well-formed rollback tag.
pub fn is_rollback_tag(value: &str) -> AppResult<bool> {
    Ok(compiled(&ROLLBACK_TAG_RE, ROLLBACK_TAG_PATTERN)?.is_match(value))
}

/// Version tag in `v{MAJOR}.{MINOR}.{PATCH}` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersionTag {
    major: u64,
    minor: u64,
    patch: u64,
}

impl SemanticVersionTag {
    /// Creates a version tag from its components.
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a `v{MAJOR}.{MINOR}.{PATCH}` tag.
    pub fn parse(value: &str) -> AppResult<Self> {
        let invalid = || {
            AppError::Validation(format!(
                "tag '{value}' is not a semantic version of the form v<MAJOR>.<MINOR>.<PATCH>"
            ))
        };

        let captures = compiled(&SEMANTIC_VERSION_RE, SEMANTIC_VERSION_PATTERN)?
            .captures(value)
            .ok_or_else(invalid)?;
        let component = |index: usize| -> AppResult<u64> {
            captures
                .get(index)
                .and_then(|matched| matched.as_str().parse::<u64>().ok())
                .ok_or_else(invalid)
        };

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }

    /// Returns the rollback tag for this version, environment and sequence number.
    #[must_use]
    pub fn rollback_tag(&self, environment: &str, number: u32) -> String {
        format!("{self}-{environment}-rollback-{number}")
    }
}

impl Display for SemanticVersionTag {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersionTag {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Returns the next rollback number for `(version, environment)`.
///
/// Numbers are strictly ascending and tolerate gaps: the result is one past the
/// highest existing number, or 1 when no rollback tag exists yet.
pub fn next_rollback_number<'a>(
    existing_tags: impl IntoIterator<Item = &'a str>,
    version: &SemanticVersionTag,
    environment: &str,
) -> AppResult<u32> {
    let prefix = format!("{version}-{environment}-rollback-");

    let highest = existing_tags
        .into_iter()
        .filter_map(|tag| tag.strip_prefix(prefix.as_str()))
        .filter(|number| !number.is_empty() && number.bytes().all(|byte| byte.is_ascii_digit()))
        .filter_map(|number| number.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    highest.checked_add(1).ok_or_else(|| {
        AppError::Internal(format!(
            "rollback numbers exhausted for '{version}' in '{environment}'"
        ))
    })
}

/// Returns versions currently carrying an environment tag for `environment`,
/// sorted ascending. Rollback and latest tags are not versions.
pub fn promoted_versions<'a>(
    existing_tags: impl IntoIterator<Item = &'a str>,
    environment: &str,
) -> AppResult<Vec<String>> {
    let suffix = format!("-{environment}");
    let mut versions: Vec<SemanticVersionTag> = existing_tags
        .into_iter()
        .filter_map(|tag| tag.strip_suffix(suffix.as_str()))
        .filter_map(|version| SemanticVersionTag::parse(version).ok())
        .collect();
    versions.sort();
    versions.dedup();

    Ok(versions.iter().map(ToString::to_string).collect())
}

fn compiled(
    regex: &'static LazyLock<Option<Regex>>,
    pattern: &str,
) -> AppResult<&'static Regex> {
    regex
        .as_ref()
        .ok_or_else(|| AppError::Internal(format!("invalid tag pattern '{pattern}'")))
}
