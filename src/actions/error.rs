//! Error types for remote version resolution.
//!
//! Every variant owns plain data so errors are `Clone`: failed lookups are
//! cached alongside successful ones and handed out again on later hits.

use thiserror::Error;

/// Result type alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Error type for GitHub API lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    // ========================================================================
    // Transport Errors
    // ========================================================================

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        message: String,
    },

    /// Request timed out.
    #[error("request to '{url}' timed out after {timeout_secs} seconds")]
    Timeout {
        url: String,
        timeout_secs: u64,
    },

    /// The API answered with an unexpected status.
    #[error("GitHub API returned {status} for '{url}'")]
    Status {
        status: u16,
        url: String,
    },

    /// The API rate limit is exhausted.
    #[error("rate limited by GitHub API (set GITHUB_TOKEN to raise the limit)")]
    RateLimited,

    /// The response body did not match the expected shape.
    #[error("failed to decode response from '{url}': {message}")]
    Decode {
        url: String,
        message: String,
    },

    /// The invocation deadline passed or the run was aborted.
    #[error("operation cancelled")]
    Cancelled,

    // ========================================================================
    // Lookup Errors
    // ========================================================================

    /// Listing the tags of a repository failed part way.
    #[error("failed to fetch tags for {owner}/{repo}: {source}")]
    TagListing {
        owner: String,
        repo: String,
        #[source]
        source: Box<ResolveError>,
    },

    /// A tag or branch could not be found.
    #[error("ref {reference} not found in {owner}/{repo}")]
    RefNotFound {
        owner: String,
        repo: String,
        reference: String,
    },

    /// No tag satisfies a version constraint.
    #[error("no compatible tags found for pattern {pattern} in {owner}/{repo}")]
    NoMatchingTags {
        owner: String,
        repo: String,
        pattern: String,
    },

    /// The repository has no tags at all.
    #[error("no tags found for {owner}/{repo}")]
    NoTags {
        owner: String,
        repo: String,
    },

    /// No tag belongs to the requested major version.
    #[error("no tags found for major version v{major} in {owner}/{repo}")]
    NoMajorTags {
        owner: String,
        repo: String,
        major: String,
    },
}

impl ResolveError {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Wrap a failure that happened while paging through tags.
    pub fn tag_listing(owner: &str, repo: &str, source: ResolveError) -> Self {
        if source.is_cancelled() {
            return source;
        }
        Self::TagListing {
            owner: owner.to_string(),
            repo: repo.to_string(),
            source: Box::new(source),
        }
    }

    /// Convert a transport error, keeping timeouts distinguishable.
    pub fn from_reqwest(url: &str, timeout_secs: u64, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            Self::http(err.to_string())
        }
    }

    /// Returns true if the failure is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::TagListing { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Returns true for failures worth retrying (timeouts, 5xx, connection resets).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Http { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
