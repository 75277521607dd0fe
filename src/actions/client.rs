//! GitHub API client
//!
//! This module provides the HTTP-backed [`Resolver`] implementation. It includes:
//!
//! - Lazy, one-time construction of the underlying HTTP client
//! - Tag pagination that follows the `Link` header and can stop early
//! - Retry with linear backoff for transient failures
//! - Cancellation of in-flight and pending calls through a shared token
//! - A shared [`VersionCache`] so repeated lookups collapse to one request

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::{CacheStats, ResolvedVersion, VersionCache, VersionKey, VersionResult};
use super::error::{ResolveError, ResolveResult};
use super::resolver::Resolver;
use super::{is_commit_hash, is_major_version_only};
use crate::version;

/// Default GitHub REST API base URL
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Environment variable holding the API token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Environment variable overriding the API base URL (set on Enterprise runners)
pub const API_URL_ENV_VAR: &str = "GITHUB_API_URL";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default maximum number of retries for transient failures
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default retry delay in milliseconds
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Tags requested per page
const TAGS_PER_PAGE: u32 = 100;

// Internal pattern markers; they keep commit and major-series lookups in
// their own slots of the constrained cache space.
const COMMIT_LOOKUP: &str = "@commit";
const MAJOR_LOOKUP: &str = "@major";

/// Configuration for the GitHub client
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// API base URL
    pub api_url: String,
    /// Bearer token
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// Base retry delay (multiplied by the attempt number)
    pub retry_delay: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            user_agent: format!("github-ci/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GitHubClientConfig {
    /// Defaults plus the token from `GITHUB_TOKEN` and the base URL from
    /// `GITHUB_API_URL`, each when set and non-empty.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_url: non_empty(API_URL_ENV_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: non_empty(TOKEN_ENV_VAR),
            ..Self::default()
        }
    }
}

/// Builder for creating a GitHubClient
pub struct GitHubClientBuilder {
    config: GitHubClientConfig,
    cache: Option<Arc<VersionCache>>,
    cancel: Option<CancellationToken>,
}

impl GitHubClientBuilder {
    /// Create a new builder with settings from the environment
    pub fn new() -> Self {
        Self {
            config: GitHubClientConfig::from_env(),
            cache: None,
            cancel: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: GitHubClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the API base URL
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the authentication token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the retry delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Share a cache with other clients
    pub fn cache(mut self, cache: Arc<VersionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Tie every request to a cancellation token
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the GitHubClient
    pub fn build(self) -> GitHubClient {
        GitHubClient {
            config: self.config,
            http: OnceCell::new(),
            cache: self.cache.unwrap_or_default(),
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryTag {
    name: String,
    commit: TagCommit,
}

#[derive(Debug, Deserialize)]
struct TagCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// One decoded response plus the URL of the next page, if any.
struct Page<T> {
    body: T,
    next: Option<String>,
}

/// HTTP client for the GitHub REST API
pub struct GitHubClient {
    config: GitHubClientConfig,
    http: OnceCell<Client>,
    cache: Arc<VersionCache>,
    cancel: CancellationToken,
}

impl GitHubClient {
    /// Create a client configured from the environment with its own cache
    pub fn new() -> Self {
        GitHubClientBuilder::new().build()
    }

    /// Create a new builder
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// The cache backing this client
    pub fn cache(&self) -> &Arc<VersionCache> {
        &self.cache
    }

    /// The underlying HTTP client, built on first use
    fn http(&self) -> ResolveResult<&Client> {
        self.http.get_or_try_init(|| {
            debug!("Creating GitHub API client for {}", self.config.api_url);
            Client::builder()
                .timeout(self.config.timeout)
                .user_agent(&self.config.user_agent)
                .build()
                .map_err(|e| ResolveError::http(format!("failed to create HTTP client: {e}")))
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> ResolveResult<Url> {
        let mut url = Url::parse(&self.config.api_url).map_err(|e| {
            ResolveError::http(format!("invalid API URL '{}': {e}", self.config.api_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| ResolveError::http(format!("invalid API URL '{}'", self.config.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document with retries. `Ok(None)` means 404.
    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> ResolveResult<Option<Page<T>>> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_delay * attempt;
                    debug!(
                        "Retry {}/{} for {} after {:?}: {}",
                        attempt, self.config.max_retries, url, delay, e
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return Err(ResolveError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                other => return other,
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(&self, url: &str) -> ResolveResult<Option<Page<T>>> {
        if self.cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let mut request = self
            .http()?
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(ref token) = self.config.token {
            request = request.bearer_auth(token);
        }

        let timeout_secs = self.config.timeout.as_secs();
        let exchange = async {
            debug!("GET {}", url);
            let response = request
                .send()
                .await
                .map_err(|e| ResolveError::from_reqwest(url, timeout_secs, &e))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status == StatusCode::TOO_MANY_REQUESTS
                || (status == StatusCode::FORBIDDEN && rate_limit_exhausted(response.headers()))
            {
                warn!("GitHub API rate limit reached");
                return Err(ResolveError::RateLimited);
            }
            if !status.is_success() {
                return Err(ResolveError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let next = next_page_url(response.headers());
            let body = response.json::<T>().await.map_err(|e| ResolveError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            Ok::<_, ResolveError>(Some(Page { body, next }))
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ResolveError::Cancelled),
            result = exchange => result,
        }
    }

    /// Walk every tag of a repository, newest page first, until `visit` breaks.
    ///
    /// A failure on any page aborts the walk; nothing gathered so far is kept.
    async fn paginate_tags<F>(&self, owner: &str, repo: &str, mut visit: F) -> ResolveResult<()>
    where
        F: FnMut(&RepositoryTag) -> ControlFlow<()> + Send,
    {
        let mut first = self
            .endpoint(["repos", owner, repo, "tags"])
            .map_err(|e| ResolveError::tag_listing(owner, repo, e))?;
        first
            .query_pairs_mut()
            .append_pair("per_page", &TAGS_PER_PAGE.to_string())
            .append_pair("page", "1");

        let mut next = Some(first.to_string());
        while let Some(url) = next.take() {
            let page = self
                .fetch::<Vec<RepositoryTag>>(&url)
                .await
                .map_err(|e| ResolveError::tag_listing(owner, repo, e))?
                .ok_or_else(|| {
                    ResolveError::tag_listing(
                        owner,
                        repo,
                        ResolveError::Status {
                            status: StatusCode::NOT_FOUND.as_u16(),
                            url: url.clone(),
                        },
                    )
                })?;

            for tag in &page.body {
                if visit(tag).is_break() {
                    return Ok(());
                }
            }
            if page.body.is_empty() {
                break;
            }
            next = page.next;
        }
        Ok(())
    }

    /// Greatest tag accepted by `accept`.
    async fn latest_tag<F>(&self, owner: &str, repo: &str, accept: F) -> ResolveResult<Option<ResolvedVersion>>
    where
        F: Fn(&str) -> bool + Send + Sync,
    {
        let mut best: Option<ResolvedVersion> = None;
        self.paginate_tags(owner, repo, |tag| {
            if accept(&tag.name)
                && best
                    .as_ref()
                    .map_or(true, |b| version::compare(&tag.name, &b.tag).is_gt())
            {
                best = Some(ResolvedVersion::new(&tag.name, &tag.commit.sha));
            }
            ControlFlow::Continue(())
        })
        .await?;
        Ok(best)
    }

    /// Look up `refs/{kind}/{reference}`. `Ok(None)` when it does not exist.
    async fn lookup_ref(&self, owner: &str, repo: &str, kind: &str, reference: &str) -> ResolveResult<Option<String>> {
        let segments = ["repos", owner, repo, "git", "ref", kind]
            .into_iter()
            .chain(reference.split('/'));
        let url = self.endpoint(segments)?;
        let found = self.fetch::<GitRef>(url.as_str()).await?;
        Ok(found.map(|page| page.body.object.sha))
    }

    async fn resolve_direct(&self, owner: &str, repo: &str, reference: &str) -> ResolveResult<String> {
        let (kinds, name): (&[&str], &str) = if let Some(tag) = reference.strip_prefix("tags/") {
            (&["tags"], tag)
        } else if let Some(branch) = reference.strip_prefix("heads/") {
            (&["heads"], branch)
        } else {
            (&["tags", "heads"], reference)
        };

        let mut first_error = None;
        for kind in kinds {
            match self.lookup_ref(owner, repo, kind, name).await {
                Ok(Some(sha)) => {
                    debug!("Resolved {}/{}@{} via refs/{} to {}", owner, repo, name, kind, sha);
                    return Ok(sha);
                }
                Ok(None) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    debug!("Lookup of refs/{}/{} in {}/{} failed: {}", kind, name, owner, repo, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or_else(|| ResolveError::RefNotFound {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: reference.to_string(),
        }))
    }

    async fn commit_hash_uncached(&self, owner: &str, repo: &str, reference: &str) -> ResolveResult<String> {
        if is_major_version_only(reference) {
            match self.resolve_latest_minor_in_major(owner, repo, reference).await {
                Ok(resolved) => return Ok(resolved.hash),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => debug!("Falling back to direct lookup of {}: {}", reference, e),
            }
        }
        self.resolve_direct(owner, repo, reference).await
    }

    async fn latest_unconstrained_uncached(&self, owner: &str, repo: &str) -> VersionResult {
        let release_url = self.endpoint(["repos", owner, repo, "releases", "latest"])?;
        match self.fetch::<Release>(release_url.as_str()).await {
            Ok(Some(page)) => {
                let tag = page.body.tag_name;
                match self.resolve_commit_hash(owner, repo, &tag).await {
                    Ok(hash) => return Ok(ResolvedVersion::new(tag, hash)),
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => debug!("Release tag {} of {}/{} did not resolve: {}", tag, owner, repo, e),
                }
            }
            Ok(None) => debug!("{}/{} has no releases, scanning tags", owner, repo),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => debug!("Latest release lookup for {}/{} failed: {}", owner, repo, e),
        }

        self.latest_tag(owner, repo, |_| true)
            .await?
            .ok_or_else(|| ResolveError::NoTags {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
    }

    fn store_constrained(&self, key: VersionKey, result: &VersionResult) {
        if !matches!(result, Err(e) if e.is_cancelled()) {
            self.cache.set_constrained(key, result.clone());
        }
    }
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for GitHubClient {
    async fn resolve_commit_hash(&self, owner: &str, repo: &str, reference: &str) -> ResolveResult<String> {
        if is_commit_hash(reference) {
            return Ok(reference.to_string());
        }
        let reference = reference.strip_prefix("refs/").unwrap_or(reference);

        let key = VersionKey::constrained(owner, repo, reference, COMMIT_LOOKUP);
        if let Some(cached) = self.cache.get_constrained(&key) {
            return cached.map(|resolved| resolved.hash);
        }

        let result = self
            .commit_hash_uncached(owner, repo, reference)
            .await
            .map(|hash| ResolvedVersion::new(reference, hash));
        self.store_constrained(key, &result);
        result.map(|resolved| resolved.hash)
    }

    async fn resolve_latest_constrained(
        &self,
        owner: &str,
        repo: &str,
        current_ref: &str,
        pattern: &str,
    ) -> VersionResult {
        let key = VersionKey::constrained(owner, repo, current_ref, pattern);
        if let Some(cached) = self.cache.get_constrained(&key) {
            return cached;
        }

        let result = self
            .latest_tag(owner, repo, |name| version::matches_pattern(name, pattern))
            .await
            .and_then(|best| {
                best.ok_or_else(|| ResolveError::NoMatchingTags {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    pattern: pattern.to_string(),
                })
            });
        if let Ok(ref resolved) = result {
            info!("Latest {}/{} for {}: {}", owner, repo, pattern, resolved.tag);
        }
        self.store_constrained(key, &result);
        result
    }

    async fn resolve_latest_unconstrained(&self, owner: &str, repo: &str) -> VersionResult {
        let key = VersionKey::unconstrained(owner, repo);
        if let Some(cached) = self.cache.get_unconstrained(&key) {
            return cached;
        }

        let result = self.latest_unconstrained_uncached(owner, repo).await;
        if !matches!(&result, Err(e) if e.is_cancelled()) {
            self.cache.set_unconstrained(key, result.clone());
        }
        result
    }

    async fn resolve_tag_for_commit(&self, owner: &str, repo: &str, hash: &str) -> ResolveResult<Option<String>> {
        let mut found = None;
        self.paginate_tags(owner, repo, |tag| {
            if tag.commit.sha.eq_ignore_ascii_case(hash) {
                found = Some(tag.name.clone());
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await?;
        Ok(found)
    }

    async fn resolve_latest_minor_in_major(&self, owner: &str, repo: &str, major: &str) -> VersionResult {
        let major = version::normalize(major).to_string();
        let exact = format!("v{major}");
        let key = VersionKey::constrained(owner, repo, &exact, MAJOR_LOOKUP);
        if let Some(cached) = self.cache.get_constrained(&key) {
            return cached;
        }

        let prefix = format!("{exact}.");
        let result = self
            .latest_tag(owner, repo, |name| name == exact || name.starts_with(&prefix))
            .await
            .and_then(|best| {
                best.ok_or_else(|| ResolveError::NoMajorTags {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    major: major.clone(),
                })
            });
        self.store_constrained(key, &result);
        result
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        if !segments.any(|s| s.trim() == r#"rel="next""#) {
            return None;
        }
        target
            .strip_prefix('<')?
            .strip_suffix('>')
            .map(str::to_string)
    })
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}
