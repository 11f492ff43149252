//! Configuration types for a review run.
//!
//! All run behaviour is controlled through [`ReviewConfig`], built via its
//! [`ReviewConfigBuilder`]. The per-run secret lives in [`Credential`],
//! which is deliberately *not* part of the config: a config can be shared,
//! logged and reused across runs, a credential cannot.

use crate::error::LupiaError;
use crate::pipeline::report::ReportRenderer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used for all three stages unless overridden.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Maximum characters of each document embedded in a prompt.
pub const DEFAULT_CHAR_LIMIT: usize = 20_000;

/// Column at which the sanitizer hard-wraps report text.
pub const DEFAULT_WRAP_WIDTH: usize = 100;

/// File name offered for the generated report.
pub const DEFAULT_REPORT_FILENAME: &str = "informe_LupIA.pdf";

/// Most retries a stage may take after its first failed call.
pub const MAX_RETRIES: u32 = 1;

/// Configuration for a review run.
///
/// # Example
/// ```rust
/// use lupia::ReviewConfig;
///
/// let config = ReviewConfig::builder()
///     .model("gpt-4o-mini")
///     .temperature(0.1)
///     .concurrent_reviews(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.char_limit, 20_000);
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Model identifier sent to the provider. Default: `gpt-4o-mini`.
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Compliance matrices must be reproducible between runs on the same
    /// documents, so the default stays close to zero.
    pub temperature: f32,

    /// Maximum tokens the model may generate per stage. Default: 4096.
    pub max_tokens: usize,

    /// Retries per stage after the first failed call: 0 or 1. Default: 1.
    pub max_retries: u32,

    /// Delay before a retry, doubled on each further attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 180.
    pub api_timeout_secs: u64,

    /// Characters of each document kept for the prompts. Default: 20 000.
    pub char_limit: usize,

    /// Report line-wrap column. Default: 100.
    pub wrap_width: usize,

    /// Run the two technical reviews concurrently. Default: false.
    ///
    /// A and B never see each other's output, so running them together only
    /// changes wall-clock time. The consensus stage always waits for both.
    pub concurrent_reviews: bool,

    /// Base URL of an OpenAI-compatible API. If None, the public OpenAI
    /// endpoint is used.
    pub base_url: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `base_url`.
    ///
    /// When None, an OpenAI provider is built for each run from that run's
    /// credential and `model`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Report renderer. If None, the built-in PDF renderer is used.
    pub renderer: Option<Arc<dyn ReportRenderer>>,

    /// Receives stage events while the run progresses.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 1,
            retry_backoff_ms: 500,
            api_timeout_secs: 180,
            char_limit: DEFAULT_CHAR_LIMIT,
            wrap_width: DEFAULT_WRAP_WIDTH,
            concurrent_reviews: false,
            base_url: None,
            provider: None,
            renderer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("char_limit", &self.char_limit)
            .field("wrap_width", &self.wrap_width)
            .field("concurrent_reviews", &self.concurrent_reviews)
            .field("base_url", &self.base_url)
            .field(
                "provider",
                &self.provider.as_ref().map(|p| format!("{}/{}", p.name(), p.model())),
            )
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn ReportRenderer>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReviewProgressCallback>"),
            )
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn char_limit(mut self, n: usize) -> Self {
        self.config.char_limit = n;
        self
    }

    pub fn wrap_width(mut self, n: usize) -> Self {
        self.config.wrap_width = n;
        self
    }

    pub fn concurrent_reviews(mut self, v: bool) -> Self {
        self.config.concurrent_reviews = v;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, LupiaError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(LupiaError::InvalidConfig("Model must not be empty".into()));
        }
        if c.char_limit == 0 {
            return Err(LupiaError::InvalidConfig(
                "Character limit must be ≥ 1".into(),
            ));
        }
        if c.wrap_width < 20 {
            return Err(LupiaError::InvalidConfig(format!(
                "Wrap width must be ≥ 20, got {}",
                c.wrap_width
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(LupiaError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES {
            return Err(LupiaError::InvalidConfig(format!(
                "At most {} retry per stage is allowed, got {}",
                MAX_RETRIES, c.max_retries
            )));
        }
        if let Some(url) = &c.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(LupiaError::InvalidConfig(format!(
                    "Base URL must start with http:// or https://, got '{}'",
                    url
                )));
            }
        }
        Ok(self.config)
    }
}

/// A provider API key, supplied per run.
///
/// `Debug` never prints the secret, so a credential can sit inside request
/// structs that end up in `tracing` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for handing to the provider.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only credentials count as missing.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
