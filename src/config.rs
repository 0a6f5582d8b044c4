//! Configuration types for the bill extraction gateway.
//!
//! All gateway behaviour is controlled through [`GatewayConfig`], built via its
//! [`GatewayConfigBuilder`]. The allow-list and prompt are injected here
//! rather than held in module-level state, so tests can run gateways with
//! alternate allow-lists side by side.

use crate::error::BillGatewayError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Origins permitted by default: local development and production.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] =
    ["http://localhost:3000", "https://www.satyajeetnigade.in"];

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for a [`crate::Gateway`].
///
/// # Example
/// ```rust
/// use bill_gateway::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .allowed_origins(["https://app.example.com"])
///     .model("gemini-2.5-pro")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// Origins allowed to call the gateway. An `Origin` header matches when it
    /// *contains* one of these strings.
    pub allowed_origins: Vec<String>,

    /// LLM provider name passed to `ProviderFactory` (e.g. "gemini", "openai").
    pub provider_name: String,

    /// Model identifier, e.g. "gemini-2.0-flash".
    pub model: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction is transcription, not composition; low temperature keeps
    /// the model faithful to the printed numbers.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// How the prompt asks the model to represent discounts.
    pub prompt_revision: PromptRevision,

    /// Custom prompt. If None, the built-in prompt for `prompt_revision` is used.
    pub system_prompt: Option<String>,

    /// Log a warning when the extracted bill fails `subtotal + tax ≈ total`. Default: true.
    pub verify_totals: bool,

    /// Largest accepted request body in bytes. Default: 10 MiB.
    ///
    /// Base64 inflates a photo by a third, so this admits phone photos of
    /// roughly 7 MiB.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            prompt_revision: PromptRevision::default(),
            system_prompt: None,
            verify_totals: true,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("allowed_origins", &self.allowed_origins)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("prompt_revision", &self.prompt_revision)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("verify_totals", &self.verify_totals)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl GatewayConfig {
    /// Create a new builder for `GatewayConfig`.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder {
            config: Self::default(),
        }
    }

    /// Return the allow-list entry the `Origin` header matches, if any.
    ///
    /// Matching is substring containment, so `https://www.satyajeetnigade.in`
    /// also admits `https://www.satyajeetnigade.in.evil.example`. Keep entries
    /// as specific as possible.
    pub fn match_origin(&self, origin: &str) -> Option<&str> {
        self.allowed_origins
            .iter()
            .find(|allowed| origin.contains(allowed.as_str()))
            .map(String::as_str)
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Replace the allow-list.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
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

    pub fn prompt_revision(mut self, revision: PromptRevision) -> Self {
        self.config.prompt_revision = revision;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn verify_totals(mut self, v: bool) -> Self {
        self.config.verify_totals = v;
        self
    }

    pub fn max_body_bytes(mut self, n: usize) -> Self {
        self.config.max_body_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<GatewayConfig, BillGatewayError> {
        self.config.allowed_origins = self
            .config
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .collect();

        let c = &self.config;
        if c.allowed_origins.is_empty() {
            return Err(BillGatewayError::InvalidConfig(
                "at least one allowed origin is required".into(),
            ));
        }
        // An empty entry is a substring of every origin.
        if c.allowed_origins.iter().any(String::is_empty) {
            return Err(BillGatewayError::InvalidConfig(
                "allowed origins must not be empty strings".into(),
            ));
        }
        if c.provider.is_none() && (c.provider_name.is_empty() || c.model.is_empty()) {
            return Err(BillGatewayError::InvalidConfig(
                "provider name and model are required".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(BillGatewayError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_body_bytes == 0 {
            return Err(BillGatewayError::InvalidConfig(
                "max_body_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the model is told to represent discounts.
///
/// | Revision | Item discount | Bill discount |
/// |----------|---------------|---------------|
/// | `DiscountLine` | negative-price line | negative-price line |
/// | `DiscountField` | `discount` field on the item (default) | negative-price line |
/// | `PreApplied` | folded into `price` | spread across items |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptRevision {
    DiscountLine,
    #[default]
    DiscountField,
    PreApplied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GatewayConfig::default();
        assert_eq!(c.allowed_origins.len(), 2);
        assert_eq!(c.provider_name, "gemini");
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.prompt_revision, PromptRevision::DiscountField);
        assert!(c.verify_totals);
    }

    #[test]
    fn origin_matches_by_containment() {
        let c = GatewayConfig::builder()
            .allowed_origins(["satyajeetnigade.in"])
            .build()
            .unwrap();
        assert_eq!(
            c.match_origin("https://www.satyajeetnigade.in"),
            Some("satyajeetnigade.in")
        );
        assert_eq!(c.match_origin("https://example.com"), None);
        assert_eq!(c.match_origin(""), None);
    }

    #[test]
    fn rejects_empty_allow_list() {
        let err = GatewayConfig::builder()
            .allowed_origins(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, BillGatewayError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_blank_origin_entry() {
        let err = GatewayConfig::builder()
            .allowed_origins(["https://ok.example", "   "])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn trims_origin_entries() {
        let c = GatewayConfig::builder()
            .allowed_origins([" https://a.example "])
            .build()
            .unwrap();
        assert_eq!(c.allowed_origins, vec!["https://a.example".to_string()]);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = GatewayConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }
}
