//! The gateway: one request in, one reply out.
//!
//! [`Gateway`] owns everything a request needs and nothing a request can
//! change: the config, the rendered prompt and the model handle. It is shared
//! behind an `Arc` and every request runs as an independent pipeline.

use crate::bill::BillExtraction;
use crate::config::GatewayConfig;
use crate::error::{BillGatewayError, GateError, ModelError};
use crate::pipeline::encode::encode_image;
use crate::pipeline::gate::{self, Admission};
use crate::pipeline::llm::{BillModel, LlmBillModel};
use crate::pipeline::normalize::{self, Normalized};
use crate::prompts::extraction_prompt;
use axum::body::Body;
use axum::http::{HeaderMap, Method};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the HTTP layer should send back.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Answer a CORS preflight.
    Preflight { origin: Option<String> },
    /// 200 with a JSON body (extracted bill or soft-failure envelope).
    Extracted { origin: String, body: String },
}

/// Why a request did not produce an [`Outcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// Rejected by the gate. `origin` is set once the origin check has passed.
    Rejected {
        error: GateError,
        origin: Option<String>,
    },
    /// The model call failed.
    Model { error: ModelError, origin: String },
}

pub struct Gateway {
    config: GatewayConfig,
    prompt: String,
    model: Arc<dyn BillModel>,
}

impl Gateway {
    /// Build a gateway around an explicit model implementation.
    pub fn new(config: GatewayConfig, model: Arc<dyn BillModel>) -> Self {
        let prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| extraction_prompt(config.prompt_revision));
        Self {
            config,
            prompt,
            model,
        }
    }

    /// Build a gateway whose model is an `edgequake-llm` provider resolved
    /// from the config.
    pub fn from_config(config: GatewayConfig) -> Result<Self, BillGatewayError> {
        let provider = resolve_provider(&config)?;
        let model = LlmBillModel::new(provider, config.temperature, config.max_tokens);
        Ok(Self::new(config, Arc::new(model)))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Run one request through gate → encode → model → normalize.
    ///
    /// The body is only read once the request head has passed the gate.
    pub async fn handle(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<Outcome, Failure> {
        let admission = gate::admit(&self.config, method, headers).map_err(|error| {
            warn!(%method, "Rejected: {}", error);
            let origin = match error {
                GateError::MethodNotAllowed | GateError::OriginNotAllowed => None,
                _ => gate::request_origin(headers).map(str::to_string),
            };
            Failure::Rejected { error, origin }
        })?;

        let origin = match admission {
            Admission::Preflight { origin } => {
                debug!(?origin, "Preflight");
                return Ok(Outcome::Preflight { origin });
            }
            Admission::Post { origin } => origin,
        };

        let reject = |error: GateError| {
            warn!(%origin, "Rejected: {}", error);
            Failure::Rejected {
                error,
                origin: Some(origin.clone()),
            }
        };
        let bytes = gate::read_body(body, self.config.max_body_bytes)
            .await
            .map_err(reject)?;
        let image = gate::admit_payload(&bytes).map_err(reject)?;
        let image_data = encode_image(&image).map_err(reject)?;

        let reply = self
            .model
            .generate(&self.prompt, image_data)
            .await
            .map_err(|error| Failure::Model {
                error,
                origin: origin.clone(),
            })?;

        let normalized = normalize::normalize(&reply);
        match &normalized {
            Normalized::Parsed { value, strategy } => {
                info!(%origin, ?strategy, "Extracted bill JSON");
                if self.config.verify_totals {
                    check_totals(value);
                }
            }
            Normalized::Unparsed { raw } => {
                warn!(%origin, reply_len = raw.len(), "Model reply was not JSON; returning raw response");
            }
        }

        Ok(Outcome::Extracted {
            origin,
            body: normalized.to_body(),
        })
    }
}

/// Flag a bill whose totals do not reconcile. Never alters the response.
fn check_totals(value: &serde_json::Value) {
    match serde_json::from_value::<BillExtraction>(value.clone()) {
        Ok(bill) if !bill.is_reconciled() => warn!(
            subtotal = bill.subtotal,
            tax = bill.tax,
            total = bill.total,
            gap = bill.reconciliation_gap(),
            "Extracted totals do not reconcile"
        ),
        Ok(bill) => debug!(items = bill.items.len(), "Extracted totals reconcile"),
        Err(e) => debug!("Reply does not match the bill schema: {}", e),
    }
}

/// Resolve the LLM provider: a pre-built provider wins, otherwise the named
/// provider is created through [`ProviderFactory`], which reads its API key
/// (`GEMINI_API_KEY`, `OPENAI_API_KEY`, …) from the environment.
fn resolve_provider(config: &GatewayConfig) -> Result<Arc<dyn LLMProvider>, BillGatewayError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    ProviderFactory::create_llm_provider(&config.provider_name, &config.model).map_err(|e| {
        BillGatewayError::ProviderNotConfigured {
            provider: config.provider_name.clone(),
            hint: format!(
                "Set the provider's API key (e.g. GEMINI_API_KEY for gemini).\nError: {e}"
            ),
        }
    })
}
