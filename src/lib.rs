//! # bill-gateway
//!
//! HTTP gateway that turns a photo of a restaurant bill into structured JSON
//! using a Vision Language Model.
//!
//! The gateway does no OCR and no arithmetic of its own. It validates the
//! request, sends the photo with a fixed extraction prompt to the model, and
//! reshapes whatever text comes back into JSON.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST { image: { base64Data, mimeType } }
//!  │
//!  ├─ 1. Gate       method, CORS origin, content-type, payload shape, MIME
//!  ├─ 2. Encode     validate base64, wrap as provider ImageData
//!  ├─ 3. VLM        one call to gemini-2.0-flash / gpt-4.1 / claude / …
//!  ├─ 4. Normalize  ```json fence → ``` fence → raw reply → soft-failure envelope
//!  └─ 5. Respond    200 JSON with CORS headers, or 4xx/5xx plain text
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bill_gateway::{serve, Gateway, GatewayConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY from the environment.
//!     let config = GatewayConfig::builder()
//!         .allowed_origins(["https://app.example.com"])
//!         .build()?;
//!     let gateway = Arc::new(Gateway::from_config(config)?);
//!     serve("0.0.0.0:8787".parse()?, gateway).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bill-gateway` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bill;
pub mod config;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bill::{BillExtraction, BillItem, Discount, DiscountType, ExtractRequest, ImageInput};
pub use config::{GatewayConfig, GatewayConfigBuilder, PromptRevision};
pub use error::{BillGatewayError, GateError, ModelError};
pub use gateway::{Failure, Gateway, Outcome};
pub use pipeline::llm::{BillModel, LlmBillModel};
pub use pipeline::normalize::{normalize, Normalized, Strategy};
pub use server::{router, serve};
