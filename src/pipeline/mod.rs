//! Pipeline stages for one bill extraction request.
//!
//! Each submodule implements exactly one step, so each is testable without
//! the others and without a live model.
//!
//! ## Data Flow
//!
//! ```text
//! gate ──▶ encode ──▶ llm ──▶ normalize
//! (CORS,    (base64    (one     (fence/raw JSON
//!  shape)    check)     call)    extraction)
//! ```
//!
//! 1. [`gate`]     : method, origin, content-type, body size, payload shape,
//!    MIME type
//! 2. [`encode`]   : validate the base64 payload and wrap it for the provider
//! 3. [`llm`]      : the only stage with network I/O; exactly one call
//! 4. [`normalize`]: pull JSON out of the free-text reply, or fall back to
//!    the soft-failure envelope

pub mod encode;
pub mod gate;
pub mod llm;
pub mod normalize;
