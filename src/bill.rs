//! Request and bill types.
//!
//! [`ExtractRequest`] is the only type the gateway deserializes from clients.
//! The bill types describe what the model is *asked* to return; the gateway
//! never rejects a reply for failing to match them.

use serde::{Deserialize, Serialize};

/// Tolerance for `subtotal + tax ≈ total`.
pub const TOTAL_TOLERANCE: f64 = 0.01;

/// POST body: `{ "image": { "base64Data": ..., "mimeType": ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    pub image: ImageInput,
}

/// Inline bill photo sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub base64_data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Flat,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub value: f64,
    pub discount_type: DiscountType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub name: String,
    /// Unit price after any bundled quantity has been divided out.
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
}

fn default_quantity() -> u32 {
    1
}

/// Structured bill as requested from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillExtraction {
    pub items: Vec<BillItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

impl BillExtraction {
    /// `subtotal + tax - total`; zero for a self-consistent bill.
    pub fn reconciliation_gap(&self) -> f64 {
        self.subtotal + self.tax - self.total
    }

    /// Whether the bill satisfies `subtotal + tax ≈ total` within [`TOTAL_TOLERANCE`].
    pub fn is_reconciled(&self) -> bool {
        // Small epsilon so a gap of exactly one cent survives float rounding.
        self.reconciliation_gap().abs() <= TOTAL_TOLERANCE + 1e-9
    }
}
