//! Extraction prompts sent alongside the bill photo.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: the JSON contract the model is asked to
//!    honour lives in exactly one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without
//!    calling a real model, so contract regressions are easy to catch.
//!
//! The three revisions differ only in how discounts are represented. Which
//! one is canonical is a product decision; see [`PromptRevision`].

use crate::config::PromptRevision;

/// Opening of every revision: role and output schema.
const PREAMBLE: &str = r#"You are an expert at reading restaurant bills. Extract every line item from the bill in this image and return ONLY a JSON object with this exact structure:

{
  "items": [
    { "name": string, "price": number, "quantity": integer__DISCOUNT_FIELD__ }
  ],
  "subtotal": number,
  "tax": number,
  "total": number
}

Follow these rules precisely:

1. ITEM NAMES
   - If an item name wraps onto several lines, merge it into a single name
   - Keep the name as printed; do not translate or abbreviate

2. QUANTITY AND PRICE
   - quantity defaults to 1 when none is printed
   - When a line shows a quantity and a line total, derive the unit price:
     "Beer 6 1200" means quantity 6 and price 200.00
   - price is always the price of ONE unit
"#;

const DISCOUNT_FIELD_SCHEMA: &str =
    r#", "discount": { "value": number, "discountType": "flat" | "percentage" } (optional)"#;

const DISCOUNT_LINE_RULES: &str = r#"
3. DISCOUNTS
   - Represent every discount (item-level or bill-level) as its own line item
     with quantity 1 and a NEGATIVE price equal to the amount taken off
   - Name the line after the discount as printed, e.g. "Happy Hour Discount"
"#;

const DISCOUNT_FIELD_RULES: &str = r#"
3. DISCOUNTS
   - Attach an item-level discount to its item in the "discount" field:
     use "percentage" when the bill prints a percent, otherwise "flat"
   - Leave "price" as the undiscounted unit price
   - A bill-level discount becomes a separate line item with quantity 1 and
     a NEGATIVE price
"#;

const PRE_APPLIED_RULES: &str = r#"
3. DISCOUNTS
   - Apply every item-level discount directly to that item's unit price
   - Spread a bill-level discount across items in proportion to their line totals
   - Never output a "discount" field or a negative line item
"#;

const TOTALS_RULES: &str = r#"
4. TAX
   - Sum every service charge, VAT, GST, CGST, SGST and similar levy into "tax"

5. TOTALS
   - "subtotal" is the sum of all line totals AFTER discounts and BEFORE tax
   - "total" is the final amount actually paid
   - Check that subtotal + tax equals total within 0.01; if it does not,
     re-check the discount calculations before answering

6. OUTPUT FORMAT
   - Output ONLY the JSON object
   - All numbers are plain numbers without currency symbols or thousands separators
   - Do NOT add commentary or explanations"#;

/// Build the instruction block for the given discount revision.
pub fn extraction_prompt(revision: PromptRevision) -> String {
    let (schema_field, discount_rules) = match revision {
        PromptRevision::DiscountLine => ("", DISCOUNT_LINE_RULES),
        PromptRevision::DiscountField => (DISCOUNT_FIELD_SCHEMA, DISCOUNT_FIELD_RULES),
        PromptRevision::PreApplied => ("", PRE_APPLIED_RULES),
    };
    let mut prompt = PREAMBLE.replace("__DISCOUNT_FIELD__", schema_field);
    prompt.push_str(discount_rules);
    prompt.push_str(TOTALS_RULES);
    prompt
}
