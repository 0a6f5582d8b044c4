//! Response normalisation: pull a JSON value out of the model's free text.
//!
//! Even when told to answer with JSON only, models often wrap the object in a
//! ```` ```json ```` fence or add a sentence of prose around it. Extraction is
//! an ordered list of strategies; each proposes at most one candidate and the
//! first candidate that parses wins:
//!
//! 1. labeled fence: ```` ```json … ``` ````
//! 2. unlabeled fence: ```` ``` … ``` ````
//! 3. the whole reply
//!
//! Fences are paired in reading order: a fence line opens a block and the next
//! bare fence line closes it. Text between blocks is never a fence candidate,
//! and with several blocks of the same kind the first one is taken.
//!
//! When nothing parses, the caller still gets a 200 with a soft-failure
//! envelope holding the raw reply, which is more useful to inspect than an
//! error status.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Error string carried by the soft-failure envelope.
pub const PARSE_FAILURE: &str = "Could not parse JSON from response";

/// Result of normalising one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A strategy produced valid JSON.
    Parsed { value: Value, strategy: Strategy },
    /// Nothing parsed; the reply is returned for inspection.
    Unparsed { raw: String },
}

impl Normalized {
    /// Serialise into the HTTP response body.
    pub fn to_body(&self) -> String {
        match self {
            Self::Parsed { value, .. } => value.to_string(),
            Self::Unparsed { raw } => envelope(raw),
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Parsed { value, .. } => Some(value),
            Self::Unparsed { .. } => None,
        }
    }
}

/// Where in the reply the JSON was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    LabeledFence,
    PlainFence,
    Raw,
}

impl Strategy {
    /// Attempt order.
    pub const ALL: [Strategy; 3] = [Strategy::LabeledFence, Strategy::PlainFence, Strategy::Raw];

    /// The text this strategy proposes for parsing, if any.
    fn candidate<'a>(&self, reply: &'a str) -> Option<&'a str> {
        match self {
            Self::LabeledFence => fenced_blocks(reply)
                .into_iter()
                .find(|block| block.label.eq_ignore_ascii_case("json"))
                .map(|block| block.body),
            Self::PlainFence => fenced_blocks(reply)
                .into_iter()
                .find(|block| block.label.is_empty())
                .map(|block| block.body),
            Self::Raw => Some(reply),
        }
    }
}

// A whole line holding a fence and an optional language label.
static RE_FENCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*```[ \t]*([A-Za-z0-9_+.\-]*)[ \t]*\r?\n?$").unwrap());

/// One closed fenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FencedBlock<'a> {
    label: &'a str,
    body: &'a str,
}

/// Every closed fenced block in `reply`, in order. An unclosed trailing
/// fence yields nothing.
fn fenced_blocks(reply: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut open: Option<(&str, usize)> = None;
    let mut offset = 0;

    for line in reply.split_inclusive('\n') {
        if let Some(caps) = RE_FENCE_LINE.captures(line) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            match open {
                None => open = Some((label, offset + line.len())),
                Some((open_label, start)) if label.is_empty() => {
                    blocks.push(FencedBlock {
                        label: open_label,
                        body: &reply[start..offset],
                    });
                    open = None;
                }
                // A labeled fence inside an open block is content.
                Some(_) => {}
            }
        }
        offset += line.len();
    }
    blocks
}

/// Run the strategy pipeline over a model reply.
pub fn normalize(reply: &str) -> Normalized {
    Strategy::ALL
        .iter()
        .find_map(|strategy| {
            let candidate = strategy.candidate(reply)?;
            serde_json::from_str::<Value>(candidate.trim())
                .ok()
                .map(|value| Normalized::Parsed {
                    value,
                    strategy: *strategy,
                })
        })
        .unwrap_or_else(|| Normalized::Unparsed {
            raw: reply.to_string(),
        })
}

#[derive(Serialize)]
struct ParseFailure<'a> {
    raw_response: &'a str,
    error: &'static str,
}

/// `{"raw_response": <reply>, "error": "Could not parse JSON from response"}`.
fn envelope(raw: &str) -> String {
    let failure = ParseFailure {
        raw_response: raw,
        error: PARSE_FAILURE,
    };
    // Serialising a struct of two strings cannot fail.
    serde_json::to_string(&failure).unwrap_or_default()
}
