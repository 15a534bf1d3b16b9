//! URL codec - percent-encode or decode a URI component

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use crate::logic::LogicError;
use crate::{BoxFuture, Inputs, Logic, Outputs};

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Encode,
    Decode,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Encode => "encode",
            Operation::Decode => "decode",
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = LogicError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encode" => Ok(Operation::Encode),
            "decode" => Ok(Operation::Decode),
            other => Err(LogicError::InvalidInput(format!("unknown operation '{other}'"))),
        }
    }
}

pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Strict decode: every `%` must start a valid escape and the bytes must be UTF-8
pub fn decode_component(text: &str) -> Result<String, String> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return Err(format!("malformed escape sequence at byte {i}"));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(text)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| format!("decoded bytes are not valid UTF-8: {e}"))
}

fn has_special_chars(text: &str) -> bool {
    !text.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}

fn has_chinese(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecDetails {
    pub operation: Operation,
    pub input_length: usize,
    pub output_length: usize,
    pub has_special_chars: bool,
    pub has_chinese: bool,
    /// Milliseconds, two decimals
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Run the codec. Failures are reported in `details.errors`, never raised.
pub fn transform(text: &str, operation: Operation) -> (String, CodecDetails) {
    let started = Instant::now();

    if text.is_empty() {
        return (String::new(), CodecDetails {
            operation,
            input_length: 0,
            output_length: 0,
            has_special_chars: false,
            has_chinese: false,
            processing_time: 0.0,
            errors: vec!["Input text is empty".to_string()],
        });
    }

    let mut errors = Vec::new();
    let result = match operation {
        Operation::Encode => encode_component(text),
        Operation::Decode => match decode_component(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                errors.push(format!("Decode failed: {e}"));
                text.to_string()
            }
        },
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let details = CodecDetails {
        operation,
        input_length: text.chars().count(),
        output_length: result.chars().count(),
        has_special_chars: has_special_chars(text),
        has_chinese: has_chinese(text),
        processing_time: (elapsed_ms * 100.0).round() / 100.0,
        errors,
    };
    (result, details)
}

pub struct UrlEncoder;

impl Logic for UrlEncoder {
    fn name(&self) -> &'static str { "urlEncoder" }

    fn description(&self) -> &'static str {
        "Percent-encode or decode text as a URI component"
    }

    fn run(&self, inputs: Inputs) -> BoxFuture<'_, Result<Outputs, LogicError>> {
        Box::pin(async move {
            let text = inputs.text("inputText").unwrap_or_default();
            let operation: Operation = inputs.text("operation").unwrap_or("encode").parse()?;

            let (result, details) = transform(text, operation);
            if !details.errors.is_empty() {
                tracing::warn!(operation = operation.as_str(), errors = ?details.errors, "URL codec reported errors");
            }

            let mut outputs = Outputs::new();
            outputs.insert("result".into(), json!(result));
            outputs.insert("details".into(), json!(details));
            Ok(outputs)
        })
    }
}
