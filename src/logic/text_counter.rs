//! Text statistics - characters, words (Latin + CJK), lines, paragraphs

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::logic::LogicError;
use crate::{BoxFuture, Inputs, Logic, Outputs};

lazy_static! {
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n\s*\n").unwrap();
    static ref WORD_RUN: Regex = Regex::new(r"[A-Za-z0-9_]+").unwrap();
    static ref CJK: Regex = Regex::new(r"[\x{4e00}-\x{9fff}]").unwrap();
    static ref DIGIT: Regex = Regex::new(r"[0-9]").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r"[^A-Za-z0-9_\s\x{4e00}-\x{9fff}]").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStatistics {
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub words: usize,
    pub lines: usize,
    pub paragraphs: usize,
    pub chinese_characters: usize,
    pub english_words: usize,
    pub numbers: usize,
    pub punctuation: usize,
}

/// Count statistics; lengths are in Unicode scalar values
pub fn count(text: &str, include_spaces: bool) -> TextStatistics {
    if text.is_empty() {
        return TextStatistics::default();
    }

    let characters_no_spaces = text.chars().filter(|c| !c.is_whitespace()).count();
    let characters = if include_spaces { text.chars().count() } else { characters_no_spaces };

    let paragraphs = PARAGRAPH_BREAK
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .count();

    // A Latin word is a whole ASCII word run made only of letters
    let english_words = WORD_RUN
        .find_iter(text)
        .filter(|m| m.as_str().bytes().all(|b| b.is_ascii_alphabetic()))
        .count();
    let chinese_characters = CJK.find_iter(text).count();

    TextStatistics {
        characters,
        characters_no_spaces,
        words: english_words + chinese_characters,
        lines: text.split('\n').count(),
        paragraphs,
        chinese_characters,
        english_words,
        numbers: DIGIT.find_iter(text).count(),
        punctuation: PUNCTUATION.find_iter(text).count(),
    }
}

pub struct TextCounter;

impl Logic for TextCounter {
    fn name(&self) -> &'static str { "textCounter" }

    fn description(&self) -> &'static str {
        "Count characters, words, lines, paragraphs, digits and punctuation"
    }

    fn run(&self, inputs: Inputs) -> BoxFuture<'_, Result<Outputs, LogicError>> {
        Box::pin(async move {
            let text = inputs.text("text").unwrap_or_default();
            let include_spaces = inputs.flag("includeSpaces").unwrap_or(true);

            let statistics = count(text, include_spaces);
            tracing::debug!(chars = statistics.characters, words = statistics.words, "Counted text");

            let mut outputs = Outputs::new();
            outputs.insert("statistics".into(), json!(statistics));
            Ok(outputs)
        })
    }
}
