//! Ingestion of heterogeneous source documents.
//!
//! Every "which field holds the question text" decision is made here, once.
//! Later stages only ever see [`SourceDocument`], [`SourceChapter`] and
//! [`RawQuestion`].

use serde_json::{Map, Value};

use crate::formats::ChapterNumber;
use crate::options::is_bare_marker;

const QUESTION_TEXT_FIELDS: &[&str] = &["question_text", "question", "text"];
const QUESTION_NUMBER_FIELDS: &[&str] = &["question_number", "questionNumber", "id"];
const SOLUTION_FIELDS: &[&str] = &["solution", "correct_option_text"];
const OPTION_TEXT_FIELDS: &[&str] = &["text", "option_text"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOption {
    Text(String),
    Flagged { text: String, is_correct: bool },
}

impl RawOption {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged { is_correct: true, .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuestion {
    pub number: Option<String>,
    pub text: String,
    pub options: Vec<RawOption>,
    pub answer: Option<String>,
    pub solution: Option<String>,
    pub explanation: Option<String>,
}

impl RawQuestion {
    /// Options arrive as objects with correctness flags rather than letters.
    pub fn uses_flags(&self) -> bool {
        self.options
            .iter()
            .any(|opt| matches!(opt, RawOption::Flagged { .. }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceChapter {
    pub title: String,
    pub number: Option<ChapterNumber>,
    pub book_name: Option<String>,
    pub questions: Vec<RawQuestion>,
    /// Question records that were not JSON objects.
    pub malformed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub book_name: Option<String>,
    pub chapters: Vec<SourceChapter>,
}

pub fn document_from_json(value: &Value) -> anyhow::Result<SourceDocument> {
    let (book_name, chapters) = match value {
        Value::Array(chapters) => (None, chapters),
        Value::Object(map) => {
            let chapters = ["data", "chapters"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .ok_or_else(|| {
                    anyhow::anyhow!("source document has neither `data` nor `chapters` array")
                })?;
            (first_str(map, &["book_title", "book_name"]), chapters)
        }
        _ => anyhow::bail!("source document must be a JSON object or array"),
    };

    let mut out = Vec::with_capacity(chapters.len());
    for (idx, chapter) in chapters.iter().enumerate() {
        let Some(map) = chapter.as_object() else {
            tracing::warn!(chapter_index = idx, "source chapter is not an object; skipping");
            continue;
        };
        out.push(chapter_from_map(map));
    }

    Ok(SourceDocument {
        book_name,
        chapters: out,
    })
}

fn chapter_from_map(map: &Map<String, Value>) -> SourceChapter {
    let mut questions = Vec::new();
    let mut malformed = 0;
    if let Some(items) = map.get("questions").and_then(Value::as_array) {
        for item in items {
            match item.as_object() {
                Some(q) => questions.push(question_from_map(q)),
                None => malformed += 1,
            }
        }
    }

    SourceChapter {
        title: first_str(map, &["chapter_title", "title"]).unwrap_or_default(),
        number: map.get("chapter_number").and_then(ChapterNumber::from_json),
        book_name: first_str(map, &["book_name"]),
        questions,
        malformed,
    }
}

pub fn question_from_map(map: &Map<String, Value>) -> RawQuestion {
    let options = map
        .get("options")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(option_from_json).collect())
        .unwrap_or_default();

    // A `solution` holding only a letter stands in for a missing `answer`.
    let answer = first_str(map, &["answer"])
        .or_else(|| first_str(map, &["solution"]).filter(|s| is_bare_marker(s)));

    RawQuestion {
        number: first_str(map, QUESTION_NUMBER_FIELDS),
        text: first_str(map, QUESTION_TEXT_FIELDS).unwrap_or_default(),
        options,
        answer,
        solution: first_str(map, SOLUTION_FIELDS),
        explanation: first_str(map, &["explanation"]),
    }
}

fn option_from_json(value: &Value) -> Option<RawOption> {
    match value {
        Value::String(s) => Some(RawOption::Text(s.clone())),
        Value::Number(n) => Some(RawOption::Text(n.to_string())),
        Value::Object(map) => Some(RawOption::Flagged {
            text: first_str(map, OPTION_TEXT_FIELDS).unwrap_or_default(),
            is_correct: map.get("is_correct").is_some_and(truthy),
        }),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        _ => false,
    }
}

/// First of `keys` holding a non-blank string or a number, trimmed.
pub fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
