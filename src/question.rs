use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::answer::{self, Finding, Rejection};
use crate::formats::{CanonicalQuestion, QUESTION_TYPE_MCQ};
use crate::options::{is_bare_marker, parse_options, reletter_by_position, repeated_letters};
use crate::raw::RawQuestion;
use crate::slug::slugify;

static RE_MISSING_IN_SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)missing in source").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    NoOptions,
    NoFlaggedOption,
    MissingText,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOptions => write!(f, "no usable options"),
            Self::NoFlaggedOption => write!(f, "no option flagged correct"),
            Self::MissingText => write!(f, "question text is empty"),
        }
    }
}

impl From<Rejection> for DropReason {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NoOptions => Self::NoOptions,
            Rejection::NoFlaggedOption => Self::NoFlaggedOption,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built {
    pub question: CanonicalQuestion,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built(Built),
    Dropped {
        question_number: String,
        reason: DropReason,
    },
}

pub fn question_number(raw: &RawQuestion, position: usize) -> String {
    raw.number
        .clone()
        .unwrap_or_else(|| format!("Q{}", position + 1))
}

pub fn build_question(chapter_slug: &str, raw: &RawQuestion, position: usize) -> BuildOutcome {
    let qnum = question_number(raw, position);
    let dropped = |reason| BuildOutcome::Dropped {
        question_number: qnum.clone(),
        reason,
    };

    let text = raw.text.trim();
    if text.is_empty() {
        return dropped(DropReason::MissingText);
    }

    let mut parsed = parse_options(&raw.options);
    let repeated = repeated_letters(&parsed);
    if !repeated.is_empty() {
        reletter_by_position(&mut parsed);
    }

    let explicit_solution = raw
        .solution
        .as_deref()
        .map(str::trim)
        .filter(|s| is_explicit_solution(s));
    let resolved = match (raw.uses_flags(), raw.answer.as_deref(), explicit_solution) {
        (true, _, _) => answer::resolve_flags(&raw.options, &parsed),
        (false, None, Some(solution)) => answer::resolve_solution_text(solution, &parsed),
        (false, declared, _) => answer::resolve_letter(declared, &parsed),
    };
    let mut resolved = match resolved {
        Ok(resolved) => resolved,
        Err(rejection) => return dropped(rejection.into()),
    };
    if !repeated.is_empty() {
        resolved
            .findings
            .insert(0, Finding::RepeatedMarker { letters: repeated });
    }

    let options = parsed.into_iter().map(|opt| opt.text).collect::<Vec<_>>();
    let index = resolved.resolution.correct_option_index;
    let solution = match explicit_solution {
        Some(explicit) => explicit.to_owned(),
        None => options[index].clone(),
    };

    BuildOutcome::Built(Built {
        question: CanonicalQuestion {
            id: format!("{chapter_slug}-{}", slugify(&qnum)),
            question_number: qnum.clone(),
            question: text.to_owned(),
            question_type: QUESTION_TYPE_MCQ.to_owned(),
            options,
            answer: resolved.resolution.answer_letter.to_string(),
            solution,
            explanation: raw.explanation.clone().unwrap_or_default(),
        },
        findings: resolved.findings,
    })
}

/// A source `solution` is usable only if it carries real text.
fn is_explicit_solution(value: &str) -> bool {
    !value.is_empty() && !RE_MISSING_IN_SOURCE.is_match(value) && !is_bare_marker(value)
}
