use once_cell::sync::Lazy;
use regex::Regex;

use crate::raw::RawOption;

pub const OPTION_LABELS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

static RE_OPTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\(\s*([a-z])\s*\)\s*[).:\-]?\s*").expect("valid regex"));
static RE_BARE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\(?\s*[a-z]\s*\)?[.:]?$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOption {
    pub letter: char,
    pub text: String,
}

/// Letter for a zero-based option position, `None` past `z`.
pub fn positional_letter(position: usize) -> Option<char> {
    OPTION_LABELS.get(position).map(|b| char::from(*b))
}

pub fn letter_index(letter: char) -> Option<usize> {
    let letter = letter.to_ascii_lowercase();
    OPTION_LABELS.iter().position(|b| char::from(*b) == letter)
}

/// `"b"`, `"(b)"`, `"B."`: a letter with no option text.
pub fn is_bare_marker(value: &str) -> bool {
    RE_BARE_MARKER.is_match(value.trim())
}

/// Letters carried by more than one option, in first-seen order.
pub fn repeated_letters(options: &[ParsedOption]) -> Vec<char> {
    let mut repeated = Vec::new();
    for (i, opt) in options.iter().enumerate() {
        if options[..i].iter().any(|prev| prev.letter == opt.letter)
            && !repeated.contains(&opt.letter)
        {
            repeated.push(opt.letter);
        }
    }
    repeated
}

/// Drop explicit markers and letter every option by its position.
pub fn reletter_by_position(options: &mut [ParsedOption]) {
    for (position, opt) in options.iter_mut().enumerate() {
        if let Some(letter) = positional_letter(position) {
            opt.letter = letter;
        }
    }
}

pub fn parse_option(raw: &RawOption, position: usize) -> Option<ParsedOption> {
    let fallback = positional_letter(position)?;
    let (letter, text) = match raw {
        RawOption::Text(raw) => match RE_OPTION_MARKER.captures(raw) {
            Some(caps) => {
                let marker = caps
                    .get(1)
                    .and_then(|m| m.as_str().chars().next())
                    .map(|c| c.to_ascii_lowercase())
                    .unwrap_or(fallback);
                let rest = &raw[caps.get(0).map_or(0, |m| m.end())..];
                (marker, rest.trim())
            }
            None => (fallback, raw.trim()),
        },
        RawOption::Flagged { text, .. } => (fallback, text.trim()),
    };

    let text = if text.is_empty() {
        format!("Option {}", letter.to_ascii_uppercase())
    } else {
        text.to_owned()
    };
    Some(ParsedOption { letter, text })
}

pub fn parse_options(raw: &[RawOption]) -> Vec<ParsedOption> {
    if raw.len() > OPTION_LABELS.len() {
        tracing::warn!(
            options = raw.len(),
            kept = OPTION_LABELS.len(),
            "question has more options than letters; extra options discarded"
        );
    }
    raw.iter()
        .enumerate()
        .filter_map(|(position, opt)| parse_option(opt, position))
        .collect()
}
