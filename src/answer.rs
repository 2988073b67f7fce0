use std::fmt;

use serde::Serialize;

use crate::options::{ParsedOption, positional_letter};
use crate::raw::RawOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub answer_letter: char,
    pub correct_option_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// The answer could not be read and option `a` was assumed.
    FallbackToFirst { reason: FallbackReason },
    /// The declared letter names a different position than the option it matched.
    LetterMismatch { declared: char, positional: char },
    /// Several options carried the same `(x)` marker; letters were reassigned by position.
    RepeatedMarker { letters: Vec<char> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoAnswer,
    NoLetter { answer: String },
    UnknownLetter { letter: char },
    UnmatchedSolution { solution: String },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FallbackToFirst { reason } => {
                write!(f, "answer fell back to option a: ")?;
                match reason {
                    FallbackReason::NoAnswer => write!(f, "no answer in source"),
                    FallbackReason::NoLetter { answer } => {
                        write!(f, "no letter in answer {answer:?}")
                    }
                    FallbackReason::UnknownLetter { letter } => {
                        write!(f, "no option labelled {letter:?}")
                    }
                    FallbackReason::UnmatchedSolution { solution } => {
                        write!(f, "solution {solution:?} matches no option")
                    }
                }
            }
            Self::LetterMismatch {
                declared,
                positional,
            } => write!(
                f,
                "answer {declared:?} matched the option at position {positional:?}"
            ),
            Self::RepeatedMarker { letters } => {
                let letters = letters.iter().collect::<String>();
                write!(f, "option markers repeated ({letters}); lettered by position")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoFlaggedOption,
    NoOptions,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFlaggedOption => write!(f, "no option is flagged correct"),
            Self::NoOptions => write!(f, "no options"),
        }
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub resolution: Resolution,
    pub findings: Vec<Finding>,
}

/// Resolve an answer given as free text such as `"(c)"` or `"b"`.
pub fn resolve_letter(
    answer: Option<&str>,
    options: &[ParsedOption],
) -> Result<Resolved, Rejection> {
    if options.is_empty() {
        return Err(Rejection::NoOptions);
    }

    let declared = answer.and_then(|a| a.chars().find(char::is_ascii_alphabetic));
    let declared = declared.map(|c| c.to_ascii_lowercase());

    let matched = declared.and_then(|letter| options.iter().position(|opt| opt.letter == letter));

    let mut findings = Vec::new();
    let index = match (declared, matched) {
        (Some(_), Some(index)) => index,
        (Some(letter), None) => {
            findings.push(Finding::FallbackToFirst {
                reason: FallbackReason::UnknownLetter { letter },
            });
            0
        }
        (None, _) => {
            let reason = match answer {
                Some(answer) if !answer.trim().is_empty() => FallbackReason::NoLetter {
                    answer: answer.to_owned(),
                },
                _ => FallbackReason::NoAnswer,
            };
            findings.push(Finding::FallbackToFirst { reason });
            0
        }
    };

    let resolution = resolution_for(index)?;
    if let (Some(declared), Some(_)) = (declared, matched)
        && declared != resolution.answer_letter
    {
        findings.push(Finding::LetterMismatch {
            declared,
            positional: resolution.answer_letter,
        });
    }

    Ok(Resolved {
        resolution,
        findings,
    })
}

/// Resolve an answer given only as the correct option's text.
///
/// Comparison ignores case and surrounding whitespace. An unmatched solution
/// falls back to option `a` with a finding.
pub fn resolve_solution_text(
    solution: &str,
    options: &[ParsedOption],
) -> Result<Resolved, Rejection> {
    if options.is_empty() {
        return Err(Rejection::NoOptions);
    }
    let wanted = solution.trim().to_lowercase();
    let matched = options
        .iter()
        .position(|opt| opt.text.trim().to_lowercase() == wanted);

    let mut findings = Vec::new();
    let index = matched.unwrap_or_else(|| {
        findings.push(Finding::FallbackToFirst {
            reason: FallbackReason::UnmatchedSolution {
                solution: solution.trim().to_owned(),
            },
        });
        0
    });

    Ok(Resolved {
        resolution: resolution_for(index)?,
        findings,
    })
}

/// Resolve an answer carried as `is_correct` flags on the options themselves.
pub fn resolve_flags(raw: &[RawOption], options: &[ParsedOption]) -> Result<Resolved, Rejection> {
    if options.is_empty() {
        return Err(Rejection::NoOptions);
    }
    let index = raw
        .iter()
        .take(options.len())
        .position(RawOption::is_flagged)
        .ok_or(Rejection::NoFlaggedOption)?;

    Ok(Resolved {
        resolution: resolution_for(index)?,
        findings: Vec::new(),
    })
}

fn resolution_for(index: usize) -> Result<Resolution, Rejection> {
    let answer_letter = positional_letter(index).ok_or(Rejection::NoOptions)?;
    Ok(Resolution {
        answer_letter,
        correct_option_index: index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::parse_options;

    fn texts(items: &[&str]) -> Vec<RawOption> {
        items.iter().map(|s| RawOption::Text((*s).to_owned())).collect()
    }

    #[test]
    fn letter_in_text_picks_matching_option() -> anyhow::Result<()> {
        let options = parse_options(&texts(&["(a) x", "(b) y", "(c) z"]));
        let resolved = resolve_letter(Some("(c)"), &options)?;
        assert_eq!(resolved.resolution.correct_option_index, 2);
        assert_eq!(resolved.resolution.answer_letter, 'c');
        assert!(resolved.findings.is_empty());
        Ok(())
    }

    #[test]
    fn first_ascii_letter_is_the_answer() -> anyhow::Result<()> {
        let options = parse_options(&texts(&["x", "y"]));
        let resolved = resolve_letter(Some("Ans: B"), &options)?;
        // First ASCII letter of "Ans: B" is `A`.
        assert_eq!(resolved.resolution.answer_letter, 'a');
        let resolved = resolve_letter(Some(" B "), &options)?;
        assert_eq!(resolved.resolution.answer_letter, 'b');
        Ok(())
    }

    // Lossy: an unreadable answer silently scores option `a`. The finding must be present.
    #[test]
    fn missing_letter_falls_back_to_first_and_is_reported() -> anyhow::Result<()> {
        let options = parse_options(&texts(&["x", "y"]));
        let resolved = resolve_letter(Some("42"), &options)?;
        assert_eq!(resolved.resolution.correct_option_index, 0);
        assert_eq!(
            resolved.findings,
            vec![Finding::FallbackToFirst {
                reason: FallbackReason::NoLetter {
                    answer: "42".to_owned()
                }
            }]
        );

        let resolved = resolve_letter(None, &options)?;
        assert_eq!(
            resolved.findings,
            vec![Finding::FallbackToFirst {
                reason: FallbackReason::NoAnswer
            }]
        );
        Ok(())
    }

    #[test]
    fn unknown_letter_falls_back_to_first() -> anyhow::Result<()> {
        let options = parse_options(&texts(&["x", "y"]));
        let resolved = resolve_letter(Some("(d)"), &options)?;
        assert_eq!(resolved.resolution.answer_letter, 'a');
        assert!(matches!(
            resolved.findings.as_slice(),
            [Finding::FallbackToFirst {
                reason: FallbackReason::UnknownLetter { letter: 'd' }
            }]
        ));
        Ok(())
    }

    #[test]
    fn marker_out_of_position_is_a_mismatch() -> anyhow::Result<()> {
        let options = parse_options(&texts(&["(b) x", "(c) y"]));
        let resolved = resolve_letter(Some("c"), &options)?;
        assert_eq!(resolved.resolution.correct_option_index, 1);
        assert_eq!(resolved.resolution.answer_letter, 'b');
        assert_eq!(
            resolved.findings,
            vec![Finding::LetterMismatch {
                declared: 'c',
                positional: 'b'
            }]
        );
        Ok(())
    }

    #[test]
    fn solution_text_picks_matching_option() -> anyhow::Result<()> {
        let options = parse_options(&texts(&[
            "Stratus",
            "Cirrus",
            "Altostratus",
            "Cumulonimbus",
        ]));
        let resolved = resolve_solution_text(" cumulonimbus ", &options)?;
        assert_eq!(resolved.resolution.correct_option_index, 3);
        assert_eq!(resolved.resolution.answer_letter, 'd');
        assert!(resolved.findings.is_empty());

        let resolved = resolve_solution_text("Nimbostratus", &options)?;
        assert_eq!(resolved.resolution.answer_letter, 'a');
        assert_eq!(
            resolved.findings,
            vec![Finding::FallbackToFirst {
                reason: FallbackReason::UnmatchedSolution {
                    solution: "Nimbostratus".to_owned()
                }
            }]
        );
        Ok(())
    }

    #[test]
    fn rejection_propagates_with_question_mark() {
        fn resolve() -> anyhow::Result<Resolved> {
            Ok(resolve_letter(Some("a"), &[])?)
        }
        let err = resolve().expect_err("no options");
        assert_eq!(err.to_string(), "no options");
    }

    #[test]
    fn flags_pick_first_flagged_option() -> anyhow::Result<()> {
        let raw = vec![
            RawOption::Flagged {
                text: "A".to_owned(),
                is_correct: false,
            },
            RawOption::Flagged {
                text: "B".to_owned(),
                is_correct: true,
            },
            RawOption::Flagged {
                text: "C".to_owned(),
                is_correct: true,
            },
        ];
        let options = parse_options(&raw);
        let resolved = resolve_flags(&raw, &options)?;
        assert_eq!(resolved.resolution.correct_option_index, 1);
        assert_eq!(resolved.resolution.answer_letter, 'b');
        Ok(())
    }

    #[test]
    fn no_flag_is_rejected() {
        let raw = vec![
            RawOption::Flagged {
                text: "A".to_owned(),
                is_correct: false,
            },
            RawOption::Flagged {
                text: "B".to_owned(),
                is_correct: false,
            },
        ];
        let options = parse_options(&raw);
        assert_eq!(resolve_flags(&raw, &options), Err(Rejection::NoFlaggedOption));
    }
}
