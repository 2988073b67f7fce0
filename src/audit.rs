use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde_json::{Map, Value};

use crate::cli::AuditArgs;
use crate::formats::{AuditReport, FileCount, NumberingIssue, OptionlessQuestion};
use crate::raw::first_str;
use crate::writer::write_json_atomic;

const MCQ_TYPES: &[&str] = &["mcq", "multiple choice", "multiple-choice"];
const NUMBERING_SAMPLE: usize = 5;
const PREVIEW_CHARS: usize = 100;

/// Digits of a question number: `"Q12"` → 12, `"7"` → 7.
pub fn numeric_part(question_number: &str) -> Option<u64> {
    let digits = question_number
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect::<String>();
    digits.parse().ok()
}

pub fn check_numbering(file: &str, questions: &[Value]) -> Option<NumberingIssue> {
    let numbers = questions
        .iter()
        .map(|q| {
            q.as_object()
                .and_then(|map| first_str(map, &["question_number", "id"]))
                .and_then(|n| numeric_part(&n))
        })
        .collect::<Vec<_>>();

    let sequential = numbers
        .iter()
        .enumerate()
        .all(|(i, n)| *n == Some(i as u64 + 1));
    if sequential {
        return None;
    }
    Some(NumberingIssue {
        file: file.to_owned(),
        first_numbers: numbers.into_iter().take(NUMBERING_SAMPLE).collect(),
    })
}

fn has_usable_options(question: &Map<String, Value>) -> bool {
    let Some(options) = question.get("options").and_then(Value::as_array) else {
        return false;
    };
    let non_blank = options
        .iter()
        .filter(|opt| match opt {
            Value::String(s) => !s.trim().is_empty(),
            Value::Object(map) => first_str(map, &["text", "option_text"]).is_some(),
            Value::Null => false,
            _ => true,
        })
        .count();
    non_blank >= 2
}

fn is_table_question(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("table") || lower.contains("<table") || text.split('|').count() > 3
}

fn is_explicit_non_mcq(question_type: &str) -> bool {
    !question_type.is_empty() && !MCQ_TYPES.contains(&question_type.to_lowercase().as_str())
}

pub fn find_optionless(file: &str, document: &Value) -> Vec<OptionlessQuestion> {
    let book_name = document
        .get("book_name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown Book");
    let chapter_title = document
        .get("chapter_title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown Chapter");

    let mut found = Vec::new();
    for (position, question) in questions_of(document).iter().enumerate() {
        let Some(map) = question.as_object() else {
            continue;
        };
        let text = first_str(map, &["question", "question_text", "text"]).unwrap_or_default();
        let question_type = first_str(map, &["question_type", "type"]).unwrap_or_default();
        let usable = has_usable_options(map);

        if (usable && !is_explicit_non_mcq(&question_type)) || is_table_question(&text) {
            continue;
        }

        found.push(OptionlessQuestion {
            file: file.to_owned(),
            position,
            question_number: first_str(map, &["question_number", "id"])
                .unwrap_or_else(|| (position + 1).to_string()),
            question_type: if question_type.is_empty() {
                if usable { "MCQ" } else { "Non-MCQ" }.to_owned()
            } else {
                question_type
            },
            book_name: book_name.to_owned(),
            chapter_title: chapter_title.to_owned(),
            question_text: text.chars().take(PREVIEW_CHARS).collect(),
        });
    }
    found
}

fn questions_of(document: &Value) -> &[Value] {
    match document {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => document
            .get("questions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    }
}

pub fn audit_dir(dir: &Path) -> anyhow::Result<AuditReport> {
    if !dir.is_dir() {
        anyhow::bail!("question directory not found: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("read question dir: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<PathBuf>, _>>()
        .context("list question dir")?;
    paths.retain(|p| p.extension().and_then(|e| e.to_str()) == Some("json"));
    paths.sort();

    let mut report = AuditReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        files_scanned: 0,
        total_questions: 0,
        numbering_issues: Vec::new(),
        without_options: Vec::new(),
        counts: Vec::new(),
    };

    for path in paths {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let document: Value = match std::fs::read(&path)
            .with_context(|| format!("read: {}", path.display()))
            .and_then(|bytes| serde_json::from_slice(&bytes).context("parse json"))
        {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(
                    file = %file,
                    error = %format!("{err:#}"),
                    "unreadable question file; skipping"
                );
                continue;
            }
        };

        let questions = questions_of(&document);
        report.files_scanned += 1;
        report.total_questions += questions.len();
        report.counts.push(FileCount {
            file: file.clone(),
            questions: questions.len(),
        });

        if let Some(issue) = check_numbering(&file, questions) {
            tracing::debug!(
                file = %file,
                first = ?issue.first_numbers,
                "numbering is not sequential"
            );
            report.numbering_issues.push(issue);
        }
        report
            .without_options
            .extend(find_optionless(&file, &document));
    }

    Ok(report)
}

pub fn run(args: AuditArgs) -> anyhow::Result<()> {
    let report = audit_dir(Path::new(&args.dir))?;

    tracing::info!(
        files = report.files_scanned,
        questions = report.total_questions,
        numbering_issues = report.numbering_issues.len(),
        without_options = report.without_options.len(),
        "audit finished"
    );

    if let Some(out) = args.out.as_deref() {
        write_json_atomic(Path::new(out), &report)
            .with_context(|| format!("write audit report: {out}"))?;
        tracing::info!(report = out, "audit report written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_part_reads_leading_digits() {
        assert_eq!(numeric_part("Q12"), Some(12));
        assert_eq!(numeric_part("7"), Some(7));
        assert_eq!(numeric_part("q-3-a"), Some(3));
        assert_eq!(numeric_part("intro"), None);
    }

    #[test]
    fn sequential_numbering_passes() {
        let questions = vec![
            serde_json::json!({"question_number": "Q1"}),
            serde_json::json!({"question_number": "Q2"}),
            serde_json::json!({"question_number": 3}),
        ];
        assert_eq!(check_numbering("f.json", &questions), None);
    }

    #[test]
    fn gaps_are_reported_with_sample() {
        let questions = (1..=8)
            .filter(|n| *n != 4)
            .map(|n| serde_json::json!({"question_number": format!("Q{n}")}))
            .collect::<Vec<_>>();
        let issue = check_numbering("f.json", &questions);
        assert_eq!(
            issue.map(|i| i.first_numbers),
            Some(vec![Some(1), Some(2), Some(3), Some(5), Some(6)])
        );
    }

    #[test]
    fn optionless_scan_skips_tables_and_mcqs() {
        let document = serde_json::json!({
            "book_name": "Oxford",
            "chapter_title": "Plotting",
            "questions": [
                {"question_number": "Q1", "question": "Plot the fix", "options": []},
                {"question_number": "Q2", "question": "Complete the table", "options": []},
                {"question_number": "Q3", "question": "Pick one", "options": ["a", "b"]},
                {"question_number": "Q4", "question": "One option", "options": ["a", " "]},
                {"question_number": "Q5", "question": "Explain", "options": ["a", "b"], "question_type": "Free Text"},
                {"question_number": "Q6", "question": "| a | b | c |"}
            ]
        });

        let found = find_optionless("oxford-plotting.json", &document);
        let numbers = found
            .iter()
            .map(|q| q.question_number.as_str())
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec!["Q1", "Q4", "Q5"]);
        assert_eq!(found[0].question_type, "Non-MCQ");
        assert_eq!(found[2].question_type, "Free Text");
        assert_eq!(found[0].book_name, "Oxford");
    }

    #[test]
    fn audit_dir_counts_and_skips_broken_files() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        std::fs::write(
            temp.path().join("a.json"),
            r#"{"questions":[{"question_number":"Q1","question":"x","options":["a","b"]},{"question_number":"Q3","question":"y","options":["a","b"]}]}"#,
        )?;
        std::fs::write(temp.path().join("b.json"), "[")?;

        let report = audit_dir(temp.path())?;
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.total_questions, 2);
        assert_eq!(report.numbering_issues.len(), 1);
        assert!(report.without_options.is_empty());
        assert_eq!(
            report.counts,
            vec![FileCount {
                file: "a.json".to_owned(),
                questions: 2
            }]
        );
        Ok(())
    }
}
