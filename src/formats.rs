use serde::{Deserialize, Serialize};

pub const QUESTION_TYPE_MCQ: &str = "MCQ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChapterNumber {
    Number(i64),
    Text(String),
}

impl ChapterNumber {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self::Number),
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Some(Self::Text(s.trim().to_owned()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalQuestion {
    pub id: String,
    pub question_number: String,
    pub question: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub answer: String,
    pub solution: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterFile {
    pub book_name: String,
    pub chapter_number: Option<ChapterNumber>,
    pub chapter_title: String,
    pub chapter_slug: String,
    pub source: String,
    pub questions: Vec<CanonicalQuestion>,
}

/// Metadata the verifier keeps for each chapter file found on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    #[serde(default)]
    pub book_name: Option<String>,
    #[serde(default)]
    pub chapter_title: Option<String>,
    #[serde(default)]
    pub chapter_slug: Option<String>,
    #[serde(default)]
    pub question_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generated_at: String,
    pub source: String,
    pub load_method: String,
    pub chapters: Vec<GeneratedChapter>,
    pub skipped_chapters: Vec<String>,
    pub totals: GenerationTotals,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationTotals {
    pub written: usize,
    pub dropped: usize,
    pub skipped: usize,
    pub answer_fallbacks: usize,
    pub letter_mismatches: usize,
    pub repeated_markers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedChapter {
    pub file: String,
    pub chapter_title: String,
    pub chapter_slug: String,
    pub questions: usize,
    pub sha256: String,
    /// Question records that were not JSON objects.
    pub malformed: usize,
    pub dropped: Vec<DroppedQuestion>,
    pub skipped: Vec<String>,
    pub findings: Vec<QuestionFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedQuestion {
    pub position: usize,
    pub question_number: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionFinding {
    pub question_id: String,
    pub finding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub generated_at: String,
    pub summary: VerificationSummary,
    pub verified: Vec<VerifiedChapter>,
    pub issues: Vec<MappingIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub verified: usize,
    pub wrong_prefix: usize,
    pub missing: usize,
    pub empty: usize,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedChapter {
    pub subject: String,
    pub book: String,
    pub chapter: String,
    pub file: String,
    pub questions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MappingIssue {
    WrongPrefix {
        subject: String,
        book: String,
        chapter: String,
        expected: String,
        found: String,
        questions: usize,
    },
    Missing {
        subject: String,
        book: String,
        chapter: String,
        expected: String,
        slug: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: String,
    pub files_scanned: usize,
    pub total_questions: usize,
    pub numbering_issues: Vec<NumberingIssue>,
    pub without_options: Vec<OptionlessQuestion>,
    pub counts: Vec<FileCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingIssue {
    pub file: String,
    pub first_numbers: Vec<Option<u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionlessQuestion {
    pub file: String,
    pub position: usize,
    pub question_number: String,
    pub question_type: String,
    pub book_name: String,
    pub chapter_title: String,
    pub question_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCount {
    pub file: String,
    pub questions: usize,
}
