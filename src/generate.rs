use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::answer::Finding;
use crate::cli::GenerateArgs;
use crate::formats::{
    ChapterFile, DroppedQuestion, GeneratedChapter, GenerationReport, GenerationTotals,
    QuestionFinding,
};
use crate::question::{BuildOutcome, build_question, question_number};
use crate::raw::{SourceChapter, document_from_json};
use crate::slug::slugify_title;
use crate::writer::{chapter_file_name, write_chapter, write_json_atomic};

/// Per-source settings for a generation run, read from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPlan {
    pub source: String,
    pub book_prefix: String,
    pub book_name: String,
    #[serde(default)]
    pub fallback_script: Option<PathBuf>,
    #[serde(default)]
    pub chapters: BTreeMap<String, ChapterMeta>,
    #[serde(default)]
    pub skip_questions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterMeta {
    pub slug: String,
    pub title: String,
}

impl GenerationPlan {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read plan: {}", path.display()))?;
        let mut plan: Self = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parse plan: {}", path.display()))?;
        if plan.book_prefix.trim().is_empty() {
            anyhow::bail!("plan book_prefix is empty: {}", path.display());
        }
        // Relative script paths are relative to the plan file.
        if let Some(script) = plan.fallback_script.take() {
            let base = path.parent().unwrap_or(Path::new("."));
            plan.fallback_script = Some(if script.is_relative() {
                base.join(script)
            } else {
                script
            });
        }
        Ok(plan)
    }

    /// Output slug and title for a source chapter, `None` when the plan does not map it.
    pub fn chapter_meta(&self, source_title: &str) -> Option<ChapterMeta> {
        if self.chapters.is_empty() {
            let slug = slugify_title(source_title);
            if slug.is_empty() {
                return None;
            }
            return Some(ChapterMeta {
                slug,
                title: source_title.trim().to_owned(),
            });
        }
        self.chapters.get(source_title.trim()).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct BuiltChapter {
    pub file: ChapterFile,
    pub dropped: Vec<DroppedQuestion>,
    pub skipped: Vec<String>,
    pub findings: Vec<QuestionFinding>,
    pub answer_fallbacks: usize,
    pub letter_mismatches: usize,
    pub repeated_markers: usize,
}

pub fn build_chapter(
    plan: &GenerationPlan,
    meta: &ChapterMeta,
    chapter: &SourceChapter,
    document_book_name: Option<&str>,
) -> BuiltChapter {
    let skip_list = plan
        .skip_questions
        .get(chapter.title.trim())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut questions = Vec::new();
    let mut dropped = Vec::new();
    let mut skipped = Vec::new();
    let mut findings = Vec::new();
    let mut answer_fallbacks = 0;
    let mut letter_mismatches = 0;
    let mut repeated_markers = 0;

    for (position, raw) in chapter.questions.iter().enumerate() {
        let qnum = question_number(raw, position);
        if skip_list.contains(&qnum) {
            skipped.push(qnum);
            continue;
        }

        match build_question(&meta.slug, raw, position) {
            BuildOutcome::Built(built) => {
                for finding in &built.findings {
                    match finding {
                        Finding::FallbackToFirst { .. } => answer_fallbacks += 1,
                        Finding::LetterMismatch { .. } => letter_mismatches += 1,
                        Finding::RepeatedMarker { .. } => repeated_markers += 1,
                    }
                    log_finding(&built.question.id, finding);
                    findings.push(QuestionFinding {
                        question_id: built.question.id.clone(),
                        finding: finding.to_string(),
                    });
                }
                questions.push(built.question);
            }
            BuildOutcome::Dropped {
                question_number,
                reason,
            } => {
                tracing::info!(
                    chapter = %meta.slug,
                    question_number = %question_number,
                    %reason,
                    "dropping question"
                );
                dropped.push(DroppedQuestion {
                    position,
                    question_number,
                    reason: reason.to_string(),
                });
            }
        }
    }

    if chapter.malformed > 0 {
        tracing::warn!(
            chapter = %meta.slug,
            malformed = chapter.malformed,
            "source chapter has question records that are not objects"
        );
    }

    let book_name = chapter
        .book_name
        .as_deref()
        .or(document_book_name)
        .unwrap_or(&plan.book_name)
        .to_owned();

    BuiltChapter {
        file: ChapterFile {
            book_name,
            chapter_number: chapter.number.clone(),
            chapter_title: meta.title.clone(),
            chapter_slug: meta.slug.clone(),
            source: plan.source.clone(),
            questions,
        },
        dropped,
        skipped,
        findings,
        answer_fallbacks,
        letter_mismatches,
        repeated_markers,
    }
}

fn log_finding(question_id: &str, finding: &Finding) {
    match finding {
        Finding::FallbackToFirst { .. } => {
            tracing::warn!(question_id, %finding, "answer fallback used");
        }
        Finding::LetterMismatch { .. } => {
            tracing::warn!(question_id, %finding, "answer letter inconsistent with option position");
        }
        Finding::RepeatedMarker { .. } => {
            tracing::warn!(question_id, %finding, "option markers repeated");
        }
    }
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let plan_path = PathBuf::from(&args.plan);
    let source_path = PathBuf::from(&args.source);
    let out_dir = PathBuf::from(&args.out);

    let plan = GenerationPlan::from_path(&plan_path).context("load generation plan")?;
    let report = generate(&plan, &source_path, &out_dir)?;

    tracing::info!(
        chapters = report.chapters.len(),
        skipped_chapters = report.skipped_chapters.len(),
        written = report.totals.written,
        dropped = report.totals.dropped,
        skipped = report.totals.skipped,
        answer_fallbacks = report.totals.answer_fallbacks,
        letter_mismatches = report.totals.letter_mismatches,
        repeated_markers = report.totals.repeated_markers,
        "generate finished"
    );

    if let Some(report_path) = args.report.as_deref() {
        write_json_atomic(Path::new(report_path), &report)
            .with_context(|| format!("write generation report: {report_path}"))?;
        tracing::info!(report = report_path, "generation report written");
    }

    Ok(())
}

pub fn generate(
    plan: &GenerationPlan,
    source_path: &Path,
    out_dir: &Path,
) -> anyhow::Result<GenerationReport> {
    let loaded = crate::source::load(source_path, plan.fallback_script.as_deref())
        .context("load source")?;
    match &loaded.method {
        crate::source::LoadMethod::Clean => {
            tracing::debug!(source = %source_path.display(), "source parsed cleanly");
        }
        method => {
            tracing::warn!(source = %source_path.display(), %method, "source needed a fallback parse");
        }
    }

    let document = document_from_json(&loaded.document).context("read source document")?;

    let mut chapters = Vec::new();
    let mut skipped_chapters = Vec::new();
    let mut totals = GenerationTotals::default();
    let mut written_files = BTreeMap::new();

    for chapter in &document.chapters {
        let Some(meta) = plan.chapter_meta(&chapter.title) else {
            tracing::warn!(chapter_title = %chapter.title, "no slug for chapter; skipping");
            skipped_chapters.push(chapter.title.clone());
            continue;
        };

        let file_name = chapter_file_name(&plan.book_prefix, &meta.slug);
        if let Some(first) = written_files.insert(file_name.clone(), chapter.title.clone()) {
            anyhow::bail!(
                "source chapters {first:?} and {:?} both map to {file_name}",
                chapter.title
            );
        }

        let built = build_chapter(plan, &meta, chapter, document.book_name.as_deref());
        let written = write_chapter(out_dir, &plan.book_prefix, &built.file)
            .with_context(|| format!("write chapter: {}", meta.slug))?;
        tracing::info!(
            file = %written.file_name,
            questions = written.questions,
            dropped = built.dropped.len(),
            skipped = built.skipped.len(),
            "wrote chapter"
        );

        totals.written += written.questions;
        totals.dropped += built.dropped.len() + chapter.malformed;
        totals.skipped += built.skipped.len();
        totals.answer_fallbacks += built.answer_fallbacks;
        totals.letter_mismatches += built.letter_mismatches;
        totals.repeated_markers += built.repeated_markers;

        chapters.push(GeneratedChapter {
            file: written.file_name,
            chapter_title: built.file.chapter_title,
            chapter_slug: built.file.chapter_slug,
            questions: written.questions,
            sha256: written.sha256,
            malformed: chapter.malformed,
            dropped: built.dropped,
            skipped: built.skipped,
            findings: built.findings,
        });
    }

    Ok(GenerationReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        source: plan.source.clone(),
        load_method: loaded.method.to_string(),
        chapters,
        skipped_chapters,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawOption, RawQuestion};

    fn plan(chapters: &[(&str, &str, &str)]) -> GenerationPlan {
        GenerationPlan {
            source: "ic-joshi".to_owned(),
            book_prefix: "ic-joshi".to_owned(),
            book_name: "MET_IC_Joshi_7 Edition".to_owned(),
            fallback_script: None,
            chapters: chapters
                .iter()
                .map(|(source, slug, title)| {
                    (
                        (*source).to_owned(),
                        ChapterMeta {
                            slug: (*slug).to_owned(),
                            title: (*title).to_owned(),
                        },
                    )
                })
                .collect(),
            skip_questions: BTreeMap::new(),
        }
    }

    fn flagged_question(number: &str, flags: &[bool]) -> RawQuestion {
        RawQuestion {
            number: Some(number.to_owned()),
            text: format!("Question {number}"),
            options: flags
                .iter()
                .enumerate()
                .map(|(i, flag)| RawOption::Flagged {
                    text: format!("option {i}"),
                    is_correct: *flag,
                })
                .collect(),
            ..RawQuestion::default()
        }
    }

    #[test]
    fn chapters_sharing_a_file_name_are_rejected() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let source = temp.path().join("source.json");
        std::fs::write(
            &source,
            serde_json::json!({
                "data": [
                    {"chapter_title": "Winds", "questions": [
                        {"question": "a", "options": ["x", "y"], "answer": "a"},
                        {"question": "b", "options": ["x", "y"], "answer": "b"}
                    ]},
                    {"chapter_title": "WINDS", "questions": [
                        {"question": "c", "options": ["x", "y"], "answer": "a"}
                    ]}
                ]
            })
            .to_string(),
        )?;
        let out = temp.path().join("out");

        let err = generate(&plan(&[]), &source, &out).expect_err("duplicate file name");
        let message = format!("{err:#}");
        assert!(message.contains("ic-joshi-winds.json"), "{message}");
        assert!(message.contains("WINDS"), "{message}");

        let written = std::fs::read_dir(&out)?.count();
        assert_eq!(written, 1);
        Ok(())
    }

    #[test]
    fn empty_plan_table_derives_slugs() {
        let plan = plan(&[]);
        let meta = plan.chapter_meta("Climatology of India");
        assert_eq!(meta.map(|m| m.slug), Some("climatology-of-india".to_owned()));
    }

    #[test]
    fn mapped_plan_skips_unknown_chapters() {
        let plan = plan(&[("JET STREAMS", "jet-streams", "Jet Streams")]);
        assert!(plan.chapter_meta("JET STREAMS").is_some());
        assert!(plan.chapter_meta("THUNDERSTORM").is_none());
    }

    #[test]
    fn unflagged_question_is_dropped_and_sibling_kept() {
        let plan = plan(&[]);
        let meta = ChapterMeta {
            slug: "ice-accretion".to_owned(),
            title: "Ice Accretion".to_owned(),
        };
        let chapter = SourceChapter {
            title: "ICE ACCRETION".to_owned(),
            questions: vec![
                flagged_question("Q1", &[false, false]),
                flagged_question("Q2", &[false, true]),
            ],
            ..SourceChapter::default()
        };

        let built = build_chapter(&plan, &meta, &chapter, None);
        let ids = built
            .file
            .questions
            .iter()
            .map(|q| q.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["ice-accretion-q2"]);
        assert_eq!(built.dropped.len(), 1);
        assert_eq!(built.dropped[0].question_number, "Q1");
        assert_eq!(built.file.book_name, "MET_IC_Joshi_7 Edition");
    }

    #[test]
    fn skip_list_removes_questions_by_number() {
        let mut plan = plan(&[]);
        plan.skip_questions
            .insert("TROPICAL SYSTEMS".to_owned(), vec!["Q7".to_owned()]);
        let meta = ChapterMeta {
            slug: "tropical-systems".to_owned(),
            title: "Tropical Systems".to_owned(),
        };
        let chapter = SourceChapter {
            title: "TROPICAL SYSTEMS".to_owned(),
            questions: vec![
                flagged_question("Q6", &[true]),
                flagged_question("Q7", &[true]),
            ],
            book_name: Some("Chapter Book".to_owned()),
            ..SourceChapter::default()
        };

        let built = build_chapter(&plan, &meta, &chapter, Some("Document Book"));
        assert_eq!(built.file.questions.len(), 1);
        assert_eq!(built.skipped, vec!["Q7"]);
        assert!(built.dropped.is_empty());
        assert_eq!(built.file.book_name, "Chapter Book");
    }
}
