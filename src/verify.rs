use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::catalog::Catalog;
use crate::cli::VerifyArgs;
use crate::formats::{
    ChapterSummary, MappingIssue, VerificationReport, VerificationSummary, VerifiedChapter,
};
use crate::writer::write_json_atomic;

/// Chapter files present in a question directory, keyed by file name.
pub type FileIndex = BTreeMap<String, ChapterSummary>;

pub fn index_dir(dir: &Path) -> anyhow::Result<FileIndex> {
    if !dir.is_dir() {
        anyhow::bail!("question directory not found: {}", dir.display());
    }

    let mut index = FileIndex::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("read question dir: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match summarize(&path) {
            Ok(summary) => {
                index.insert(file_name.to_owned(), summary);
            }
            Err(err) => {
                tracing::warn!(
                    file = file_name,
                    error = %format!("{err:#}"),
                    "unreadable chapter file; skipping"
                );
            }
        }
    }
    Ok(index)
}

fn summarize(path: &Path) -> anyhow::Result<ChapterSummary> {
    let bytes = std::fs::read(path).with_context(|| format!("read: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).context("parse json")?;
    let text = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    };
    Ok(ChapterSummary {
        book_name: text("book_name"),
        chapter_title: text("chapter_title"),
        chapter_slug: text("chapter_slug"),
        question_count: value
            .get("questions")
            .and_then(|q| q.as_array())
            .map_or(0, Vec::len),
    })
}

pub fn verify(catalog: &Catalog, files: &FileIndex) -> VerificationReport {
    let mut verified = Vec::new();
    let mut issues = Vec::new();
    let mut summary = VerificationSummary {
        files: files.len(),
        ..VerificationSummary::default()
    };

    for chapter in catalog.chapters() {
        if catalog.is_sentinel(chapter.title) {
            continue;
        }

        let slug = catalog.chapter_slug(chapter.book, chapter.title);
        let expected = catalog.expected_file(&chapter);

        if let Some(info) = files.get(&expected) {
            if info.question_count == 0 {
                tracing::warn!(file = %expected, "verified chapter file has no questions");
                summary.empty += 1;
            }
            summary.verified += 1;
            verified.push(VerifiedChapter {
                subject: chapter.subject.to_owned(),
                book: chapter.book.to_owned(),
                chapter: chapter.title.to_owned(),
                file: expected,
                questions: info.question_count,
            });
            continue;
        }

        let alternates = std::iter::once(chapter.book)
            .chain(catalog.fallback_prefixes.iter().map(String::as_str))
            .map(|prefix| format!("{prefix}-{slug}.json"))
            .filter(|alt| *alt != expected);

        let mut found = None;
        for alt in alternates {
            if let Some(info) = files.get(&alt) {
                found = Some((alt, info.question_count));
                break;
            }
        }

        match found {
            Some((alt, questions)) => {
                summary.wrong_prefix += 1;
                issues.push(MappingIssue::WrongPrefix {
                    subject: chapter.subject.to_owned(),
                    book: chapter.book.to_owned(),
                    chapter: chapter.title.to_owned(),
                    expected,
                    found: alt,
                    questions,
                });
            }
            None => {
                summary.missing += 1;
                issues.push(MappingIssue::Missing {
                    subject: chapter.subject.to_owned(),
                    book: chapter.book.to_owned(),
                    chapter: chapter.title.to_owned(),
                    expected,
                    slug,
                });
            }
        }
    }

    VerificationReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary,
        verified,
        issues,
    }
}

pub fn run(args: VerifyArgs) -> anyhow::Result<()> {
    let catalog = Catalog::load(args.catalog.as_deref()).context("load catalog")?;
    let dir = PathBuf::from(&args.dir);
    let files = index_dir(&dir)?;
    let report = verify(&catalog, &files);

    for issue in &report.issues {
        match issue {
            MappingIssue::Missing {
                book,
                chapter,
                expected,
                ..
            } => tracing::warn!(%book, %chapter, %expected, "missing chapter file"),
            MappingIssue::WrongPrefix {
                book,
                chapter,
                expected,
                found,
                questions,
                ..
            } => tracing::warn!(
                %book,
                %chapter,
                %expected,
                %found,
                questions,
                "chapter file under wrong prefix"
            ),
        }
    }
    tracing::info!(
        verified = report.summary.verified,
        wrong_prefix = report.summary.wrong_prefix,
        missing = report.summary.missing,
        empty = report.summary.empty,
        files = report.summary.files,
        "verify finished"
    );

    if let Some(out) = args.out.as_deref() {
        write_json_atomic(Path::new(out), &report)
            .with_context(|| format!("write verification report: {out}"))?;
        tracing::info!(report = out, "verification report written");
    }

    Ok(())
}
