use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use sha2::Digest as _;

use crate::formats::ChapterFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenChapter {
    pub path: PathBuf,
    pub file_name: String,
    pub questions: usize,
    pub sha256: String,
}

pub fn chapter_file_name(book_prefix: &str, chapter_slug: &str) -> String {
    format!("{book_prefix}-{chapter_slug}.json")
}

/// Replace `{book_prefix}-{chapter_slug}.json` in `out_dir` with `chapter`.
///
/// Nothing from a previous version of the file survives.
pub fn write_chapter(
    out_dir: &Path,
    book_prefix: &str,
    chapter: &ChapterFile,
) -> anyhow::Result<WrittenChapter> {
    let file_name = chapter_file_name(book_prefix, &chapter.chapter_slug);
    let path = out_dir.join(&file_name);

    let mut data = serde_json::to_vec_pretty(chapter).context("serialize chapter file")?;
    data.push(b'\n');
    write_atomic(&path, &data)?;

    Ok(WrittenChapter {
        path,
        file_name,
        questions: chapter.questions.len(),
        sha256: hex::encode(sha2::Sha256::digest(&data)),
    })
}

pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut data = serde_json::to_vec_pretty(value).context("serialize json")?;
    data.push(b'\n');
    write_atomic(path, &data)
}

fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create output dir: {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in: {}", parent.display()))?;
    tmp.write_all(data)
        .with_context(|| format!("write temp file for: {}", path.display()))?;
    tmp.flush()
        .with_context(|| format!("flush temp file for: {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("rename temp file to: {}", path.display()))?;
    Ok(())
}
