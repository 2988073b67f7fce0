use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::catalog::Catalog;
use crate::cli::LocateArgs;

/// Resolve the chapter file to serve for `book` and an optional `chapter` slug.
///
/// Exact names are tried first: the catalog prefix, the book's alternate
/// prefixes, then the bare book slug. When none exist the directory is scanned
/// for a file whose stem ends with (or embeds) the chapter slug.
pub fn locate(
    catalog: &Catalog,
    dir: &Path,
    book: &str,
    chapter: Option<&str>,
) -> anyhow::Result<Option<PathBuf>> {
    let book = book.trim().to_lowercase();
    let prefix = catalog.book_prefix(&book, None);

    let Some(chapter) = chapter.map(|c| c.trim().to_lowercase()) else {
        let path = dir.join(format!("{prefix}.json"));
        return Ok(path.is_file().then_some(path));
    };

    for candidate in &candidate_prefixes(catalog, &book, &prefix) {
        let path = dir.join(format!("{candidate}-{chapter}.json"));
        if path.is_file() {
            tracing::debug!(path = %path.display(), "exact chapter file");
            return Ok(Some(path));
        }
    }

    fuzzy_match(dir, &chapter)
}

/// Prefixes to try for exact names, in order, each once.
fn candidate_prefixes(catalog: &Catalog, book: &str, prefix: &str) -> Vec<String> {
    let alternates = catalog
        .alternate_prefixes
        .get(book)
        .into_iter()
        .flatten()
        .map(String::as_str);

    let mut prefixes: Vec<String> = Vec::new();
    for candidate in std::iter::once(prefix).chain(alternates).chain([book]) {
        if !prefixes.iter().any(|p| p == candidate) {
            prefixes.push(candidate.to_owned());
        }
    }
    prefixes
}

fn normalize(name: &str) -> String {
    name.replace("organisations", "organizations")
}

fn fuzzy_match(dir: &Path, chapter: &str) -> anyhow::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("read question dir: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .context("list question dir")?;
    paths.retain(|p| p.extension().and_then(|e| e.to_str()) == Some("json"));
    paths.sort();

    let wanted = normalize(chapter);
    let suffix = format!("-{wanted}");
    let infix = format!("-{wanted}-");

    let found = paths.into_iter().find(|path| {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        let stem = normalize(&stem.to_lowercase());
        stem == wanted || stem.ends_with(&suffix) || stem.contains(&infix)
    });
    if let Some(path) = &found {
        tracing::debug!(path = %path.display(), %chapter, "fuzzy chapter match");
    }
    Ok(found)
}

pub fn run(args: LocateArgs) -> anyhow::Result<()> {
    let catalog = Catalog::load(args.catalog.as_deref()).context("load catalog")?;
    let found = locate(
        &catalog,
        Path::new(&args.dir),
        &args.book,
        args.chapter.as_deref(),
    )?;

    match found {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => anyhow::bail!(
            "no chapter file for book {:?} chapter {:?} in {}",
            args.book,
            args.chapter.as_deref().unwrap_or(""),
            args.dir
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, "{}")?;
        Ok(path)
    }

    #[test]
    fn catalog_prefix_wins() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let expected = touch(temp.path(), "oxford-airways.json")?;
        touch(temp.path(), "cae-oxford-airways.json")?;

        let catalog = Catalog::builtin()?;
        let found = locate(&catalog, temp.path(), "CAE-Oxford", Some("Airways"))?;
        assert_eq!(found, Some(expected));
        Ok(())
    }

    #[test]
    fn alternate_prefix_is_tried() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let expected = touch(temp.path(), "performance-take-off.json")?;

        let catalog = Catalog::builtin()?;
        let found = locate(&catalog, temp.path(), "mass-and-balance", Some("take-off"))?;
        assert_eq!(found, Some(expected));
        Ok(())
    }

    #[test]
    fn candidate_prefixes_are_unique() -> anyhow::Result<()> {
        let catalog = Catalog::builtin()?;
        let prefix = catalog.book_prefix("mass-and-balance", None);
        assert_eq!(
            candidate_prefixes(&catalog, "mass-and-balance", &prefix),
            vec!["mass-and-balance-and-performance", "mass-and-balance", "performance"]
        );
        assert_eq!(
            candidate_prefixes(&catalog, "ic-joshi", "ic-joshi"),
            vec!["ic-joshi"]
        );
        Ok(())
    }

    #[test]
    fn fuzzy_match_treats_spellings_alike() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let expected = touch(
            temp.path(),
            "rk-bali-international-organisations-and-conventions.json",
        )?;

        let catalog = Catalog::builtin()?;
        let found = locate(
            &catalog,
            temp.path(),
            "unknown-book",
            Some("international-organizations-and-conventions"),
        )?;
        assert_eq!(found, Some(expected));
        Ok(())
    }

    #[test]
    fn book_without_chapter_uses_book_file() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let expected = touch(temp.path(), "ic-joshi.json")?;

        let catalog = Catalog::builtin()?;
        assert_eq!(locate(&catalog, temp.path(), "ic-joshi", None)?, Some(expected));
        assert_eq!(locate(&catalog, temp.path(), "rk-bali", None)?, None);
        Ok(())
    }

    #[test]
    fn nothing_matching_is_none() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        touch(temp.path(), "ic-joshi-winds.json")?;

        let catalog = Catalog::builtin()?;
        let found = locate(&catalog, temp.path(), "ic-joshi", Some("jet-streams"))?;
        assert_eq!(found, None);
        Ok(())
    }
}
