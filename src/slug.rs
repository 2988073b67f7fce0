use anyhow::Context as _;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::{Catalog, ChapterRef};
use crate::cli::SlugArgs;

static RE_PARENTHESISED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("valid regex"));
static RE_NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Slug for a chapter title: `"Point of Equal Time (PET)"` → `point-of-equal-time-pet`.
///
/// Parenthesised text becomes a hyphen-prefixed token before the general
/// collapse, so `"Time (1)"` and `"Time 1"` agree.
pub fn slugify_title(title: &str) -> String {
    let lower = title.to_lowercase();
    let tokens = RE_PARENTHESISED.replace_all(&lower, |caps: &regex::Captures<'_>| {
        format!("-{}", &caps[1])
    });
    collapse(&tokens)
}

/// Slug for question ids; never empty.
pub fn slugify(value: &str) -> String {
    let slug = collapse(&value.to_lowercase());
    if slug.is_empty() {
        "item".to_owned()
    } else {
        slug
    }
}

fn collapse(lower: &str) -> String {
    RE_NON_ALNUM
        .replace_all(lower, "-")
        .trim_matches('-')
        .to_owned()
}

pub fn run(args: SlugArgs) -> anyhow::Result<()> {
    let catalog = Catalog::load(args.catalog.as_deref()).context("load catalog")?;
    let subject = args
        .subject
        .as_deref()
        .or_else(|| catalog.subject_of(&args.book))
        .unwrap_or_default();
    tracing::debug!(book = %args.book, subject, "resolving chapter file name");

    let file = catalog.expected_file(&ChapterRef {
        subject,
        book: &args.book,
        title: &args.title,
    });
    println!("{file}");
    Ok(())
}
