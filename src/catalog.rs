use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::slug::slugify_title;

const DEFAULT_CATALOG_YAML: &str = include_str!("../catalog/default.yaml");

const DEFAULT_SENTINEL_TITLES: &[&str] = &[
    "Revision Question",
    "Revision Questions",
    "Sample Question Papers",
];

/// Hand-maintained chapter catalog and the filename tables that go with it.
///
/// Subjects and books keep the order they are written in, so reports list
/// chapters the way the catalog does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub subjects: IndexMap<String, IndexMap<String, Vec<String>>>,
    pub slug_overrides: BTreeMap<String, BTreeMap<String, String>>,
    pub book_prefixes: BTreeMap<String, PrefixRule>,
    pub fallback_prefixes: Vec<String>,
    pub alternate_prefixes: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_sentinel_titles")]
    pub sentinel_titles: Vec<String>,
}

fn default_sentinel_titles() -> Vec<String> {
    DEFAULT_SENTINEL_TITLES
        .iter()
        .map(|title| (*title).to_owned())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefixRule {
    Fixed(String),
    BySubject {
        default: String,
        #[serde(default)]
        by_subject: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef<'a> {
    pub subject: &'a str,
    pub book: &'a str,
    pub title: &'a str,
}

impl Catalog {
    pub fn builtin() -> anyhow::Result<Self> {
        serde_yaml::from_str(DEFAULT_CATALOG_YAML).context("parse built-in catalog")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read catalog: {}", path.display()))?;
        serde_yaml::from_str(&yaml).with_context(|| format!("parse catalog: {}", path.display()))
    }

    /// Catalog from `--catalog`, or the compiled-in default.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_path(Path::new(path)),
            None => Self::builtin(),
        }
    }

    /// First subject listing `book`, in subject order.
    pub fn subject_of(&self, book: &str) -> Option<&str> {
        self.subjects
            .iter()
            .find(|(_, books)| books.contains_key(book))
            .map(|(subject, _)| subject.as_str())
    }

    pub fn is_sentinel(&self, title: &str) -> bool {
        self.sentinel_titles.iter().any(|s| s == title)
    }

    pub fn resolve_slug(&self, book: &str, slug: &str) -> String {
        let slug = slug.to_lowercase();
        self.slug_overrides
            .get(book)
            .and_then(|table| table.get(&slug))
            .cloned()
            .unwrap_or(slug)
    }

    pub fn book_prefix(&self, book: &str, subject: Option<&str>) -> String {
        match self.book_prefixes.get(book) {
            Some(PrefixRule::Fixed(prefix)) => prefix.clone(),
            Some(PrefixRule::BySubject {
                default,
                by_subject,
            }) => subject
                .and_then(|s| by_subject.get(s))
                .unwrap_or(default)
                .clone(),
            None => book.to_owned(),
        }
    }

    pub fn chapter_slug(&self, book: &str, title: &str) -> String {
        self.resolve_slug(book, &slugify_title(title))
    }

    pub fn expected_file(&self, chapter: &ChapterRef<'_>) -> String {
        let prefix = self.book_prefix(chapter.book, Some(chapter.subject));
        let slug = self.chapter_slug(chapter.book, chapter.title);
        format!("{prefix}-{slug}.json")
    }

    /// Every catalogued chapter in subject/book order, sentinels included.
    pub fn chapters(&self) -> impl Iterator<Item = ChapterRef<'_>> {
        self.subjects.iter().flat_map(|(subject, books)| {
            books.iter().flat_map(move |(book, titles)| {
                titles.iter().map(move |title| ChapterRef {
                    subject,
                    book,
                    title,
                })
            })
        })
    }
}
