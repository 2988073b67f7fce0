use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_EMBEDDED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"RAW_JSON\s*=\s*r?""""#).expect("valid regex"));

/// How a source document was finally read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMethod {
    Clean,
    /// Parsed only after doubling every backslash.
    RepairedEscapes,
    /// Parsed from the `RAW_JSON = r"""…"""` block of a fallback script.
    EmbeddedBlock { script: PathBuf, repaired: bool },
}

impl fmt::Display for LoadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::RepairedEscapes => write!(f, "repaired-escapes"),
            Self::EmbeddedBlock { script, repaired } => {
                write!(f, "embedded-block:{}", script.display())?;
                if *repaired {
                    write!(f, " (repaired-escapes)")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub document: Value,
    pub method: LoadMethod,
}

pub fn load(path: &Path, fallback_script: Option<&Path>) -> anyhow::Result<LoadedSource> {
    if !path.exists() {
        anyhow::bail!("source file not found: {}", path.display());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read source: {}", path.display()))?;

    let mut attempts = Vec::new();
    match parse_text(&text) {
        Ok((document, false)) => {
            return Ok(LoadedSource {
                document,
                method: LoadMethod::Clean,
            });
        }
        Ok((document, true)) => {
            return Ok(LoadedSource {
                document,
                method: LoadMethod::RepairedEscapes,
            });
        }
        Err(err) => attempts.push(format!("{}: {err}", path.display())),
    }

    if let Some(script) = fallback_script {
        match load_embedded(script) {
            Ok((document, repaired)) => {
                return Ok(LoadedSource {
                    document,
                    method: LoadMethod::EmbeddedBlock {
                        script: script.to_path_buf(),
                        repaired,
                    },
                });
            }
            Err(err) => attempts.push(format!("{}: {err:#}", script.display())),
        }
    }

    anyhow::bail!("unable to parse source ({})", attempts.join("; "))
}

fn load_embedded(script: &Path) -> anyhow::Result<(Value, bool)> {
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("read fallback script: {}", script.display()))?;
    let block = embedded_block(&text)
        .ok_or_else(|| anyhow::anyhow!("no RAW_JSON block in fallback script"))?;
    parse_text(block).context("parse RAW_JSON block")
}

/// Parse JSON, retrying with doubled backslashes. The flag reports the retry.
fn parse_text(text: &str) -> anyhow::Result<(Value, bool)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let clean_err = match serde_json::from_str(text) {
        Ok(value) => return Ok((value, false)),
        Err(err) => err,
    };
    match serde_json::from_str(&text.replace('\\', "\\\\")) {
        Ok(value) => Ok((value, true)),
        Err(_) => Err(clean_err.into()),
    }
}

fn embedded_block(text: &str) -> Option<&str> {
    let marker = RE_EMBEDDED_MARKER.find(text)?;
    let rest = &text[marker.end()..];
    let end = rest.find(r#"""""#)?;
    Some(&rest[..end])
}
