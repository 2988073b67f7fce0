use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize a raw question bank into per-chapter files.
    Generate(GenerateArgs),
    /// Check every catalogued chapter against the files on disk.
    Verify(VerifyArgs),
    /// Report numbering gaps and questions without usable options.
    Audit(AuditArgs),
    /// Print the expected file name for a catalogued chapter.
    Slug(SlugArgs),
    /// Print the chapter file that would be served for a book/chapter pair.
    Locate(LocateArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Raw source JSON file.
    #[arg(long)]
    pub source: String,

    /// Generation plan (`plan.yaml`) for this source.
    #[arg(long)]
    pub plan: String,

    /// Output directory for chapter files.
    #[arg(long)]
    pub out: String,

    /// Write the generation report to this JSON file.
    #[arg(long)]
    pub report: Option<String>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Directory holding chapter files.
    #[arg(long)]
    pub dir: String,

    /// Catalog YAML (default: built-in catalog).
    #[arg(long)]
    pub catalog: Option<String>,

    /// Write the verification report to this JSON file.
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Directory holding chapter files.
    #[arg(long)]
    pub dir: String,

    /// Write the audit report to this JSON file.
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Debug, Args)]
pub struct SlugArgs {
    /// Book slug as it appears in the catalog.
    #[arg(long)]
    pub book: String,

    /// Chapter title.
    #[arg(long)]
    pub title: String,

    /// Subject slug (default: the subject that lists the book).
    #[arg(long)]
    pub subject: Option<String>,

    /// Catalog YAML (default: built-in catalog).
    #[arg(long)]
    pub catalog: Option<String>,
}

#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Directory holding chapter files.
    #[arg(long)]
    pub dir: String,

    /// Book slug.
    #[arg(long)]
    pub book: String,

    /// Chapter slug; omit to look up the whole-book file.
    #[arg(long)]
    pub chapter: Option<String>,

    /// Catalog YAML (default: built-in catalog).
    #[arg(long)]
    pub catalog: Option<String>,
}
