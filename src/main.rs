use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    questionbank::logging::init().context("init logging")?;

    let cli = questionbank::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        questionbank::cli::Command::Generate(args) => {
            questionbank::generate::run(args).context("generate")?;
        }
        questionbank::cli::Command::Verify(args) => {
            questionbank::verify::run(args).context("verify")?;
        }
        questionbank::cli::Command::Audit(args) => {
            questionbank::audit::run(args).context("audit")?;
        }
        questionbank::cli::Command::Slug(args) => {
            questionbank::slug::run(args).context("slug")?;
        }
        questionbank::cli::Command::Locate(args) => {
            questionbank::locate::run(args).context("locate")?;
        }
    }

    Ok(())
}
