use std::env;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use manuscript_pandoc::error::Result;
use manuscript_pandoc::prescan::prescan;
use manuscript_pandoc::{TMPDIR_VAR, run_filter};

/// Pandoc filter for Obsidian `[!figure]` and `[!table]` callouts.
///
/// Used as `pandoc --filter manuscript-pandoc`: pandoc passes the output
/// format as the only argument and the document as JSON on stdin.
#[derive(Parser)]
#[command(version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Output format, as passed by pandoc
    format: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Count callouts across the files of a multi-file manuscript
    Prescan {
        /// Prepended to each file stem to name its output file
        #[arg(long, default_value = "")]
        file_prefix: String,

        /// Also put this file's offsets at the top level, for use as
        /// `--metadata-file` in its own run
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Markdown sources, in build order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Prescan {
            file_prefix,
            file,
            files,
        }) => {
            let mut report = prescan(&files, &file_prefix);
            if let Some(file) = file {
                if !report.select(&file) {
                    log::warn!("{} is not among the scanned files", file.display());
                }
            }
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", report.to_json()?)?;
        }
        None => {
            let tmpdir = env::var_os(TMPDIR_VAR).map(PathBuf::from);
            let stdin = io::stdin().lock();
            let mut stdout = BufWriter::new(io::stdout().lock());
            run_filter(stdin, &mut stdout, cli.format.as_deref(), tmpdir.as_deref())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
