mod config;
mod tidy;

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;

use crate::tidy::EpisodeTidy;

#[derive(Parser)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Find duplicate and uncategorized TV episode files")]
struct Args {
    /// Base directory to scan
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Allowed file extensions, comma or space separated. Prefix with '+' to add to the defaults
    #[arg(
        short = 'f',
        long,
        num_args = 1..,
        value_delimiter = ',',
        value_parser = parse_extension_arg,
        action = clap::ArgAction::Append,
        name = "EXTENSIONS"
    )]
    filter_extensions: Vec<String>,

    /// How many sub-directory levels to scan, -1 for unlimited
    #[arg(short = 'r', long, value_name = "DEPTH", allow_negative_numbers = true)]
    recursion_depth: Option<i64>,

    /// Delete duplicate episodes that differ only by extension
    #[arg(short = 'x', long)]
    del_dups_diff_ext: bool,

    /// Delete "(copy N)" duplicates
    #[arg(short = 's', long)]
    del_dups_same_ext: bool,

    /// Move episodes without a season and episode code, optionally to the given directory
    #[arg(
        short = 'u',
        long,
        value_name = "DIR",
        num_args = 0..=1,
        require_equals = true,
        value_hint = clap::ValueHint::DirPath
    )]
    move_uncategorized: Option<Option<PathBuf>>,

    /// Extensions to delete from duplicates that differ by extension, instead of asking
    #[arg(
        short = 'e',
        long,
        num_args = 1..,
        value_delimiter = ',',
        value_parser = parse_extension_arg,
        action = clap::ArgAction::Append,
        name = "PURGE"
    )]
    purge_extensions: Vec<String>,

    /// Abort the scan on the first file not named "Show - S01E01 - Title"
    #[arg(short = 'S', long)]
    strict_names: bool,

    /// Answer yes to all confirmations
    #[arg(short = 'y', long)]
    yes: bool,

    /// Only print what would be done without deleting or moving files
    #[arg(short = 'p', long)]
    print: bool,

    /// Delete files permanently instead of moving them to trash
    #[arg(short = 'P', long)]
    permanent: bool,

    /// Do not clear the screen before listing files
    #[arg(short = 'n', long)]
    no_clear: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return episode_tidy::generate_shell_completion(*shell, Args::command(), env!("CARGO_BIN_NAME"));
    }

    // Exit cleanly on interrupt, also while waiting for a confirmation
    ctrlc::set_handler(|| {
        println!("\n{}", "Exiting...".yellow());
        std::process::exit(0);
    })
    .context("Failed to set Ctrl+C handler")?;

    EpisodeTidy::new(args)?.run()
}

/// Reject path-like values so a directory after an extension list is not read as an extension.
fn parse_extension_arg(value: &str) -> Result<String, String> {
    if value.contains(['/', '\\']) {
        Err(format!(
            "'{value}' looks like a path, give the directory before the extensions or after `--`"
        ))
    } else {
        Ok(value.to_string())
    }
}
