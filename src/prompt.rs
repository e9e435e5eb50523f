//! Terminal implementation of the planner [`Prompt`].

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use anyhow::Context;
use colored::Colorize;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use itertools::Itertools;

use crate::episode::{Answer, FileRecord, Prompt};
use crate::print_warning;

/// Reads answers line by line and writes listings to the output.
pub struct TerminalPrompt<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    clear_screen: bool,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on standard input and output.
    #[must_use]
    pub fn stdio(clear_screen: bool) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), clear_screen)
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub const fn new(reader: R, writer: W, clear_screen: bool) -> Self {
        Self {
            reader,
            writer,
            clear_screen,
        }
    }

    fn read_line(&mut self) -> anyhow::Result<String> {
        let mut input = String::new();
        self.reader.read_line(&mut input).context("Failed to read input")?;
        Ok(input.trim().to_string())
    }

    fn write_prompt(&mut self, text: &str) -> anyhow::Result<()> {
        write!(self.writer, "{text} ")?;
        self.writer.flush().context("Failed to flush stdout")
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn present(&mut self, files: &[&FileRecord], summary: &str) {
        if self.clear_screen
            && let Err(error) = execute!(self.writer, Clear(ClearType::All), MoveTo(0, 0))
        {
            print_warning!("Failed to clear screen: {error}");
        }
        let mut listing = String::new();
        for file in files {
            listing.push_str(&format!(
                "{}  {}\n",
                crate::path_to_string_relative(file.path()),
                file.human_size().dimmed()
            ));
        }
        listing.push_str(&format!("{}\n", summary.bold()));
        if let Err(error) = self.writer.write_all(listing.as_bytes()) {
            print_warning!("Failed to write file listing: {error}");
        }
    }

    fn confirm(&mut self, question: &str) -> anyhow::Result<Answer> {
        self.write_prompt(&format!("{question} {}", "[Y/N/A]".magenta()))?;
        Ok(parse_answer(&self.read_line()?))
    }

    fn choose_extensions(&mut self, available: &BTreeSet<String>) -> anyhow::Result<BTreeSet<String>> {
        let options = available.iter().join(", ");
        self.write_prompt(&format!(
            "Extensions to delete ({}):",
            options.cyan()
        ))?;
        let input = self.read_line()?;

        let (chosen, unknown): (BTreeSet<String>, BTreeSet<String>) =
            parse_extension_list(&input).partition(|extension| available.contains(extension));
        for extension in unknown {
            print_warning!("Ignoring extension '{extension}', no duplicates use it");
        }
        Ok(chosen)
    }
}

/// Interpret a typed answer. Anything unrecognised is a no.
#[must_use]
pub fn parse_answer(input: &str) -> Answer {
    match input.trim().to_lowercase().as_str() {
        "a" | "all" => Answer::All,
        "y" | "yes" => Answer::Yes,
        _ => Answer::No,
    }
}

/// Split a comma or whitespace separated list of extensions,
/// dropping leading dots and converting to lowercase.
pub fn parse_extension_list(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|extension| extension.trim().trim_start_matches('.').to_lowercase())
        .filter(|extension| !extension.is_empty())
}
