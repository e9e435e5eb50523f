//! Turn a classification result into user confirmed deletions and moves.
//!
//! All user interaction goes through the [`Prompt`] trait,
//! so the planner can be driven from a terminal or from a script.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use itertools::Itertools;
use thiserror::Error;

use crate::episode::classify::ClassificationResult;
use crate::episode::record::FileRecord;
use crate::print_error;

/// Answer to a yes / no / all question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Yes to this and every following question.
    All,
}

/// How confirmations are resolved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPolicy {
    #[default]
    AlwaysAsk,
    AutoYes,
    /// List what would be done without touching any file.
    AutoNo,
}

/// How files are deleted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMethod {
    /// Move to the system trash, falling back to deletion on network drives.
    #[default]
    Trash,
    Permanent,
}

/// User interaction needed by the planner.
pub trait Prompt {
    /// Show the files a following question is about.
    fn present(&mut self, files: &[&FileRecord], summary: &str);

    /// Ask a yes / no / all question.
    ///
    /// # Errors
    /// Returns an error if the answer cannot be read.
    fn confirm(&mut self, question: &str) -> anyhow::Result<Answer>;

    /// Ask which of the available extensions should be deleted.
    ///
    /// # Errors
    /// Returns an error if the answer cannot be read.
    fn choose_extensions(&mut self, available: &BTreeSet<String>) -> anyhow::Result<BTreeSet<String>>;
}

/// A single failed delete or move.
#[derive(Debug, Error)]
#[error("Failed to {action} {}: {source}", path.display())]
pub struct ActionFailure {
    pub path: PathBuf,
    pub action: &'static str,
    #[source]
    pub source: io::Error,
}

/// Outcome of one best-effort batch.
#[derive(Debug, Default)]
pub struct ActionReport {
    /// Files that were deleted or moved, with their new location for moves.
    pub completed: Vec<PathBuf>,
    pub failures: Vec<ActionFailure>,
}

/// Resolves the categories of a [`ClassificationResult`] one at a time.
pub struct ActionPlanner<'a, P: Prompt> {
    result: &'a ClassificationResult,
    prompt: P,
    policy: ConfirmationPolicy,
    removal: RemovalMethod,
    purge_extensions: Option<BTreeSet<String>>,
}

impl ActionReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failures.is_empty()
    }

    fn record(&mut self, path: &Path, action: &'static str, outcome: io::Result<PathBuf>) {
        match outcome {
            Ok(done) => self.completed.push(done),
            Err(source) => {
                let failure = ActionFailure {
                    path: path.to_path_buf(),
                    action,
                    source,
                };
                print_error!("{failure}");
                self.failures.push(failure);
            }
        }
    }
}

impl<'a, P: Prompt> ActionPlanner<'a, P> {
    pub const fn new(result: &'a ClassificationResult, prompt: P, policy: ConfirmationPolicy) -> Self {
        Self {
            result,
            prompt,
            policy,
            removal: RemovalMethod::Trash,
            purge_extensions: None,
        }
    }

    #[must_use]
    pub fn with_removal(mut self, removal: RemovalMethod) -> Self {
        self.removal = removal;
        self
    }

    /// Use these extensions for cross extension duplicates instead of asking.
    #[must_use]
    pub fn with_purge_extensions(mut self, extensions: BTreeSet<String>) -> Self {
        self.purge_extensions = Some(extensions);
        self
    }

    #[must_use]
    pub const fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    /// Delete every file with a chosen extension from the cross extension pairs.
    ///
    /// # Errors
    /// Returns an error only if reading user input fails.
    pub fn resolve_cross_extension_duplicates(&mut self) -> anyhow::Result<ActionReport> {
        let pairs = &self.result.cross_extension_duplicates;
        if pairs.is_empty() {
            return Ok(ActionReport::default());
        }

        let files: Vec<&FileRecord> = pairs.iter().flat_map(|(new, existing)| [new, existing]).collect();
        self.prompt.present(
            &files,
            &format!("Found {} files with the same name, but different extension", pairs.len()),
        );

        if self.policy == ConfirmationPolicy::AutoNo {
            return Ok(ActionReport::default());
        }

        let extensions = match &self.purge_extensions {
            Some(extensions) => extensions.clone(),
            None => self.prompt.choose_extensions(&self.result.duplicate_extensions)?,
        };
        let targets = self.result.cross_extension_files_with(&extensions);
        if targets.is_empty() {
            println!("No files with the selected extensions");
            return Ok(ActionReport::default());
        }

        self.prompt.present(
            &targets,
            &format!(
                "{} files with extension {}",
                targets.len(),
                extensions.iter().join(", ")
            ),
        );
        if !self.confirm("Do you want to delete these files?")? {
            return Ok(ActionReport::default());
        }

        Ok(self.remove_all(&targets))
    }

    /// Delete every `(copy N)` file.
    ///
    /// # Errors
    /// Returns an error only if reading user input fails.
    pub fn resolve_same_extension_duplicates(&mut self) -> anyhow::Result<ActionReport> {
        let copies: Vec<&FileRecord> = self.result.same_extension_duplicates.iter().collect();
        if copies.is_empty() {
            return Ok(ActionReport::default());
        }

        self.prompt
            .present(&copies, &format!("Found {} duplicate files", copies.len()));
        if !self.confirm("Do you want to delete these files?")? {
            return Ok(ActionReport::default());
        }

        Ok(self.remove_all(&copies))
    }

    /// Move every uncategorized file to the destination directory, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if reading user input fails or the destination cannot be created.
    pub fn resolve_uncategorized(&mut self, destination: &Path) -> anyhow::Result<ActionReport> {
        let files: Vec<&FileRecord> = self.result.uncategorized.iter().collect();
        if files.is_empty() {
            return Ok(ActionReport::default());
        }

        self.prompt
            .present(&files, &format!("Found {} uncategorized episodes", files.len()));
        if !self.confirm(&format!("Do you want to move these files to {}?", destination.display()))? {
            return Ok(ActionReport::default());
        }

        fs::create_dir_all(destination)
            .with_context(|| format!("Failed to create directory {}", destination.display()))?;

        let mut report = ActionReport::default();
        for file in files {
            let target = crate::get_unique_path(destination, file.path().file_name().unwrap_or_default());
            println!(
                "{}: {}",
                "Move".magenta(),
                crate::path_to_string_relative(&target)
            );
            report.record(file.path(), "move", move_file(file.path(), &target).map(|()| target));
        }
        Ok(report)
    }

    fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        match self.policy {
            ConfirmationPolicy::AutoYes => Ok(true),
            ConfirmationPolicy::AutoNo => Ok(false),
            ConfirmationPolicy::AlwaysAsk => match self.prompt.confirm(question)? {
                Answer::Yes => Ok(true),
                Answer::No => Ok(false),
                Answer::All => {
                    self.policy = ConfirmationPolicy::AutoYes;
                    Ok(true)
                }
            },
        }
    }

    fn remove_all(&self, files: &[&FileRecord]) -> ActionReport {
        let mut report = ActionReport::default();
        for file in files {
            let path = file.path();
            let outcome = remove_file(path, self.removal).map(|()| path.to_path_buf());
            report.record(path, "delete", outcome);
        }
        report
    }
}

/// Delete a single file with the given method.
fn remove_file(path: &Path, removal: RemovalMethod) -> io::Result<()> {
    // Trash does not work on network drives
    if removal == RemovalMethod::Permanent || crate::is_network_path(path) {
        println!("{}: {}", "Delete".red(), path.display());
        fs::remove_file(path)
    } else {
        println!("{}: {}", "Trash".yellow(), path.display());
        trash::delete(path).map_err(io::Error::other)
    }
}

/// Rename a file, copying it instead when the target is on another filesystem.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::fs::File;

    use tempfile::{TempDir, tempdir};

    use crate::episode::classify::{ScanOptions, Scanner};

    /// Prompt that answers from a fixed script and remembers what it was shown.
    #[derive(Default)]
    struct ScriptedPrompt {
        answers: VecDeque<Answer>,
        extensions: BTreeSet<String>,
        presented: Vec<String>,
        questions: usize,
    }

    impl ScriptedPrompt {
        fn answering(answers: &[Answer]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Prompt for &mut ScriptedPrompt {
        fn present(&mut self, _files: &[&FileRecord], summary: &str) {
            self.presented.push(summary.to_string());
        }

        fn confirm(&mut self, _question: &str) -> anyhow::Result<Answer> {
            self.questions += 1;
            self.answers.pop_front().context("No scripted answer left")
        }

        fn choose_extensions(&mut self, _available: &BTreeSet<String>) -> anyhow::Result<BTreeSet<String>> {
            Ok(self.extensions.clone())
        }
    }

    fn make_tree(files: &[&str]) -> TempDir {
        let dir = tempdir().expect("tempdir");
        for file in files {
            File::create(dir.path().join(file)).expect("create file");
        }
        dir
    }

    fn scan(dir: &TempDir, extensions: &[&str]) -> ClassificationResult {
        let options = ScanOptions {
            extensions: extensions.iter().map(|&s| s.to_string()).collect(),
            ..ScanOptions::default()
        };
        Scanner::new(dir.path(), options)
            .expect("valid root")
            .scan()
            .expect("scan")
    }

    #[test]
    fn deletes_selected_extension_only() {
        let dir = make_tree(&["Show - S01E01 - Pilot.mkv", "Show - S01E01 - Pilot.ts"]);
        let result = scan(&dir, &["mkv", "ts"]);

        let mut prompt = ScriptedPrompt::answering(&[Answer::Yes]);
        prompt.extensions = BTreeSet::from(["ts".to_string()]);
        let report = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AlwaysAsk)
            .with_removal(RemovalMethod::Permanent)
            .resolve_cross_extension_duplicates()
            .expect("resolve");

        assert_eq!(report.completed.len(), 1);
        assert!(report.failures.is_empty());
        assert!(dir.path().join("Show - S01E01 - Pilot.mkv").exists());
        assert!(!dir.path().join("Show - S01E01 - Pilot.ts").exists());
    }

    #[test]
    fn declined_confirmation_keeps_files() {
        let dir = make_tree(&["Show - S01E01 - Pilot.mkv", "Show - S01E01 - Pilot (copy 1).mkv"]);
        let result = scan(&dir, &["mkv"]);

        let mut prompt = ScriptedPrompt::answering(&[Answer::No]);
        let report = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AlwaysAsk)
            .with_removal(RemovalMethod::Permanent)
            .resolve_same_extension_duplicates()
            .expect("resolve");

        assert!(report.is_empty());
        assert!(dir.path().join("Show - S01E01 - Pilot (copy 1).mkv").exists());
        assert_eq!(prompt.presented, vec!["Found 1 duplicate files"]);
    }

    #[test]
    fn answer_all_stops_asking() {
        let dir = make_tree(&["Show - S01E01 - Pilot (copy 1).mkv", "random.mkv"]);
        let result = scan(&dir, &["mkv"]);
        let destination = dir.path().join("Uncategorized");

        let mut prompt = ScriptedPrompt::answering(&[Answer::All]);
        let mut planner = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AlwaysAsk)
            .with_removal(RemovalMethod::Permanent);
        let copies = planner.resolve_same_extension_duplicates().expect("resolve");
        assert_eq!(planner.policy(), ConfirmationPolicy::AutoYes);
        let moved = planner.resolve_uncategorized(&destination).expect("resolve");
        drop(planner);

        assert_eq!(copies.completed.len(), 1);
        assert_eq!(moved.completed, vec![destination.join("random.mkv")]);
        assert_eq!(prompt.questions, 1);
        assert!(destination.join("random.mkv").exists());
        assert!(!dir.path().join("random.mkv").exists());
    }

    #[test]
    fn auto_no_touches_nothing() {
        let dir = make_tree(&[
            "Show - S01E01 - Pilot.mkv",
            "Show - S01E01 - Pilot.ts",
            "Show - S01E01 - Pilot (copy 1).mkv",
            "random.mkv",
        ]);
        let result = scan(&dir, &["mkv", "ts"]);
        let destination = dir.path().join("Uncategorized");

        let mut prompt = ScriptedPrompt::default();
        let mut planner = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AutoNo);
        assert!(planner.resolve_cross_extension_duplicates().expect("resolve").is_empty());
        assert!(planner.resolve_same_extension_duplicates().expect("resolve").is_empty());
        assert!(planner.resolve_uncategorized(&destination).expect("resolve").is_empty());
        drop(planner);

        assert_eq!(prompt.questions, 0);
        assert_eq!(prompt.presented.len(), 3);
        assert!(!destination.exists());
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 4);
    }

    #[test]
    fn preset_extensions_skip_extension_prompt() {
        let dir = make_tree(&["Show - S01E01 - Pilot.mkv", "Show - S01E01 - Pilot.ts"]);
        let result = scan(&dir, &["mkv", "ts"]);

        let mut prompt = ScriptedPrompt::default();
        let report = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AutoYes)
            .with_removal(RemovalMethod::Permanent)
            .with_purge_extensions(BTreeSet::from(["mkv".to_string()]))
            .resolve_cross_extension_duplicates()
            .expect("resolve");

        assert_eq!(report.completed, vec![dir.path().join("Show - S01E01 - Pilot.mkv")]);
        assert!(dir.path().join("Show - S01E01 - Pilot.ts").exists());
    }

    #[test]
    fn failure_does_not_stop_batch() {
        let dir = make_tree(&["A - S01E01 - One (copy 1).mkv", "A - S01E02 - Two (copy 1).mkv"]);
        let result = scan(&dir, &["mkv"]);
        fs::remove_file(dir.path().join("A - S01E01 - One (copy 1).mkv")).expect("remove");

        let mut prompt = ScriptedPrompt::default();
        let report = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AutoYes)
            .with_removal(RemovalMethod::Permanent)
            .resolve_same_extension_duplicates()
            .expect("resolve");

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].action, "delete");
        assert_eq!(report.completed.len(), 1);
        assert!(!dir.path().join("A - S01E02 - Two (copy 1).mkv").exists());
    }

    #[test]
    fn move_does_not_overwrite_existing_file() {
        let dir = make_tree(&["random.mkv"]);
        let result = scan(&dir, &["mkv"]);
        let destination = dir.path().join("Uncategorized");
        fs::create_dir_all(&destination).expect("create dir");
        File::create(destination.join("random.mkv")).expect("create file");

        let mut prompt = ScriptedPrompt::default();
        let report = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AutoYes)
            .resolve_uncategorized(&destination)
            .expect("resolve");

        assert_eq!(report.completed, vec![destination.join("random.1.mkv")]);
        assert!(destination.join("random.mkv").exists());
    }

    #[test]
    fn move_keeps_name_on_disk() {
        let dir = make_tree(&["Cafe\u{301}.mkv"]);
        let result = scan(&dir, &["mkv"]);
        let destination = dir.path().join("Uncategorized");

        let mut prompt = ScriptedPrompt::default();
        let report = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AutoYes)
            .resolve_uncategorized(&destination)
            .expect("resolve");

        assert_eq!(report.completed, vec![destination.join("Cafe\u{301}.mkv")]);
        let moved: Vec<_> = fs::read_dir(&destination)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(moved, vec![std::ffi::OsString::from("Cafe\u{301}.mkv")]);
    }

    #[test]
    fn purge_matches_upper_case_extension() {
        let dir = make_tree(&["Show - S01E01 - Pilot.MKV", "Show - S01E01 - Pilot.ts"]);
        let result = scan(&dir, &["mkv", "ts"]);

        let mut prompt = ScriptedPrompt::default();
        let report = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AutoYes)
            .with_removal(RemovalMethod::Permanent)
            .with_purge_extensions(BTreeSet::from(["mkv".to_string()]))
            .resolve_cross_extension_duplicates()
            .expect("resolve");

        assert_eq!(report.completed, vec![dir.path().join("Show - S01E01 - Pilot.MKV")]);
        assert!(dir.path().join("Show - S01E01 - Pilot.ts").exists());
    }

    #[test]
    fn empty_categories_do_not_prompt() {
        let result = ClassificationResult::default();
        let mut prompt = ScriptedPrompt::default();
        let mut planner = ActionPlanner::new(&result, &mut prompt, ConfirmationPolicy::AlwaysAsk);
        assert!(planner.resolve_cross_extension_duplicates().expect("resolve").is_empty());
        assert!(planner.resolve_same_extension_duplicates().expect("resolve").is_empty());
        assert!(
            planner
                .resolve_uncategorized(Path::new("/nonexistent/target"))
                .expect("resolve")
                .is_empty()
        );
        drop(planner);
        assert!(prompt.presented.is_empty());
    }
}
