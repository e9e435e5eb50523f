//! Walk a directory tree and partition episode files into duplicate and naming categories.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;
use itertools::Itertools;
use thiserror::Error;
use walkdir::WalkDir;

use crate::episode::record::{FileRecord, ParseError};
use crate::print_warning;

/// Filesystem housekeeping files that are never media.
pub const SKIP_FILE_NAMES: &[&str] = &[".DS_Store", "._.DS_Store", "Thumbs.db", "desktop.ini"];

/// Default allowed extensions.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mkv", "ts"];

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{} is not a valid directory", .0.display())]
    NotADirectory(PathBuf),
}

/// What to do with a file whose name lacks the `" - "` separated fields.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MalformedNamePolicy {
    /// Stop the whole scan with the parse error.
    Abort,
    /// Put the file in the uncategorized list and keep going.
    #[default]
    Uncategorize,
}

/// Errors that end a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    MalformedEpisodeName(ParseError),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How many directory levels below the root to visit. `None` is unlimited.
    pub max_depth: Option<usize>,
    /// Lowercase extensions without the leading dot.
    pub extensions: BTreeSet<String>,
    pub malformed_names: MalformedNamePolicy,
    /// Report every skipped file as it is found.
    pub verbose: bool,
}

/// Why a file was left out of every partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry could not be read as a regular file.
    Unreadable(String),
    /// The extension is not in the allowed list.
    ExtensionMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Scan output, owned by the caller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// First seen record for each episode key.
    pub unique_episodes: BTreeMap<PathBuf, FileRecord>,
    /// Files with a `(copy N)` marker.
    pub same_extension_duplicates: Vec<FileRecord>,
    /// Pairs of `(new, existing)` records sharing an episode key.
    pub cross_extension_duplicates: Vec<(FileRecord, FileRecord)>,
    /// Every extension that appears in a cross extension pair, in lowercase.
    pub duplicate_extensions: BTreeSet<String>,
    /// Lowercase extensions seen so far for each episode key.
    pub extensions_by_key: BTreeMap<PathBuf, BTreeSet<String>>,
    /// Files whose episode code is not `SxxEyy`, or whose name could not be parsed.
    pub uncategorized: Vec<FileRecord>,
    /// Files skipped during the walk.
    pub skipped: Vec<SkippedFile>,
}

/// Classification engine for a single root directory.
#[derive(Debug)]
pub struct Scanner {
    root: PathBuf,
    options: ScanOptions,
}

/// Accumulator for one call to [`Scanner::scan`].
#[derive(Default)]
struct ScanState {
    result: ClassificationResult,
    /// All records that can still be matched by a later file with the same key.
    seen: HashMap<PathBuf, Vec<FileRecord>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(0),
            extensions: DEFAULT_EXTENSIONS.iter().map(|&s| s.to_string()).collect(),
            malformed_names: MalformedNamePolicy::default(),
            verbose: false,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(error) => write!(f, "{error}"),
            Self::ExtensionMismatch(extension) => write!(f, "extension '{extension}' is not allowed"),
        }
    }
}

impl ClassificationResult {
    /// True if there is nothing for the user to resolve.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.same_extension_duplicates.is_empty()
            && self.cross_extension_duplicates.is_empty()
            && self.uncategorized.is_empty()
    }

    /// Every record from the cross extension pairs whose extension is in the given set,
    /// ignoring ASCII case. Each file is listed once even if it is part of several pairs.
    #[must_use]
    pub fn cross_extension_files_with(&self, extensions: &BTreeSet<String>) -> Vec<&FileRecord> {
        let mut seen_paths: BTreeSet<&Path> = BTreeSet::new();
        self.cross_extension_duplicates
            .iter()
            .flat_map(|(new, existing)| [new, existing])
            .filter(|record| {
                extensions
                    .iter()
                    .any(|extension| extension.eq_ignore_ascii_case(record.extension()))
            })
            .filter(|record| seen_paths.insert(record.path()))
            .collect()
    }

    /// Print counts and sizes for each category.
    pub fn print_summary(&self) {
        println!("{}", "Scan summary".bold());
        println!(
            "  Unique episodes:            {:>5}  {}",
            self.unique_episodes.len(),
            crate::episode::human_size(total_size(self.unique_episodes.values()))
        );
        println!(
            "  Copies:                     {:>5}  {}",
            self.same_extension_duplicates.len().to_string().yellow(),
            crate::episode::human_size(total_size(&self.same_extension_duplicates))
        );
        println!(
            "  Different extension pairs:  {:>5}  {}",
            self.cross_extension_duplicates.len().to_string().yellow(),
            self.duplicate_extensions.iter().join(", ")
        );
        println!(
            "  Uncategorized:              {:>5}  {}",
            self.uncategorized.len().to_string().yellow(),
            crate::episode::human_size(total_size(&self.uncategorized))
        );
        if !self.skipped.is_empty() {
            println!("  Skipped:                    {:>5}", self.skipped.len());
        }
    }
}

/// Scan a root directory in one call.
///
/// # Errors
/// Returns `Directory` if the root is not a directory,
/// or `MalformedEpisodeName` with [`MalformedNamePolicy::Abort`].
pub fn scan(root: impl Into<PathBuf>, options: ScanOptions) -> Result<ClassificationResult, ScanError> {
    Scanner::new(root, options)?.scan()
}

impl Scanner {
    /// Create a scanner for the given root directory.
    ///
    /// # Errors
    /// Returns `DirectoryError` if the root does not exist or is not a directory.
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions) -> Result<Self, DirectoryError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DirectoryError::NotADirectory(root));
        }
        Ok(Self { root, options })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and classify every eligible file.
    ///
    /// # Errors
    /// Returns `MalformedEpisodeName` only with [`MalformedNamePolicy::Abort`].
    pub fn scan(&self) -> Result<ClassificationResult, ScanError> {
        let mut walker = WalkDir::new(&self.root).sort_by_file_name();
        if let Some(depth) = self.options.max_depth {
            // Files directly in root are at walkdir depth 1
            walker = walker.max_depth(depth.saturating_add(1));
        }

        let mut state = ScanState::default();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    let path = error.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    self.skip(&mut state, path, SkipReason::Unreadable(error.to_string()));
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if SKIP_FILE_NAMES.iter().any(|name| entry.file_name() == *name) {
                continue;
            }
            self.classify(&mut state, entry.path())?;
        }

        Ok(state.result)
    }

    fn classify(&self, state: &mut ScanState, path: &Path) -> Result<(), ScanError> {
        let record = match FileRecord::new(path) {
            Ok(record) => record,
            Err(error) => {
                self.skip(state, path.to_path_buf(), SkipReason::Unreadable(error.to_string()));
                return Ok(());
            }
        };

        if !self.is_allowed_extension(record.extension()) {
            let reason = SkipReason::ExtensionMismatch(record.extension().to_string());
            self.skip(state, path.to_path_buf(), reason);
            return Ok(());
        }

        if record.is_copy() {
            state.result.same_extension_duplicates.push(record);
            return Ok(());
        }

        match record.episode() {
            Ok(episode) if !episode.has_valid_code() => state.result.uncategorized.push(record.clone()),
            Ok(_) => {}
            Err(error) => match self.options.malformed_names {
                MalformedNamePolicy::Abort => return Err(ScanError::MalformedEpisodeName(error)),
                MalformedNamePolicy::Uncategorize => {
                    if self.options.verbose {
                        print_warning!("{error}");
                    }
                    state.result.uncategorized.push(record.clone());
                    return Ok(());
                }
            },
        }

        state.add_episode(record);
        Ok(())
    }

    fn is_allowed_extension(&self, extension: &str) -> bool {
        self.options
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    fn skip(&self, state: &mut ScanState, path: PathBuf, reason: SkipReason) {
        match reason {
            SkipReason::Unreadable(_) => print_warning!("Skipping {}: {reason}", path.display()),
            SkipReason::ExtensionMismatch(_) if self.options.verbose => {
                println!("Skipping {}: {reason}", crate::path_to_string_relative(&path).dimmed());
            }
            SkipReason::ExtensionMismatch(_) => {}
        }
        state.result.skipped.push(SkippedFile { path, reason });
    }
}

impl ScanState {
    /// Pair the record with every earlier record that has the same episode key,
    /// or accept it as a unique episode if there are none.
    fn add_episode(&mut self, record: FileRecord) {
        let key = record.episode_key().to_path_buf();
        let extension = record.extension().to_ascii_lowercase();
        self.result
            .extensions_by_key
            .entry(key.clone())
            .or_default()
            .insert(extension.clone());

        let previous = self.seen.entry(key.clone()).or_default();
        if previous.is_empty() {
            self.result.unique_episodes.insert(key, record.clone());
        } else {
            for existing in previous.iter() {
                self.result.duplicate_extensions.insert(extension.clone());
                self.result
                    .duplicate_extensions
                    .insert(existing.extension().to_ascii_lowercase());
                self.result
                    .cross_extension_duplicates
                    .push((record.clone(), existing.clone()));
            }
        }
        previous.push(record);
    }
}

fn total_size<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> u64 {
    records.into_iter().map(FileRecord::size).sum()
}
