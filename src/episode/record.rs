//! Parse a single file on disk into an episode record.
//!
//! Episode files are expected to follow the `Show - S01E01 - Title.ext` convention.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Separator between the show, episode code and title fields.
pub const FIELD_SEPARATOR: &str = " - ";

/// Regex to match a season and episode code like `S01E02` at the start of the code field
static RE_EPISODE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[sS][0-9]{2}[eE][0-9]{2}").expect("Invalid episode code regex"));

/// Regex to match an OS-level copy marker like `Name (copy 1)` at the end of the stem
static RE_COPY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(copy [0-9]\)$").expect("Invalid copy marker regex"));

const SIZE_UNITS: &[&str] = &["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

/// Per-file parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{} is not a valid file", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read metadata for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{name}' does not match the 'Show - S01E01 - Title' naming convention")]
    MalformedEpisodeName { name: String },
}

/// Episode code and title parsed from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeName {
    /// Season and episode code candidate, for example `S01E01`.
    pub code: String,
    /// Human readable episode title.
    pub title: String,
}

/// Immutable snapshot of one media file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    path: PathBuf,
    base_name: String,
    extension: String,
    size: u64,
    episode_key: PathBuf,
    episode: Option<EpisodeName>,
}

impl EpisodeName {
    /// Split a file stem on `" - "` and take the second and third fields.
    ///
    /// # Errors
    /// Returns `MalformedEpisodeName` if there are fewer than three fields.
    pub fn parse(stem: &str) -> Result<Self, ParseError> {
        let mut fields = stem.split(FIELD_SEPARATOR).skip(1);
        match (fields.next(), fields.next()) {
            (Some(code), Some(title)) => Ok(Self {
                code: code.to_string(),
                title: title.to_string(),
            }),
            _ => Err(ParseError::MalformedEpisodeName { name: stem.to_string() }),
        }
    }

    /// True if the code starts with a `SxxEyy` season and episode marker.
    #[must_use]
    pub fn has_valid_code(&self) -> bool {
        RE_EPISODE_CODE.is_match(&self.code)
    }
}

impl FileRecord {
    /// Read the file metadata and derive all name based fields.
    ///
    /// A name without the episode structure is not an error here,
    /// use [`FileRecord::episode`] to get the parse result.
    ///
    /// # Errors
    /// Returns `NotFound` if the path is not a regular file,
    /// or `Metadata` if the file size cannot be read.
    pub fn new(path: &Path) -> Result<Self, ParseError> {
        if !path.is_file() {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }
        let size = fs::metadata(path)
            .map_err(|source| ParseError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        // Identity comes from the name on disk, the normalized name is only for display and parsing
        let (raw_stem, raw_extension) = crate::split_file_name(path.file_name().unwrap_or_default());
        let episode_key = path.with_file_name(raw_stem);
        let extension = raw_extension.to_string_lossy().into_owned();

        let base_name = crate::path_to_filename_string(path);
        let episode = EpisodeName::parse(split_extension(&base_name).0).ok();

        Ok(Self {
            path: path.to_path_buf(),
            extension,
            episode_key,
            episode,
            size,
            base_name,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// File extension without the leading dot, in the case found on disk.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File size in bytes when the record was created.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Absolute path without the extension.
    /// Files sharing a key are the same episode in different containers.
    #[must_use]
    pub fn episode_key(&self) -> &Path {
        &self.episode_key
    }

    /// Display name without the extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        split_extension(&self.base_name).0
    }

    /// Parsed episode code and title.
    ///
    /// # Errors
    /// Returns `MalformedEpisodeName` if the name has fewer than three `" - "` separated fields.
    pub fn episode(&self) -> Result<&EpisodeName, ParseError> {
        self.episode.as_ref().ok_or_else(|| ParseError::MalformedEpisodeName {
            name: self.base_name.clone(),
        })
    }

    /// True if the name ends with a `(copy N)` marker.
    #[must_use]
    pub fn is_copy(&self) -> bool {
        RE_COPY_MARKER.is_match(self.stem())
    }

    #[must_use]
    pub fn human_size(&self) -> String {
        human_size(self.size)
    }
}

/// Parse a file into a record that must follow the episode naming convention.
///
/// # Errors
/// Returns `NotFound`, `Metadata` or `MalformedEpisodeName`.
pub fn parse(path: &Path) -> Result<FileRecord, ParseError> {
    let record = FileRecord::new(path)?;
    record.episode()?;
    Ok(record)
}

/// Format a byte count with binary prefixes, for example `1.5MiB`.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in SIZE_UNITS {
        if num.abs() < 1024.0 {
            return format!("{num:3.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}YiB")
}

/// Split a file name into stem and extension on the last dot.
/// The extension is empty if there is no dot.
fn split_extension(base_name: &str) -> (&str, &str) {
    base_name.rsplit_once('.').unwrap_or((base_name, ""))
}
