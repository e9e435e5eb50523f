//! Episode file classification.
//!
//! [`record`] parses single files, [`classify`] walks a directory tree and
//! partitions the files, and [`planner`] resolves the partitions with the user.

pub mod classify;
pub mod planner;
pub mod record;

pub use classify::{
    ClassificationResult, DEFAULT_EXTENSIONS, DirectoryError, MalformedNamePolicy, ScanError, ScanOptions, Scanner,
    SkipReason, SkippedFile, scan,
};
pub use planner::{ActionFailure, ActionPlanner, ActionReport, Answer, ConfirmationPolicy, Prompt, RemovalMethod};
pub use record::{EpisodeName, FileRecord, ParseError, human_size, parse};
