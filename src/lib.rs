pub mod config;
pub mod episode;
pub mod prompt;

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::Colorize;
use unicode_normalization::UnicodeNormalization;

/// Resolves the provided input directory to an absolute path.
///
/// If `path` is `None` or empty, the current working directory is used.
/// The function verifies that the provided path exists and is accessible,
/// returning an error if it does not.
///
/// ```rust
/// use std::path::Path;
/// use episode_tidy::resolve_input_path;
///
/// let path = Path::new("src");
/// let absolute_path = resolve_input_path(Some(path)).unwrap();
/// assert!(absolute_path.is_absolute());
/// ```
#[inline]
pub fn resolve_input_path(path: Option<&Path>) -> Result<PathBuf> {
    let filepath = match path {
        Some(p) if !is_blank(p.as_os_str()) => p.to_path_buf(),
        _ => env::current_dir().context("Failed to get current working directory")?,
    };
    if !filepath.exists() {
        anyhow::bail!(
            "Input path does not exist or is not accessible: '{}'",
            filepath.display()
        );
    }

    let absolute_input_path = dunce::canonicalize(&filepath)?;

    // Canonicalize fails for network drives on Windows :(
    if path_to_string(&absolute_input_path).starts_with(r"\\?") && !path_to_string(&filepath).starts_with(r"\\?") {
        Ok(filepath)
    } else {
        Ok(absolute_input_path)
    }
}

/// True if the value is empty or only whitespace.
fn is_blank(value: &OsStr) -> bool {
    value.to_str().is_some_and(|text| text.trim().is_empty())
}

/// Convert the given path to be relative to the current working directory.
/// Returns the original path if the relative path cannot be created.
#[must_use]
pub fn get_relative_path_from_current_working_directory(path: &Path) -> PathBuf {
    env::current_dir().map_or_else(
        |_| path.to_path_buf(),
        |current_dir| path.strip_prefix(&current_dir).unwrap_or(path).to_path_buf(),
    )
}

/// Get a path in `dir` for the given file name that does not exist yet.
///
/// Adds an increasing number before the extension until the name is free.
/// The name is used as is, without any Unicode conversion.
///
/// ```rust
/// use std::ffi::OsStr;
/// use std::path::Path;
/// use episode_tidy::get_unique_path;
///
/// let dir = Path::new("/nonexistent/dir");
/// let path = get_unique_path(dir, OsStr::new("video.mkv"));
/// assert_eq!(path, dir.join("video.mkv"));
/// ```
#[must_use]
pub fn get_unique_path(dir: &Path, file_name: &OsStr) -> PathBuf {
    let (stem, extension) = split_file_name(file_name);
    let mut path = dir.join(file_name);
    let mut counter: usize = 1;
    while path.exists() {
        let mut name = stem.to_os_string();
        name.push(format!(".{counter}"));
        if !extension.is_empty() {
            name.push(".");
            name.push(extension);
        }
        path = dir.join(name);
        counter += 1;
    }
    path
}

/// Split a file name into stem and extension on the last dot, without any lossy conversion.
/// The extension is empty if there is no dot.
#[must_use]
pub fn split_file_name(name: &OsStr) -> (&OsStr, &OsStr) {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;

        let bytes = name.as_bytes();
        bytes.iter().rposition(|&byte| byte == b'.').map_or_else(
            || (name, OsStr::new("")),
            |index| (OsStr::from_bytes(&bytes[..index]), OsStr::from_bytes(&bytes[index + 1..])),
        )
    }
    #[cfg(not(unix))]
    {
        match name.to_str() {
            Some(name) => {
                let (stem, extension) = name.rsplit_once('.').unwrap_or((name, ""));
                (OsStr::new(stem), OsStr::new(extension))
            }
            // Unpaired surrogates: fall back to the standard library split
            None => {
                let path = Path::new(name);
                (
                    path.file_stem().unwrap_or(name),
                    path.extension().unwrap_or_default(),
                )
            }
        }
    }
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
///
/// Special characters are kept composed (Unicode NFC),
/// so a name read from macOS compares equal to the same name typed by the user.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
        .nfc()
        .collect::<String>()
}

/// Get relative path and convert to string with invalid unicode handling.
#[must_use]
pub fn path_to_string_relative(path: &Path) -> String {
    path_to_string(&get_relative_path_from_current_working_directory(path))
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Generate a shell completion script for the given shell.
///
/// Bash, fish and zsh completions are written to the user completion directory,
/// other shells get the script on stdout.
pub fn generate_shell_completion(shell: Shell, mut command: Command, command_name: &str) -> Result<()> {
    if let Some(dir) = user_completion_dir(shell)? {
        std::fs::create_dir_all(&dir)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, &dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

fn user_completion_dir(shell: Shell) -> Result<Option<PathBuf>> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(match shell {
        Shell::Bash => Some(home.join(".bash_completion.d")),
        Shell::Fish => Some(home.join(".config/fish/completions")),
        Shell::Zsh => Some(home.join(".zsh/completions")),
        _ => None,
    })
}

/// Check if a path is on a network drive.
/// On Windows, detects mapped network drives and UNC paths.
/// On other platforms, always returns false.
#[cfg(windows)]
#[must_use]
pub fn is_network_path(path: &Path) -> bool {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::GetDriveTypeW;

    const DRIVE_REMOTE: u32 = 4;

    // Check for UNC paths (\\server\share)
    let path_str = path.to_string_lossy();
    if path_str.starts_with(r"\\") {
        return true;
    }

    // Check drive type for mapped network drives
    if let Some(prefix) = path.components().next() {
        let prefix_str = prefix.as_os_str();
        // Create a root path like "X:\"
        let mut root: Vec<u16> = prefix_str.encode_wide().collect();
        if root.len() >= 2 && root[1] == u16::from(b':') {
            root.push(u16::from(b'\\'));
            root.push(0);

            // SAFETY: GetDriveTypeW only reads the null-terminated string
            #[allow(unsafe_code)]
            let drive_type = unsafe { GetDriveTypeW(root.as_ptr()) };
            return drive_type == DRIVE_REMOTE;
        }
    }

    false
}

/// Check if a path is on a network drive.
/// On Windows, detects mapped network drives and UNC paths.
/// On other platforms, always returns false.
#[cfg(not(windows))]
pub const fn is_network_path(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    use std::fs::File;

    use tempfile::tempdir;

    #[test]
    fn test_resolve_input_path_valid() {
        let dir = tempdir().expect("tempdir");
        let resolved = resolve_input_path(Some(dir.path()));
        assert!(resolved.is_ok());
    }

    #[test]
    fn test_resolve_input_path_nonexistent() {
        let path = Path::new("nonexistent");
        assert!(resolve_input_path(Some(path)).is_err());
    }

    #[test]
    fn test_resolve_input_path_default() {
        let resolved = resolve_input_path(None).expect("should resolve");
        assert_eq!(resolved, dunce::canonicalize(env::current_dir().expect("cwd")).expect("canonical"));
    }

    #[test]
    fn test_resolve_input_path_blank_is_current_dir() {
        let resolved = resolve_input_path(Some(Path::new("  "))).expect("should resolve");
        assert_eq!(resolved, dunce::canonicalize(env::current_dir().expect("cwd")).expect("canonical"));
    }

    // Other platforms reject names that are not valid Unicode
    #[cfg(target_os = "linux")]
    #[test]
    fn test_resolve_input_path_keeps_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join(OsStr::from_bytes(b"tv\xFF"));
        assert!(resolve_input_path(Some(&missing)).is_err());

        std::fs::create_dir(&missing).expect("create dir");
        let resolved = resolve_input_path(Some(&missing)).expect("should resolve");
        assert_eq!(resolved.file_name(), missing.file_name());
    }

    #[test]
    fn test_get_unique_path_no_conflict() {
        let dir = PathBuf::from("/nonexistent/path");
        let result = get_unique_path(&dir, OsStr::new("video.mkv"));
        assert_eq!(result, dir.join("video.mkv"));
    }

    #[test]
    fn test_get_unique_path_with_conflicts() {
        let dir = tempdir().expect("tempdir");
        File::create(dir.path().join("video.mkv")).expect("create");
        File::create(dir.path().join("video.1.mkv")).expect("create");

        let result = get_unique_path(dir.path(), OsStr::new("video.mkv"));
        assert_eq!(result, dir.path().join("video.2.mkv"));
    }

    #[test]
    fn test_get_unique_path_no_extension() {
        let dir = tempdir().expect("tempdir");
        File::create(dir.path().join("video")).expect("create");

        let result = get_unique_path(dir.path(), OsStr::new("video"));
        assert_eq!(result, dir.path().join("video.1"));
    }

    #[test]
    fn test_get_unique_path_keeps_decomposed_name() {
        let dir = tempdir().expect("tempdir");
        let name = OsStr::new("Cafe\u{301}.mkv");
        File::create(dir.path().join(name)).expect("create");

        let result = get_unique_path(dir.path(), name);
        assert_eq!(result, dir.path().join("Cafe\u{301}.1.mkv"));
    }

    #[test]
    fn test_split_file_name_on_last_dot() {
        assert_eq!(
            split_file_name(OsStr::new("Show - S01E01 - Pilot.v2.mkv")),
            (OsStr::new("Show - S01E01 - Pilot.v2"), OsStr::new("mkv"))
        );
        assert_eq!(split_file_name(OsStr::new("video")), (OsStr::new("video"), OsStr::new("")));
        assert_eq!(split_file_name(OsStr::new(".mkv")), (OsStr::new(""), OsStr::new("mkv")));
    }

    #[test]
    fn test_path_to_filename_string_composes_unicode() {
        let decomposed = Path::new("/tmp/Cafe\u{301} - S01E01 - Pilot.mkv");
        assert_eq!(path_to_filename_string(decomposed), "Caf\u{e9} - S01E01 - Pilot.mkv");
    }

    #[test]
    fn test_user_completion_dir_only_for_installable_shells() {
        let bash = user_completion_dir(Shell::Bash).expect("home dir");
        assert!(bash.is_some_and(|dir| dir.ends_with(".bash_completion.d")));
        assert!(user_completion_dir(Shell::PowerShell).expect("home dir").is_none());
    }

    #[test]
    fn test_path_to_string_relative_outside_cwd() {
        let path = Path::new("/nonexistent/dir/file.mkv");
        assert_eq!(path_to_string_relative(path), "/nonexistent/dir/file.mkv");
    }
}
