//! Configuration for `EpisodeTidy`.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use serde::Deserialize;

use episode_tidy::episode::{ConfirmationPolicy, DEFAULT_EXTENSIONS, MalformedNamePolicy, RemovalMethod, ScanOptions};
use episode_tidy::prompt::parse_extension_list;

use crate::Args;

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct TidyConfig {
    #[serde(default)]
    auto_yes: bool,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default)]
    no_clear: bool,
    #[serde(default)]
    permanent: bool,
    #[serde(default)]
    recursion_depth: Option<i64>,
    #[serde(default)]
    strict_names: bool,
    #[serde(default)]
    uncategorized_dir: Option<PathBuf>,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    eptidy: TidyConfig,
}

/// Final config created from CLI arguments and user config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) clear_screen: bool,
    pub(crate) delete_diff_ext: bool,
    pub(crate) delete_same_ext: bool,
    pub(crate) move_uncategorized: bool,
    pub(crate) policy: ConfirmationPolicy,
    pub(crate) purge_extensions: Option<BTreeSet<String>>,
    pub(crate) removal: RemovalMethod,
    pub(crate) scan: ScanOptions,
    /// Destination for uncategorized files, relative to the scan root if not set.
    pub(crate) uncategorized_dir: Option<PathBuf>,
    pub(crate) verbose: bool,
}

impl TidyConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub(crate) fn get_user_config() -> Result<Self> {
        let Some(path) = episode_tidy::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.eptidy)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed.
    pub fn from_args(args: Args) -> Result<Self> {
        let user_config = TidyConfig::get_user_config()?;
        Ok(Self::from_args_and_user_config(args, user_config))
    }

    fn from_args_and_user_config(args: Args, user_config: TidyConfig) -> Self {
        let extensions = merge_extensions(&args.filter_extensions, &user_config.extensions);

        let depth = args.recursion_depth.or(user_config.recursion_depth).unwrap_or(0);
        // Any negative depth means no limit
        let max_depth = usize::try_from(depth).ok();

        let malformed_names = if args.strict_names || user_config.strict_names {
            MalformedNamePolicy::Abort
        } else {
            MalformedNamePolicy::Uncategorize
        };

        let policy = if args.print || user_config.dryrun {
            ConfirmationPolicy::AutoNo
        } else if args.yes || user_config.auto_yes {
            ConfirmationPolicy::AutoYes
        } else {
            ConfirmationPolicy::AlwaysAsk
        };

        let removal = if args.permanent || user_config.permanent {
            RemovalMethod::Permanent
        } else {
            RemovalMethod::Trash
        };

        let purge_extensions: BTreeSet<String> = args
            .purge_extensions
            .iter()
            .flat_map(|value| parse_extension_list(value))
            .collect();

        let verbose = args.verbose || user_config.verbose;

        Self {
            clear_screen: !(args.no_clear || user_config.no_clear),
            // Preset extensions imply resolving the cross extension duplicates
            delete_diff_ext: args.del_dups_diff_ext || !purge_extensions.is_empty(),
            delete_same_ext: args.del_dups_same_ext,
            move_uncategorized: args.move_uncategorized.is_some(),
            policy,
            purge_extensions: (!purge_extensions.is_empty()).then_some(purge_extensions),
            removal,
            scan: ScanOptions {
                max_depth,
                extensions,
                malformed_names,
                verbose,
            },
            // The config file only gives the default destination, the move itself needs `-u`
            uncategorized_dir: args.move_uncategorized.flatten().or(user_config.uncategorized_dir),
            verbose,
        }
    }
}

/// Combine extensions from the CLI and the config file.
///
/// CLI values replace the config and defaults,
/// unless the first value starts with `+`, in which case they are added to the defaults.
fn merge_extensions(cli: &[String], config: &[String]) -> BTreeSet<String> {
    let append = cli.first().is_some_and(|value| value.trim_start().starts_with('+'));
    let cli_extensions: BTreeSet<String> = cli
        .iter()
        .flat_map(|value| parse_extension_list(value.trim_start().trim_start_matches('+')))
        .collect();
    let config_extensions: BTreeSet<String> = config.iter().flat_map(|value| parse_extension_list(value)).collect();
    let base: BTreeSet<String> = if config_extensions.is_empty() {
        DEFAULT_EXTENSIONS.iter().map(|&s| s.to_string()).collect()
    } else {
        config_extensions
    };

    if cli_extensions.is_empty() {
        base
    } else if append {
        base.into_iter().chain(cli_extensions).collect()
    } else {
        cli_extensions
    }
}
