use std::path::PathBuf;

use anyhow::Context;
use colored::Colorize;

use episode_tidy::episode::{ActionPlanner, ActionReport, ClassificationResult, Prompt, Scanner};
use episode_tidy::prompt::TerminalPrompt;

use crate::Args;
use crate::config::Config;

/// Directory under the scan root used when no destination is given.
const DEFAULT_UNCATEGORIZED_DIR: &str = "Uncategorized";

pub struct EpisodeTidy {
    config: Config,
    root: PathBuf,
}

impl EpisodeTidy {
    pub fn new(args: Args) -> anyhow::Result<Self> {
        let root = episode_tidy::resolve_input_path(args.path.as_deref())?;
        let config = Config::from_args(args)?;
        Ok(Self { config, root })
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let scanner = Scanner::new(&self.root, self.config.scan.clone())?;

        if self.config.verbose {
            self.print_config();
        }

        let result = scanner
            .scan()
            .with_context(|| format!("Scan of {} aborted", self.root.display()))?;

        result.print_summary();

        if result.is_empty() {
            println!("{}", "Nothing to resolve".green());
            return Ok(());
        }

        let prompt = TerminalPrompt::stdio(self.config.clear_screen);
        self.resolve(&result, prompt)
    }

    /// Run the requested resolutions in order: different extension, copies, uncategorized.
    fn resolve<P: Prompt>(&self, result: &ClassificationResult, prompt: P) -> anyhow::Result<()> {
        let mut planner = ActionPlanner::new(result, prompt, self.config.policy).with_removal(self.config.removal);
        if let Some(extensions) = &self.config.purge_extensions {
            planner = planner.with_purge_extensions(extensions.clone());
        }

        if self.config.delete_diff_ext {
            let report = planner.resolve_cross_extension_duplicates()?;
            Self::print_report(&report, "Deleted");
        }

        if self.config.delete_same_ext {
            let report = planner.resolve_same_extension_duplicates()?;
            Self::print_report(&report, "Deleted");
        }

        if self.config.move_uncategorized {
            let report = planner.resolve_uncategorized(&self.uncategorized_destination())?;
            Self::print_report(&report, "Moved");
        }

        Ok(())
    }

    fn print_config(&self) {
        println!("Scanning: {}", episode_tidy::path_to_string(&self.root).magenta());
        println!("Extensions: {:?}", self.config.scan.extensions);
        match self.config.scan.max_depth {
            Some(depth) => println!("Recursion depth: {depth}"),
            None => println!("Recursion depth: unlimited"),
        }
        println!("Malformed names: {:?}", self.config.scan.malformed_names);
        println!("Confirmation: {:?}", self.config.policy);
        println!("Removal: {:?}", self.config.removal);
        if self.config.move_uncategorized {
            println!("Uncategorized destination: {}", self.uncategorized_destination().display());
        }
    }

    fn uncategorized_destination(&self) -> PathBuf {
        self.config
            .uncategorized_dir
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_UNCATEGORIZED_DIR))
    }

    fn print_report(report: &ActionReport, verb: &str) {
        if report.is_empty() {
            return;
        }
        println!("{}", format!("{verb} {} files", report.completed.len()).green());
        if !report.failures.is_empty() {
            println!("{}", format!("{} files failed", report.failures.len()).red());
        }
    }
}
