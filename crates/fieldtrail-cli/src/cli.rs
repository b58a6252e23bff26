use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fieldtrail",
    about = "fieldtrail — field-level change auditing for documents",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show tracked-field changes between two JSON snapshots
    Diff(DiffArgs),
    /// Predict the effect of an update operator document
    Simulate(SimulateArgs),
    /// Build the audit entry a write would produce
    Entry(EntryArgs),
    /// Validate a tracking configuration
    Check(CheckArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    /// Tracking configuration (TOML)
    #[arg(short, long)]
    pub config: PathBuf,
    /// Snapshot before the write; omit for an insert
    #[arg(long)]
    pub before: Option<PathBuf>,
    /// Snapshot after the write; omit for a delete
    #[arg(long)]
    pub after: Option<PathBuf>,
}

#[derive(Args)]
pub struct SimulateArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    #[arg(long)]
    pub before: PathBuf,
    /// Update operator document, e.g. {"$set": {...}}
    #[arg(long)]
    pub patch: PathBuf,
    /// Also diff the snapshot against the prediction
    #[arg(long)]
    pub diff: bool,
}

#[derive(Args)]
pub struct EntryArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    #[arg(long)]
    pub before: Option<PathBuf>,
    #[arg(long, conflicts_with = "patch")]
    pub after: Option<PathBuf>,
    #[arg(long, requires = "before")]
    pub patch: Option<PathBuf>,
    /// Actor as inline JSON, e.g. '{"user":"alice"}'
    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[arg(short, long)]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_diff() {
        let cli = Cli::try_parse_from([
            "fieldtrail", "diff", "-c", "audit.toml", "--before", "a.json", "--after", "b.json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        let Command::Diff(args) = cli.command else {
            panic!("expected diff");
        };
        assert_eq!(args.config, PathBuf::from("audit.toml"));
        assert_eq!(args.before, Some(PathBuf::from("a.json")));
        assert_eq!(args.after, Some(PathBuf::from("b.json")));
    }

    #[test]
    fn parse_simulate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "fieldtrail", "simulate", "--config", "c.toml", "--before", "a.json", "--patch",
            "p.json", "--diff", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert!(args.diff);
    }

    #[test]
    fn parse_entry_with_actor() {
        let cli = Cli::try_parse_from([
            "fieldtrail", "entry", "-c", "c.toml", "--after", "b.json", "--actor", r#"{"user":"a"}"#,
        ])
        .unwrap();
        let Command::Entry(args) = cli.command else {
            panic!("expected entry");
        };
        assert!(args.before.is_none());
        assert_eq!(args.actor.as_deref(), Some(r#"{"user":"a"}"#));
    }

    #[test]
    fn entry_patch_requires_before_and_excludes_after() {
        assert!(Cli::try_parse_from(["fieldtrail", "entry", "-c", "c", "--patch", "p"]).is_err());
        assert!(Cli::try_parse_from([
            "fieldtrail", "entry", "-c", "c", "--before", "a", "--after", "b", "--patch", "p",
        ])
        .is_err());
    }

    #[test]
    fn check_requires_config() {
        assert!(Cli::try_parse_from(["fieldtrail", "check"]).is_err());
        assert!(Cli::try_parse_from(["fieldtrail", "check", "-c", "c.toml"]).is_ok());
    }
}
