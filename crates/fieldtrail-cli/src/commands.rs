use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use fieldtrail_diff::diff;
use fieldtrail_ledger::AuditEntry;
use fieldtrail_patch::{overlay, simulate, PatchOperationSet};
use fieldtrail_sdk::{Auditor, AuditorConfig, InMemoryAuditSink};
use fieldtrail_types::{ArrayKind, ChangeKind, ChangeRecord, FieldSpec, Value};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let output = match cli.command {
        Command::Diff(args) => cmd_diff(args, cli.format)?,
        Command::Simulate(args) => cmd_simulate(args, cli.format)?,
        Command::Entry(args) => cmd_entry(args, cli.format)?,
        Command::Check(args) => cmd_check(args, cli.format)?,
    };
    println!("{output}");
    Ok(())
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<String> {
    if args.before.is_none() && args.after.is_none() {
        bail!("at least one of --before and --after is required");
    }
    let config = load_config(&args.config)?;
    let before = args.before.as_deref().map(read_json).transpose()?;
    let after = args.after.as_deref().map(read_json).transpose()?;
    let changes = diff(before.as_ref(), after.as_ref(), &config.fields);
    debug!(changes = changes.len(), "diff complete");

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&changes)?),
        OutputFormat::Text => Ok(render_changes(&changes)),
    }
}

fn cmd_simulate(args: SimulateArgs, format: OutputFormat) -> anyhow::Result<String> {
    let config = load_config(&args.config)?;
    let before = read_json(&args.before)?;
    let ops = PatchOperationSet::from_value(&read_json(&args.patch)?);
    if ops.is_empty() {
        bail!("{} contains no supported update operators", args.patch.display());
    }
    let fields = simulate(&ops, Some(&before), &config.fields);
    let after = overlay(Some(&before), &fields);
    let changes = args.diff.then(|| diff(Some(&before), Some(&after), &config.fields));

    match format {
        OutputFormat::Json => {
            let mut out = serde_json::Map::new();
            let predicted: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|(path, value)| {
                    let json = value.clone().map(serde_json::Value::from).unwrap_or_default();
                    (path.clone(), json)
                })
                .collect();
            out.insert("fields".into(), predicted.into());
            out.insert("after".into(), after.into());
            if let Some(changes) = changes {
                out.insert("changes".into(), serde_json::to_value(changes)?);
            }
            Ok(serde_json::to_string_pretty(&out)?)
        }
        OutputFormat::Text => {
            let mut lines = Vec::new();
            if fields.is_empty() {
                lines.push("No tracked fields touched.".to_string());
            }
            for (path, value) in &fields {
                match value {
                    Some(value) => lines.push(format!(
                        "  {} = {}",
                        path.bold(),
                        value.to_canonical_json()?.cyan()
                    )),
                    None => lines.push(format!("  {} {}", path.bold(), "(unset)".red())),
                }
            }
            if let Some(changes) = changes {
                lines.push(String::new());
                lines.push(render_changes(&changes));
            }
            Ok(lines.join("\n"))
        }
    }
}

fn cmd_entry(args: EntryArgs, format: OutputFormat) -> anyhow::Result<String> {
    let config = load_config(&args.config)?;
    let auditor = Auditor::new(config, Arc::new(InMemoryAuditSink::new()))?;
    let actor = match &args.actor {
        Some(raw) => {
            let json: serde_json::Value =
                serde_json::from_str(raw).context("--actor must be valid JSON")?;
            Value::from(json)
        }
        None => Value::Null,
    };
    let before = args.before.as_deref().map(read_json).transpose()?;
    let after = args.after.as_deref().map(read_json).transpose()?;
    let patch = args.patch.as_deref().map(read_json).transpose()?;

    let entry = match (&before, &after, &patch) {
        (Some(before), _, Some(patch)) => auditor.prepare_patch(before, patch, actor)?,
        (Some(before), Some(after), None) => auditor.prepare_update(before, after, actor)?,
        (None, Some(after), None) => auditor.prepare_create(after, actor)?,
        (Some(before), None, None) => auditor.prepare_delete(before, actor)?,
        _ => bail!("provide --after, --before, --before with --after, or --before with --patch"),
    };

    match (format, entry) {
        (OutputFormat::Json, entry) => Ok(serde_json::to_string_pretty(&entry)?),
        (OutputFormat::Text, None) => Ok("No tracked changes; no entry would be written.".into()),
        (OutputFormat::Text, Some(entry)) => Ok(render_entry(&entry)),
    }
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<String> {
    let config = load_config(&args.config)?;
    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "subject": config.subject,
                "id_path": config.id_path,
                "capture_whole_document": config.capture_whole_document,
                "compress": config.compress,
                "fields": config.fields.len(),
            });
            Ok(serde_json::to_string_pretty(&summary)?)
        }
        OutputFormat::Text => {
            let mut lines = vec![format!(
                "{} Configuration valid for subject {}",
                "✓".green().bold(),
                config.subject.yellow()
            )];
            describe_fields(&config.fields, 1, &mut lines);
            Ok(lines.join("\n"))
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<AuditorConfig> {
    AuditorConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Value::from(json))
}

fn render_changes(changes: &[ChangeRecord]) -> String {
    if changes.is_empty() {
        return "No changes.".to_string();
    }
    changes
        .iter()
        .map(|change| {
            let from = change.from_value.as_deref().unwrap_or("(none)");
            let to = change.to_value.as_deref().unwrap_or("(none)");
            let line = match change.kind {
                ChangeKind::Add => {
                    format!("  {} {} {}", "+".green(), change.field_name.bold(), to.green())
                }
                ChangeKind::Remove => {
                    format!("  {} {} {}", "-".red(), change.field_name.bold(), from.red())
                }
                ChangeKind::Edit => format!(
                    "  {} {} {} → {}",
                    "~".yellow(),
                    change.field_name.bold(),
                    from.red(),
                    to.green()
                ),
            };
            match &change.context {
                Some(context) => format!(
                    "{line}\n      {}",
                    context.to_canonical_json().unwrap_or_default().dimmed()
                ),
                None => line,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_entry(entry: &AuditEntry) -> String {
    let mut lines = vec![
        format!(
            "{} {} {}/{}",
            "Entry".bold(),
            entry.kind.to_string().yellow(),
            entry.subject,
            entry.subject_id.cyan()
        ),
        format!("  Id: {}", entry.id.to_string().dimmed()),
        format!("  At: {}", entry.created_at.to_rfc3339()),
    ];
    if !entry.actor.is_null() {
        lines.push(format!("  Actor: {}", entry.actor.to_canonical_json().unwrap_or_default()));
    }
    if let Some(context) = &entry.context {
        lines.push(format!("  Context: {}", context.to_canonical_json().unwrap_or_default()));
    }
    if let Some(snapshots) = &entry.snapshots {
        let side = |s: &Option<fieldtrail_ledger::SnapshotData>| match s {
            None => "none",
            Some(data) if data.is_compressed() => "compressed",
            Some(_) => "plain",
        };
        lines.push(format!(
            "  Snapshots: before {}, after {}",
            side(&snapshots.before),
            side(&snapshots.after)
        ));
    }
    lines.push(render_changes(&entry.changes));
    lines.join("\n")
}

fn describe_fields(fields: &[FieldSpec], depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for field in fields {
        let mut notes = Vec::new();
        if field.array != ArrayKind::None {
            notes.push(field.array.to_string());
        }
        if let Some(value_field) = &field.value_field {
            notes.push(format!("value {value_field}"));
        }
        if field.mask.is_some() {
            notes.push("masked".to_string());
        }
        if field.context.is_some() {
            notes.push("context".to_string());
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        lines.push(format!("{indent}{}{}", field.path.bold(), notes.dimmed()));
        describe_fields(&field.children, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
        subject = "orders"

        [[fields]]
        path = "status"

        [[fields]]
        path = "tags"
        array_kind = "primitive"

        [[fields]]
        path = "items"
        array_kind = "keyed"
        array_key = "sku"
        children = [{ path = "qty" }]
    "#;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn fixtures() -> (TempDir, PathBuf, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "audit.toml", CONFIG);
        let before = write(
            &dir,
            "before.json",
            r#"{"_id": "o-1", "status": "open", "tags": ["a", "b"], "items": [{"sku": "A", "qty": 1}]}"#,
        );
        let after = write(
            &dir,
            "after.json",
            r#"{"_id": "o-1", "status": "open", "tags": ["b", "c"], "items": [{"sku": "A", "qty": 3}]}"#,
        );
        (dir, config, before, after)
    }

    fn json(output: &str) -> serde_json::Value {
        serde_json::from_str(output).unwrap()
    }

    #[test]
    fn diff_json_output() {
        let (_dir, config, before, after) = fixtures();
        let args = DiffArgs {
            config,
            before: Some(before),
            after: Some(after),
        };
        let out = json(&cmd_diff(args, OutputFormat::Json).unwrap());
        let changes = out.as_array().unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().any(|c| c["field_name"] == "items.qty"
            && c["kind"] == "edit"
            && c["from_value"] == "1"
            && c["to_value"] == "3"));
    }

    #[test]
    fn diff_requires_a_side() {
        let (_dir, config, _, _) = fixtures();
        let args = DiffArgs {
            config,
            before: None,
            after: None,
        };
        assert!(cmd_diff(args, OutputFormat::Text).is_err());
    }

    #[test]
    fn diff_text_without_changes() {
        let (_dir, config, before, _) = fixtures();
        let args = DiffArgs {
            config,
            before: Some(before.clone()),
            after: Some(before),
        };
        assert_eq!(cmd_diff(args, OutputFormat::Text).unwrap(), "No changes.");
    }

    #[test]
    fn simulate_predicts_and_diffs() {
        let (dir, config, before, _) = fixtures();
        let patch = write(
            &dir,
            "patch.json",
            r#"{"$set": {"status": "closed"}, "$pull": {"tags": "a"}}"#,
        );
        let args = SimulateArgs {
            config,
            before,
            patch,
            diff: true,
        };
        let out = json(&cmd_simulate(args, OutputFormat::Json).unwrap());
        assert_eq!(out["fields"]["status"], "closed");
        assert_eq!(out["after"]["tags"], serde_json::json!(["b"]));
        assert_eq!(out["changes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn simulate_rejects_empty_patch() {
        let (dir, config, before, _) = fixtures();
        let patch = write(&dir, "patch.json", r#"{"$rename": {"a": "b"}}"#);
        let args = SimulateArgs {
            config,
            before,
            patch,
            diff: false,
        };
        assert!(cmd_simulate(args, OutputFormat::Text).is_err());
    }

    #[test]
    fn entry_for_update_and_unchanged() {
        let (_dir, config, before, after) = fixtures();
        let args = EntryArgs {
            config: config.clone(),
            before: Some(before.clone()),
            after: Some(after),
            patch: None,
            actor: Some(r#"{"user": "alice"}"#.into()),
        };
        let out = json(&cmd_entry(args, OutputFormat::Json).unwrap());
        assert_eq!(out["kind"], "update");
        assert_eq!(out["subject_id"], "o-1");
        assert_eq!(out["actor"]["user"], "alice");

        let args = EntryArgs {
            config,
            before: Some(before.clone()),
            after: Some(before),
            patch: None,
            actor: None,
        };
        assert_eq!(json(&cmd_entry(args, OutputFormat::Json).unwrap()), serde_json::Value::Null);
    }

    #[test]
    fn entry_rejects_bad_actor() {
        let (_dir, config, _, after) = fixtures();
        let args = EntryArgs {
            config,
            before: None,
            after: Some(after),
            patch: None,
            actor: Some("{not json".into()),
        };
        assert!(cmd_entry(args, OutputFormat::Text).is_err());
    }

    #[test]
    fn check_summarizes_config() {
        let (_dir, config, _, _) = fixtures();
        let out = json(&cmd_check(CheckArgs { config }, OutputFormat::Json).unwrap());
        assert_eq!(out["subject"], "orders");
        assert_eq!(out["id_path"], "_id");
        assert_eq!(out["fields"], 3);
    }

    #[test]
    fn check_reports_invalid_config() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "bad.toml", "subject = \"x\"\n[[fields]]\npath = \"\"\n");
        let err = cmd_check(CheckArgs { config }, OutputFormat::Text).unwrap_err();
        assert!(format!("{err:#}").contains("missing or empty path"));
    }
}
