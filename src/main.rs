// Inherit lint configuration from lib.rs for consistency
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::unnecessary_wraps
)]

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use transarc::cancel::CancelToken;
use transarc::cli::commands::{Cli, Command};
use transarc::cli::output;
use transarc::config::Config;
use transarc::db::Database;
use transarc::models::OperationOutcome;
use transarc::operations::{self, RestoreScope};
use transarc::store::RecordStore;
use transarc::vfs::DiskFs;

fn main() {
    let cli = Cli::parse();
    let config = Config::new(&cli.root);
    init_tracing(&config.settings.logging.filter);

    if let Err(e) = run(cli.command, &config) {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over config.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Command, config: &Config) -> CmdResult {
    match command {
        Command::Sync { label } => cmd_sync(config, label.as_deref()),
        Command::Restore => cmd_restore(config),
        Command::Rollback { snapshot } => cmd_rollback(config, snapshot),
        Command::Snapshots => cmd_snapshots(config),
        Command::History { unique_id } => cmd_history(config, &unique_id),
        Command::Show { unique_id, at } => cmd_show(config, &unique_id, at),
        Command::Diff { entry, from, to } => cmd_diff(config, entry, from, to),
        Command::ImportLegacy { file } => cmd_import_legacy(config, file),
        Command::ExportLegacy { file } => cmd_export_legacy(config, file),
        Command::Reset { unique_id } => cmd_reset(config, &unique_id),
        Command::Records => cmd_records(config),
        Command::Verify => cmd_verify(config),
    }
}

type CmdResult = Result<(), Box<dyn std::fmt::Display>>;

fn map_err(e: impl std::fmt::Display + 'static) -> Box<dyn std::fmt::Display> {
    Box::new(e.to_string())
}

fn get_db(config: &Config) -> Result<Database, Box<dyn std::fmt::Display>> {
    operations::open_archive(config).map_err(map_err)
}

/// Print the outcome; a failed outcome also becomes the command's error.
fn finish(outcome: &OperationOutcome) -> CmdResult {
    println!("{}", output::format_json(outcome));
    if outcome.success {
        Ok(())
    } else {
        Err(map_err(outcome.message.clone()))
    }
}

fn legacy_path(config: &Config, file: Option<String>) -> PathBuf {
    file.map_or_else(|| config.legacy_backup_path(), PathBuf::from)
}

fn cmd_sync(config: &Config, label: Option<&str>) -> CmdResult {
    let db = get_db(config)?;
    let outcome = operations::sync(
        &db,
        &DiskFs,
        &config.mods_root,
        &config.settings.scan,
        label,
        &CancelToken::new(),
    );
    finish(&outcome)
}

fn cmd_restore(config: &Config) -> CmdResult {
    let db = get_db(config)?;
    let target = operations::restore_target(config);
    finish(&operations::restore(&db, &DiskFs, &target, RestoreScope::All))
}

fn cmd_rollback(config: &Config, snapshot: i64) -> CmdResult {
    let db = get_db(config)?;
    let target = operations::restore_target(config);
    finish(&operations::rollback(&db, &DiskFs, &target, snapshot))
}

fn cmd_snapshots(config: &Config) -> CmdResult {
    let db = get_db(config)?;
    let snapshots = operations::list_snapshots(&db).map_err(map_err)?;
    println!("{}", output::format_json(&snapshots));
    Ok(())
}

fn cmd_history(config: &Config, unique_id: &str) -> CmdResult {
    let db = get_db(config)?;
    let entries = operations::record_history(&db, unique_id).map_err(map_err)?;
    println!("{}", output::format_json(&entries));
    Ok(())
}

fn cmd_show(config: &Config, unique_id: &str, at: Option<i64>) -> CmdResult {
    let db = get_db(config)?;
    if let Some(snapshot) = at {
        let entry = operations::record_as_of(&db, unique_id, snapshot)
            .map_err(map_err)?
            .ok_or_else(|| {
                map_err(format!(
                    "{unique_id} has no archived capture at or before snapshot #{snapshot}"
                ))
            })?;
        println!("{}", output::format_json(&entry));
    } else {
        let record = db
            .record(unique_id)
            .map_err(map_err)?
            .ok_or_else(|| map_err(format!("record not found: {unique_id}")))?;
        println!("{}", output::format_json(&record));
    }
    Ok(())
}

fn cmd_diff(config: &Config, entry: Option<i64>, from: Option<i64>, to: Option<i64>) -> CmdResult {
    let db = get_db(config)?;
    match (entry, from, to) {
        (Some(id), _, _) => {
            let diff = operations::diff_entry(&db, id).map_err(map_err)?;
            println!("{}", output::format_json(&diff));
        }
        (None, Some(from), Some(to)) => {
            let diffs = operations::diff_snapshots(&db, from, to).map_err(map_err)?;
            println!("{}", output::format_json(&diffs));
        }
        _ => return Err(map_err("pass --entry <id> or --from <snapshot> --to <snapshot>")),
    }
    Ok(())
}

fn cmd_import_legacy(config: &Config, file: Option<String>) -> CmdResult {
    let db = get_db(config)?;
    let path = legacy_path(config, file);
    finish(&operations::import_legacy(&db, &DiskFs, &path))
}

fn cmd_export_legacy(config: &Config, file: Option<String>) -> CmdResult {
    let db = get_db(config)?;
    let path = legacy_path(config, file);
    finish(&operations::export_legacy(
        &db,
        &DiskFs,
        &path,
        &config.settings.legacy,
    ))
}

fn cmd_reset(config: &Config, unique_id: &str) -> CmdResult {
    let db = get_db(config)?;
    let target = operations::restore_target(config);
    finish(&operations::reset(&db, &DiskFs, &target, unique_id))
}

fn cmd_records(config: &Config) -> CmdResult {
    let db = get_db(config)?;
    let records = db.all_records().map_err(map_err)?;
    println!("{}", output::format_json(&records));
    Ok(())
}

fn cmd_verify(config: &Config) -> CmdResult {
    if !config.archive_exists() {
        return Err(map_err("Archive not found. Run 'transarc sync' first."));
    }

    let db = Database::open(&config.db_path).map_err(map_err)?;
    let report = operations::verify_archive(&db, &DiskFs, &config.mods_root).map_err(map_err)?;
    println!("{}", output::format_json(&report));
    Ok(())
}
