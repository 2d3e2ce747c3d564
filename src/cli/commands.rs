use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "transarc",
    version,
    about = "Archive hand-made mod manifest translations and put them back after updates",
    after_help = "Every command works on one mods root (--root, default: current directory) \
                  whose child directories each hold a mod with a manifest.json. \
                  The archive lives in <root>/.transarc/archive.db."
)]
pub struct Cli {
    /// Mods root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Archive every manifest that changed since the last sync.
    ///
    /// Only immediate child directories of the root are scanned (see
    /// `[scan] ingest_depth`). A snapshot is written only if something changed.
    Sync {
        /// Snapshot label (default from `[scan] default_label`)
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Push archived translations back onto the manifests on disk
    Restore,

    /// Roll every record back to a snapshot and discard later snapshots.
    ///
    /// The archived state is rewritten first, then the manifests on disk are
    /// patched. This cannot be undone.
    Rollback {
        /// Snapshot id to return to
        snapshot: i64,
    },

    /// List snapshots, oldest first
    Snapshots,

    /// List every archived capture of one record
    History {
        /// The mod's UniqueID
        unique_id: String,
    },

    /// Show one record, or its archived capture as of a snapshot
    Show {
        /// The mod's UniqueID
        unique_id: String,
        /// Snapshot id for a point-in-time view
        #[arg(long)]
        at: Option<i64>,
    },

    /// Field-level diff of one history entry, or of two snapshots
    Diff {
        /// History entry id (compared with the record's previous entry)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        entry: Option<i64>,
        /// Older snapshot id
        #[arg(long, requires = "to")]
        from: Option<i64>,
        /// Newer snapshot id
        #[arg(long, requires = "from")]
        to: Option<i64>,
    },

    /// Import translations from a legacy JSON backup
    ImportLegacy {
        /// Backup file (default: `[legacy] backup_file` in the root)
        file: Option<String>,
    },

    /// Write current translations as a legacy JSON backup
    ExportLegacy {
        /// Output file (default: `[legacy] backup_file` in the root)
        file: Option<String>,
    },

    /// Reset one record to the text captured on first sync and patch its manifest
    Reset {
        /// The mod's UniqueID
        unique_id: String,
    },

    /// List archived records
    Records,

    /// Verify archive integrity and report issues.
    ///
    /// Checks for:
    /// - `SQLite` database integrity
    /// - Orphan history entries
    /// - Records whose fingerprint no longer matches their archived text
    /// - Records whose manifest no longer exists under the root
    Verify,
}
