pub mod outcome;
pub mod record;
pub mod snapshot;

pub use outcome::OperationOutcome;
pub use record::Record;
pub use snapshot::{HistoryEntry, PendingEntry, Snapshot};
