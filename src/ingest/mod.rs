pub mod hasher;
pub mod scanner;

pub use scanner::{discover_manifests, ScanOutcome, ScannedManifest, Scanner};
