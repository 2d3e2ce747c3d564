// Pedantic lint configuration for the crate.
// Most of these are reasonable but too strict for this codebase:
// - cast_possible_truncation / cast_sign_loss / cast_possible_wrap: row ids and counts stay far below i64 limits
// - missing_errors_doc: Error handling is self-evident from Result types
// - missing_panics_doc: Panics are rare and documented inline
// - items_after_statements: Output structs are clearer near their usage
// - too_many_lines: Pipelines keep fan-out and aggregation together
// - similar_names: Variable naming is contextually clear
// - option_if_let_else: if-let is often clearer
// - needless_pass_by_value: Sometimes clearer semantically
// - match_same_arms: Combined arms can reduce readability
// - single_match_else: match is clearer than if-let for pattern matching
// - manual_let_else: if-let with early return is often clearer in context
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::items_after_statements,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::option_if_let_else,
    clippy::needless_pass_by_value,
    clippy::match_same_arms,
    clippy::single_match_else,
    clippy::manual_let_else
)]

pub mod cancel;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod manifest;
pub mod models;
pub mod operations;
pub mod store;
pub mod vfs;
