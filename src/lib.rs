// Pedantic lint configuration for the crate.
// Most of these are reasonable but too strict for this codebase:
// - cast_possible_truncation: tree-sitter child indices fit in u32
// - missing_errors_doc: Error handling is self-evident from Result types
// - missing_panics_doc: Panics are rare and documented inline
// - module_name_repetitions: verse::ParsedVerse, html::HtmlParser read naturally
// - too_many_lines: Line classification and tree walks need cohesive logic
// - option_if_let_else: if-let is often clearer
// - needless_pass_by_value: Sometimes clearer semantically
// - match_same_arms: Combined arms can reduce readability
// - manual_let_else: if-let with early return is often clearer in context
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::option_if_let_else,
    clippy::needless_pass_by_value,
    clippy::match_same_arms,
    clippy::manual_let_else
)]

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod models;
