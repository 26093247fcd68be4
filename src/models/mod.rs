pub mod verse;

pub use verse::{ParseResult, ParseScope, ParsedVerse};
