//! Generates Up/Down migration scripts by comparing two SQL schema files.
//!
//! The pipeline is [`parser::parse`] for each input, [`diff::diff`] between
//! the two models, a dialect [`dialect::Renderer`] for each direction and
//! finally [`migration::assemble`]. [`migration::generate`] runs all of it.

pub mod config;
pub mod dialect;
pub mod diff;
pub mod migration;
pub mod parser;
pub mod schema;

use thiserror::Error;

pub use dialect::{Dialect, UnsupportedDialectError};
pub use diff::ChangeSet;
pub use migration::{generate, Migration};
pub use parser::ParseError;

pub const SQLDELTA_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    UnsupportedDialect(#[from] UnsupportedDialectError),
    #[error("Could not parse {input} schema: {source}")]
    Parse {
        input: &'static str,
        source: ParseError,
    },
}
