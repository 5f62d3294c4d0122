//! Grammar driven parsing, merging and reconciliation of line oriented
//! device configurations.
//!
//! A [`Grammar`] describes the commands of one device family. Configurations
//! parsed with it are merged into one target with [`merge_into`] and compared
//! with the configuration of a device by [`reconcile`], which returns the
//! device commands that transform one into the other.

pub mod config;
pub mod crypto;
pub mod dialect;
pub mod diff;
pub mod format;
pub mod grammar;
pub mod merge;
mod names;
mod normalize;
pub mod parser;

pub use config::{CmdId, Command, Configuration, Reference};
pub use dialect::{Model, UnknownModel};
pub use diff::{reconcile, reconcile_with, DiffError, Reconciliation, Tuning};
pub use format::{format_json, format_summary, format_text};
pub use grammar::{CommandType, Grammar, GrammarError};
pub use merge::{merge_into, MergeError};
pub use parser::{parse, parse_config, ParseError};

/// Any error of this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Diff(#[from] DiffError),
}
