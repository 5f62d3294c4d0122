//! Reconciliation of a device configuration with its target.

mod acl;
mod edit;
pub mod engine;
mod interfaces;
pub mod result;
mod route;
mod state;

pub use engine::{reconcile, reconcile_with, DiffError};
pub use result::{Reconciliation, Tuning};
