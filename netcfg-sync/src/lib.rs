//! Command line front end of `netcfg-diff-core`.
//!
//! A target configuration is generated as a set of files per device; see
//! [`device::load_target`]. Comparing it with the configuration saved from
//! the device gives the commands that bring the device in line with its
//! target.

pub mod device;
pub mod inspect;
pub mod report;
pub mod settings;
