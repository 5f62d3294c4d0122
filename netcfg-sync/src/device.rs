//! Loading of device and target configurations for one device family.
//!
//! A target is generated as up to three files: `<dir>/<name>` with IPv4
//! rules, `<dir>/ipv6/<name>` with IPv6 rules and a manually maintained
//! `<dir>/<name>.raw`. Each of them may be missing.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use netcfg_diff_core::{
    merge_into, parse_config, reconcile_with, Configuration, DiffError, Grammar, GrammarError,
    MergeError, Model, ParseError, Reconciliation, Tuning,
};
use serde::Deserialize;
use tracing::debug;

/// Operations a device family offers to the tool.
pub trait Device {
    fn parse_config(&self, data: &[u8], file_name: &str) -> Result<Configuration, ParseError>;

    /// Combine `other` with `target`, e.g. IPv6 rules or a raw file.
    fn merge_into_target(
        &self,
        target: Configuration,
        other: Configuration,
    ) -> Result<Configuration, MergeError>;

    fn reconcile(
        &self,
        current: Configuration,
        target: Configuration,
    ) -> Result<Reconciliation, DiffError>;
}

/// Cisco ASA or IOS device.
#[derive(Debug, Clone)]
pub struct CiscoDevice {
    model: Model,
    grammar: Arc<Grammar>,
    tuning: Tuning,
}

impl CiscoDevice {
    pub fn new(model: Model, tuning: Tuning) -> Result<Self, GrammarError> {
        Ok(Self {
            model,
            grammar: model.grammar()?,
            tuning,
        })
    }
}

impl Device for CiscoDevice {
    fn parse_config(&self, data: &[u8], file_name: &str) -> Result<Configuration, ParseError> {
        parse_config(&self.grammar, data, file_name)
    }

    fn merge_into_target(
        &self,
        mut target: Configuration,
        other: Configuration,
    ) -> Result<Configuration, MergeError> {
        // Warnings are logged while merging.
        merge_into(&mut target, other)?;
        Ok(target)
    }

    fn reconcile(
        &self,
        current: Configuration,
        target: Configuration,
    ) -> Result<Reconciliation, DiffError> {
        reconcile_with(current, target, self.model, &self.tuning)
    }
}

#[derive(Debug, Deserialize)]
struct DeviceInfo {
    model: String,
}

/// Path of the IPv6 companion of a target file.
pub fn ipv6_path(path: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or(path.as_os_str());
    parent_dir(path).join("ipv6").join(name)
}

/// Path of the raw companion of a target file.
pub fn raw_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".raw");
    PathBuf::from(p)
}

fn info_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".info");
    PathBuf::from(p)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

/// Read model from the `.info` file of a target, the IPv4 one first.
pub fn detect_model(path: &Path) -> Result<Option<Model>> {
    for info in [info_path(path), info_path(&ipv6_path(path))] {
        let Some(data) = read_optional(&info)? else {
            continue;
        };
        let parsed: DeviceInfo = serde_json::from_slice(&data)
            .with_context(|| format!("While reading {}", info.display()))?;
        let model = parsed
            .model
            .parse::<Model>()
            .with_context(|| format!("While reading {}", info.display()))?;
        debug!("{} has model {model}", info.display());
        return Ok(Some(model));
    }
    Ok(None)
}

/// Pick device family: explicit choice, then `.info` files of `paths`,
/// then the configured default.
pub fn resolve_model(
    explicit: Option<Model>,
    paths: &[&Path],
    default: Option<Model>,
) -> Result<Model> {
    if let Some(m) = explicit {
        return Ok(m);
    }
    for path in paths {
        if let Some(m) = detect_model(path)? {
            return Ok(m);
        }
    }
    default.ok_or_else(|| {
        anyhow!(
            "Can't determine device model of {}, use --model",
            paths
                .first()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )
    })
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Can't read {}", path.display())),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_file(device: &dyn Device, path: &Path, data: &[u8]) -> Result<Configuration> {
    let name = display_name(path);
    device
        .parse_config(data, &name)
        .with_context(|| format!("While reading {name}"))
}

/// Parse configuration saved from a device.
pub fn load_device(device: &dyn Device, path: &Path) -> Result<Configuration> {
    let data = fs::read(path).with_context(|| format!("Can't read {}", path.display()))?;
    parse_file(device, path, &data)
}

/// Parse one target file, missing files give an empty configuration.
fn load_part(device: &dyn Device, path: &Path) -> Result<Configuration> {
    let data = read_optional(path)?.unwrap_or_else(|| {
        debug!("{} not found, using empty config", path.display());
        Vec::new()
    });
    parse_file(device, path, &data)
}

/// Parse target file of a device together with its IPv6 and raw companions.
pub fn load_target(device: &dyn Device, path: &Path) -> Result<Configuration> {
    let v4 = load_part(device, path)?;
    let v6 = load_part(device, &ipv6_path(path))?;
    let raw_file = raw_path(path);
    let raw = load_part(device, &raw_file)?;
    let conf = device
        .merge_into_target(v4, v6)
        .with_context(|| format!("While merging IPv6 into {}", display_name(path)))?;
    device
        .merge_into_target(conf, raw)
        .with_context(|| format!("While reading {}", display_name(&raw_file)))
}
