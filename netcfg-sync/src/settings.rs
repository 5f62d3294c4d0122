use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use netcfg_diff_core::{Model, Tuning};
use serde::Deserialize;

const DEFAULT_SETTINGS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/settings/default.toml"
));

/// Settings of the tool, read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Device family used if no other source names one.
    pub default_model: Option<Model>,
    pub tuning: Tuning,
}

impl Settings {
    /// Load settings from `path` or use the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::from_toml(DEFAULT_SETTINGS).context("invalid built-in settings");
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("failed to parse settings {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use netcfg_diff_core::{Model, Tuning};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn built_in_settings_use_default_tuning() {
        let s = Settings::load(None).expect("defaults");
        assert_eq!(s.default_model, None);
        assert_eq!(s.tuning, Tuning::default());
    }

    #[test]
    fn partial_tuning_keeps_other_defaults() {
        let s = Settings::from_toml("default_model = \"IOS\"\n[tuning]\nacl_insert_limit = 50\n")
            .expect("parse");
        assert_eq!(s.default_model, Some(Model::Ios));
        assert_eq!(s.tuning.acl_insert_limit, 50);
        assert_eq!(
            s.tuning.object_group_edit_ratio,
            Tuning::default().object_group_edit_ratio
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(Settings::from_toml("modle = \"ASA\"\n").is_err());
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let dir = tempdir().expect("tempdir");
        let err = Settings::load(Some(&dir.path().join("none.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read settings"));
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("s.toml");
        fs::write(&path, "[tuning]\nobject_group_edit_ratio = 0.5\n").expect("write");
        let s = Settings::load(Some(&path)).expect("load");
        assert_eq!(s.tuning.object_group_edit_ratio, 0.5);
    }
}
