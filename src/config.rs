use anyhow::{Context, Result};
use directories::ProjectDirs;
use irisgate_vision::Preprocessor;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::identity::IdentityCase;
use crate::service::Reenrollment;

/// Similarity a capture must exceed to match its template.
pub const DEFAULT_THRESHOLD: f32 = 0.85;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "irisgate")
}

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("IRISGATE_CONFIG_PATH") {
    Some(path) => PathBuf::from(path),
    None => project_dirs()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/usr/local/etc/irisgate/config.toml")),
});

pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| match option_env!("IRISGATE_DATA_DIR") {
    Some(path) => PathBuf::from(path),
    None => project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/usr/local/etc/irisgate")),
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub threshold: f32,
    pub reenrollment: Reenrollment,
    pub identity_case: IdentityCase,
    pub model_path: PathBuf,
    pub store_dir: PathBuf,
    pub preprocess: PreprocessConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            reenrollment: Reenrollment::default(),
            identity_case: IdentityCase::default(),
            model_path: DATA_DIR.join("iris_embedding_model.onnx"),
            store_dir: DATA_DIR.join("templates"),
            preprocess: PreprocessConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub size: u32,
    pub clip_limit: f32,
    pub tile_grid: u32,
    pub mask_margin: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        let p = Preprocessor::default();
        Self {
            size: p.size,
            clip_limit: p.clip_limit,
            tile_grid: p.tile_grid,
            mask_margin: p.mask_margin,
        }
    }
}

impl From<&PreprocessConfig> for Preprocessor {
    fn from(cfg: &PreprocessConfig) -> Self {
        Self {
            size: cfg.size,
            clip_limit: cfg.clip_limit,
            tile_grid: cfg.tile_grid,
            mask_margin: cfg.mask_margin,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            anyhow::bail!("threshold must be a finite number, got {}", self.threshold);
        }
        if self.preprocess.size == 0 {
            anyhow::bail!("preprocess.size must be non-zero");
        }
        if self.preprocess.tile_grid == 0 || self.preprocess.tile_grid > self.preprocess.size {
            anyhow::bail!(
                "preprocess.tile_grid must be between 1 and {}, got {}",
                self.preprocess.size,
                self.preprocess.tile_grid
            );
        }
        if !self.preprocess.clip_limit.is_finite() {
            anyhow::bail!("preprocess.clip_limit must be a finite number");
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validating config {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.threshold, 0.85);
        assert_eq!(cfg.reenrollment, Reenrollment::Overwrite);
        assert_eq!(cfg.identity_case, IdentityCase::Sensitive);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let cfg = Config {
            threshold: 0.9,
            reenrollment: Reenrollment::Reject,
            identity_case: IdentityCase::Insensitive,
            ..Config::default()
        };
        save_config(&cfg, Some(&path)).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "threshold = 0.7\nidentity_case = \"insensitive\"\n\n[preprocess]\nsize = 112\n",
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.threshold, 0.7);
        assert_eq!(cfg.identity_case, IdentityCase::Insensitive);
        assert_eq!(cfg.reenrollment, Reenrollment::Overwrite);
        assert_eq!(cfg.preprocess.size, 112);
        assert_eq!(cfg.preprocess.tile_grid, 8);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "reenrollment = \"merge\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());

        std::fs::write(&path, "[preprocess]\ntile_grid = 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());

        let cfg = Config {
            threshold: f32::NAN,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_preprocessor_from_config() {
        let cfg = PreprocessConfig {
            size: 128,
            ..PreprocessConfig::default()
        };
        let pre = Preprocessor::from(&cfg);
        assert_eq!(pre.size, 128);
        assert_eq!(pre.clip_limit, 2.0);
    }
}
