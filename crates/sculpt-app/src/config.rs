//! 程序配置
//!
//! 可选的 JSON 文件，缺失的字段使用默认值。

use std::path::Path;

use anyhow::{Context, Result};
use sculpt_core::camera::PerspectiveCamera;
use sculpt_file::ArchiveFormat;
use sculpt_ui::ShapeExtruderConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub format: ArchiveFormat,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub archive: ArchiveConfig,
    pub extruder: ShapeExtruderConfig,
    pub camera: PerspectiveCamera,
}

impl AppConfig {
    /// 读取配置；没有给出路径时使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 命令行参数优先于配置文件
    pub fn format_or(&self, format: Option<&str>) -> ArchiveFormat {
        format.map(ArchiveFormat::from).unwrap_or(self.archive.format)
    }

    pub fn password_or<'a>(&'a self, password: Option<&'a str>) -> &'a str {
        password.unwrap_or(&self.archive.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("{}").unwrap();
        assert_eq!(config.archive.format, ArchiveFormat::Optimized);
        assert!(config.archive.password.is_empty());
        assert_eq!(config.extruder, ShapeExtruderConfig::default());
        assert_eq!(config.camera, PerspectiveCamera::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::parse(
            r#"{
                "archive": { "format": "compatible", "password": "secret" },
                "extruder": { "extrude": false },
                "camera": { "near": 0.5 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.archive.format, ArchiveFormat::Compatible);
        assert_eq!(config.password_or(None), "secret");
        assert_eq!(config.password_or(Some("other")), "other");
        assert!(!config.extruder.extrude);
        assert_eq!(config.extruder.edge_size, 0.005);
        assert_eq!(config.camera.near, 0.5);
        assert_eq!(config.camera.far, 100.0);
    }

    #[test]
    fn test_format_override() {
        let config = AppConfig::default();
        assert_eq!(config.format_or(None), ArchiveFormat::Optimized);
        assert_eq!(config.format_or(Some("filesystem")), ArchiveFormat::Filesystem);
        assert_eq!(config.format_or(Some("bogus")), ArchiveFormat::Invalid);
    }

    #[test]
    fn test_missing_file() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/sculpt.json"))).is_err());
    }
}
