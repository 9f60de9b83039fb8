use crate::package_manager::DEFAULT_EXECUTABLE;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 覆盖 opkg 路径的环境变量
pub const EXECUTABLE_ENV: &str = "LIAN_OPKG_BIN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// opkg 可执行文件路径
    pub executable: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config/lian-opkg/config.toml")
    }

    /// 读取配置文件（不存在则使用默认值），环境变量优先
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::default()
        };

        if let Ok(bin) = std::env::var(EXECUTABLE_ENV) {
            if !bin.trim().is_empty() {
                config.executable = PathBuf::from(bin);
            }
        }

        log::debug!("opkg executable: {}", config.executable.display());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
