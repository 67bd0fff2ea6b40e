use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// 配置文件内容，所有字段都可以被命令行参数覆盖
///
/// ```toml
/// working_dir = "/srv/releases"
/// package_name = "UmbracoCms"
/// package_name_part = "UmbracoCms."
/// download_url = "https://example.com/UmbracoCms.{version}.zip"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub working_dir: Option<PathBuf>,
    pub package_name: Option<String>,
    pub package_name_part: Option<String>,
    pub download_url: Option<String>,
}

/// 合并并校验后的批量生成参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    pub working_dir: PathBuf,
    pub package_name: String,
    pub package_name_part: String,
    pub download_url: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("无法读取 {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("无法解析 {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用 `overrides` 中已设置的字段覆盖当前配置
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            working_dir: overrides.working_dir.or(self.working_dir),
            package_name: overrides.package_name.or(self.package_name),
            package_name_part: overrides.package_name_part.or(self.package_name_part),
            download_url: overrides.download_url.or(self.download_url),
        }
    }

    pub fn resolve(self) -> Result<ReleaseSettings> {
        let working_dir = self
            .working_dir
            .ok_or_else(|| Error::Config("缺少 working_dir".to_string()))?;
        let package_name = self
            .package_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::Config("缺少 package_name".to_string()))?;
        let package_name_part = self
            .package_name_part
            .filter(|part| !part.trim().is_empty())
            .unwrap_or_else(|| format!("{}.", package_name));

        Ok(ReleaseSettings {
            working_dir,
            package_name,
            package_name_part,
            download_url: self.download_url,
        })
    }
}
