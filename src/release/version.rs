use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// `major.minor.patch` 形式的发布版本号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PackageVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// 从包文件名中解析版本号，例如 `UmbracoCms.7.12.2.zip` 去掉 `UmbracoCms.` 前缀
    pub fn from_package_name(name: &str, package_name_part: &str) -> Result<Self> {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        let stem = file_name.strip_suffix(".zip").unwrap_or(file_name);
        let version = stem
            .strip_prefix(package_name_part)
            .ok_or_else(|| Error::InvalidVersion(name.to_string()))?;
        version.parse()
    }

    /// 同一 minor 系列中比当前版本更早的所有补丁版本，按从新到旧排列
    ///
    /// `7.12.3` 得到 `7.12.2, 7.12.1, 7.12.0`；`x.y.0` 得到空列表。
    pub fn previous_patches(&self) -> Vec<PackageVersion> {
        (0..self.patch)
            .rev()
            .map(|patch| PackageVersion::new(self.major, self.minor, patch))
            .collect()
    }

    /// 是否为该 minor 系列的首个版本
    pub fn is_first_patch(&self) -> bool {
        self.patch == 0
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    /// 接受两到四段数字；缺省的补丁号为 0，第四段被忽略
    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .trim()
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidVersion(s.to_string()))?;

        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor, 0)),
            [major, minor, patch] | [major, minor, patch, _] => {
                Ok(Self::new(*major, *minor, *patch))
            }
            _ => Err(Error::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
