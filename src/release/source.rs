use log::{info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::version::PackageVersion;
use crate::error::{Error, Result};
use crate::utils::{CopyFailure, copy_buffered};

/// 提供某个版本的发布包
pub trait PackageSource {
    /// 确保 `destination` 处存在 `version` 对应的压缩包
    fn ensure(&self, version: PackageVersion, destination: &Path) -> Result<()>;
}

/// 只使用工作目录中已有的压缩包
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

impl PackageSource for LocalSource {
    fn ensure(&self, _version: PackageVersion, destination: &Path) -> Result<()> {
        if destination.is_file() {
            Ok(())
        } else {
            Err(Error::MissingInput(destination.to_path_buf()))
        }
    }
}

/// 压缩包不存在时从 HTTP 地址下载
///
/// 地址模板中的 `{version}` 会被替换为三段式版本号。
#[derive(Debug, Clone)]
pub struct HttpSource {
    url_template: String,
}

impl HttpSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }

    pub fn url_for(&self, version: PackageVersion) -> String {
        self.url_template.replace("{version}", &version.to_string())
    }

    fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let download_error = |reason: String| Error::Download {
            url: url.to_string(),
            reason,
        };

        let response = ureq::get(url)
            .call()
            .map_err(|e| download_error(e.to_string()))?;

        let mut reader = response.into_body().into_reader();
        let bytes = save_download(&mut reader, url, destination)?;

        info!("已下载 {} ({} 字节)", destination.display(), bytes);
        Ok(())
    }
}

/// 先写入 `.part` 临时文件，完成后再改名，避免中断的下载被当成完整的包
fn save_download<R: Read>(reader: &mut R, url: &str, destination: &Path) -> Result<u64> {
    let partial = partial_path(destination);
    let file = File::create(&partial).map_err(Error::fs(&partial))?;
    let mut writer = BufWriter::new(file);

    let copied = copy_buffered(reader, &mut writer).and_then(|bytes| {
        writer.flush().map_err(CopyFailure::Write)?;
        Ok(bytes)
    });
    drop(writer);

    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(failure) => {
            discard_partial(&partial);
            return Err(match failure {
                CopyFailure::Read(e) => Error::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                },
                CopyFailure::Write(e) => Error::Filesystem {
                    path: partial,
                    source: e,
                },
            });
        }
    };

    if let Err(e) = fs::rename(&partial, destination) {
        discard_partial(&partial);
        return Err(Error::Filesystem {
            path: destination.to_path_buf(),
            source: e,
        });
    }
    Ok(bytes)
}

fn discard_partial(partial: &Path) {
    if let Err(e) = fs::remove_file(partial)
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!("无法删除未完成的下载 {}: {}", partial.display(), e);
    }
}

impl PackageSource for HttpSource {
    fn ensure(&self, version: PackageVersion, destination: &Path) -> Result<()> {
        if destination.is_file() {
            info!("压缩包 {} 已存在，跳过下载", destination.display());
            return Ok(());
        }

        let url = self.url_for(version);
        info!("正在下载 {}", url);
        self.download(&url, destination)
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
