use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 增量包生成过程中的错误
#[derive(Debug, Error)]
pub enum Error {
    /// 压缩包无法打开，或其中某个条目无法解码
    #[error("压缩包已损坏: {path:?}")]
    ArchiveCorrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// 解压或打包过程中的读写失败
    #[error("压缩包读写失败: {path:?}")]
    ArchiveIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 目录创建、删除或遍历失败
    #[error("文件系统操作失败: {path:?}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("输入不存在: {0:?}")]
    MissingInput(PathBuf),

    /// 增量目录已存在，且不是本次运行创建的
    #[error("工作目录已存在: {0:?}")]
    WorkingDirExists(PathBuf),

    /// 文件名不是有效的 UTF-8，无法写入压缩包
    #[error("文件名无法写入压缩包: {0:?}")]
    InvalidEntryName(PathBuf),

    #[error("无效的版本号: {0}")]
    InvalidVersion(String),

    #[error("下载失败 {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("配置错误: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn fs(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::Filesystem { path, source }
    }

    pub(crate) fn archive_io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::ArchiveIo { path, source }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>) -> impl FnOnce(zip::result::ZipError) -> Error {
        let path = path.into();
        move |source| Error::ArchiveCorrupt { path, source }
    }
}
