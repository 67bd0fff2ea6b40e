//! zip 压缩包的流式解压与打包

mod create;
mod extract;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

pub use create::{collect_entries, write_entries};

/// 打包时固定使用的 deflate 压缩等级（0-9，兼顾速度与压缩率）
pub const COMPRESSION_LEVEL: i64 = 3;

/// 压缩包中的一个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// 使用 `/` 分隔的相对路径，不含盘符或根目录
    pub relative_path: String,
    /// 打包时读取的源文件
    pub source_path: PathBuf,
    pub last_modified: SystemTime,
    pub size: u64,
    pub is_directory: bool,
}

/// 压缩包编解码器
///
/// 不持有任何状态，解压与打包都按条目顺序流式处理，单个条目的内存占用
/// 受固定缓冲区限制。
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveCodec;

impl ArchiveCodec {
    pub fn new() -> Self {
        Self
    }

    /// 将压缩包中的文件条目解压到 `output_dir`
    ///
    /// 目录条目会被忽略，所需的父目录根据文件路径自动创建。调用方应在
    /// 调用前自行判断输出目录是否已存在。
    pub fn extract(&self, archive_path: &Path, output_dir: &Path) -> Result<()> {
        extract::extract_archive(archive_path, output_dir)
    }

    /// 将 `source_dir` 下的所有文件打包为 `output_archive`
    ///
    /// 只写入文件条目，目录由文件路径隐式表示；空目录不会出现在压缩包中。
    pub fn create(&self, output_archive: &Path, source_dir: &Path) -> Result<Vec<ArchiveEntry>> {
        create::create_archive(output_archive, source_dir)
    }
}
