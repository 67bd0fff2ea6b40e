use log::{debug, info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::files_equal;

/// 遍历过程中待处理的一对目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPair {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl DirectoryPair {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// 一次目录比较的统计结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompareSummary {
    /// 复制到增量目录中的文件（相对新版本根目录）
    pub copied: Vec<PathBuf>,
    pub unchanged: usize,
    pub directories: usize,
}

impl CompareSummary {
    pub fn summary(&self) -> String {
        format!(
            "复制: {} 个文件, 未变化: {} 个文件, 目录: {} 个",
            self.copied.len(),
            self.unchanged,
            self.directories
        )
    }
}

/// 目录树比较器
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeComparator;

impl TreeComparator {
    pub fn new() -> Self {
        Self
    }

    /// 比较 `new_root` 与 `old_root`，把新增或修改过的文件复制到 `delta_root`
    ///
    /// 使用显式栈做深度优先遍历，不依赖递归深度。增量目录会保留新版本中
    /// 所有目录的骨架，未变化的子树在这里会留下空目录，需要随后清理。
    /// 任何 I/O 错误都会中止整个比较。
    pub fn compare(
        &self,
        new_root: &Path,
        old_root: &Path,
        delta_root: &Path,
    ) -> Result<CompareSummary> {
        info!("正在比较 {} 与 {}", new_root.display(), old_root.display());

        let mut summary = CompareSummary::default();
        let mut stack = vec![DirectoryPair::new(new_root, delta_root)];

        while let Some(pair) = stack.pop() {
            fs::create_dir_all(&pair.target).map_err(Error::fs(&pair.target))?;
            fs::create_dir_all(&pair.source).map_err(Error::fs(&pair.source))?;
            summary.directories += 1;

            let mut subdirs = Vec::new();
            for entry in fs::read_dir(&pair.source).map_err(Error::fs(&pair.source))? {
                let entry = entry.map_err(Error::fs(&pair.source))?;
                let path = entry.path();
                let mut file_type = entry.file_type().map_err(Error::fs(&path))?;

                // 符号链接按其指向的目标处理，指向目录或已失效的链接跳过
                if file_type.is_symlink() {
                    match fs::metadata(&path) {
                        Ok(target) if target.is_file() => file_type = target.file_type(),
                        Ok(_) => {
                            warn!("跳过指向目录的符号链接: {}", path.display());
                            continue;
                        }
                        Err(e) => {
                            warn!("跳过无法解析的符号链接 {}: {}", path.display(), e);
                            continue;
                        }
                    }
                }

                if file_type.is_dir() {
                    subdirs.push(path);
                    continue;
                }

                let relative = path
                    .strip_prefix(new_root)
                    .map_err(|e| Error::Filesystem {
                        path: path.clone(),
                        source: io::Error::new(io::ErrorKind::InvalidInput, e),
                    })?
                    .to_path_buf();
                let old_path = old_root.join(&relative);

                if old_path.is_file() && files_equal(&old_path, &path).map_err(Error::fs(&path))? {
                    summary.unchanged += 1;
                    continue;
                }

                copy_file(&path, &pair.target.join(entry.file_name()))?;
                debug!("  + {}", relative.display());
                summary.copied.push(relative);
            }

            subdirs.sort();
            for dir in subdirs.into_iter().rev() {
                let target = match dir.file_name() {
                    Some(name) => pair.target.join(name),
                    None => continue,
                };
                stack.push(DirectoryPair::new(dir, target));
            }
        }

        info!("比较完成: {}", summary.summary());
        Ok(summary)
    }
}

/// 复制文件并保留修改时间，目标存在时覆盖
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest).map_err(Error::fs(dest))?;

    let modified = source
        .metadata()
        .and_then(|m| m.modified())
        .map_err(Error::fs(source))?;
    File::options()
        .write(true)
        .open(dest)
        .and_then(|f| f.set_modified(modified))
        .map_err(Error::fs(dest))?;

    Ok(())
}
