use log::{error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::compare::TreeComparator;
use super::prune::prune_empty_dirs;
use crate::archive::ArchiveCodec;
use crate::error::Error;
use crate::utils::{compute_file_hash, extraction_dir, remove_dir_if_exists};

/// 单次增量生成所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Comparing,
    Pruning,
    Archiving,
    CleaningUp,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extracting => "解压",
            Stage::Comparing => "比较",
            Stage::Pruning => "清理空目录",
            Stage::Archiving => "打包",
            Stage::CleaningUp => "清理工作目录",
            Stage::Done => "完成",
            Stage::Failed => "失败",
        };
        f.write_str(name)
    }
}

/// 增量生成在某个阶段失败
#[derive(Debug, Error)]
#[error("{stage}阶段失败")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

/// 一次增量生成的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaReport {
    pub output: PathBuf,
    pub copied_files: usize,
    pub unchanged_files: usize,
    pub archive_sha256: String,
}

/// 一次运行使用的工作目录，全部位于输入与输出压缩包旁边
#[derive(Debug)]
struct WorkingDirs {
    old: PathBuf,
    new: PathBuf,
    delta: PathBuf,
    /// 本次运行新建的目录，清理时只删除这些
    created: Vec<PathBuf>,
}

/// 解压 → 比较 → 清理空目录 → 打包 → 清理工作目录
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaPipeline {
    codec: ArchiveCodec,
    comparator: TreeComparator,
}

impl DeltaPipeline {
    pub fn new(codec: ArchiveCodec, comparator: TreeComparator) -> Self {
        Self { codec, comparator }
    }

    /// 根据新旧两个版本的压缩包生成增量压缩包 `output`
    ///
    /// 无论成功与否，本次运行新建的解压目录和增量目录都会在返回前删除；
    /// 运行前已存在的解压目录会被复用并保留。增量目录已存在时直接失败，
    /// 不会覆盖其中的内容。
    pub fn run(
        &self,
        old_archive: &Path,
        new_archive: &Path,
        output: &Path,
    ) -> Result<DeltaReport, PipelineError> {
        let mut dirs = WorkingDirs {
            old: extraction_dir(old_archive),
            new: extraction_dir(new_archive),
            delta: extraction_dir(output),
            created: Vec::new(),
        };

        info!(
            "正在生成增量包: {} -> {}",
            old_archive.display(),
            new_archive.display()
        );
        let result = self.run_stages(old_archive, new_archive, output, &mut dirs);

        info!("阶段: {}", Stage::CleaningUp);
        clean_up(&dirs);

        match result {
            Ok(report) => {
                info!("阶段: {}", Stage::Done);
                info!(
                    "增量包已生成: {} (sha256 {})",
                    report.output.display(),
                    report.archive_sha256
                );
                Ok(report)
            }
            Err(err) => {
                error!("阶段: {} ({}): {}", Stage::Failed, err.stage, err.source);
                Err(err)
            }
        }
    }

    fn run_stages(
        &self,
        old_archive: &Path,
        new_archive: &Path,
        output: &Path,
        dirs: &mut WorkingDirs,
    ) -> Result<DeltaReport, PipelineError> {
        info!("阶段: {}", Stage::Extracting);
        self.ensure_extracted(old_archive, &dirs.old, &mut dirs.created)
            .map_err(at(Stage::Extracting))?;
        self.ensure_extracted(new_archive, &dirs.new, &mut dirs.created)
            .map_err(at(Stage::Extracting))?;

        info!("阶段: {}", Stage::Comparing);
        if dirs.delta.exists() {
            return Err(PipelineError {
                stage: Stage::Comparing,
                source: Error::WorkingDirExists(dirs.delta.clone()),
            });
        }
        dirs.created.push(dirs.delta.clone());
        let summary = self
            .comparator
            .compare(&dirs.new, &dirs.old, &dirs.delta)
            .map_err(at(Stage::Comparing))?;

        info!("阶段: {}", Stage::Pruning);
        let pruned = prune_empty_dirs(&dirs.delta);
        info!("已删除 {} 个空目录", pruned);

        info!("阶段: {}", Stage::Archiving);
        self.codec
            .create(output, &dirs.delta)
            .map_err(at(Stage::Archiving))?;
        let archive_sha256 = compute_file_hash(output).map_err(at(Stage::Archiving))?;

        Ok(DeltaReport {
            output: output.to_path_buf(),
            copied_files: summary.copied.len(),
            unchanged_files: summary.unchanged,
            archive_sha256,
        })
    }

    fn ensure_extracted(
        &self,
        archive: &Path,
        dir: &Path,
        created: &mut Vec<PathBuf>,
    ) -> Result<(), Error> {
        if !archive.is_file() {
            return Err(Error::MissingInput(archive.to_path_buf()));
        }

        // 不检查已有目录是否与压缩包一致
        if dir.exists() {
            warn!("解压目录 {} 已存在，跳过解压", dir.display());
        } else {
            // 先登记，解压中途失败时也会被清理
            created.push(dir.to_path_buf());
            self.codec.extract(archive, dir)?;
        }

        if !dir.is_dir() {
            return Err(Error::MissingInput(dir.to_path_buf()));
        }
        Ok(())
    }
}

fn at(stage: Stage) -> impl FnOnce(Error) -> PipelineError {
    move |source| PipelineError { stage, source }
}

fn clean_up(dirs: &WorkingDirs) {
    for dir in &dirs.created {
        if let Err(e) = remove_dir_if_exists(dir) {
            warn!("无法删除工作目录 {}: {}", dir.display(), e);
        }
    }
}
