use log::{error, info};
use std::path::{Path, PathBuf};

use super::source::PackageSource;
use super::version::PackageVersion;
use crate::delta::{DeltaPipeline, DeltaReport, PipelineError, Stage};
use crate::error::{Error, Result};

/// 某个旧版本的增量包生成失败
#[derive(Debug)]
pub struct PairFailure {
    pub old_version: PackageVersion,
    pub stage: Stage,
    pub error: Error,
}

/// 一次多版本增量生成的汇总
#[derive(Debug, Default)]
pub struct BatchReport {
    pub deltas: Vec<DeltaReport>,
    pub failures: Vec<PairFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "成功: {} 个增量包, 失败: {} 个",
            self.deltas.len(),
            self.failures.len()
        )
    }
}

/// 为新版本生成与同一 minor 系列中每个旧补丁版本之间的增量包
///
/// 某个旧版本失败时记录错误并继续处理剩余版本。
pub struct ReleaseDiff<S> {
    working_dir: PathBuf,
    package_name: String,
    package_name_part: String,
    source: S,
    pipeline: DeltaPipeline,
}

impl<S: PackageSource> ReleaseDiff<S> {
    pub fn new(
        working_dir: impl Into<PathBuf>,
        package_name: impl Into<String>,
        package_name_part: impl Into<String>,
        source: S,
        pipeline: DeltaPipeline,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            package_name: package_name.into(),
            package_name_part: package_name_part.into(),
            source,
            pipeline,
        }
    }

    /// 工作目录中某个版本的压缩包路径，例如 `UmbracoCms.7.12.2.zip`
    pub fn package_path(&self, version: PackageVersion) -> PathBuf {
        self.working_dir
            .join(format!("{}{}.zip", self.package_name_part, version))
    }

    /// 增量包输出路径，例如 `UmbracoCms.Diff.7.12.1-7.12.2.zip`
    pub fn delta_path(&self, old: PackageVersion, new: PackageVersion) -> PathBuf {
        self.working_dir
            .join(format!("{}.Diff.{}-{}.zip", self.package_name, old, new))
    }

    /// 解析命令行给出的新版本，既可以是版本号也可以是包文件名
    pub fn resolve_version(&self, value: &str) -> Result<PackageVersion> {
        value
            .parse()
            .or_else(|_| PackageVersion::from_package_name(value, &self.package_name_part))
    }

    pub fn run(&self, new_version: PackageVersion) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        if new_version.is_first_patch() {
            info!("{} 是该 minor 系列的首个版本，只在补丁版本之间生成增量包", new_version);
            return Ok(report);
        }

        let new_package = self.package_path(new_version);
        self.source.ensure(new_version, &new_package)?;

        for old_version in new_version.previous_patches() {
            info!("正在生成 {} 与 {} 之间的增量包", new_version, old_version);

            match self.run_pair(old_version, new_version, &new_package) {
                Ok(delta) => report.deltas.push(delta),
                Err(failure) => {
                    error!(
                        "{} -> {} 失败 ({}): {}",
                        old_version, new_version, failure.stage, failure.error
                    );
                    report.failures.push(failure);
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    fn run_pair(
        &self,
        old_version: PackageVersion,
        new_version: PackageVersion,
        new_package: &Path,
    ) -> std::result::Result<DeltaReport, PairFailure> {
        let old_package = self.package_path(old_version);
        self.source
            .ensure(old_version, &old_package)
            .map_err(|error| PairFailure {
                old_version,
                stage: Stage::Extracting,
                error,
            })?;

        let output = self.delta_path(old_version, new_version);
        self.pipeline
            .run(&old_package, new_package, &output)
            .map_err(|PipelineError { stage, source }| PairFailure {
                old_version,
                stage,
                error: source,
            })
    }
}
