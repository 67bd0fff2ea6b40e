use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Write;

use extract_diff::cli::{Cli, Commands};
use extract_diff::config::{Config, ReleaseSettings};
use extract_diff::release::{HttpSource, LocalSource, PackageSource, ReleaseDiff};
use extract_diff::{ArchiveCodec, DeltaPipeline};

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}: {}",
                chrono::Utc::now().format("%d%m%Y %H:%M"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    message
}

fn run_release<S: PackageSource>(
    settings: ReleaseSettings,
    source: S,
    new_version: &str,
) -> Result<()> {
    let release = ReleaseDiff::new(
        settings.working_dir,
        settings.package_name,
        settings.package_name_part,
        source,
        DeltaPipeline::default(),
    );
    let version = release.resolve_version(new_version)?;
    let report = release.run(version)?;

    for delta in &report.deltas {
        println!("{}  {}", delta.archive_sha256, delta.output.display());
    }
    if !report.is_success() {
        for failure in &report.failures {
            eprintln!(
                "  ! {} ({}): {}",
                failure.old_version,
                failure.stage,
                error_chain(&failure.error)
            );
        }
        bail!("部分增量包生成失败: {}", report.summary());
    }

    Ok(())
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Release {
            new_version,
            working_dir,
            package_name,
            package_name_part,
            download_url,
            config,
        } => {
            let file_config = match &config {
                Some(path) => Config::load(path)?,
                None => Config::default(),
            };
            let settings = file_config
                .merge(Config {
                    working_dir,
                    package_name,
                    package_name_part,
                    download_url,
                })
                .resolve()?;

            if !settings.working_dir.is_dir() {
                bail!("工作目录不存在: {:?}", settings.working_dir);
            }

            match settings.download_url.clone() {
                Some(url) => run_release(settings, HttpSource::new(url), &new_version)?,
                None => run_release(settings, LocalSource, &new_version)?,
            }
        }
        Commands::Diff {
            old_archive,
            new_archive,
            output,
        } => {
            let report = DeltaPipeline::default()
                .run(&old_archive, &new_archive, &output)
                .with_context(|| format!("生成增量包失败: {}", output.display()))?;
            println!(
                "复制: {} 个文件, 未变化: {} 个文件",
                report.copied_files, report.unchanged_files
            );
            println!("{}  {}", report.archive_sha256, report.output.display());
        }
        Commands::Pack { source_dir, output } => {
            if !source_dir.is_dir() {
                bail!("源目录不存在: {:?}", source_dir);
            }
            let entries = ArchiveCodec::new().create(&output, &source_dir)?;
            println!("已打包 {} 个文件: {}", entries.len(), output.display());
        }
        Commands::Unpack { archive, output } => {
            if !archive.exists() {
                bail!("压缩包不存在: {:?}", archive);
            }
            if output.exists() {
                bail!("输出目录已存在: {:?}", output);
            }
            ArchiveCodec::new().extract(&archive, &output)?;
            println!("已解压到: {}", output.display());
        }
    }

    Ok(())
}
