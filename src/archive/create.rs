use chrono::{Datelike, Local, Timelike};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path};
use std::time::SystemTime;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::{ArchiveEntry, COMPRESSION_LEVEL};
use crate::error::{Error, Result};
use crate::utils::{CopyFailure, copy_buffered};

pub(super) fn create_archive(output: &Path, source_dir: &Path) -> Result<Vec<ArchiveEntry>> {
    let entries = collect_entries(source_dir)?;
    write_entries(output, &entries)?;

    info!(
        "目录 {} 已打包为 {} ({} 个文件)",
        source_dir.display(),
        output.display(),
        entries.len()
    );
    Ok(entries)
}

/// 按顺序把 `entries` 写入新建的压缩包 `output`
///
/// 写入途中失败时删除已创建的不完整压缩包。
pub fn write_entries(output: &Path, entries: &[ArchiveEntry]) -> Result<()> {
    let file = File::create(output).map_err(Error::archive_io(output))?;
    let result = write_zip(file, output, entries);

    if result.is_err()
        && let Err(e) = fs::remove_file(output)
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!("无法删除不完整的压缩包 {}: {}", output.display(), e);
    }

    result
}

fn write_zip(file: File, output: &Path, entries: &[ArchiveEntry]) -> Result<()> {
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for entry in entries {
        let path = &entry.source_path;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL))
            .last_modified_time(to_zip_time(entry.last_modified))
            .large_file(entry.size > u64::from(u32::MAX));

        zip.start_file(entry.relative_path.as_str(), options)
            .map_err(Error::corrupt(output))?;

        let mut reader = BufReader::new(File::open(path).map_err(Error::archive_io(path))?);
        copy_buffered(&mut reader, &mut zip).map_err(|failure| match failure {
            CopyFailure::Read(e) => Error::ArchiveIo {
                path: path.clone(),
                source: e,
            },
            CopyFailure::Write(e) => Error::ArchiveIo {
                path: output.to_path_buf(),
                source: e,
            },
        })?;

        debug!("  + {}", entry.relative_path);
    }

    let mut writer = zip.finish().map_err(Error::corrupt(output))?;
    writer.flush().map_err(Error::archive_io(output))?;
    Ok(())
}

/// 列出 `source_dir` 下将被打包的全部文件条目
///
/// 每个目录内先列文件再进入子目录，同级按文件名字典序排列。
pub fn collect_entries(source_dir: &Path) -> Result<Vec<ArchiveEntry>> {
    if !source_dir.is_dir() {
        return Err(Error::MissingInput(source_dir.to_path_buf()));
    }

    let walker = WalkDir::new(source_dir).min_depth(1).sort_by(|a, b| {
        a.file_type()
            .is_dir()
            .cmp(&b.file_type().is_dir())
            .then_with(|| a.file_name().cmp(b.file_name()))
    });

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| Error::ArchiveIo {
            path: e.path().unwrap_or(source_dir).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry.metadata().map_err(|e| Error::ArchiveIo {
            path: entry.path().to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::ArchiveIo {
                path: entry.path().to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, e),
            })?;

        let relative_path = entry_name(relative)
            .ok_or_else(|| Error::InvalidEntryName(entry.path().to_path_buf()))?;

        entries.push(ArchiveEntry {
            relative_path,
            source_path: entry.path().to_path_buf(),
            last_modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
            is_directory: false,
        });
    }

    Ok(entries)
}

/// 统一使用 `/` 作为分隔符，并去掉盘符与根目录；文件名不是 UTF-8 时返回 `None`
fn entry_name(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// zip 时间戳只有 2 秒精度，且无法表示 1980 年以前的时间
fn to_zip_time(time: SystemTime) -> DateTime {
    let local: chrono::DateTime<Local> = time.into();
    let Ok(year) = u16::try_from(local.year()) else {
        return DateTime::default();
    };

    DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}
