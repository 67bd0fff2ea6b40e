use chrono::{Local, TimeZone};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;
use zip::result::ZipError;
use zip::{DateTime, ZipArchive};

use crate::error::{Error, Result};
use crate::utils::{CopyFailure, copy_buffered};

pub(super) fn extract_archive(archive_path: &Path, output_dir: &Path) -> Result<()> {
    if !archive_path.is_file() {
        return Err(Error::MissingInput(archive_path.to_path_buf()));
    }

    let file = File::open(archive_path).map_err(Error::archive_io(archive_path))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(Error::corrupt(archive_path))?;

    fs::create_dir_all(output_dir).map_err(Error::fs(output_dir))?;

    let mut extracted = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(Error::corrupt(archive_path))?;

        // 目录条目不单独创建
        if !entry.is_file() {
            continue;
        }

        let relative_path = entry
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| Error::ArchiveCorrupt {
                path: archive_path.to_path_buf(),
                source: ZipError::InvalidArchive("条目路径越出解压目录".into()),
            })?;
        let dest = output_dir.join(&relative_path);
        let last_modified: Option<DateTime> = entry.last_modified().into();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(Error::fs(parent))?;
        }

        let output = File::create(&dest).map_err(Error::archive_io(&dest))?;
        let mut writer = BufWriter::new(output);
        copy_buffered(&mut entry, &mut writer).map_err(|failure| match failure {
            CopyFailure::Read(e) => Error::ArchiveCorrupt {
                path: archive_path.to_path_buf(),
                source: ZipError::Io(e),
            },
            CopyFailure::Write(e) => Error::ArchiveIo {
                path: dest.clone(),
                source: e,
            },
        })?;
        writer.flush().map_err(Error::archive_io(&dest))?;

        if let Some(modified) = last_modified.and_then(from_zip_time) {
            writer
                .get_ref()
                .set_modified(modified)
                .map_err(Error::archive_io(&dest))?;
        }

        debug!("  > {}", relative_path.display());
        extracted += 1;
    }

    info!(
        "已解压 {} 到 {} ({} 个文件)",
        archive_path.display(),
        output_dir.display(),
        extracted
    );
    Ok(())
}

/// 条目时间按本地时间解释，与打包时的转换相反
fn from_zip_time(time: DateTime) -> Option<SystemTime> {
    Local
        .with_ymd_and_hms(
            i32::from(time.year()),
            u32::from(time.month()),
            u32::from(time.day()),
            u32::from(time.hour()),
            u32::from(time.minute()),
            u32::from(time.second()),
        )
        .earliest()
        .map(SystemTime::from)
}
