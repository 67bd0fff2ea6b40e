use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::fs::{CopyFailure, copy_buffered};
use crate::error::{Error, Result};

/// 计算文件的 SHA256 校验和
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(Error::fs(path))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    copy_buffered(&mut reader, &mut hasher).map_err(|failure| match failure {
        CopyFailure::Read(e) | CopyFailure::Write(e) => Error::Filesystem {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    Ok(hex::encode(hasher.finalize()))
}
