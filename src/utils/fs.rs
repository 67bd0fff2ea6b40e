use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// 流式复制与逐字节比较使用的固定缓冲区大小
pub const BUFFER_SIZE: usize = 8192;

/// 缓冲复制失败时区分是读端还是写端出错
#[derive(Debug)]
pub enum CopyFailure {
    Read(io::Error),
    Write(io::Error),
}

/// 通过固定大小的缓冲区把 `reader` 的内容写入 `writer`，返回复制的字节数
pub fn copy_buffered<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, CopyFailure>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyFailure::Read(e)),
        };
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(CopyFailure::Write)?;
        total += bytes_read as u64;
    }

    Ok(total)
}

/// 判断两个文件内容是否完全一致
///
/// 先比较长度，长度相同时再逐块比较全部字节，任意位置不同即视为已修改。
pub fn files_equal(left: &Path, right: &Path) -> io::Result<bool> {
    if left.metadata()?.len() != right.metadata()?.len() {
        return Ok(false);
    }

    let mut left_reader = BufReader::new(File::open(left)?);
    let mut right_reader = BufReader::new(File::open(right)?);
    let mut left_buf = [0u8; BUFFER_SIZE];
    let mut right_buf = [0u8; BUFFER_SIZE];

    loop {
        let left_len = read_full(&mut left_reader, &mut left_buf)?;
        let right_len = read_full(&mut right_reader, &mut right_buf)?;

        if left_buf[..left_len] != right_buf[..right_len] {
            return Ok(false);
        }
        if left_len == 0 {
            return Ok(true);
        }
    }
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// 压缩包解压后对应的同级目录
///
/// `UmbracoCms.7.12.2.zip` 解压到 `UmbracoCms.7.12.2/`；没有 `.zip` 扩展名的
/// 文件则追加 `.extracted` 后缀，避免与压缩包本身同名。
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let is_zip = archive
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

    if is_zip {
        archive.with_extension("")
    } else {
        let mut name = archive.as_os_str().to_owned();
        name.push(".extracted");
        PathBuf::from(name)
    }
}

/// 删除目录及其内容，目录不存在时视为成功
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
