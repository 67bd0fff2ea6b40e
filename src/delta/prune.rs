use log::{debug, warn};
use std::fs;
use std::path::Path;

/// 递归删除 `root` 下不包含任何文件的目录，返回删除的目录数
///
/// 先处理子目录再检查当前目录，`root` 本身始终保留。单个目录删除失败
/// （权限不足、已被删除等）只记录日志，不中断清理。
pub fn prune_empty_dirs(root: &Path) -> usize {
    let mut removed = 0;

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("无法读取目录 {}: {}", root.display(), e);
            return removed;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            removed += prune_dir(&path);
        }
    }

    removed
}

fn prune_dir(dir: &Path) -> usize {
    let removed = prune_empty_dirs(dir);

    let is_empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    };
    if !is_empty {
        return removed;
    }

    match fs::remove_dir(dir) {
        Ok(()) => {
            debug!("  - {}/", dir.display());
            removed + 1
        }
        Err(e) => {
            warn!("无法删除空目录 {}: {}", dir.display(), e);
            removed
        }
    }
}
