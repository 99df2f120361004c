//! 文件扫描模块
//!
//! 递归扫描目录（或单个文件）并按扩展名白名单产出待处理文件。

use super::constants::formats;
use super::utils;
use crate::{AuditError, AuditResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 待处理文件（绝对路径，扫描后不再修改）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkItem {
    path: PathBuf,
}

impl WorkItem {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// 惰性文件扫描器
///
/// 一次性迭代器：遍历结束后不能重新开始。同一目录树的多次扫描产出相同的集合，
/// 同级条目按文件名排序。无法读取的目录项记录告警后跳过。
pub struct FileScan<F> {
    entries: walkdir::IntoIter,
    accept: F,
}

impl<F> Iterator for FileScan<F>
where
    F: FnMut(&Path) -> bool,
{
    type Item = WorkItem;

    fn next(&mut self) -> Option<WorkItem> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if !is_regular_file(&entry) {
                continue;
            }

            if (self.accept)(entry.path()) {
                return Some(WorkItem::new(entry.into_path()));
            }
        }
    }
}

/// 普通文件，或指向普通文件的符号链接（指向目录的链接不展开）
fn is_regular_file(entry: &walkdir::DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink() && fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file())
}

/// 按自定义条件扫描文件
///
/// - 根路径不存在：返回 `PathNotFound`
/// - 根路径是文件：最多产出它自己（满足条件时）
/// - 空目录：产出空序列
pub fn scan_files<F>(root: &Path, accept: F) -> AuditResult<FileScan<F>>
where
    F: FnMut(&Path) -> bool,
{
    if !root.exists() {
        return Err(AuditError::PathNotFound(root.to_path_buf()));
    }

    let root = std::path::absolute(root)?;
    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    Ok(FileScan { entries, accept })
}

/// 按扩展名白名单扫描文件（忽略大小写）
pub fn scan_with_extensions<'a>(
    root: &Path,
    extensions: &'a [&'a str],
) -> AuditResult<FileScan<impl FnMut(&Path) -> bool + use<'a>>> {
    scan_files(root, move |path| utils::has_extension_in(path, extensions))
}

/// 扫描支持的音频文件
pub fn scan_audio_files(root: &Path) -> AuditResult<FileScan<impl FnMut(&Path) -> bool + use<>>> {
    scan_with_extensions(root, formats::AUDIO_EXTENSIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_nonexistent_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let result = scan_audio_files(&missing);
        assert!(matches!(result, Err(AuditError::PathNotFound(p)) if p == missing));
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.FLAC");
        let notes = dir.path().join("notes.txt");
        fs::write(&song, b"x").unwrap();
        fs::write(&notes, b"x").unwrap();

        let found: Vec<_> = scan_audio_files(&song).unwrap().collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].path().is_absolute());
        assert!(found[0].path().ends_with("song.FLAC"));

        // 不匹配的单文件：空序列而不是错误
        assert_eq!(scan_audio_files(&notes).unwrap().count(), 0);
    }

    #[test]
    fn test_custom_predicate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.flac"), b"x").unwrap();
        fs::write(dir.path().join("b.flac"), b"x").unwrap();

        let found: Vec<_> = scan_files(dir.path(), |p| p.ends_with("b.flac"))
            .unwrap()
            .collect();
        assert_eq!(found.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_listed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let lib = dir.path().join("lib");
        fs::create_dir_all(store.join("album")).unwrap();
        fs::create_dir_all(&lib).unwrap();
        fs::write(store.join("track.flac"), b"x").unwrap();
        fs::write(store.join("album/inner.flac"), b"x").unwrap();

        symlink(store.join("track.flac"), lib.join("track.flac")).unwrap();
        // 指向目录的链接不展开，悬空链接跳过
        symlink(store.join("album"), lib.join("album")).unwrap();
        symlink(store.join("gone.flac"), lib.join("gone.flac")).unwrap();

        let found: Vec<_> = scan_audio_files(&lib).unwrap().collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].path().ends_with("lib/track.flac"));
    }
}
