//! 封面图片显示/隐藏模块
//!
//! 通过添加或移除文件名前缀的点来隐藏/显示封面图片。
//! 目标文件名已存在时跳过改名，只记录为单文件失败。

use super::constants::cover_art::{COVER_ART_NAMES, HIDDEN_MARKER};
use super::scanner::{self, FileScan, WorkItem};
use super::utils;
use crate::{AuditError, AuditResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 改名方向（二选一）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverArtDirection {
    /// 添加点前缀
    Hide,
    /// 移除点前缀
    Show,
}

impl CoverArtDirection {
    /// 文件名是否为该方向需要处理的形式（可见形式用于Hide，隐藏形式用于Show）
    pub fn is_source_name(self, file_name: &str) -> bool {
        match self {
            Self::Hide => is_visible_cover_name(file_name),
            Self::Show => file_name
                .strip_prefix(HIDDEN_MARKER)
                .is_some_and(is_visible_cover_name),
        }
    }

    /// 计算改名后的文件名
    pub fn target_name(self, file_name: &str) -> Option<String> {
        if !self.is_source_name(file_name) {
            return None;
        }
        match self {
            Self::Hide => Some(format!("{HIDDEN_MARKER}{file_name}")),
            Self::Show => file_name.strip_prefix(HIDDEN_MARKER).map(str::to_string),
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::Show => "show",
        }
    }
}

/// 可见形式的封面文件名（忽略大小写）
pub fn is_visible_cover_name(file_name: &str) -> bool {
    COVER_ART_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(file_name))
}

/// 单个文件的改名结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    /// 已经是目标形式（或不是封面文件），无需处理
    Unchanged(PathBuf),
}

/// 扫描需要改名的封面文件
///
/// 只产出当前处于"源形式"的文件，已经是目标形式的文件不会出现在结果中。
pub fn scan_cover_art(
    root: &Path,
    direction: CoverArtDirection,
) -> AuditResult<FileScan<impl FnMut(&Path) -> bool + use<>>> {
    scanner::scan_files(root, move |path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| direction.is_source_name(name))
    })
}

/// 改名单个封面文件
///
/// - 不是源形式：`Unchanged`（幂等，不是错误）
/// - 目标已存在：`Err(RenameSkipped)`（非致命）
/// - 其他I/O失败：`Err(IoError)`，由调用方计入失败
pub fn normalize(item: &WorkItem, direction: CoverArtDirection) -> AuditResult<RenameOutcome> {
    let path = item.path();
    let Some(target_name) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| direction.target_name(name))
    else {
        return Ok(RenameOutcome::Unchanged(path.to_path_buf()));
    };

    let target = utils::get_parent_dir(path).join(target_name);
    match rename_no_clobber(path, &target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(AuditError::RenameSkipped { target });
        }
        Err(e) => return Err(e.into()),
    }
    tracing::debug!(from = %path.display(), to = %target.display(), "renamed cover art");

    Ok(RenameOutcome::Renamed {
        from: path.to_path_buf(),
        to: target,
    })
}

/// 改名但绝不覆盖已有文件
///
/// 先建立硬链接（目标存在时原子地失败），再删除原名。
/// 文件系统不支持硬链接时退回"检查后改名"。
fn rename_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => fs::remove_file(from),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "hard link unavailable, falling back to rename");
            if fs::symlink_metadata(to).is_ok() {
                return Err(io::Error::from(io::ErrorKind::AlreadyExists));
            }
            fs::rename(from, to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_names() {
        assert!(CoverArtDirection::Hide.is_source_name("cover.jpg"));
        assert!(CoverArtDirection::Hide.is_source_name("Cover.JPEG"));
        assert!(!CoverArtDirection::Hide.is_source_name(".cover.jpg"));
        assert!(!CoverArtDirection::Hide.is_source_name("folder.jpg"));

        assert!(CoverArtDirection::Show.is_source_name(".cover.png"));
        assert!(CoverArtDirection::Show.is_source_name(".COVER.png"));
        assert!(!CoverArtDirection::Show.is_source_name("cover.png"));
        assert!(!CoverArtDirection::Show.is_source_name("..cover.png"));
    }

    #[test]
    fn test_target_names_preserve_case() {
        assert_eq!(
            CoverArtDirection::Hide.target_name("Cover.JPG").as_deref(),
            Some(".Cover.JPG")
        );
        assert_eq!(
            CoverArtDirection::Show.target_name(".Cover.JPG").as_deref(),
            Some("Cover.JPG")
        );
        assert_eq!(CoverArtDirection::Hide.target_name(".cover.jpg"), None);
    }

    #[test]
    fn test_normalize_renames_and_detects_collision() {
        let dir = tempfile::tempdir().unwrap();
        let visible = dir.path().join("cover.png");
        fs::write(&visible, b"img").unwrap();

        let item = WorkItem::new(visible.clone());
        let outcome = normalize(&item, CoverArtDirection::Hide).unwrap();
        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                from: visible.clone(),
                to: dir.path().join(".cover.png"),
            }
        );

        // 重新创建可见文件，此时目标已存在
        fs::write(&visible, b"img2").unwrap();
        let collision = normalize(&item, CoverArtDirection::Hide);
        assert!(matches!(collision, Err(AuditError::RenameSkipped { .. })));
        assert!(visible.exists());
    }

    #[test]
    fn test_normalize_already_hidden_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = dir.path().join(".cover.jpg");
        fs::write(&hidden, b"img").unwrap();

        let outcome = normalize(&WorkItem::new(hidden.clone()), CoverArtDirection::Hide).unwrap();
        assert_eq!(outcome, RenameOutcome::Unchanged(hidden.clone()));
        assert!(hidden.exists());
    }

    #[test]
    fn test_rename_never_replaces_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("cover.jpg");
        let to = dir.path().join(".cover.jpg");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        let err = rename_no_clobber(&from, &to).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&from).unwrap(), b"new");
        assert_eq!(fs::read(&to).unwrap(), b"old");

        fs::remove_file(&to).unwrap();
        rename_no_clobber(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"new");
    }

    /// 悬空的符号链接也算已存在的目标
    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_target_is_collision() {
        let dir = tempfile::tempdir().unwrap();
        let visible = dir.path().join("cover.png");
        fs::write(&visible, b"img").unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join(".cover.png"))
            .unwrap();

        let result = normalize(&WorkItem::new(visible.clone()), CoverArtDirection::Hide);
        assert!(matches!(result, Err(AuditError::RenameSkipped { .. })));
        assert!(visible.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_cover_is_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("art.jpg");
        fs::write(&real, b"img").unwrap();
        let album = dir.path().join("album");
        fs::create_dir_all(&album).unwrap();
        std::os::unix::fs::symlink(&real, album.join("cover.jpg")).unwrap();

        let items: Vec<_> = scan_cover_art(&album, CoverArtDirection::Hide)
            .unwrap()
            .collect();
        assert_eq!(items.len(), 1);

        normalize(&items[0], CoverArtDirection::Hide).unwrap();
        let hidden = album.join(".cover.jpg");
        assert!(fs::symlink_metadata(&hidden).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&hidden).unwrap(), b"img");
        assert!(real.exists());
    }
}
