//! 工具函数模块
//!
//! 提供文件路径处理等通用工具函数。

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 获取父目录，如果不存在则返回当前目录
    #[inline]
    pub fn get_parent_dir(path: &Path) -> &Path {
        path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// 提取小写扩展名（不含点）
    #[inline]
    pub fn extension_lowercase(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase())
    }

    /// 扩展名是否在白名单中（忽略大小写）
    pub fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
        extension_lowercase(path)
            .map(|ext| extensions.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

// 重新导出为平级函数
pub use path::{extension_lowercase, get_parent_dir, has_extension_in};
