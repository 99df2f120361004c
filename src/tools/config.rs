//! 配置文件模块
//!
//! JSON 格式的设置文件，启动时加载一次。文件缺失时写入默认值，
//! 文件损坏时备份为 `.bak` 并回退到默认值。

use super::constants::defaults;
use super::progress::ProgressKind;
use crate::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 用户设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 完整性检查日志目录（相对路径基于当前工作目录）
    pub log_folder: PathBuf,
    /// 单次外部工具调用超时（秒），0 表示不限时
    pub tool_timeout_secs: u64,
    pub progress_style: ProgressKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_folder: PathBuf::from(defaults::LOG_FOLDER),
            tool_timeout_secs: defaults::TOOL_TIMEOUT_SECS,
            progress_style: ProgressKind::default(),
        }
    }
}

impl Settings {
    /// 默认配置文件路径（当前工作目录）
    pub fn default_path() -> PathBuf {
        PathBuf::from(defaults::CONFIG_FILE_NAME)
    }

    /// 超时时长，0 视为不限时
    pub fn tool_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.tool_timeout_secs)
    }

    /// 严格加载：文件不存在返回 `IoError(NotFound)`，解析失败返回 `ConfigLoad`
    pub fn load(path: &Path) -> AuditResult<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| AuditError::ConfigLoad(format!("{}: {e}", path.display())))
    }

    /// 加载设置，任何问题都回退到默认值
    ///
    /// - 文件不存在：写入默认配置
    /// - 文件存在但无法使用（解析失败、非UTF-8等）：原文件备份为 `<name>.bak`，写入默认配置
    /// - 备份失败时不覆盖原文件
    /// - 写入失败只记录告警
    pub fn load_or_create(path: &Path) -> Self {
        let settings = Self::default();
        match Self::load(path) {
            Ok(settings) => return settings,
            Err(AuditError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "config unusable, falling back to defaults"
                );
                let backup = backup_path(path);
                if let Err(e) = fs::rename(path, &backup) {
                    tracing::warn!(
                        backup = %backup.display(),
                        error = %e,
                        "could not back up config, leaving it in place"
                    );
                    return settings;
                }
            }
        }

        if let Err(e) = settings.save(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not write default config");
        }
        settings
    }

    /// 写入（格式化的JSON）
    pub fn save(&self, path: &Path) -> AuditResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AuditError::ConfigLoad(e.to_string()))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }
}

#[inline]
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// `<name>.bak`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}
