//! 统一错误处理框架
//!
//! 区分三类错误：运行前致命错误（路径、外部工具）、单文件非致命错误
//! （文件损坏、改名冲突、工具超时）以及可恢复的配置错误。

use std::fmt;
use std::io;
use std::path::PathBuf;

/// 审计流程的统一错误类型
#[derive(Debug)]
pub enum AuditError {
    /// 输入路径不存在（运行前致命）
    PathNotFound(PathBuf),

    /// 参数或路径类型不符合要求（运行前致命）
    InvalidInput(String),

    /// 外部工具不在PATH中（运行前致命）
    ToolUnavailable { tool: &'static str },

    /// 无法启动外部工具子进程（致命）
    ToolInvocation { tool: String, source: io::Error },

    /// 外部工具在限定时间内没有结束（单文件，非致命）
    ToolTimeout { tool: String, seconds: u64 },

    /// 文件本身无法解析/探测（单文件，非致命）
    ProbeFailed(String),

    /// 目标文件名已存在，跳过改名（单文件，非致命）
    RenameSkipped { target: PathBuf },

    /// 配置文件无法解析（可恢复：回退默认值）
    ConfigLoad(String),

    /// 文件I/O错误
    IoError(io::Error),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::PathNotFound(path) => {
                write!(f, "Path not found / 路径不存在: '{}'", path.display())
            }
            AuditError::InvalidInput(msg) => write!(f, "Invalid input / 输入无效: {msg}"),
            AuditError::ToolUnavailable { tool } => write!(
                f,
                "{tool} is not installed or not in your PATH / 未找到{tool}，请安装并加入PATH"
            ),
            AuditError::ToolInvocation { tool, source } => {
                write!(f, "Failed to run {tool} / 无法运行{tool}: {source}")
            }
            AuditError::ToolTimeout { tool, seconds } => {
                write!(f, "{tool} timed out after {seconds}s / {tool}执行超时")
            }
            AuditError::ProbeFailed(msg) => write!(f, "{msg}"),
            AuditError::RenameSkipped { target } => write!(
                f,
                "target already exists / 目标文件已存在: '{}'",
                target.display()
            ),
            AuditError::ConfigLoad(msg) => write!(f, "Invalid config file / 配置文件无效: {msg}"),
            AuditError::IoError(err) => write!(f, "I/O error / 文件I/O错误: {err}"),
        }
    }
}

impl std::error::Error for AuditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuditError::ToolInvocation { source, .. } => Some(source),
            AuditError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AuditError {
    fn from(err: io::Error) -> Self {
        AuditError::IoError(err)
    }
}

impl AuditError {
    /// 是否需要中止整个批处理
    ///
    /// 单文件错误（损坏、超时、改名冲突）只计入统计；配置错误由加载方自行恢复。
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AuditError::ToolTimeout { .. }
                | AuditError::ProbeFailed(_)
                | AuditError::RenameSkipped { .. }
                | AuditError::ConfigLoad(_)
        )
    }
}

/// 审计操作的标准Result类型
pub type AuditResult<T> = Result<T, AuditError>;

/// 创建探测失败错误的helper函数
#[inline]
pub fn probe_failed<E: fmt::Display>(context: &str, err: E) -> AuditError {
    AuditError::ProbeFailed(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================

/// 错误类别枚举（用于退出码映射和用户提示）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 运行环境问题（外部工具缺失或无法启动）
    Environment,
    /// 用户输入问题（路径不存在、路径类型错误）
    Input,
    /// 单个文件的问题（不影响批处理继续）
    Item,
    /// 配置文件问题
    Config,
    /// 文件系统I/O问题
    Io,
}

impl ErrorCategory {
    /// 从AuditError提取错误类别
    pub fn from_error(e: &AuditError) -> Self {
        match e {
            AuditError::ToolUnavailable { .. } | AuditError::ToolInvocation { .. } => {
                Self::Environment
            }
            AuditError::PathNotFound(_) | AuditError::InvalidInput(_) => Self::Input,
            AuditError::ToolTimeout { .. }
            | AuditError::ProbeFailed(_)
            | AuditError::RenameSkipped { .. } => Self::Item,
            AuditError::ConfigLoad(_) => Self::Config,
            AuditError::IoError(_) => Self::Io,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Environment => "环境错误 / Environment",
            Self::Input => "输入错误 / Input",
            Self::Item => "文件错误 / File",
            Self::Config => "配置错误 / Config",
            Self::Io => "I/O错误 / I/O",
        }
    }
}
