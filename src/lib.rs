//! Audio Audit Tool
//!
//! 音频库批量审计工具：完整性检查、封面图片显示/隐藏、编解码器信息分析。
//!
//! ## 核心特性
//! - 递归扫描音频文件（扩展名白名单，忽略大小写）
//! - 通过 ffmpeg 完整解码校验文件完整性，支持单文件超时
//! - 通过 ffprobe 读取流参数并给出有损编码提示
//! - 串行批处理，单个文件失败不中断整个批次
//! - 两种可互换的进度条实现（indicatif 动画 / ASCII）

pub mod audio;
pub mod error;
pub mod tools;

// 重新导出核心类型
pub use audio::{FfmpegProbe, MediaProbe, MetadataRecord, ProbeOutcome, ProbeResult, StreamInfo};
pub use error::{AuditError, AuditResult, ErrorCategory};
pub use tools::{BatchReport, BatchSummary, RunConfig, Task};
