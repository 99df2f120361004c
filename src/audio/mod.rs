//! 外部探测模块
//!
//! 通过 ffmpeg / ffprobe 子进程完成完整性校验和元数据探测。

pub mod ffmpeg_bridge;
pub mod format;

pub use ffmpeg_bridge::{FFMPEG_INSTALL_GUIDE, FfmpegProbe, MediaProbe, Tool, parse_ffprobe_json};
pub use format::{MetadataRecord, ProbeOutcome, ProbeResult, StreamInfo, is_lossless_codec};
