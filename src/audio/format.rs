//! 探测结果数据模块
//!
//! 定义完整性检查结果、流信息以及元数据记录，
//! 并根据解码得到的参数生成提示/告警信息。

use crate::tools::constants::{formats, thresholds};
use crate::tools::utils;
use std::fmt;
use std::path::{Path, PathBuf};

/// 完整性检查结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Passed,
    Failed,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Passed => f.write_str("PASSED"),
            ProbeOutcome::Failed => f.write_str("FAILED"),
        }
    }
}

/// 单个文件的完整性检查结果（创建后不再修改）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub path: PathBuf,
    pub outcome: ProbeOutcome,
    /// 诊断信息（解码器错误输出、超时说明等）
    pub detail: Option<String>,
}

impl ProbeResult {
    pub fn passed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            outcome: ProbeOutcome::Passed,
            detail: None,
        }
    }

    pub fn failed(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            outcome: ProbeOutcome::Failed,
            detail: Some(detail.into()),
        }
    }

    #[inline]
    pub fn is_passed(&self) -> bool {
        self.outcome == ProbeOutcome::Passed
    }
}

/// 元数据探测得到的原始流信息
///
/// 所有字段都可能缺失：ffprobe 对不同容器给出的字段并不一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub codec: Option<String>,
    /// 比特率（bps）
    pub bit_rate: Option<u64>,
    /// 采样率（Hz）
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u16>,
    pub channels: Option<u16>,
}

/// 单个文件的元数据记录（仅由 info 流程创建）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub path: PathBuf,
    pub codec: Option<String>,
    pub bit_rate: Option<u64>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u16>,
    pub channels: Option<u16>,
    /// 提示信息（编解码器类型说明），按规则顺序排列
    pub notes: Vec<String>,
    /// 告警信息，按规则顺序排列
    pub warnings: Vec<String>,
}

impl MetadataRecord {
    /// 从流信息构建记录并派生提示/告警
    pub fn from_stream(path: &Path, info: StreamInfo) -> Self {
        let mut record = Self {
            path: path.to_path_buf(),
            codec: info.codec,
            bit_rate: info.bit_rate,
            sample_rate: info.sample_rate,
            bit_depth: info.bit_depth,
            channels: info.channels,
            notes: Vec::new(),
            warnings: Vec::new(),
        };
        record.derive_advisories();
        record
    }

    /// 编解码器名称，缺失时显示 N/A
    pub fn codec_name(&self) -> &str {
        self.codec.as_deref().unwrap_or("N/A")
    }

    /// 是否为无损编解码器
    pub fn is_lossless_codec(&self) -> bool {
        self.codec.as_deref().is_some_and(is_lossless_codec)
    }

    /// 声道描述：Mono / Stereo / N channels
    pub fn channel_description(&self) -> String {
        match self.channels {
            None => "N/A".to_string(),
            Some(1) => "Mono".to_string(),
            Some(2) => "Stereo".to_string(),
            Some(n) => format!("{n} channels"),
        }
    }

    fn derive_advisories(&mut self) {
        let codec = self.codec_name().to_string();
        let codec_lower = codec.to_ascii_lowercase();

        // 1. 容器相关的编解码器说明
        match utils::extension_lowercase(&self.path).as_deref() {
            Some("m4a") => {
                if codec_lower.contains("aac") {
                    self.notes.push("AAC (lossy) codec detected.".to_string());
                } else if codec_lower.contains("alac") {
                    self.notes.push("ALAC (lossless) codec detected.".to_string());
                } else {
                    self.warnings.push(format!("Unknown codec: {codec}"));
                }
            }
            Some("opus") | Some("mp3") => {
                self.notes.push(format!("Lossy codec: {codec}"));
            }
            _ => {}
        }

        // 2. 位深度
        if let Some(depth) = self.bit_depth
            && depth < thresholds::MIN_BIT_DEPTH
        {
            if self.is_lossless_codec() {
                self.warnings.push(format!(
                    "Low bit depth ({depth} bits) for lossless codec {codec}, may indicate lossy encoding."
                ));
            } else {
                self.warnings.push(format!(
                    "Low bit depth ({depth} bits) may indicate lossy encoding."
                ));
            }
        }

        // 3. 采样率
        if let Some(rate) = self.sample_rate
            && rate < thresholds::MIN_SAMPLE_RATE
        {
            self.warnings.push(format!(
                "Low sample rate ({rate} Hz) may indicate lossy encoding."
            ));
        }
    }
}

/// 根据 ffprobe 的 codec_name 判断是否无损
pub fn is_lossless_codec(codec: &str) -> bool {
    let codec = codec.to_ascii_lowercase();
    codec.starts_with(formats::PCM_CODEC_PREFIX)
        || formats::LOSSLESS_CODECS.contains(&codec.as_str())
}
