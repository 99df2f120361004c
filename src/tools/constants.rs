//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 支持的文件格式
pub mod formats {
    /// 音频文件扩展名白名单（小写，不含点，匹配时忽略大小写）
    pub const AUDIO_EXTENSIONS: &[&str] = &[
        "flac", "wav", "m4a", "mp3", "ogg", "opus", "ape", "wv", "wma",
    ];

    /// 无损编解码器名称（ffprobe codec_name）
    pub const LOSSLESS_CODECS: &[&str] = &["flac", "alac", "ape", "wavpack", "tta", "mlp"];

    /// PCM 类编解码器前缀（pcm_s16le、pcm_s24be 等均视为无损）
    pub const PCM_CODEC_PREFIX: &str = "pcm_";
}

/// 封面图片相关常量
pub mod cover_art {
    /// 可见形式的封面文件名（匹配时忽略大小写）
    pub const COVER_ART_NAMES: &[&str] = &["cover.jpg", "cover.jpeg", "cover.png"];

    /// 隐藏标记：文件名前缀的点
    pub const HIDDEN_MARKER: char = '.';
}

/// 元数据告警阈值
pub mod thresholds {
    /// 低于该位深度视为可疑（可能来自有损源）
    pub const MIN_BIT_DEPTH: u16 = 16;

    /// 低于该采样率视为可疑（Hz）
    pub const MIN_SAMPLE_RATE: u32 = 44_100;
}

/// 默认配置值
pub mod defaults {
    /// 配置文件名（位于当前工作目录）
    pub const CONFIG_FILE_NAME: &str = "audio-audit-config.json";

    /// 默认日志目录
    pub const LOG_FOLDER: &str = "Logs";

    /// 单次外部工具调用的默认超时（秒），0 表示不限时
    pub const TOOL_TIMEOUT_SECS: u64 = 600;

    /// 子进程轮询间隔（毫秒）
    pub const TOOL_POLL_INTERVAL_MS: u64 = 20;

    /// ASCII进度条宽度（字符数）
    pub const ASCII_BAR_WIDTH: usize = 70;
}

/// 输出文件命名
pub mod file_names {
    /// 完整性检查日志文件名前缀
    pub const CHECK_LOG_PREFIX: &str = "integrity_check_log_";

    /// 完整性检查日志时间戳格式
    pub const CHECK_LOG_TIMESTAMP: &str = "%Y-%m-%d_%H-%M-%S";

    /// 元数据报告文件名前缀
    pub const INFO_REPORT_PREFIX: &str = "audio_analysis_";

    /// 元数据报告日期格式
    pub const INFO_REPORT_DATE: &str = "%Y%m%d";
}

/// 进度条标签
pub mod labels {
    pub const CHECKING: &str = "Checking files";
    pub const ANALYZING: &str = "Analyzing audio";
    pub const COVER_ART: &str = "Processing cover art";
}
