//! 工具模块集合
//!
//! 包含CLI、配置、文件扫描、封面处理、批处理执行、格式化和进度显示等模块，
//! 支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod config;
pub mod constants;
pub mod cover_art;
pub mod formatter;
pub mod interrupt;
pub mod processor;
pub mod progress;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchSummary, BatchTracker, RunPhase};
pub use cli::{
    CheckOptions, CliInvocation, CoverArtOptions, InfoOptions, RunConfig, Task, parse_args,
    parse_args_from, show_startup_info,
};
pub use config::Settings;
pub use cover_art::{CoverArtDirection, RenameOutcome};
pub use interrupt::CancelFlag;
pub use processor::{BatchReport, execute, run_check, run_cover_art, run_info};
pub use progress::{ProgressIndicator, ProgressKind, create_progress};
pub use scanner::{FileScan, WorkItem, scan_audio_files, scan_files};
pub use utils::path;
