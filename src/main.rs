//! Audio Audit Tool - 主程序入口
//!
//! 纯流程控制器：初始化日志，解析参数，加载设置，分派任务并映射退出码。

use audio_audit_tool::{
    audio::FFMPEG_INSTALL_GUIDE,
    error::{AuditError, ErrorCategory},
    tools::{self, BatchReport, RunConfig, Settings, Task, interrupt},
};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

/// 退出码定义
mod exit_codes {
    /// 通用错误（含I/O）
    pub const GENERAL_ERROR: i32 = 1;
    /// 路径/输入错误
    pub const INPUT_ERROR: i32 = 2;
    /// 外部工具错误
    pub const TOOL_ERROR: i32 = 3;
    /// 有文件未通过完整性检查
    pub const FILES_FAILED: i32 = 4;
    /// 被 Ctrl+C 中断
    pub const INTERRUPTED: i32 = super::interrupt::INTERRUPTED_EXIT_CODE;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &AuditError) -> &'static str {
    match ErrorCategory::from_error(error) {
        ErrorCategory::Environment => {
            "请安装 FFmpeg（含 ffprobe）并确保其在 PATH 中 / Install FFmpeg (with ffprobe) and make sure it is on your PATH"
        }
        ErrorCategory::Input => {
            "检查路径是否正确，使用 --help 查看完整用法 / Check the path, use --help to see full usage"
        }
        ErrorCategory::Item => {
            "文件可能损坏或使用不支持的编码 / File may be corrupted or use an unsupported encoding"
        }
        ErrorCategory::Config => {
            "删除配置文件后重新运行以生成默认配置 / Delete the settings file and rerun to regenerate defaults"
        }
        ErrorCategory::Io => {
            "检查目录是否存在且可写 / Check that the directories exist and are writable"
        }
    }
}

/// 错误处理和建议
fn handle_error(error: AuditError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");

    let category = ErrorCategory::from_error(&error);
    eprintln!("[INFO] 类别 / Category: {}", category.display_name());
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    if matches!(error, AuditError::ToolUnavailable { .. }) {
        eprintln!("{FFMPEG_INSTALL_GUIDE}");
    }

    let exit_code = match category {
        ErrorCategory::Input => exit_codes::INPUT_ERROR,
        ErrorCategory::Environment => exit_codes::TOOL_ERROR,
        ErrorCategory::Item | ErrorCategory::Config | ErrorCategory::Io => {
            exit_codes::GENERAL_ERROR
        }
    };

    process::exit(exit_code);
}

/// 根据运行结果确定退出码
fn completion_code(config: &RunConfig, report: &BatchReport) -> i32 {
    if report.interrupted {
        return exit_codes::INTERRUPTED;
    }
    match config.task {
        Task::Check(_) if !report.summary.all_passed() => exit_codes::FILES_FAILED,
        _ => 0,
    }
}

/// 初始化诊断日志（RUST_LOG，默认warn，输出到stderr）
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// 应用程序主逻辑
fn run() -> Result<i32, AuditError> {
    // 1. 解析命令行参数
    let invocation = tools::parse_args();

    // 2. 加载设置并合并为运行配置
    let settings = Settings::load_or_create(&invocation.config_path);
    let config = invocation.resolve(&settings);
    tools::show_startup_info(&config);

    // 3. 安装中断监听
    let cancel = interrupt::install()?;

    // 4. 执行任务
    let mut console = io::stdout();
    let report = tools::execute(&config, &mut console, &cancel)?;

    if report.interrupted {
        println!("Quitting job...");
    }
    Ok(completion_code(&config, &report))
}

fn main() {
    init_tracing();

    match run() {
        Ok(code) => process::exit(code),
        Err(error) => handle_error(error),
    }
}
