//! 命令行接口模块
//!
//! 负责命令行参数解析、与设置文件合并成运行配置，以及程序信息展示。

use super::config::{self, Settings};
use super::constants::file_names;
use super::cover_art::CoverArtDirection;
use super::progress::ProgressKind;
use chrono::NaiveDate;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command, value_parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// check 子命令选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// 逐条打印结果（不显示进度条）
    pub verbose: bool,
    /// 只打印汇总
    pub summary: bool,
    /// 强制写日志
    pub save_log: bool,
}

impl CheckOptions {
    /// 是否写检查日志
    #[inline]
    pub fn writes_log(&self) -> bool {
        self.save_log || (!self.verbose && !self.summary)
    }

    /// 是否在控制台打印汇总
    #[inline]
    pub fn prints_summary(&self) -> bool {
        self.verbose || self.summary
    }
}

/// cover-art 子命令选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverArtOptions {
    pub direction: CoverArtDirection,
    pub verbose: bool,
}

/// info 子命令选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoOptions {
    /// 指定的报告文件名，None 时使用按日期命名的默认文件
    pub output: Option<PathBuf>,
    /// 输出到控制台（不写报告文件，不显示进度条）
    pub verbose: bool,
}

impl InfoOptions {
    /// 报告文件的实际路径，verbose 模式返回 None（输出到控制台）
    pub fn report_path(&self, today: NaiveDate) -> Option<PathBuf> {
        if self.verbose {
            return None;
        }
        Some(
            self.output
                .clone()
                .unwrap_or_else(|| default_report_name(today)),
        )
    }
}

/// 默认报告文件名（当前工作目录）
pub fn default_report_name(today: NaiveDate) -> PathBuf {
    PathBuf::from(format!(
        "{}{}.txt",
        file_names::INFO_REPORT_PREFIX,
        today.format(file_names::INFO_REPORT_DATE)
    ))
}

/// 子命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Check(CheckOptions),
    CoverArt(CoverArtOptions),
    Info(InfoOptions),
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Check(_) => "check",
            Task::CoverArt(_) => "cover-art",
            Task::Info(_) => "info",
        }
    }

    pub fn is_verbose(&self) -> bool {
        match self {
            Task::Check(opts) => opts.verbose,
            Task::CoverArt(opts) => opts.verbose,
            Task::Info(opts) => opts.verbose,
        }
    }
}

/// 命令行解析结果（尚未与设置文件合并）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliInvocation {
    pub input_path: PathBuf,
    pub task: Task,
    pub config_path: PathBuf,
    pub progress: Option<ProgressKind>,
    pub timeout_secs: Option<u64>,
}

impl CliInvocation {
    /// 与设置文件合并，命令行参数优先
    pub fn resolve(self, settings: &Settings) -> RunConfig {
        let timeout_secs = self.timeout_secs.unwrap_or(settings.tool_timeout_secs);
        RunConfig {
            input_path: self.input_path,
            task: self.task,
            log_folder: settings.log_folder.clone(),
            tool_timeout: config::timeout_from_secs(timeout_secs),
            progress: self.progress.unwrap_or(settings.progress_style),
        }
    }
}

/// 运行配置（启动时确定，之后只读）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub task: Task,
    pub log_folder: PathBuf,
    /// None 表示不限时
    pub tool_timeout: Option<Duration>,
    pub progress: ProgressKind,
}

impl RunConfig {
    /// 使用默认设置构建（测试和嵌入使用）
    pub fn new(input_path: impl Into<PathBuf>, task: Task) -> Self {
        let settings = Settings::default();
        Self {
            input_path: input_path.into(),
            task,
            log_folder: settings.log_folder.clone(),
            tool_timeout: settings.tool_timeout(),
            progress: settings.progress_style,
        }
    }
}

fn path_arg() -> Arg {
    Arg::new("PATH")
        .help("Audio file or directory / 音频文件或目录路径")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .index(1)
}

fn verbose_arg(help: &'static str) -> Arg {
    Arg::new("verbose")
        .long("verbose")
        .short('v')
        .help(help)
        .action(ArgAction::SetTrue)
}

/// 构建命令行定义
pub fn build_command() -> Command {
    Command::new("audio-audit")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("MacinMeter Team")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Settings file / 配置文件路径")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("progress")
                .long("progress")
                .help("Progress bar style / 进度条样式")
                .value_name("STYLE")
                .value_parser(["animated", "ascii"])
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Per-file tool timeout in seconds, 0 = unlimited / 单文件超时（秒），0 为不限时")
                .value_name("SECS")
                .value_parser(value_parser!(u64))
                .global(true),
        )
        .subcommand(
            Command::new("check")
                .about("Check audio files for corruption / 检查音频文件完整性")
                .arg(path_arg())
                .arg(verbose_arg("Print every result, no progress bar / 逐条输出结果"))
                .arg(
                    Arg::new("summary")
                        .long("summary")
                        .short('s')
                        .help("Print only the summary / 只输出汇总")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("verbose"),
                )
                .arg(
                    Arg::new("save-log")
                        .long("save-log")
                        .help("Always write the log file / 总是保存日志")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("cover-art")
                .about("Hide or show cover art images / 隐藏或显示封面图片")
                .arg(path_arg())
                .arg(
                    Arg::new("hide")
                        .long("hide")
                        .help("Add a leading dot / 添加点前缀")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("show")
                        .long("show")
                        .help("Remove the leading dot / 移除点前缀")
                        .action(ArgAction::SetTrue),
                )
                .group(
                    ArgGroup::new("direction")
                        .args(["hide", "show"])
                        .required(true)
                        .multiple(false),
                )
                .arg(verbose_arg("Print every rename / 逐条输出改名结果")),
        )
        .subcommand(
            Command::new("info")
                .about("Analyze audio metadata / 分析音频元数据")
                .arg(path_arg())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Report file name / 报告文件名")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(verbose_arg("Print the report to the console / 报告输出到控制台")),
        )
}

/// 解析指定参数（第一个元素为程序名）
pub fn parse_args_from<I, T>(args: I) -> Result<CliInvocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    Ok(invocation_from_matches(&matches))
}

/// 解析进程命令行（参数错误时由clap打印用法并退出）
pub fn parse_args() -> CliInvocation {
    let matches = build_command().get_matches();
    invocation_from_matches(&matches)
}

fn invocation_from_matches(matches: &ArgMatches) -> CliInvocation {
    let (task, sub) = match matches.subcommand() {
        Some(("check", sub)) => (
            Task::Check(CheckOptions {
                verbose: sub.get_flag("verbose"),
                summary: sub.get_flag("summary"),
                save_log: sub.get_flag("save-log"),
            }),
            sub,
        ),
        Some(("cover-art", sub)) => {
            let direction = if sub.get_flag("show") {
                CoverArtDirection::Show
            } else {
                CoverArtDirection::Hide
            };
            (
                Task::CoverArt(CoverArtOptions {
                    direction,
                    verbose: sub.get_flag("verbose"),
                }),
                sub,
            )
        }
        Some(("info", sub)) => (
            Task::Info(InfoOptions {
                output: sub.get_one::<PathBuf>("output").cloned(),
                verbose: sub.get_flag("verbose"),
            }),
            sub,
        ),
        _ => unreachable!("subcommand_required"),
    };

    // 全局参数在子命令上同样可见
    CliInvocation {
        input_path: sub
            .get_one::<PathBuf>("PATH")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(".")),
        task,
        config_path: sub
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(Settings::default_path),
        progress: sub
            .get_one::<String>("progress")
            .and_then(|s| s.parse().ok()),
        timeout_secs: sub.get_one::<u64>("timeout").copied(),
    }
}

/// 显示程序启动信息（仅verbose模式）
pub fn show_startup_info(config: &RunConfig) {
    if !config.task.is_verbose() {
        return;
    }
    println!("Audio Audit Tool v{VERSION} / 音频审计工具");
    println!("Task / 任务: {}", config.task.name());
    println!("Path / 路径: {}", config.input_path.display());
    match config.tool_timeout {
        Some(t) => println!("Timeout / 超时: {}s", t.as_secs()),
        None => println!("Timeout / 超时: unlimited / 不限时"),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliInvocation {
        let mut full = vec!["audio-audit"];
        full.extend_from_slice(args);
        parse_args_from(full).unwrap()
    }

    #[test]
    fn test_log_decision_table() {
        let cases = [
            // (verbose, summary, save_log) -> (writes_log, prints_summary)
            ((false, false, false), (true, false)),
            ((false, false, true), (true, false)),
            ((true, false, false), (false, true)),
            ((true, false, true), (true, true)),
            ((false, true, false), (false, true)),
            ((false, true, true), (true, true)),
        ];
        for ((verbose, summary, save_log), (log, print)) in cases {
            let opts = CheckOptions {
                verbose,
                summary,
                save_log,
            };
            assert_eq!(opts.writes_log(), log, "{opts:?}");
            assert_eq!(opts.prints_summary(), print, "{opts:?}");
        }
    }

    #[test]
    fn test_parse_check() {
        let inv = parse(&["check", "/music", "--verbose", "--save-log"]);
        assert_eq!(inv.input_path, PathBuf::from("/music"));
        assert_eq!(
            inv.task,
            Task::Check(CheckOptions {
                verbose: true,
                summary: false,
                save_log: true,
            })
        );
        assert_eq!(inv.config_path, Settings::default_path());
    }

    #[test]
    fn test_verbose_and_summary_conflict() {
        let result = parse_args_from(["audio-audit", "check", "/m", "--verbose", "--summary"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cover_art_requires_one_direction() {
        assert!(parse_args_from(["audio-audit", "cover-art", "/m"]).is_err());
        assert!(parse_args_from(["audio-audit", "cover-art", "/m", "--hide", "--show"]).is_err());

        let inv = parse(&["cover-art", "/m", "--show"]);
        assert_eq!(
            inv.task,
            Task::CoverArt(CoverArtOptions {
                direction: CoverArtDirection::Show,
                verbose: false,
            })
        );
    }

    #[test]
    fn test_info_output_variants() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let report_path = |args: &[&str]| match parse(args).task {
            Task::Info(opts) => opts.report_path(today),
            other => panic!("expected info task, got {other:?}"),
        };

        assert_eq!(
            report_path(&["info", "/m"]),
            Some(PathBuf::from("audio_analysis_20240309.txt"))
        );
        assert_eq!(
            report_path(&["info", "/m", "-o", "out.txt"]),
            Some(PathBuf::from("out.txt"))
        );
        assert_eq!(report_path(&["info", "/m", "--verbose"]), None);
        assert_eq!(report_path(&["info", "/m", "--verbose", "-o", "out.txt"]), None);
    }

    #[test]
    fn test_global_overrides_resolve() {
        let inv = parse(&["check", "/m", "--progress", "ascii", "--timeout", "0"]);
        assert_eq!(inv.progress, Some(ProgressKind::Ascii));
        assert_eq!(inv.timeout_secs, Some(0));

        let config = inv.resolve(&Settings::default());
        assert_eq!(config.progress, ProgressKind::Ascii);
        assert_eq!(config.tool_timeout, None);
        assert_eq!(config.log_folder, PathBuf::from("Logs"));
    }

    #[test]
    fn test_settings_apply_without_overrides() {
        let settings = Settings {
            tool_timeout_secs: 5,
            progress_style: ProgressKind::Ascii,
            ..Settings::default()
        };
        let config = parse(&["info", "/m"]).resolve(&settings);
        assert_eq!(config.tool_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.progress, ProgressKind::Ascii);
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(parse_args_from(["audio-audit", "convert", "/m"]).is_err());
        assert!(parse_args_from(["audio-audit", "check"]).is_err());
    }
}
