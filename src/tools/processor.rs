//! 批处理执行模块
//!
//! 串行驱动 check / info / cover-art 三种任务：扫描工作集，逐个处理，
//! 累加统计，渲染进度，并把结果写入控制台或日志/报告文件。
//! 单个文件的失败只计入统计，不会中断批处理。

use super::batch_state::{BatchSummary, BatchTracker, RunPhase};
use super::cli::{CheckOptions, CoverArtOptions, InfoOptions, RunConfig, Task};
use super::constants::{file_names, labels};
use super::cover_art::{self, RenameOutcome};
use super::formatter::{self, SummaryLabels};
use super::interrupt::CancelFlag;
use super::progress::{self, ProgressIndicator};
use super::scanner::{self, WorkItem};
use crate::audio::{FfmpegProbe, MediaProbe, MetadataRecord, ProbeResult};
use crate::{AuditError, AuditResult};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 单次运行的结果
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// 写入的日志/报告文件
    pub output_path: Option<PathBuf>,
    /// 被 Ctrl+C 提前终止
    pub interrupted: bool,
}

impl BatchReport {
    fn empty(summary: BatchSummary) -> Self {
        Self {
            summary,
            output_path: None,
            interrupted: false,
        }
    }
}

/// 检查日志路径：`<log_folder>/integrity_check_log_YYYY-MM-DD_HH-MM-SS.txt`
pub fn check_log_path(log_folder: &Path, now: DateTime<Local>) -> PathBuf {
    log_folder.join(format!(
        "{}{}.txt",
        file_names::CHECK_LOG_PREFIX,
        now.format(file_names::CHECK_LOG_TIMESTAMP)
    ))
}

/// 运行前检查：路径必须存在，cover-art 要求目录
pub fn preflight(config: &RunConfig) -> AuditResult<()> {
    let path = &config.input_path;
    if !path.exists() {
        return Err(AuditError::PathNotFound(path.clone()));
    }
    if matches!(config.task, Task::CoverArt(_)) && !path.is_dir() {
        return Err(AuditError::InvalidInput(format!(
            "'{}' is not a directory / 不是目录",
            path.display()
        )));
    }
    Ok(())
}

/// 执行一次完整任务（路径检查 → 工具检查 → 批处理）
pub fn execute(
    config: &RunConfig,
    console: &mut dyn Write,
    cancel: &CancelFlag,
) -> AuditResult<BatchReport> {
    preflight(config)?;

    match &config.task {
        Task::Check(opts) => {
            let probe =
                FfmpegProbe::for_integrity(config.tool_timeout)?.with_cancel(cancel.clone());
            run_check(config, *opts, &probe, console, cancel)
        }
        Task::CoverArt(opts) => run_cover_art(config, *opts, console, cancel),
        Task::Info(opts) => {
            let probe =
                FfmpegProbe::for_metadata(config.tool_timeout)?.with_cancel(cancel.clone());
            run_info(config, opts, &probe, console, cancel)
        }
    }
}

// ==================== 文本输出文件 ====================

/// 日志/报告文件（带缓冲，收尾时写入汇总）
struct TextSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TextSink {
    fn create(path: PathBuf) -> AuditResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { path, writer })
    }

    fn write_text(&mut self, text: &str) -> AuditResult<()> {
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn finish(mut self, summary: &BatchSummary) -> AuditResult<PathBuf> {
        self.write_text(&formatter::format_summary_text(summary))?;
        self.writer.flush()?;
        Ok(self.path)
    }
}

// ==================== 通用驱动循环 ====================

/// 逐个处理工作项
///
/// 每个文件开始前检查取消标志；处理期间收到取消时丢弃该文件的结果。
/// `process` 返回 `Err` 表示致命错误，立即停止。
/// 返回值表示是否被中断。
fn drive<T>(
    items: &[WorkItem],
    tracker: &mut BatchTracker,
    progress: &mut dyn ProgressIndicator,
    cancel: &CancelFlag,
    mut process: impl FnMut(&WorkItem) -> AuditResult<T>,
    mut emit: impl FnMut(T) -> AuditResult<bool>,
) -> AuditResult<bool> {
    for item in items {
        if cancel.is_cancelled() {
            return Ok(true);
        }

        let outcome = process(item)?;

        if cancel.is_cancelled() {
            tracing::debug!(
                file = %item.path().display(),
                "interrupted, discarding in-flight result"
            );
            return Ok(true);
        }

        let passed = emit(outcome)?;
        tracker.record(passed);
        progress.advance(1);
    }
    Ok(false)
}

/// 扫描并物化工作集（进度条需要总数）
fn discover<I>(tracker: &mut BatchTracker, scan: I) -> Vec<WorkItem>
where
    I: Iterator<Item = WorkItem>,
{
    tracker.advance_to(RunPhase::Discovering);
    let items: Vec<WorkItem> = scan.collect();
    tracing::debug!(count = items.len(), "work set discovered");
    items
}

// ==================== check ====================

/// 完整性检查
pub fn run_check(
    config: &RunConfig,
    opts: CheckOptions,
    probe: &dyn MediaProbe,
    console: &mut dyn Write,
    cancel: &CancelFlag,
) -> AuditResult<BatchReport> {
    let root = &config.input_path;
    let mut tracker = BatchTracker::new();
    let items = discover(&mut tracker, scanner::scan_audio_files(root)?);

    if items.is_empty() {
        writeln!(console, "No audio files found in '{}'.", root.display())?;
        return Ok(BatchReport::empty(tracker.finalize()));
    }

    let mut log = if opts.writes_log() {
        Some(TextSink::create(check_log_path(&config.log_folder, Local::now()))?)
    } else {
        None
    };

    tracker.advance_to(RunPhase::Processing);
    let mut progress = progress::create_progress(
        config.progress,
        items.len() as u64,
        labels::CHECKING,
        !opts.verbose,
    );

    let driven = drive(
        &items,
        &mut tracker,
        progress.as_mut(),
        cancel,
        |item| match probe.verify(item.path()) {
            Ok(result) => Ok(result),
            Err(e) if !e.is_fatal() => Ok(ProbeResult::failed(item.path(), e.to_string())),
            Err(e) => Err(e),
        },
        |result| {
            let line = formatter::format_check_line(&result);
            if opts.verbose {
                writeln!(console, "{line}")?;
            }
            if let Some(log) = log.as_mut() {
                log.write_text(&line)?;
                log.write_text("\n")?;
            }
            Ok(result.is_passed())
        },
    );

    progress.finish();
    let summary = tracker.finalize();
    let log_path = log.map(|log| log.finish(&summary)).transpose()?;
    let interrupted = driven?;

    if opts.prints_summary() {
        writeln!(
            console,
            "{}",
            formatter::render_summary_table(&summary, SummaryLabels::CHECK)
        )?;
    }

    match (&log_path, interrupted) {
        (Some(path), false) => {
            writeln!(console, "Check complete. Log saved to '{}'", path.display())?
        }
        (None, false) => writeln!(console, "Check complete.")?,
        (Some(path), true) => writeln!(
            console,
            "Partial results saved to '{}' / 已保存部分结果",
            path.display()
        )?,
        (None, true) => {}
    }

    Ok(BatchReport {
        summary,
        output_path: log_path,
        interrupted,
    })
}

// ==================== info ====================

/// 单文件元数据分析结果（失败时保留原因）
type InfoOutcome = Result<MetadataRecord, (PathBuf, String)>;

/// 元数据分析
pub fn run_info(
    config: &RunConfig,
    opts: &InfoOptions,
    probe: &dyn MediaProbe,
    console: &mut dyn Write,
    cancel: &CancelFlag,
) -> AuditResult<BatchReport> {
    let root = &config.input_path;
    let mut tracker = BatchTracker::new();
    let items = discover(&mut tracker, scanner::scan_audio_files(root)?);

    if items.is_empty() {
        writeln!(console, "No audio files found in '{}'.", root.display())?;
        return Ok(BatchReport::empty(tracker.finalize()));
    }

    let now = Local::now();
    let mut report = match opts.report_path(now.date_naive()) {
        Some(path) => {
            let mut sink = TextSink::create(path)?;
            sink.write_text(&formatter::create_report_header(root, now))?;
            Some(sink)
        }
        None => None,
    };

    tracker.advance_to(RunPhase::Processing);
    let mut progress = progress::create_progress(
        config.progress,
        items.len() as u64,
        labels::ANALYZING,
        !opts.verbose,
    );

    let driven = drive(
        &items,
        &mut tracker,
        progress.as_mut(),
        cancel,
        |item| -> AuditResult<InfoOutcome> {
            let path = item.path();
            match probe.inspect(path) {
                Ok(info) => Ok(Ok(MetadataRecord::from_stream(path, info))),
                Err(e) if !e.is_fatal() => Ok(Err((path.to_path_buf(), e.to_string()))),
                Err(e) => Err(e),
            }
        },
        |outcome| {
            let (block, analyzed) = match outcome {
                Ok(record) => (formatter::format_metadata_block(&record), true),
                Err((path, reason)) => (formatter::format_analysis_error(&path, &reason), false),
            };
            match report.as_mut() {
                Some(sink) => sink.write_text(&block)?,
                None => console.write_all(block.as_bytes())?,
            }
            Ok(analyzed)
        },
    );

    progress.finish();
    let summary = tracker.finalize();
    let report_path = report.map(|sink| sink.finish(&summary)).transpose()?;
    let interrupted = driven?;

    match &report_path {
        Some(path) if !interrupted => writeln!(
            console,
            "Analysis complete. Results saved to '{}'",
            path.display()
        )?,
        Some(path) => writeln!(
            console,
            "Partial results saved to '{}' / 已保存部分结果",
            path.display()
        )?,
        None => writeln!(
            console,
            "{}",
            formatter::render_summary_table(&summary, SummaryLabels::INFO)
        )?,
    }

    Ok(BatchReport {
        summary,
        output_path: report_path,
        interrupted,
    })
}

// ==================== cover-art ====================

/// 封面图片显示/隐藏
pub fn run_cover_art(
    config: &RunConfig,
    opts: CoverArtOptions,
    console: &mut dyn Write,
    cancel: &CancelFlag,
) -> AuditResult<BatchReport> {
    let root = &config.input_path;
    let mut tracker = BatchTracker::new();
    let items = discover(
        &mut tracker,
        cover_art::scan_cover_art(root, opts.direction)?,
    );

    if items.is_empty() {
        writeln!(
            console,
            "No cover art to {} in '{}'.",
            opts.direction.verb(),
            root.display()
        )?;
        return Ok(BatchReport::empty(tracker.finalize()));
    }

    tracker.advance_to(RunPhase::Processing);
    let mut progress = progress::create_progress(
        config.progress,
        items.len() as u64,
        labels::COVER_ART,
        !opts.verbose,
    );

    // 改名失败（冲突或I/O错误）全部按单文件跳过处理
    let driven = drive(
        &items,
        &mut tracker,
        progress.as_mut(),
        cancel,
        |item| Ok((item.path().to_path_buf(), cover_art::normalize(item, opts.direction))),
        |(path, outcome)| {
            let (line, renamed) = match outcome {
                Ok(RenameOutcome::Renamed { from, to }) => (
                    format!("RENAMED {} -> {}", from.display(), to.display()),
                    true,
                ),
                Ok(RenameOutcome::Unchanged(path)) => {
                    (format!("UNCHANGED {}", path.display()), true)
                }
                Err(e) => {
                    tracing::debug!(file = %path.display(), error = %e, "rename skipped");
                    (format!("SKIPPED {}: {e}", path.display()), false)
                }
            };
            if opts.verbose {
                writeln!(console, "{line}")?;
            }
            Ok(renamed)
        },
    );

    progress.finish();
    let summary = tracker.finalize();
    let interrupted = driven?;

    writeln!(
        console,
        "{}",
        formatter::render_summary_table(&summary, SummaryLabels::COVER_ART)
    )?;
    if !interrupted {
        writeln!(
            console,
            "Cover art {} complete. Renamed: {}, Skipped: {}",
            opts.direction.verb(),
            summary.passed,
            summary.failed
        )?;
    }

    Ok(BatchReport {
        summary,
        output_path: None,
        interrupted,
    })
}
