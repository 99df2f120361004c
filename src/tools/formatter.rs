//! 输出格式化模块
//!
//! 负责检查结果行、汇总信息、元数据报告块的文本格式化。
//! 日志/报告文件使用纯文本格式，控制台汇总使用表格。

use super::batch_state::BatchSummary;
use crate::audio::{MetadataRecord, ProbeResult};
use chrono::{DateTime, Local};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use std::path::Path;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 汇总表中两类计数的标签
#[derive(Debug, Clone, Copy)]
pub struct SummaryLabels {
    pub passed: &'static str,
    pub failed: &'static str,
}

impl SummaryLabels {
    pub const CHECK: Self = Self {
        passed: "Passed / 通过",
        failed: "Failed / 失败",
    };
    pub const INFO: Self = Self {
        passed: "Analyzed / 已分析",
        failed: "Errors / 出错",
    };
    pub const COVER_ART: Self = Self {
        passed: "Renamed / 已改名",
        failed: "Skipped / 已跳过",
    };
}

/// 格式化单个检查结果行：`PASSED <path>` 或 `FAILED <path>: <detail>`
pub fn format_check_line(result: &ProbeResult) -> String {
    match result.detail.as_deref() {
        Some(detail) if !detail.is_empty() => {
            format!("{} {}: {detail}", result.outcome, result.path.display())
        }
        _ => format!("{} {}", result.outcome, result.path.display()),
    }
}

/// 纯文本汇总（写入日志/报告文件）
pub fn format_summary_text(summary: &BatchSummary) -> String {
    format!(
        "\nSummary:\nTotal files: {}\nPassed: {}\nFailed: {}\n",
        summary.total, summary.passed, summary.failed
    )
}

/// 控制台汇总表格
pub fn render_summary_table(summary: &BatchSummary, labels: SummaryLabels) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Summary / 汇总", "Count / 数量"]);

    let rows = [
        ("Total files / 文件总数", summary.total.to_string()),
        (labels.passed, summary.passed.to_string()),
        (labels.failed, summary.failed.to_string()),
        (
            "Elapsed (s) / 耗时",
            format!("{:.1}", summary.elapsed_seconds()),
        ),
    ];
    for (name, value) in rows {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// 元数据报告文件头部
pub fn create_report_header(source: &Path, generated_at: DateTime<Local>) -> String {
    let mut output = String::new();

    output.push_str("=====================================\n");
    output.push_str(&format!("   Audio Audit Tool v{VERSION}\n"));
    output.push_str("   Audio analysis report / 音频分析报告\n");
    output.push_str("=====================================\n");
    output.push_str(&format!(
        "Generated: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("Source: {}\n\n", source.display()));

    output
}

/// 单个文件的元数据报告块
pub fn format_metadata_block(record: &MetadataRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Analyzing: {}\n", record.path.display()));

    match record.bit_rate {
        Some(rate) => output.push_str(&format!("  Bitrate: {rate} bps\n")),
        None => output.push_str("  Bitrate: N/A\n"),
    }
    match record.sample_rate {
        Some(rate) => output.push_str(&format!("  Sample Rate: {rate} Hz\n")),
        None => output.push_str("  Sample Rate: N/A\n"),
    }
    match record.bit_depth {
        Some(depth) => output.push_str(&format!("  Bit Depth: {depth} bits\n")),
        None => output.push_str("  Bit Depth: N/A\n"),
    }
    output.push_str(&format!("  Channels: {}\n", record.channel_description()));
    output.push_str(&format!("  Codec: {}\n", record.codec_name()));

    for note in &record.notes {
        output.push_str(&format!("  [INFO] {note}\n"));
    }
    for warning in &record.warnings {
        output.push_str(&format!("  [WARNING] {warning}\n"));
    }
    output.push('\n');

    output
}

/// 单个文件分析失败时的报告块
pub fn format_analysis_error(path: &Path, reason: &str) -> String {
    format!(
        "Analyzing: {}\n  [ERROR] Failed to analyze: {reason}\n\n",
        path.display()
    )
}
