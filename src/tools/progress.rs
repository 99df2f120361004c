//! 进度指示模块
//!
//! 统一的进度接口，两种可互换的渲染实现：
//! - `AnimatedProgress`：基于 indicatif 的动画进度条
//! - `AsciiProgress`：手写的 `\r` 刷新 ASCII 进度条
//!
//! verbose 模式下使用 `HiddenProgress`，避免进度条与逐条结果输出交错。

use super::constants::defaults;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::str::FromStr;

/// 进度渲染方式（启动时选定）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    #[default]
    Animated,
    Ascii,
}

impl FromStr for ProgressKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "animated" => Ok(Self::Animated),
            "ascii" => Ok(Self::Ascii),
            other => Err(format!("unknown progress style: {other}")),
        }
    }
}

/// 进度指示接口
///
/// # 约定
///
/// - `advance` 只会增加位置，位置不会超过总数，显示的百分比单调不减
/// - 所有 `advance` 之和等于总数时，`finish` 的最终渲染显示 100%
/// - `finish` 之后不再渲染
pub trait ProgressIndicator {
    /// 前进 `by` 个单位并重新渲染
    fn advance(&mut self, by: u64);

    /// 最终渲染并释放控制台
    fn finish(&mut self);

    fn position(&self) -> u64;

    fn total(&self) -> u64;

    /// 当前百分比（总数为0时视为100%）
    fn percent(&self) -> u64 {
        percent_of(self.position(), self.total())
    }

    /// 是否会向控制台输出
    fn is_visible(&self) -> bool {
        true
    }
}

#[inline]
fn percent_of(position: u64, total: u64) -> u64 {
    if total == 0 {
        100
    } else {
        position.min(total) * 100 / total
    }
}

/// 创建进度指示器
///
/// `visible == false`（verbose 模式）时返回不输出任何内容的实现。
pub fn create_progress(
    kind: ProgressKind,
    total: u64,
    label: &str,
    visible: bool,
) -> Box<dyn ProgressIndicator> {
    if !visible {
        return Box::new(HiddenProgress::new(total));
    }
    match kind {
        ProgressKind::Animated => Box::new(AnimatedProgress::new(total, label)),
        ProgressKind::Ascii => Box::new(AsciiProgress::new(io::stdout(), total, label)),
    }
}

// ==================== indicatif 实现 ====================

/// 基于 indicatif 的动画进度条（输出到 stderr）
#[derive(Debug)]
pub struct AnimatedProgress {
    bar: ProgressBar,
    position: u64,
    total: u64,
    finished: bool,
}

impl AnimatedProgress {
    pub fn new(total: u64, label: &str) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(label.to_string());

        Self {
            bar,
            position: 0,
            total,
            finished: false,
        }
    }
}

impl ProgressIndicator for AnimatedProgress {
    fn advance(&mut self, by: u64) {
        if self.finished {
            return;
        }
        self.position = (self.position + by).min(self.total);
        self.bar.set_position(self.position);
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.position >= self.total {
            self.bar.finish();
        } else {
            // 中断：保留当前进度
            self.bar.abandon();
        }
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn total(&self) -> u64 {
        self.total
    }
}

// ==================== 手写 ASCII 实现 ====================

/// 手写 ASCII 进度条
///
/// 格式：`\r<label> [####------] 40% 4/10`，完成时换行。
pub struct AsciiProgress<W: Write> {
    out: W,
    label: String,
    position: u64,
    total: u64,
    last_percent: u64,
    finished: bool,
}

impl<W: Write> AsciiProgress<W> {
    /// 创建并立即渲染 0% 状态
    pub fn new(out: W, total: u64, label: &str) -> Self {
        let mut progress = Self {
            out,
            label: label.to_string(),
            position: 0,
            total,
            last_percent: 0,
            finished: false,
        };
        progress.render();
        progress
    }

    /// 取回输出目标（测试用）
    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self) {
        let width = defaults::ASCII_BAR_WIDTH;
        let filled = if self.total == 0 {
            width
        } else {
            (width as u64 * self.position.min(self.total) / self.total) as usize
        };
        let percent = percent_of(self.position, self.total);
        self.last_percent = self.last_percent.max(percent);

        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(width - filled));
        // 进度输出失败不影响批处理
        let _ = write!(
            self.out,
            "\r{} [{bar}] {}% {}/{}",
            self.label, self.last_percent, self.position, self.total
        );
        let _ = self.out.flush();
    }
}

impl<W: Write> ProgressIndicator for AsciiProgress<W> {
    fn advance(&mut self, by: u64) {
        if self.finished {
            return;
        }
        self.position = (self.position + by).min(self.total);
        self.render();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.render();
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn total(&self) -> u64 {
        self.total
    }
}

// ==================== 静默实现 ====================

/// 不输出任何内容（verbose 模式）
#[derive(Debug, Default)]
pub struct HiddenProgress {
    position: u64,
    total: u64,
}

impl HiddenProgress {
    pub fn new(total: u64) -> Self {
        Self { position: 0, total }
    }
}

impl ProgressIndicator for HiddenProgress {
    fn advance(&mut self, by: u64) {
        self.position = (self.position + by).min(self.total);
    }

    fn finish(&mut self) {}

    fn position(&self) -> u64 {
        self.position
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn is_visible(&self) -> bool {
        false
    }
}
