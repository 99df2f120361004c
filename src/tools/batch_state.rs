//! 批处理状态管理模块
//!
//! 单次运行的状态机（Idle → Discovering → Processing → Finalizing → Done）
//! 以及只增不减的通过/失败统计。

use chrono::{DateTime, Local};

/// 运行阶段（只能前进，不能回退）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Idle,
    Discovering,
    Processing,
    Finalizing,
    Done,
}

/// 批处理统计快照
///
/// 任意时刻都满足 `total == passed + failed`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// 已处理的文件数
    pub total: usize,
    /// 通过（或改名成功）的文件数
    pub passed: usize,
    /// 失败（或改名被跳过）的文件数
    pub failed: usize,
    pub started_at: DateTime<Local>,
    /// 仅在收尾后存在
    pub finished_at: Option<DateTime<Local>>,
}

impl BatchSummary {
    fn new(started_at: DateTime<Local>) -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: 0,
            started_at,
            finished_at: None,
        }
    }

    #[inline]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// 耗时（秒），未收尾时按当前时间计算
    pub fn elapsed_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Local::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}

/// 串行批处理统计（单线程）
///
/// 由批处理器独占，驱动运行阶段并累加计数。
#[derive(Debug)]
pub struct BatchTracker {
    phase: RunPhase,
    summary: BatchSummary,
}

impl Default for BatchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchTracker {
    /// 创建新的统计实例（Idle）
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            summary: BatchSummary::new(Local::now()),
        }
    }

    #[inline]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// 推进到下一阶段
    ///
    /// 允许跳过阶段（空工作集直接从 Discovering 进入 Finalizing），不允许回退。
    pub fn advance_to(&mut self, next: RunPhase) {
        debug_assert!(
            next > self.phase,
            "运行阶段不能回退: {:?} -> {next:?}",
            self.phase
        );
        if next <= self.phase {
            return;
        }
        if next == RunPhase::Processing {
            self.summary.started_at = Local::now();
        }
        self.phase = next;
    }

    /// 增加成功处理计数
    #[inline]
    pub fn inc_passed(&mut self) -> usize {
        self.summary.total += 1;
        self.summary.passed += 1;
        self.summary.passed
    }

    /// 增加失败计数
    #[inline]
    pub fn inc_failed(&mut self) -> usize {
        self.summary.total += 1;
        self.summary.failed += 1;
        self.summary.failed
    }

    /// 记录单个结果
    #[inline]
    pub fn record(&mut self, passed: bool) {
        if passed {
            self.inc_passed();
        } else {
            self.inc_failed();
        }
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> BatchSummary {
        self.summary.clone()
    }

    /// 收尾：记录结束时间并进入 Done
    ///
    /// 只生效一次，重复调用返回同一份快照。
    pub fn finalize(&mut self) -> BatchSummary {
        if self.phase < RunPhase::Finalizing {
            self.advance_to(RunPhase::Finalizing);
        }
        if self.summary.finished_at.is_none() {
            self.summary.finished_at = Some(Local::now());
        }
        if self.phase < RunPhase::Done {
            self.advance_to(RunPhase::Done);
        }
        self.summary.clone()
    }
}
