//! 中断处理模块
//!
//! 第一次 Ctrl+C 只设置取消标志，批处理器在下一个文件开始前检查并收尾；
//! 第二次 Ctrl+C 直接以 130 退出。
//! 外部工具运行在独立进程组中，不直接收到信号，由探测器在看到取消标志后终止。

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tokio::signal;

/// 中断退出码（128 + SIGINT）
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// 共享取消标志
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 安装 Ctrl+C 监听（后台线程 + 单线程tokio运行时）
pub fn install() -> io::Result<CancelFlag> {
    let flag = CancelFlag::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let listener = flag.clone();
    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                if let Err(e) = signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                tracing::debug!("received Ctrl+C, cancelling batch");
                listener.cancel();

                if signal::ctrl_c().await.is_ok() {
                    eprintln!("\nQuitting job...");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            });
        })?;

    Ok(flag)
}
