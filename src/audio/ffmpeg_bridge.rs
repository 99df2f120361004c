//! FFmpeg桥接模块
//!
//! 通过子进程调用 ffmpeg / ffprobe 完成完整性校验和元数据探测。
//! 文件损坏属于正常的 Failed 结论，只有工具本身无法启动才返回致命错误。

use crate::error::{self, AuditError, AuditResult};
use crate::tools::constants::defaults;
use crate::tools::interrupt::CancelFlag;
use serde::Deserialize;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::format::{ProbeResult, StreamInfo};

/// FFmpeg安装指南（跨平台）
pub const FFMPEG_INSTALL_GUIDE: &str = r#"
FFmpeg is required for integrity checks and metadata analysis / 需要安装FFmpeg（含ffprobe）

Installation / 安装方法:
  macOS:   brew install ffmpeg
  Windows: https://www.gyan.dev/ffmpeg/builds/ (推荐Full版本)
           或使用: winget install Gyan.FFmpeg
  Linux:
    - Ubuntu/Debian: sudo apt install ffmpeg
    - Fedora/RHEL:   sudo dnf install ffmpeg
    - Arch:          sudo pacman -S ffmpeg

Official site / 官方网站: https://ffmpeg.org/download.html
"#;

/// 外部工具
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }

    /// 在PATH中查找工具（批处理开始前调用一次）
    pub fn locate(self) -> AuditResult<PathBuf> {
        which::which(self.name()).map_err(|e| {
            tracing::debug!(tool = self.name(), error = %e, "tool lookup failed");
            AuditError::ToolUnavailable { tool: self.name() }
        })
    }
}

/// 单文件探测接口
///
/// 批处理器只依赖此trait，测试中可以用进程内实现替换真实的 FFmpeg。
///
/// # 错误约定
///
/// - `verify`：文件损坏、工具超时都返回 `Ok(ProbeResult)`（Failed），
///   只有无法启动工具时返回 `Err`（致命）
/// - `inspect`：文件无法探测返回非致命错误（`ProbeFailed` / `ToolTimeout`），
///   由调用方通过 [`AuditError::is_fatal`] 区分
pub trait MediaProbe {
    /// 完整解码一次，判断文件是否完好
    fn verify(&self, path: &Path) -> AuditResult<ProbeResult>;

    /// 读取流参数（编解码器、比特率、采样率、位深、声道数）
    fn inspect(&self, path: &Path) -> AuditResult<StreamInfo>;
}

/// 基于 ffmpeg / ffprobe 子进程的探测实现
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
    /// 单次调用的超时，None 表示无限等待
    timeout: Option<Duration>,
    /// 收到取消时终止正在运行的工具
    cancel: Option<CancelFlag>,
}

impl FfmpegProbe {
    /// 用于完整性检查：要求 ffmpeg 可用
    pub fn for_integrity(timeout: Option<Duration>) -> AuditResult<Self> {
        Ok(Self {
            ffmpeg: Some(Tool::Ffmpeg.locate()?),
            ffprobe: None,
            timeout,
            cancel: None,
        })
    }

    /// 用于元数据分析：要求 ffprobe 可用
    pub fn for_metadata(timeout: Option<Duration>) -> AuditResult<Self> {
        Ok(Self {
            ffmpeg: None,
            ffprobe: Some(Tool::Ffprobe.locate()?),
            timeout,
            cancel: None,
        })
    }

    /// 使用指定的可执行文件路径（便携部署或测试替身）
    pub fn with_paths(
        ffmpeg: Option<PathBuf>,
        ffprobe: Option<PathBuf>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            timeout,
            cancel: None,
        }
    }

    /// 绑定取消标志：批处理被中断时立即终止进行中的工具
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn run(&self, tool: Tool, program: &Path, args: &[&OsStr]) -> AuditResult<ToolRun> {
        run_tool(program, args, self.timeout, self.cancel.as_ref()).map_err(|source| {
            AuditError::ToolInvocation {
                tool: tool.name().to_string(),
                source,
            }
        })
    }

    fn program(&self, tool: Tool) -> AuditResult<&Path> {
        let path = match tool {
            Tool::Ffmpeg => self.ffmpeg.as_deref(),
            Tool::Ffprobe => self.ffprobe.as_deref(),
        };
        path.ok_or(AuditError::ToolUnavailable { tool: tool.name() })
    }

    fn timeout_error(&self, tool: Tool) -> AuditError {
        AuditError::ToolTimeout {
            tool: tool.name().to_string(),
            seconds: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
        }
    }
}

impl MediaProbe for FfmpegProbe {
    fn verify(&self, path: &Path) -> AuditResult<ProbeResult> {
        let program = self.program(Tool::Ffmpeg)?;
        let args = [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-i"),
            path.as_os_str(),
            OsStr::new("-f"),
            OsStr::new("null"),
            OsStr::new("-"),
        ];

        tracing::debug!(file = %path.display(), "verifying with ffmpeg");
        let output = match self.run(Tool::Ffmpeg, program, &args)? {
            ToolRun::Completed(output) => output,
            ToolRun::TimedOut => {
                tracing::warn!(file = %path.display(), "ffmpeg timed out");
                return Ok(ProbeResult::failed(
                    path,
                    self.timeout_error(Tool::Ffmpeg).to_string(),
                ));
            }
            ToolRun::Cancelled => return Ok(ProbeResult::failed(path, CANCELLED_DETAIL)),
        };

        Ok(classify_integrity(path, &output))
    }

    fn inspect(&self, path: &Path) -> AuditResult<StreamInfo> {
        let program = self.program(Tool::Ffprobe)?;
        let args = [
            OsStr::new("-v"),
            OsStr::new("quiet"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_format"),
            OsStr::new("-show_streams"),
            path.as_os_str(),
        ];

        tracing::debug!(file = %path.display(), "probing with ffprobe");
        let output = match self.run(Tool::Ffprobe, program, &args)? {
            ToolRun::Completed(output) => output,
            ToolRun::TimedOut => return Err(self.timeout_error(Tool::Ffprobe)),
            ToolRun::Cancelled => {
                return Err(AuditError::ProbeFailed(CANCELLED_DETAIL.to_string()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if stderr.trim().is_empty() {
                format!("ffprobe exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(AuditError::ProbeFailed(reason));
        }

        parse_ffprobe_json(&output.stdout)
    }
}

/// 根据 ffmpeg 的退出状态和错误输出给出结论
///
/// 退出码非零或 stderr 有任何内容都视为 Failed（`-v error` 下只有错误才会输出）。
fn classify_integrity(path: &Path, output: &ToolOutput) -> ProbeResult {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    if !stderr.is_empty() {
        ProbeResult::failed(path, stderr)
    } else if !output.status.success() {
        ProbeResult::failed(path, format!("ffmpeg exited with {}", output.status))
    } else {
        ProbeResult::passed(path)
    }
}

// ==================== 子进程执行 ====================

/// 被取消的调用的结论（批处理器会丢弃该结果）
const CANCELLED_DETAIL: &str = "cancelled / 已取消";

/// 子进程的完整输出
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// 子进程执行结果
#[derive(Debug)]
pub(crate) enum ToolRun {
    Completed(ToolOutput),
    /// 超过时限，进程已被终止
    TimedOut,
    /// 收到取消，进程已被终止
    Cancelled,
}

/// 启动外部工具并在限定时间内等待其结束
///
/// stdout/stderr 由独立线程读取，避免管道写满导致子进程阻塞。
/// Unix 下子进程放入独立进程组，终端的 Ctrl+C 只送达本程序，由取消标志终止子进程。
/// 超时或取消时不等待读取线程：工具派生的后代进程可能仍持有管道。
/// 返回的 `io::Error` 只表示无法启动或等待进程。
pub(crate) fn run_tool<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    timeout: Option<Duration>,
    cancel: Option<&CancelFlag>,
) -> std::io::Result<ToolRun> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command.spawn()?;

    let stdout_reader = child.stdout.take().map(drain_pipe);
    let stderr_reader = child.stderr.take().map(drain_pipe);

    let ended = match (timeout, cancel) {
        (None, None) => WaitEnd::Exited(child.wait()?),
        _ => wait_until(&mut child, timeout, cancel)?,
    };

    let status = match ended {
        WaitEnd::Exited(status) => status,
        stopped => {
            let _ = child.kill();
            let _ = child.wait();
            drop(stdout_reader);
            drop(stderr_reader);
            return Ok(match stopped {
                WaitEnd::Cancelled => ToolRun::Cancelled,
                _ => ToolRun::TimedOut,
            });
        }
    };

    Ok(ToolRun::Completed(ToolOutput {
        status,
        stdout: collect_pipe(stdout_reader),
        stderr: collect_pipe(stderr_reader),
    }))
}

enum WaitEnd {
    Exited(ExitStatus),
    DeadlinePassed,
    Cancelled,
}

fn wait_until(
    child: &mut Child,
    limit: Option<Duration>,
    cancel: Option<&CancelFlag>,
) -> std::io::Result<WaitEnd> {
    let poll = Duration::from_millis(defaults::TOOL_POLL_INTERVAL_MS);
    let started = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(WaitEnd::Exited(status));
        }
        if cancel.is_some_and(CancelFlag::is_cancelled) {
            return Ok(WaitEnd::Cancelled);
        }
        let elapsed = started.elapsed();
        let nap = match limit {
            Some(limit) if elapsed >= limit => return Ok(WaitEnd::DeadlinePassed),
            Some(limit) => poll.min(limit - elapsed),
            None => poll,
        };
        thread::sleep(nap);
    }
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn collect_pipe(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

// ==================== ffprobe JSON 解析 ====================

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    bits_per_raw_sample: Option<String>,
    bits_per_sample: Option<u16>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    bit_rate: Option<String>,
}

/// 解析 `ffprobe -print_format json -show_format -show_streams` 的输出
///
/// 优先选择第一条音频流（部分MP3/M4A把封面作为第0条视频流），
/// 没有标注类型时退回第0条流。
pub fn parse_ffprobe_json(raw: &[u8]) -> AuditResult<StreamInfo> {
    let parsed: FfprobeOutput = serde_json::from_slice(raw)
        .map_err(|e| error::probe_failed("Unreadable ffprobe output / ffprobe输出无法解析", e))?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .or_else(|| parsed.streams.first())
        .ok_or_else(|| AuditError::ProbeFailed("No streams found / 未找到音频流".to_string()))?;

    let bit_depth = parse_number::<u16>(stream.bits_per_raw_sample.as_deref())
        .filter(|&bits| bits > 0)
        .or(stream.bits_per_sample.filter(|&bits| bits > 0));

    let bit_rate = parsed
        .format
        .as_ref()
        .and_then(|f| parse_number::<u64>(f.bit_rate.as_deref()))
        .or_else(|| parse_number::<u64>(stream.bit_rate.as_deref()));

    Ok(StreamInfo {
        codec: stream.codec_name.clone(),
        bit_rate,
        sample_rate: parse_number::<u32>(stream.sample_rate.as_deref()),
        bit_depth,
        channels: stream.channels,
    })
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse::<T>().ok())
}
