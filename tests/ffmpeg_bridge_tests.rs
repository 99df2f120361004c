//! FFmpeg桥接集成测试
//!
//! Unix 下使用 shell 脚本替身模拟 ffmpeg / ffprobe，验证子进程调用、
//! 结果分类和超时处理；系统安装了 FFmpeg 时额外验证真实解码。

use audio_audit_tool::audio::Tool;
use audio_audit_tool::{AuditError, FfmpegProbe, MediaProbe};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// 用 hound 写入一段 16-bit 立体声正弦波
fn write_test_wav(path: &Path) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..44_100 {
        let t = i as f32 / 44_100.0;
        let sample = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// 系统存在 FFmpeg 时：正常WAV通过，垃圾数据的 .flac 失败
#[test]
fn test_real_ffmpeg_when_available() {
    let Ok(probe) = FfmpegProbe::for_integrity(Some(Duration::from_secs(60))) else {
        println!("  - 未找到 FFmpeg，跳过 / ffmpeg not found, skipped");
        return;
    };
    #[cfg(unix)]
    let _ = stand_ins::scripts();

    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    write_test_wav(&wav);
    let garbage = dir.path().join("garbage.flac");
    fs::write(&garbage, b"fLaC this is definitely not a flac stream").unwrap();

    let good = probe.verify(&wav).unwrap();
    assert!(good.is_passed(), "{:?}", good.detail);

    let bad = probe.verify(&garbage).unwrap();
    assert!(!bad.is_passed());
    assert!(bad.detail.is_some());
    println!("  ✓ 真实 FFmpeg 校验结果正确");

    if Tool::Ffprobe.locate().is_ok() {
        let metadata = FfmpegProbe::for_metadata(Some(Duration::from_secs(60))).unwrap();
        let info = metadata.inspect(&wav).unwrap();
        assert_eq!(info.sample_rate, Some(44_100));
        assert_eq!(info.channels, Some(2));
        println!("  ✓ 真实 ffprobe 读取流参数正确");
    }
}

#[cfg(unix)]
mod stand_ins {
    use super::*;
    use audio_audit_tool::tools::{self, CancelFlag, CheckOptions, RunConfig, Task};
    use std::os::unix::fs::PermissionsExt;
    use std::sync::OnceLock;

    /// ffmpeg 替身：文件名含 bad 输出错误，含 silent 无输出但退出码非零，
    /// 含 slow 时派生子进程挂起（子进程继承输出管道）
    const FAKE_FFMPEG: &str = r#"#!/bin/sh
case "${4##*/}" in
  *bad*) echo "Invalid data found when processing input" >&2; exit 1 ;;
  *silent*) exit 2 ;;
  *slow*) sleep 5 ;;
esac
exit 0
"#;

    /// ffprobe 替身：文件名含 broken 时失败，否则输出封面流 + 8位FLAC音频流
    const FAKE_FFPROBE: &str = r#"#!/bin/sh
case "${7##*/}" in
  *broken*) echo "$7: Invalid data found when processing input" >&2; exit 1 ;;
esac
cat <<'JSON'
{"streams":[{"codec_type":"video","codec_name":"mjpeg"},{"codec_type":"audio","codec_name":"flac","sample_rate":"44100","channels":2,"bits_per_raw_sample":"8"}],"format":{"bit_rate":"700000"}}
JSON
"#;

    pub struct Scripts {
        _dir: tempfile::TempDir,
        pub ffmpeg: PathBuf,
        pub ffprobe: PathBuf,
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// 所有测试共享同一组脚本（在任何子进程启动前写好，避免 ETXTBSY）
    pub fn scripts() -> &'static Scripts {
        static SCRIPTS: OnceLock<Scripts> = OnceLock::new();
        SCRIPTS.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let ffmpeg = write_script(dir.path(), "ffmpeg", FAKE_FFMPEG);
            let ffprobe = write_script(dir.path(), "ffprobe", FAKE_FFPROBE);
            Scripts {
                _dir: dir,
                ffmpeg,
                ffprobe,
            }
        })
    }

    fn probe(timeout: Option<Duration>) -> FfmpegProbe {
        let scripts = scripts();
        FfmpegProbe::with_paths(
            Some(scripts.ffmpeg.clone()),
            Some(scripts.ffprobe.clone()),
            timeout,
        )
    }

    #[test]
    fn test_verify_classifies_outcomes() {
        let probe = probe(Some(Duration::from_secs(30)));

        let ok = probe.verify(Path::new("/music/ok.flac")).unwrap();
        assert!(ok.is_passed());
        assert_eq!(ok.detail, None);

        let bad = probe.verify(Path::new("/music/bad.flac")).unwrap();
        assert!(!bad.is_passed());
        assert_eq!(
            bad.detail.as_deref(),
            Some("Invalid data found when processing input")
        );

        let silent = probe.verify(Path::new("/music/silent.flac")).unwrap();
        assert!(!silent.is_passed());
        println!("  ✓ 替身 ffmpeg 结果分类正确");
    }

    #[test]
    fn test_verify_timeout_is_item_failure() {
        let probe = probe(Some(Duration::from_millis(300)));

        let started = Instant::now();
        let result = probe.verify(Path::new("/music/slow.flac")).unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!result.is_passed());
        assert!(result.detail.unwrap().contains("timed out"));
        println!("  ✓ 超时计为单文件失败");
    }

    #[test]
    fn test_inspect_parses_audio_stream() {
        let probe = probe(Some(Duration::from_secs(30)));

        let info = probe.inspect(Path::new("/music/track.flac")).unwrap();
        assert_eq!(info.codec.as_deref(), Some("flac"));
        assert_eq!(info.bit_depth, Some(8));
        assert_eq!(info.bit_rate, Some(700_000));

        let broken = probe.inspect(Path::new("/music/broken.flac"));
        match broken {
            Err(e @ AuditError::ProbeFailed(_)) => {
                assert!(!e.is_fatal());
                assert!(e.to_string().contains("Invalid data"));
            }
            other => panic!("expected ProbeFailed, got {other:?}"),
        }
        println!("  ✓ 替身 ffprobe 输出解析正确");
    }

    #[test]
    fn test_missing_binary_is_invocation_error() {
        let _ = scripts();
        let probe = FfmpegProbe::with_paths(
            Some(PathBuf::from("/nonexistent/ffmpeg")),
            None,
            None,
        );
        let result = probe.verify(Path::new("a.flac"));
        match result {
            Err(e @ AuditError::ToolInvocation { .. }) => assert!(e.is_fatal()),
            other => panic!("expected ToolInvocation, got {other:?}"),
        }
        println!("  ✓ 无法启动工具为致命错误");
    }

    /// 批处理 + 替身工具：超时文件计入失败，不中断批次
    #[test]
    fn test_check_batch_with_stand_ins() {
        let probe = probe(Some(Duration::from_millis(300)));
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir_all(&music).unwrap();
        for name in ["1-ok.flac", "2-bad.flac", "3-slow.flac", "4-ok.mp3"] {
            fs::write(music.join(name), b"x").unwrap();
        }

        let opts = CheckOptions::default();
        let mut config = RunConfig::new(&music, Task::Check(opts));
        config.log_folder = dir.path().join("Logs");

        let started = Instant::now();
        let report =
            tools::run_check(&config, opts, &probe, &mut Vec::new(), &CancelFlag::new()).unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 2);

        let log = fs::read_to_string(report.output_path.unwrap()).unwrap();
        assert!(log.contains("3-slow.flac: ffmpeg timed out"));
        println!("  ✓ 批处理在超时和损坏文件后继续");
    }

    /// 处理中途取消：进行中的工具被终止，其结果不写入日志
    #[test]
    fn test_cancel_stops_in_flight_tool() {
        let cancel = CancelFlag::new();
        let probe = probe(None).with_cancel(cancel.clone());
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir_all(&music).unwrap();
        for name in ["1-ok.flac", "2-slow.flac", "3-ok.flac"] {
            fs::write(music.join(name), b"x").unwrap();
        }

        let opts = CheckOptions::default();
        let mut config = RunConfig::new(&music, Task::Check(opts));
        config.log_folder = dir.path().join("Logs");

        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(500));
            trigger.cancel();
        });

        let started = Instant::now();
        let report = tools::run_check(&config, opts, &probe, &mut Vec::new(), &cancel).unwrap();
        canceller.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(report.interrupted);
        assert_eq!(report.summary.total, 1);
        let log = fs::read_to_string(report.output_path.unwrap()).unwrap();
        assert!(!log.contains("2-slow.flac"));
        assert!(!log.contains("3-ok.flac"));
        assert!(log.contains("Total files: 1"));
        println!("  ✓ 取消时终止进行中的工具并丢弃其结果");
    }
}
