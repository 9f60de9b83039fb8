//! 流式命令执行：启动 opkg，边读边转发 stdout / stderr，退出后汇总结果

use super::types::CommandResult;
use crate::error::{OpkgError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

pub const DEFAULT_EXECUTABLE: &str = "/usr/bin/opkg";

const READ_CHUNK: usize = 8192;

/// 实时输出的接收端，每收到一块数据调用一次
pub trait OutputSink: Send {
    fn write_chunk(&mut self, chunk: &[u8]);

    /// 流结束时调用一次
    fn finish(&mut self) {}
}

impl<F> OutputSink for F
where
    F: FnMut(&[u8]) + Send,
{
    fn write_chunk(&mut self, chunk: &[u8]) {
        self(chunk)
    }
}

/// 把输出块按文本转发到 channel（例如交给 UI 线程渲染）
///
/// 跨读取边界的多字节字符会先暂存，凑齐后再发送。
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
    pending: Vec<u8>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tx,
            pending: Vec::new(),
        }
    }

    fn send(&self, text: String) {
        // 接收端已关闭时丢弃即可，结果仍会累积到缓冲区
        if !text.is_empty() {
            let _ = self.tx.send(text);
        }
    }
}

impl OutputSink for ChannelSink {
    fn write_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(complete) => {
                    text.push_str(complete);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // 真正的非法字节：替换后继续解码
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        // 末尾字符不完整，留到下一块
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        self.send(text);
    }

    fn finish(&mut self) {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.send(rest);
    }
}

/// 执行一次 opkg 调用。退出码 0 返回 `Ok`，否则返回 `OpkgError::Exit`
pub trait CommandRunner {
    fn run(
        &self,
        argv: Vec<String>,
        stdout: Option<Box<dyn OutputSink>>,
        stderr: Option<Box<dyn OutputSink>>,
    ) -> impl Future<Output = Result<CommandResult>> + Send;
}

/// 通过子进程执行真实的 opkg 可执行文件
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: PathBuf,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE)
    }
}

impl ProcessRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// 只影响之后发起的调用
    pub fn set_executable(&mut self, executable: impl Into<PathBuf>) {
        self.executable = executable.into();
    }
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        argv: Vec<String>,
        stdout: Option<Box<dyn OutputSink>>,
        stderr: Option<Box<dyn OutputSink>>,
    ) -> impl Future<Output = Result<CommandResult>> + Send {
        // 在调用开始时读取路径，之后的修改不影响本次调用
        let executable = self.executable.clone();
        async move { run_process(&executable, &argv, stdout, stderr).await }
    }
}

/// 读取一个管道直到 EOF；每块先交给 sink，再追加到缓冲区
async fn drain_stream<R>(stream: Option<R>, mut sink: Option<Box<dyn OutputSink>>) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let Some(mut reader) = stream else {
        return Ok(collected);
    };

    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        let chunk = &buffer[..n];
        if let Some(sink) = sink.as_mut() {
            sink.write_chunk(chunk);
        }
        collected.extend_from_slice(chunk);
    }
    if let Some(sink) = sink.as_mut() {
        sink.finish();
    }
    Ok(collected)
}

async fn run_process(
    executable: &Path,
    argv: &[String],
    stdout_sink: Option<Box<dyn OutputSink>>,
    stderr_sink: Option<Box<dyn OutputSink>>,
) -> Result<CommandResult> {
    log::debug!("spawn {} {:?}", executable.display(), argv);

    let mut child = Command::new(executable)
        .args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| OpkgError::Spawn {
            path: executable.to_path_buf(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // 两个管道与进程退出并发等待，避免管道写满导致子进程阻塞；
    // 读取出错时 child 被丢弃，kill_on_drop 会结束仍在运行的进程
    let (all_stdout, all_stderr, status) = tokio::try_join!(
        drain_stream(stdout, stdout_sink),
        drain_stream(stderr, stderr_sink),
        async { child.wait().await.map_err(OpkgError::from) },
    )?;

    let exit_code = match status.code() {
        Some(code) => code,
        None => {
            log::warn!("{} 被信号终止: {:?}", executable.display(), argv);
            -1
        }
    };

    let result = CommandResult {
        exit_code,
        stdout: String::from_utf8_lossy(&all_stdout).into_owned(),
        stderr: String::from_utf8_lossy(&all_stderr).into_owned(),
    };

    if result.success() {
        log::debug!("{:?} 执行成功", argv);
        Ok(result)
    } else {
        log::warn!("{:?} 退出码 {}", argv, result.exit_code);
        Err(OpkgError::Exit(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sh(script: &str) -> (ProcessRunner, Vec<String>) {
        (
            ProcessRunner::new("/bin/sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    #[tokio::test]
    async fn test_success_collects_both_streams() {
        let (runner, argv) = sh("printf 'hello\\nworld\\n'; printf 'warn' >&2");
        let result = runner.run(argv, None, None).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello\nworld\n");
        assert_eq!(result.stderr, "warn");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_partial_output() {
        let (runner, argv) = sh("echo partial; echo 'not found' >&2; exit 2");
        let err = runner.run(argv, None, None).await.unwrap_err();

        match err {
            OpkgError::Exit(result) => {
                assert_eq!(result.exit_code, 2);
                assert_eq!(result.stdout, "partial\n");
                assert_eq!(result.stderr, "not found\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sinks_see_every_byte_in_order() {
        let seen = Arc::new(Mutex::new(Vec::<u8>::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = move |chunk: &[u8]| seen_clone.lock().unwrap().extend_from_slice(chunk);

        let (runner, argv) = sh("for i in 1 2 3 4 5; do echo line$i; done");
        let result = runner
            .run(argv, Some(Box::new(sink)), None)
            .await
            .unwrap();

        let seen = String::from_utf8(seen.lock().unwrap().clone()).unwrap();
        assert_eq!(seen, result.stdout);
        assert_eq!(seen, "line1\nline2\nline3\nline4\nline5\n");
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_stderr() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (runner, argv) = sh("echo oops >&2");
        let result = runner
            .run(argv, None, Some(Box::new(ChannelSink::new(tx))))
            .await
            .unwrap();

        let mut received = String::new();
        while let Ok(chunk) = rx.try_recv() {
            received.push_str(&chunk);
        }
        assert_eq!(received, "oops\n");
        assert_eq!(result.stderr, "oops\n");
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        let mut received = String::new();
        while let Ok(chunk) = rx.try_recv() {
            received.push_str(&chunk);
        }
        received
    }

    #[test]
    fn test_channel_sink_joins_split_multibyte_chars() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        let bytes = "a\u{e9}b\u{4e2d}".as_bytes();

        // 每次只写一个字节，é 与 中 都会被拆开
        for byte in bytes {
            sink.write_chunk(std::slice::from_ref(byte));
        }
        sink.finish();

        let received = drain(&mut rx);
        assert_eq!(received, "a\u{e9}b\u{4e2d}");
        assert!(!received.contains(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn test_channel_sink_replaces_invalid_and_flushes_tail() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);

        sink.write_chunk(b"ok\xffgo\xc3");
        assert_eq!(drain(&mut rx), "ok\u{fffd}go");

        // 流结束时残留的半个字符按 lossy 输出
        sink.finish();
        assert_eq!(drain(&mut rx), "\u{fffd}");
    }

    #[tokio::test]
    async fn test_channel_sink_across_read_boundary() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (runner, argv) = sh("head -c 8191 /dev/zero | tr '\\0' a; printf '\\303\\251'");
        let result = runner
            .run(argv, Some(Box::new(ChannelSink::new(tx))), None)
            .await
            .unwrap();

        let received = drain(&mut rx);
        assert!(result.stdout.ends_with('\u{e9}'));
        assert_eq!(result.stdout.len(), 8191 + 2);
        assert!(!received.contains(char::REPLACEMENT_CHARACTER));
        assert_eq!(received, result.stdout);
    }

    #[tokio::test]
    async fn test_large_concurrent_output_is_complete_and_ordered() {
        const LINES: usize = 60_000;
        const ERR_LEN: usize = 200_000;

        // stdout 写递增的行号，stderr 同时写满，两者都远超管道缓冲
        let script = format!(
            "(head -c {ERR_LEN} /dev/zero | tr '\\0' e >&2) & \
             i=0; while [ $i -lt {LINES} ]; do echo $i; i=$((i+1)); done; wait"
        );
        let expected: String = (0..LINES).map(|i| format!("{i}\n")).collect();

        let chunks = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
        let chunks_clone = Arc::clone(&chunks);
        let sink = move |chunk: &[u8]| chunks_clone.lock().unwrap().push(chunk.to_vec());

        let (runner, argv) = sh(&script);
        let result = runner
            .run(argv, Some(Box::new(sink)), None)
            .await
            .unwrap();

        let seen = chunks.lock().unwrap();
        assert!(seen.len() > 1);
        assert_eq!(seen.concat(), result.stdout.as_bytes());

        assert!(expected.len() > 64 * 1024);
        assert_eq!(result.stdout.len(), expected.len());
        assert_eq!(result.stdout, expected);
        assert_eq!(result.stderr.len(), ERR_LEN);
        assert!(result.stderr.bytes().all(|b| b == b'e'));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let runner = ProcessRunner::new("/nonexistent/opkg");
        let err = runner.run(vec!["update".into()], None, None).await.unwrap_err();
        assert!(matches!(err, OpkgError::Spawn { .. }));
    }

    #[test]
    fn test_executable_can_be_changed() {
        let mut runner = ProcessRunner::default();
        assert_eq!(runner.executable(), Path::new(DEFAULT_EXECUTABLE));
        runner.set_executable("/opt/bin/opkg");
        assert_eq!(runner.executable(), Path::new("/opt/bin/opkg"));
    }
}
