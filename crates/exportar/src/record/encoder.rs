//! Encoder process supervision.
//!
//! The recorder streams PNG frames into an external `ffmpeg` over its
//! standard input; ffmpeg stitches them into an H.264 MP4. Stdout is
//! discarded, stderr is line-accumulated so a non-zero exit can surface
//! something better than an exit code. The frame sink is a trait so the
//! recorder loop can be exercised against an in-memory sink in tests.

use crate::result::{ExportError, ExportResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};

/// Default encoder binary
pub const FFMPEG_BINARY: &str = "ffmpeg";

/// Destination for captured PNG frames
#[async_trait]
pub trait FrameSink: Send {
    /// Write one PNG frame, waiting out pipe backpressure
    async fn write_frame(&mut self, png: &[u8]) -> ExportResult<()>;

    /// Close the input and wait for the encoder to finish successfully
    async fn finish(&mut self) -> ExportResult<()>;

    /// Close the input and reap the encoder, swallowing its exit error
    /// (used when the capture itself already failed)
    async fn abort(&mut self);
}

/// Check that the encoder binary is invocable (`ffmpeg --version`)
pub async fn probe_encoder(binary: &str) -> ExportResult<()> {
    let status = Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => Ok(()),
        _ => Err(ExportError::environment(
            "mp4 export requires ffmpeg on PATH (or EXPORTAR_FFMPEG pointing at it)",
        )),
    }
}

/// Arguments for the image-pipe to MP4 invocation.
///
/// When `speedup > 1` a `setpts=PTS/<k>` filter compresses the encoded
/// timeline back to real time after motion-dilated capture, and the
/// output rate is re-asserted.
#[must_use]
pub fn encoder_args(fps: u32, speedup: f64, output: &Path) -> Vec<String> {
    let mut args = vec![
        "-f".into(),
        "image2pipe".into(),
        "-framerate".into(),
        fps.to_string(),
        "-vcodec".into(),
        "png".into(),
        "-i".into(),
        "-".into(),
        "-an".into(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "veryfast".into(),
    ];
    if speedup > 1.0 {
        args.push("-vf".into());
        args.push(format!("setpts=PTS/{speedup}"));
        args.push("-r".into());
        args.push(fps.to_string());
    }
    args.extend([
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-movflags".into(),
        "+faststart".into(),
        "-y".into(),
        output.display().to_string(),
    ]);
    args
}

/// A supervised ffmpeg child process
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<tokio::task::JoinHandle<String>>,
    frames_written: u64,
}

impl FfmpegEncoder {
    /// Spawn the encoder for the given output
    pub async fn spawn(fps: u32, speedup: f64, output: &Path) -> ExportResult<Self> {
        let binary = std::env::var("EXPORTAR_FFMPEG").unwrap_or_else(|_| FFMPEG_BINARY.into());
        probe_encoder(&binary).await?;

        let mut child = Command::new(&binary)
            .args(encoder_args(fps, speedup, output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExportError::Encoder {
                message: format!("failed to spawn {binary}: {e}"),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ExportError::Encoder {
            message: "encoder stdin unavailable".to_string(),
        })?;
        let stderr = child.stderr.take();

        let stderr_task = stderr.map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut collected = String::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    collected.push_str(&line);
                    collected.push('\n');
                }
                collected
            })
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_task,
            frames_written: 0,
        })
    }

    /// Frames written so far
    #[must_use]
    pub const fn frames_written(&self) -> u64 {
        self.frames_written
    }

    async fn collect_stderr(&mut self) -> String {
        match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        }
    }

    async fn wait_checked(&mut self) -> ExportResult<()> {
        let status = self.child.wait().await.map_err(|e| ExportError::Encoder {
            message: e.to_string(),
        })?;
        if status.success() {
            return Ok(());
        }
        let stderr = self.collect_stderr().await;
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            match status.code() {
                Some(code) => format!("encoder exited with code {code}"),
                None => "encoder terminated by signal".to_string(),
            }
        } else {
            stderr.to_string()
        };
        Err(ExportError::Encoder { message })
    }
}

#[async_trait]
impl FrameSink for FfmpegEncoder {
    async fn write_frame(&mut self, png: &[u8]) -> ExportResult<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| ExportError::Encoder {
            message: "encoder input already closed".to_string(),
        })?;
        // write_all suspends while the pipe is full, which is the
        // backpressure wait.
        stdin.write_all(png).await.map_err(|e| ExportError::Encoder {
            message: format!("frame write failed: {e}"),
        })?;
        self.frames_written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> ExportResult<()> {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }
        self.wait_checked().await
    }

    async fn abort(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }
        let _ = self.child.wait().await;
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

/// In-memory sink recording every frame, for recorder tests
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Frames in write order
    pub frames: Vec<Vec<u8>>,
    /// Whether `finish` ran
    pub finished: bool,
    /// Whether `abort` ran
    pub aborted: bool,
}

impl MemorySink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn write_frame(&mut self, png: &[u8]) -> ExportResult<()> {
        self.frames.push(png.to_vec());
        Ok(())
    }

    async fn finish(&mut self) -> ExportResult<()> {
        self.finished = true;
        Ok(())
    }

    async fn abort(&mut self) {
        self.aborted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_without_speedup() {
        let args = encoder_args(30, 1.0, &PathBuf::from("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.starts_with("-f image2pipe -framerate 30 -vcodec png -i -"));
        assert!(joined.contains("-c:v libx264 -preset veryfast"));
        assert!(joined.contains("-pix_fmt yuv420p -movflags +faststart"));
        assert!(!joined.contains("setpts"));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_args_with_speedup_adds_setpts_and_rate() {
        let args = encoder_args(24, 2.0, &PathBuf::from("clip.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-vf setpts=PTS/2 -r 24"));
        // Filter precedes the pixel format / container flags
        let vf = joined.find("setpts").unwrap();
        let pix = joined.find("yuv420p").unwrap();
        assert!(vf < pix);
    }

    #[tokio::test]
    async fn test_memory_sink_counts_frames_in_order() {
        let mut sink = MemorySink::new();
        sink.write_frame(&[1]).await.unwrap();
        sink.write_frame(&[2]).await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.frames, vec![vec![1], vec![2]]);
        assert!(sink.finished);
        assert!(!sink.aborted);
    }

    #[tokio::test]
    async fn test_probe_missing_binary_is_environment_error() {
        let err = probe_encoder("definitely-not-a-real-encoder-binary")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ffmpeg"));
        assert!(err.is_request_error());
    }
}
