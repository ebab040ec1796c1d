//! Single-frame extraction from videos via an external decoder.
//!
//! Runs `ffmpeg -y -ss <seek> -i <video> -frames:v 1 -f image2 -vcodec png
//! <tmp>/frame.png` and decodes the PNG. The child is polled until it exits
//! or the timeout passes, in which case it is killed and the file fails.
//!
//! Only the direct child is killed on timeout. If the configured binary is a
//! wrapper script, processes it started keep running until they exit on
//! their own; point `ffmpeg_path` at the decoder itself.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;
use tempfile::TempDir;

use super::MediaError;
use crate::config::Settings;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Extracts one frame of a video as an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameExtractor {
    binary: PathBuf,
    timeout: Duration,
    seek: String,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FrameExtractor {
    /// Use `binary` with a 15 s timeout, seeking to one second.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(15),
            seek: "00:00:01.000".to_string(),
        }
    }

    /// Build from settings, honoring `DUPESWEEP_FFMPEG_PATH`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.ffmpeg_binary())
            .with_timeout(Duration::from_secs(settings.video_timeout_secs))
            .with_seek(settings.video_seek.clone())
    }

    /// Kill the decoder after `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Position of the extracted frame, in decoder syntax.
    #[must_use]
    pub fn with_seek(mut self, seek: impl Into<String>) -> Self {
        self.seek = seek.into();
        self
    }

    /// Decoder binary.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Extract and decode the frame of `video`.
    ///
    /// # Errors
    ///
    /// - [`MediaError::DecoderMissing`] if the binary cannot be started
    /// - [`MediaError::DecoderTimeout`] if it outlives the timeout
    /// - [`MediaError::DecoderFailed`] on a non-zero exit
    /// - [`MediaError::Decode`] if the produced frame is unreadable
    pub fn extract_frame(&self, video: &Path) -> Result<DynamicImage, MediaError> {
        let workdir = TempDir::new().map_err(|source| MediaError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let frame = workdir.path().join("frame.png");

        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .args(["-ss", self.seek.as_str(), "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-f", "image2", "-vcodec", "png"])
            .arg(&frame)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            // Keep terminal Ctrl+C away from the child
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        log::debug!("Extracting frame from {}", video.display());
        let child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                MediaError::DecoderMissing(self.binary.clone())
            }
            _ => MediaError::Io {
                path: self.binary.clone(),
                source: e,
            },
        })?;

        let status = self.wait_with_deadline(child, video)?;
        if !status.success() {
            return Err(MediaError::DecoderFailed {
                path: video.to_path_buf(),
                status: status.to_string(),
            });
        }

        image::open(&frame).map_err(|source| MediaError::Decode {
            path: video.to_path_buf(),
            source,
        })
    }

    fn wait_with_deadline(
        &self,
        mut child: Child,
        video: &Path,
    ) -> Result<ExitStatus, MediaError> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(source) => {
                    return Err(MediaError::Io {
                        path: video.to_path_buf(),
                        source,
                    })
                }
            }

            if started.elapsed() >= self.timeout {
                log::warn!(
                    "Frame decoder exceeded {}s on {}, killing it",
                    self.timeout.as_secs(),
                    video.display()
                );
                // Kills the direct child only; its own children are not signalled
                let _ = child.kill();
                let _ = child.wait();
                return Err(MediaError::DecoderTimeout {
                    path: video.to_path_buf(),
                    secs: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let extractor = FrameExtractor::default();
        assert_eq!(extractor.binary(), Path::new("ffmpeg"));
        assert_eq!(extractor.timeout, Duration::from_secs(15));
        assert_eq!(extractor.seek, "00:00:01.000");
    }

    #[test]
    fn test_missing_binary() {
        let extractor = FrameExtractor::new("/nonexistent/dupesweep/ffmpeg");
        let err = extractor
            .extract_frame(Path::new("/tmp/clip.mp4"))
            .unwrap_err();
        assert!(matches!(err, MediaError::DecoderMissing(_)));
    }

    #[cfg(unix)]
    fn fake_decoder(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("fake-ffmpeg");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_decoder() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = fake_decoder(dir.path(), "sleep 5");
        let extractor = FrameExtractor::new(script).with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let err = extractor.extract_frame(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, MediaError::DecoderTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_timeout_reaps_direct_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let pid_file = dir.path().join("pid");
        let script = fake_decoder(
            dir.path(),
            &format!("echo $$ > '{}'\nexec sleep 5", pid_file.display()),
        );
        let extractor = FrameExtractor::new(script).with_timeout(Duration::from_millis(300));

        let err = extractor.extract_frame(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, MediaError::DecoderTimeout { secs: 0, .. }));

        // `exec` keeps the pid, so the killed and reaped child is gone
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        assert!(!Path::new(&format!("/proc/{}", pid.trim())).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_decoder() {
        // `false` ignores its arguments and exits 1
        let err = FrameExtractor::new("false")
            .extract_frame(Path::new("clip.mp4"))
            .unwrap_err();
        assert!(matches!(err, MediaError::DecoderFailed { .. }));
    }
}
