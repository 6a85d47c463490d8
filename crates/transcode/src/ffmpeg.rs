use crate::error::{ErrorKind, Result};
use crate::{Tags, Transcoder};
use async_trait::async_trait;
use bilicache_fragment::PatchedStream;
use exn::ResultExt;
use std::ffi::OsString;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::instrument;

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// How patched bytes reach FFmpeg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Streamed through stdin; nothing touches the disk.
    #[default]
    Pipe,
    /// Written to a temporary file first, for demuxers that need to seek.
    TempFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegOptions {
    pub codec: String,
    /// Variable bitrate quality passed to `-q:a` (lower is better for LAME).
    pub quality: u8,
    pub extension: String,
    /// Per-invocation limit, after which FFmpeg is killed.
    pub timeout: Duration,
    pub input: InputMode,
    /// Inserted just before the output path.
    pub extra_args: Vec<String>,
}
impl Default for FfmpegOptions {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_string(),
            quality: 2,
            extension: "mp3".to_string(),
            timeout: Duration::from_secs(600),
            input: InputMode::Pipe,
            extra_args: Vec::new(),
        }
    }
}

/// A verified FFmpeg executable.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
    options: FfmpegOptions,
}
impl Ffmpeg {
    /// Finds `ffmpeg` on the `PATH`.
    pub async fn discover(options: FfmpegOptions) -> Result<Self> {
        let Ok(program) = which::which("ffmpeg") else {
            tracing::info!("FFmpeg executable not found in PATH");
            exn::bail!(ErrorKind::NotFound);
        };
        Self::verify(program, options).await
    }

    /// Uses the given program, either a path or a name looked up on the `PATH`.
    pub async fn with_program(program: impl AsRef<Path>, options: FfmpegOptions) -> Result<Self> {
        let program = which::which(program.as_ref()).or_raise(|| ErrorKind::NotFound)?;
        Self::verify(program, options).await
    }

    async fn verify(program: PathBuf, options: FfmpegOptions) -> Result<Self> {
        let version = Command::new(&program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = match tokio::time::timeout(VERSION_CHECK_TIMEOUT, version).await {
            Ok(Ok(output)) if output.status.success() => output,
            _ => exn::bail!(ErrorKind::Unusable(program)),
        };
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout.lines().next().unwrap_or_default();
        tracing::debug!(program = %program.display(), version, "Transcoder verified");
        Ok(Self { program, options })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list for one invocation.
    fn arguments(&self, input: impl Into<OsString>, demuxer: Option<&str>, output: &Path, tags: &Tags) -> Vec<OsString> {
        let mut args: Vec<OsString> =
            ["-hide_banner", "-nostats", "-loglevel", "error", "-y"].into_iter().map(OsString::from).collect();
        if let Some(demuxer) = demuxer {
            args.push("-f".into());
            args.push(demuxer.into());
        }
        args.push("-i".into());
        args.push(input.into());
        let quality = self.options.quality.to_string();
        args.extend(["-vn", "-acodec", self.options.codec.as_str(), "-q:a", quality.as_str()].map(OsString::from));
        for (key, value) in tags.pairs() {
            args.push("-metadata".into());
            args.push(format!("{key}={value}").into());
        }
        args.extend(self.options.extra_args.iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run_piped(&self, input: &PatchedStream, output: &Path, tags: &Tags) -> Result<()> {
        // Without a file extension to go on the demuxer has to be named.
        let args = self.arguments("pipe:0", Some(input.container().demuxer()), output, tags);
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ErrorKind::Io)?;
        let mut stdin =
            child.stdin.take().ok_or_else(|| ErrorKind::Io(std::io::Error::other("stdin not captured")))?;
        let feed = async move {
            for chunk in input.chunks() {
                stdin.write_all(chunk).await?;
            }
            // Dropping stdin closes the pipe, which is FFmpeg's end of input.
            stdin.shutdown().await
        };
        // Feed and drain concurrently, otherwise a chatty FFmpeg blocks on a
        // full stderr pipe while we block on a full stdin pipe.
        let (fed, finished) = tokio::join!(feed, child.wait_with_output());
        let finished = finished.map_err(ErrorKind::Io)?;
        check(&finished)?;
        match fed {
            // FFmpeg may stop reading once it has what it needs.
            Err(e) if e.kind() == IoErrorKind::BrokenPipe => Ok(()),
            fed => Ok(fed.map_err(ErrorKind::Io)?),
        }
    }

    async fn run_with_tempfile(&self, input: &PatchedStream, output: &Path, tags: &Tags) -> Result<()> {
        let suffix = format!(".{}", input.container().extension());
        let temp = tempfile::Builder::new().prefix(".bilicache-").suffix(&suffix).tempfile().map_err(ErrorKind::Io)?;
        let mut file = tokio::fs::File::from_std(temp.reopen().map_err(ErrorKind::Io)?);
        for chunk in input.chunks() {
            file.write_all(chunk).await.map_err(ErrorKind::Io)?;
        }
        file.flush().await.map_err(ErrorKind::Io)?;
        drop(file);
        tracing::trace!(input = %temp.path().display(), "Patched stream written to temporary file");

        let args = self.arguments(temp.path(), None, output, tags);
        let finished = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ErrorKind::Io)?;
        check(&finished)
    }
}

/// Turns an unsuccessful exit into [`ErrorKind::Failed`] carrying stderr.
fn check(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let diagnostic = if stderr.is_empty() { output.status.to_string() } else { stderr };
    exn::bail!(ErrorKind::Failed(diagnostic))
}

#[async_trait]
impl Transcoder for Ffmpeg {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn extension(&self) -> &str {
        &self.options.extension
    }

    #[instrument(skip_all, fields(output = %output.display(), bytes = input.len()))]
    async fn transcode(&self, input: &PatchedStream, output: &Path, tags: &Tags) -> Result<()> {
        let run = async {
            match self.options.input {
                InputMode::Pipe => self.run_piped(input, output, tags).await,
                InputMode::TempFile => self.run_with_tempfile(input, output, tags).await,
            }
        };
        // Dropping the future on timeout drops the child, which kills it.
        tokio::time::timeout(self.options.timeout, run).await.or_raise(|| ErrorKind::Timeout(self.options.timeout))?
    }
}
