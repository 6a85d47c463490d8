//! Transcoder stand-in for testing.

use crate::error::{ErrorKind, Result};
use crate::{Tags, Transcoder};
use async_trait::async_trait;
use bilicache_fragment::{Container, PatchedStream};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded [`Transcoder::transcode`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub output: PathBuf,
    pub container: Container,
    pub input: Vec<u8>,
    pub tags: Tags,
}

/// Records every job and "transcodes" by writing the patched stream verbatim
/// to the output path.
///
/// # Examples
///
/// ```
/// use bilicache_transcode::{MockTranscoder, Tags, Transcoder};
/// use bilicache_fragment::{Container, PatchedStream};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let dir = tempfile::tempdir().unwrap();
/// let mock = MockTranscoder::default().with_failure("Broken Episode");
/// let tags = Tags { title: Some("Broken Episode".into()), ..Tags::default() };
/// let stream = PatchedStream::new(Container::Mp4);
/// assert!(mock.transcode(&stream, &dir.path().join("x.mp3"), &tags).await.is_err());
/// assert_eq!(mock.jobs().len(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockTranscoder {
    failing: BTreeSet<String>,
    empty_output: bool,
    broken_pipe: bool,
    hang: bool,
    jobs: Mutex<Vec<Job>>,
}
impl MockTranscoder {
    /// Fail, FFmpeg style, any job whose title tag equals `title`.
    pub fn with_failure(mut self, title: impl Into<String>) -> Self {
        self.failing.insert(title.into());
        self
    }

    /// Succeed without writing a single byte.
    pub fn with_empty_output(mut self) -> Self {
        self.empty_output = true;
        self
    }

    /// Fail every job as if the pipe to the transcoder broke.
    pub fn with_broken_pipe(mut self) -> Self {
        self.broken_pipe = true;
        self
    }

    /// Write half of the stream, then never finish.
    pub fn with_hang(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Jobs received so far, in call order.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    fn extension(&self) -> &str {
        "mp3"
    }

    async fn transcode(&self, input: &PatchedStream, output: &Path, tags: &Tags) -> Result<()> {
        let data: Vec<u8> = input.chunks().flatten().copied().collect();
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(Job { output: output.to_path_buf(), container: input.container(), input: data.clone(), tags: tags.clone() });
        }
        if tags.title.as_ref().is_some_and(|title| self.failing.contains(title)) {
            exn::bail!(ErrorKind::Failed("pipe:0: Invalid data found when processing input".to_string()));
        }
        if self.broken_pipe {
            exn::bail!(ErrorKind::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)));
        }
        if self.hang {
            tokio::fs::write(output, &data[..data.len() / 2]).await.map_err(ErrorKind::Io)?;
            std::future::pending::<()>().await;
        }
        let data = if self.empty_output { Vec::new() } else { data };
        Ok(tokio::fs::write(output, data).await.map_err(ErrorKind::Io)?)
    }
}
