use crate::convert::error::{ErrorKind, Result};
use crate::convert::{Context, OnExisting};
use crate::report::Outcome;
use crate::scan::CacheEntry;
use bilicache_fragment::{PatchedStream, Position, select};
use bilicache_storage::BackendHandle;
use bilicache_transcode::Tags;
use exn::ResultExt;
use tracing::instrument;

/// Converts one entry into `<ctx.output>/<stem>.<extension>`.
///
/// Fragments are read and patched in order; if any of them is rejected the
/// transcoder is never started. The transcoder writes into a hidden temporary
/// file next to the target, which is renamed into place only once it holds a
/// non-empty result, so a failed entry leaves no output file behind.
///
/// # Errors
/// Returns the [`ErrorKind`] of the first stage that failed. Errors are scoped
/// to this entry.
#[instrument(skip_all, fields(entry = %entry.id))]
pub async fn convert_entry(backend: &BackendHandle, ctx: &Context, entry: &CacheEntry, stem: &str) -> Result<Outcome> {
    let target = ctx.target(stem);
    if ctx.existing == OnExisting::Skip
        && tokio::fs::try_exists(&target).await.or_raise(|| ErrorKind::Filesystem(target.clone()))?
    {
        tracing::debug!(output = %target.display(), "Output exists; skipping");
        return Ok(Outcome::Skipped { output: target });
    }

    let selection = select(&entry.fragments).or_raise(|| ErrorKind::NoAudioFragment)?;
    tracing::debug!(
        rule = ?selection.rule,
        variant = %selection.variant.display(),
        fragments = selection.fragments.len(),
        "Fragments selected"
    );

    let total = selection.fragments.len();
    let mut stream = PatchedStream::new(selection.container);
    let mut rejected = 0;
    let mut first_rejection = None;
    for (index, fragment) in selection.fragments.iter().enumerate() {
        let data = backend.read(&fragment.path).await.or_raise(|| ErrorKind::Filesystem(fragment.path.clone()))?;
        match ctx.patcher.patch(selection.container, data, Position::of(index)) {
            Ok(patched) => stream.push(patched),
            Err(e) => {
                tracing::warn!(path = %fragment.path.display(), reason = %*e, "Fragment rejected");
                rejected += 1;
                first_rejection.get_or_insert(e);
            },
        }
    }
    if let Some(e) = first_rejection {
        return Err(e).or_raise(|| ErrorKind::CorruptFragmentHeader { rejected, total });
    }

    let temp = tempfile::Builder::new()
        .prefix(".bilicache-")
        .suffix(&format!(".{}", ctx.transcoder.extension()))
        .tempfile_in(&ctx.output)
        .or_raise(|| ErrorKind::Filesystem(ctx.output.clone()))?
        // Only the path is needed; dropping it removes the file.
        .into_temp_path();

    if let Err(e) = ctx.transcoder.transcode(&stream, &temp, &tags(entry)).await {
        let diagnostic = (*e).to_string();
        return Err(e.raise(ErrorKind::Transcoder(diagnostic)));
    }

    let bytes = tokio::fs::metadata(&temp).await.or_raise(|| ErrorKind::Filesystem(target.clone()))?.len();
    if bytes == 0 {
        exn::bail!(ErrorKind::EmptyOutput);
    }
    temp.persist(&target).or_raise(|| ErrorKind::Filesystem(target.clone()))?;
    tracing::info!(output = %target.display(), bytes, transcoder = ctx.transcoder.name(), "Converted");
    Ok(Outcome::Converted { output: target, bytes })
}

/// Tags for the output file. Entries without metadata are only titled.
fn tags(entry: &CacheEntry) -> Tags {
    match entry.metadata.descriptor() {
        Some(descriptor) => Tags {
            title: descriptor.part.clone().or_else(|| descriptor.title.clone()),
            album: descriptor.title.clone(),
            artist: descriptor.owner.clone(),
            track: descriptor.page,
        },
        None => Tags { title: Some(entry.display_name()), ..Tags::default() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::MetadataState;
    use bilicache_descriptor::{EntryDescriptor, Schema};
    use bilicache_storage::FileInfo;
    use bilicache_storage::backend::MockBackend;
    use bilicache_transcode::MockTranscoder;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use time::OffsetDateTime;

    const FTYP: &[u8] = b"\0\0\0\x10ftypiso5\0\0\0\x01";
    const MDAT: &[u8] = b"\0\0\0\x0cmdatAAAA";

    fn first_fragment() -> Vec<u8> {
        [b"000000000".as_slice(), FTYP, MDAT].concat()
    }

    fn setup(
        files: &[(&str, Vec<u8>)],
        transcoder: MockTranscoder,
    ) -> (BackendHandle, Arc<MockTranscoder>, CacheEntry, Context, tempfile::TempDir) {
        let backend = MockBackend::with_files(files.iter().map(|(path, data)| (*path, data.clone())));
        let fragments = files
            .iter()
            .map(|(path, data)| FileInfo::new(*path, data.len() as u64, OffsetDateTime::UNIX_EPOCH))
            .collect();
        let entry = CacheEntry { id: "170001".into(), dir: PathBuf::from("170001"), fragments, metadata: MetadataState::Missing };
        let transcoder = Arc::new(transcoder);
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(transcoder.clone(), dir.path());
        (Arc::new(backend), transcoder, entry, ctx, dir)
    }

    fn outputs(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> =
            std::fs::read_dir(dir).unwrap().map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_converts() {
        let (backend, transcoder, entry, ctx, dir) =
            setup(&[("170001/80/audio.m4s", first_fragment())], MockTranscoder::default());
        let outcome = convert_entry(&backend, &ctx, &entry, "170001").await.unwrap();
        let expected = dir.path().join("170001.mp3");
        assert!(matches!(&outcome, Outcome::Converted { output, bytes: 28 } if *output == expected));
        assert_eq!(std::fs::read(&expected).unwrap(), [FTYP, MDAT].concat());
        assert_eq!(transcoder.jobs()[0].tags.title.as_deref(), Some("170001"));
        assert_eq!(outputs(dir.path()), ["170001.mp3"]);
    }

    #[tokio::test]
    async fn test_no_audio() {
        let (backend, transcoder, entry, ctx, dir) =
            setup(&[("170001/80/video.m4s", first_fragment())], MockTranscoder::default());
        let err = convert_entry(&backend, &ctx, &entry, "170001").await.unwrap_err();
        assert_eq!(*err, ErrorKind::NoAudioFragment);
        assert!(transcoder.jobs().is_empty());
        assert!(outputs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_partially_corrupt() {
        let (backend, transcoder, entry, ctx, dir) = setup(
            &[("170001/80/audio_0.m4s", first_fragment()), ("170001/80/audio_1.m4s", [b"XXXXXXXXX".as_slice(), MDAT].concat())],
            MockTranscoder::default(),
        );
        let err = convert_entry(&backend, &ctx, &entry, "170001").await.unwrap_err();
        assert_eq!(*err, ErrorKind::CorruptFragmentHeader { rejected: 1, total: 2 });
        assert!(err.is_partial());
        assert!(transcoder.jobs().is_empty());
        assert!(outputs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_transcoder_failure_leaves_nothing() {
        let (backend, _, entry, ctx, dir) =
            setup(&[("170001/80/audio.m4s", first_fragment())], MockTranscoder::default().with_failure("170001"));
        let err = convert_entry(&backend, &ctx, &entry, "170001").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transcoder(diagnostic) if diagnostic.contains("Invalid data")));
        assert!(outputs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_transcoder_io_failure_keeps_os_error() {
        let (backend, _, entry, ctx, dir) =
            setup(&[("170001/80/audio.m4s", first_fragment())], MockTranscoder::default().with_broken_pipe());
        let err = convert_entry(&backend, &ctx, &entry, "170001").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Transcoder("transcoder I/O failed: broken pipe".into()));
        assert!(outputs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_output_leaves_nothing() {
        let (backend, _, entry, ctx, dir) =
            setup(&[("170001/80/audio.m4s", first_fragment())], MockTranscoder::default().with_empty_output());
        let err = convert_entry(&backend, &ctx, &entry, "170001").await.unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyOutput);
        assert!(outputs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_existing_output() {
        let (backend, transcoder, entry, ctx, dir) =
            setup(&[("170001/80/audio.m4s", first_fragment())], MockTranscoder::default());
        std::fs::write(dir.path().join("170001.mp3"), b"old").unwrap();

        let skip = Context { existing: OnExisting::Skip, ..ctx };
        let outcome = convert_entry(&backend, &skip, &entry, "170001").await.unwrap();
        assert!(matches!(outcome, Outcome::Skipped { .. }));
        assert!(transcoder.jobs().is_empty());
        assert_eq!(std::fs::read(dir.path().join("170001.mp3")).unwrap(), b"old");

        let overwrite = Context { existing: OnExisting::Overwrite, ..skip };
        convert_entry(&backend, &overwrite, &entry, "170001").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("170001.mp3")).unwrap(), [FTYP, MDAT].concat());
    }

    #[test]
    fn test_tags() {
        let mut entry = CacheEntry { id: "1".into(), dir: "1".into(), fragments: vec![], metadata: MetadataState::Missing };
        entry.metadata = MetadataState::Parsed(EntryDescriptor {
            schema: Schema::Page,
            title: Some("Episode 1".into()),
            part: Some("Intro".into()),
            page: Some(1),
            owner: Some("bishi".into()),
            bvid: None,
            avid: None,
        });
        let expected = Tags {
            title: Some("Intro".into()),
            album: Some("Episode 1".into()),
            artist: Some("bishi".into()),
            track: Some(1),
        };
        assert_eq!(tags(&entry), expected);
    }
}
