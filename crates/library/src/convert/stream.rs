use crate::convert::Context;
use crate::convert::entry::convert_entry;
use crate::naming::Names;
use crate::report::{EntryReport, Outcome};
use crate::scan::CacheEntry;
use async_stream::stream;
use bilicache_storage::BackendHandle;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};

/// Progress events emitted by [`convert`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once, with the number of entries.
/// 2. [`Finished`](Self::Finished) once per entry, in completion order.
/// 3. [`Complete`](Self::Complete) exactly once.
#[derive(Debug)]
pub enum ConvertEvent {
    Started(u64),
    Finished(Box<EntryReport>),
    Complete,
}

/// Streams [`ConvertEvent`]s while converting `entries`, up to `ctx.jobs` at
/// a time.
///
/// Output names are claimed in entry order before any work starts, so the
/// name an entry gets doesn't depend on which conversion finishes first.
/// Failures are reported per entry and never end the stream early. Dropping
/// the stream cancels the entries in flight; their temporary files are
/// removed and any transcoder process they started is killed.
pub fn convert<'a>(
    backend: &'a BackendHandle,
    ctx: &'a Context,
    entries: Vec<CacheEntry>,
) -> impl Stream<Item = ConvertEvent> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield ConvertEvent::Started(u64::try_from(entries.len()).unwrap_or(0));

        let mut names = Names::default();
        let mut pending = entries
            .into_iter()
            .map(|entry| {
                let name = names.claim(ctx.names.stem(&entry), &entry.id);
                run(backend, ctx, entry, name)
            })
            .collect::<Vec<_>>()
            .into_iter();
        let mut processing = FuturesUnordered::new();
        processing.extend(pending.by_ref().take(ctx.jobs.max(1)));
        while let Some(report) = processing.next().await {
            yield ConvertEvent::Finished(Box::new(report));
            if let Some(next) = pending.next() {
                processing.push(next);
            }
        }

        yield ConvertEvent::Complete;
    })
}

async fn run(backend: &BackendHandle, ctx: &Context, entry: CacheEntry, name: String) -> EntryReport {
    let outcome = match convert_entry(backend, ctx, &entry, &name).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(entry = %entry.id, error = ?e, "Conversion failed");
            Outcome::Failed(e)
        },
    };
    EntryReport::new(entry, name, outcome)
}
