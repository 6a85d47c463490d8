use crate::name::Container;
use crate::patch::Patched;

/// Patched fragments of one entry, in concatenation order.
///
/// Nothing is copied into a contiguous buffer: consumers walk
/// [`chunks`](Self::chunks) and write each fragment's payload in turn.
#[derive(Debug, Clone)]
pub struct PatchedStream {
    container: Container,
    segments: Vec<Patched>,
}
impl PatchedStream {
    pub fn new(container: Container) -> Self {
        Self { container, segments: Vec::new() }
    }

    pub fn push(&mut self, segment: Patched) {
        self.segments.push(segment);
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// Number of fragments.
    pub fn segments(&self) -> usize {
        self.segments.len()
    }

    /// Total number of bytes forwarded.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Patched::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().map(Patched::payload)
    }
}
