use crate::convert::error::Error as ConvertError;
use crate::scan::{CacheEntry, MetadataState};
use std::fmt;
use std::path::PathBuf;

/// How the conversion of one entry ended.
#[derive(Debug)]
pub enum Outcome {
    Converted { output: PathBuf, bytes: u64 },
    /// The output already existed and the run was told not to overwrite it.
    Skipped { output: PathBuf },
    Failed(ConvertError),
}
impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converted { output, bytes } => write!(f, "converted to {} ({bytes} bytes)", output.display()),
            Self::Skipped { output } => write!(f, "skipped, {} already exists", output.display()),
            Self::Failed(e) => write!(f, "failed: {}", **e),
        }
    }
}

/// One line of the run report.
#[derive(Debug)]
pub struct EntryReport {
    pub id: String,
    pub dir: PathBuf,
    /// Output file stem the entry was given.
    pub name: String,
    pub metadata: MetadataState,
    pub outcome: Outcome,
}
impl EntryReport {
    pub fn new(entry: CacheEntry, name: String, outcome: Outcome) -> Self {
        let CacheEntry { id, dir, metadata, .. } = entry;
        Self { id, dir, name, metadata, outcome }
    }

    /// Why the entry was named after its directory, if it was.
    pub fn fallback_reason(&self) -> Option<String> {
        match &self.metadata {
            MetadataState::Parsed(_) => None,
            MetadataState::Missing => Some("no entry.json".to_string()),
            MetadataState::Unreadable => Some("entry.json not readable".to_string()),
            MetadataState::Invalid(kind) => Some(format!("entry.json unusable: {kind}")),
        }
    }
}
impl fmt::Display for EntryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.outcome)?;
        if let Some(reason) = self.fallback_reason() {
            write!(f, " [named after directory: {reason}]")?;
        }
        Ok(())
    }
}

/// Running totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub converted: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Entries named after their directory instead of their metadata.
    pub fallback: u64,
}
impl Summary {
    pub fn record(&mut self, report: &EntryReport) {
        match report.outcome {
            Outcome::Converted { .. } => self.converted += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
        if report.metadata.is_fallback() {
            self.fallback += 1;
        }
    }

    /// Records an entry the scan had to leave out; it counts as failed.
    pub fn record_unscanned(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u64 {
        self.converted + self.skipped + self.failed
    }

    /// `0` when nothing failed, otherwise the number of failed entries capped
    /// at 100.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.failed.min(100)).unwrap_or(100)
    }
}
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} converted, {} skipped, {} failed", self.converted, self.skipped, self.failed)?;
        if self.fallback > 0 {
            write!(f, " ({} named after their directory)", self.fallback)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::error::ErrorKind as ConvertErrorKind;
    use bilicache_descriptor::error::ErrorKind as DescriptorErrorKind;
    use rstest::rstest;

    fn report(metadata: MetadataState, outcome: Outcome) -> EntryReport {
        let entry = CacheEntry { id: "170001".into(), dir: "170001".into(), fragments: vec![], metadata };
        EntryReport::new(entry, "170001".into(), outcome)
    }

    #[rstest]
    #[case(0, 0)]
    #[case(3, 3)]
    #[case(100, 100)]
    #[case(250, 100)]
    fn test_exit_code(#[case] failed: u64, #[case] expected: u8) {
        let summary = Summary { converted: 4, failed, ..Summary::default() };
        assert_eq!(summary.exit_code(), expected);
    }

    #[test]
    fn test_record() {
        let mut summary = Summary::default();
        summary.record(&report(MetadataState::Missing, Outcome::Converted { output: "a.mp3".into(), bytes: 1 }));
        summary.record(&report(MetadataState::Unreadable, Outcome::Skipped { output: "b.mp3".into() }));
        summary.record(&report(
            MetadataState::Invalid(DescriptorErrorKind::Empty),
            Outcome::Failed(exn::Exn::from(ConvertErrorKind::NoAudioFragment)),
        ));
        summary.record_unscanned();
        assert_eq!(summary, Summary { converted: 1, skipped: 1, failed: 2, fallback: 3 });
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.to_string(), "1 converted, 1 skipped, 2 failed (3 named after their directory)");
    }

    #[test]
    fn test_display_entry() {
        let report = report(MetadataState::Missing, Outcome::Failed(exn::Exn::from(ConvertErrorKind::NoAudioFragment)));
        assert_eq!(report.to_string(), "170001: failed: no audio track [named after directory: no entry.json]");
    }
}
