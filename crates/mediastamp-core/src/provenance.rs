use serde::{Deserialize, Serialize};

use crate::date::Candidates;

/// Which combination of timestamp sources was available for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    ExifOnly,
    QuickTimeOnly,
    FallbackOnly,
    MixedSources,
    Unknown,
}

impl Provenance {
    /// Pure function of which sources are present.
    ///
    /// Filesystem times are read for every file, so `ExifOnly`, `QuickTimeOnly` and
    /// `Unknown` only occur when the platform cannot report them.
    pub fn classify(candidates: &Candidates) -> Self {
        let capture = candidates.capture.is_some();
        let container = candidates.container.is_some();
        let fallback = candidates.fs_created.is_some() || candidates.fs_modified.is_some();

        match (capture, container, fallback) {
            (false, false, false) => Provenance::Unknown,
            (false, false, true) => Provenance::FallbackOnly,
            (true, false, false) => Provenance::ExifOnly,
            (false, true, false) => Provenance::QuickTimeOnly,
            // embedded + filesystem, or both embedded kinds
            _ => Provenance::MixedSources,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Provenance::ExifOnly => "EXIF-only",
            Provenance::QuickTimeOnly => "QuickTime-only",
            Provenance::FallbackOnly => "Fallback-only",
            Provenance::MixedSources => "Mixed-sources",
            Provenance::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_every_presence_combination() {
        let t = NaiveDate::from_ymd_opt(2022, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();

        for bits in 0u8..16 {
            let c = Candidates {
                capture: (bits & 1 != 0).then_some(t),
                container: (bits & 2 != 0).then_some(t),
                fs_created: (bits & 4 != 0).then_some(t),
                fs_modified: (bits & 8 != 0).then_some(t),
            };
            let embedded = bits & 3;
            let fallback = bits & 12 != 0;
            let expected = match (embedded, fallback) {
                (0, false) => Provenance::Unknown,
                (0, true) => Provenance::FallbackOnly,
                (1, false) => Provenance::ExifOnly,
                (2, false) => Provenance::QuickTimeOnly,
                _ => Provenance::MixedSources,
            };
            assert_eq!(Provenance::classify(&c), expected, "bits {bits:04b}");
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(Provenance::MixedSources.to_string(), "Mixed-sources");
        assert_eq!(Provenance::FallbackOnly.label(), "Fallback-only");
    }
}
