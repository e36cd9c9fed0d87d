use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::provenance::Provenance;

/// The fixed set of batch counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Counter {
    Processed,
    DateTakenSet,
    DateCreatedSet,
    DateModifiedSet,
    SignatureMismatchCount,
    SignatureRenamedCount,
    Skipped,
    Failed,
    DryRun,
    ExifOnly,
    QuickTimeOnly,
    FallbackOnly,
    MixedSources,
    Unknown,
    Renamed,
    WithCounter,
}

impl Counter {
    pub const COUNT: usize = 16;

    pub const ALL: [Counter; Counter::COUNT] = [
        Counter::Processed,
        Counter::DateTakenSet,
        Counter::DateCreatedSet,
        Counter::DateModifiedSet,
        Counter::SignatureMismatchCount,
        Counter::SignatureRenamedCount,
        Counter::Skipped,
        Counter::Failed,
        Counter::DryRun,
        Counter::ExifOnly,
        Counter::QuickTimeOnly,
        Counter::FallbackOnly,
        Counter::MixedSources,
        Counter::Unknown,
        Counter::Renamed,
        Counter::WithCounter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Counter::Processed => "Processed",
            Counter::DateTakenSet => "DateTakenSet",
            Counter::DateCreatedSet => "DateCreatedSet",
            Counter::DateModifiedSet => "DateModifiedSet",
            Counter::SignatureMismatchCount => "SignatureMismatchCount",
            Counter::SignatureRenamedCount => "SignatureRenamedCount",
            Counter::Skipped => "Skipped",
            Counter::Failed => "Failed",
            Counter::DryRun => "DryRun",
            Counter::ExifOnly => "EXIF-only",
            Counter::QuickTimeOnly => "QuickTime-only",
            Counter::FallbackOnly => "Fallback-only",
            Counter::MixedSources => "Mixed-sources",
            Counter::Unknown => "Unknown",
            Counter::Renamed => "Renamed",
            Counter::WithCounter => "WithCounter",
        }
    }

    /// Counters that only move when a filesystem change was actually applied.
    pub fn is_applied_change(self) -> bool {
        matches!(
            self,
            Counter::DateTakenSet
                | Counter::DateCreatedSet
                | Counter::DateModifiedSet
                | Counter::SignatureRenamedCount
                | Counter::Renamed
                | Counter::WithCounter
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl From<Provenance> for Counter {
    fn from(tag: Provenance) -> Self {
        match tag {
            Provenance::ExifOnly => Counter::ExifOnly,
            Provenance::QuickTimeOnly => Counter::QuickTimeOnly,
            Provenance::FallbackOnly => Counter::FallbackOnly,
            Provenance::MixedSources => Counter::MixedSources,
            Provenance::Unknown => Counter::Unknown,
        }
    }
}

/// Process-wide counters shared by all workers. Increments are lock-free.
#[derive(Debug, Default)]
pub struct Stats {
    counts: [AtomicU64; Counter::COUNT],
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, counter: Counter) {
        self.counts[counter.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counts[counter.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let mut counts = [0u64; Counter::COUNT];
        for counter in Counter::ALL {
            counts[counter.index()] = self.get(counter);
        }
        StatsSnapshot { counts }
    }
}

/// Point-in-time copy of the counters, read for progress lines and the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    counts: [u64; Counter::COUNT],
}

impl StatsSnapshot {
    pub fn get(&self, counter: Counter) -> u64 {
        self.counts[counter.index()]
    }

    /// Counters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Counter, u64)> + '_ {
        Counter::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl Serialize for StatsSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(Counter::COUNT))?;
        for (counter, value) in self.iter() {
            map.serialize_entry(counter.name(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StatsSnapshot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = std::collections::HashMap::<String, u64>::deserialize(deserializer)?;
        let mut counts = [0u64; Counter::COUNT];
        for counter in Counter::ALL {
            if let Some(v) = raw.get(counter.name()) {
                counts[counter.index()] = *v;
            }
        }
        Ok(StatsSnapshot { counts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let stats = Stats::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..10_000 {
                        stats.incr(Counter::Processed);
                        stats.incr(Counter::Renamed);
                    }
                });
            }
        });
        assert_eq!(stats.get(Counter::Processed), 80_000);
        assert_eq!(stats.get(Counter::Renamed), 80_000);
        assert_eq!(stats.get(Counter::Failed), 0);
    }

    #[test]
    fn test_snapshot_names_and_order() {
        let stats = Stats::new();
        stats.incr(Counter::MixedSources);
        stats.incr(Counter::MixedSources);
        let snap = stats.snapshot();
        let names: Vec<&str> = snap.iter().map(|(c, _)| c.name()).collect();
        assert_eq!(names.len(), Counter::COUNT);
        assert_eq!(names[0], "Processed");
        assert_eq!(names[12], "Mixed-sources");
        assert_eq!(snap.get(Counter::MixedSources), 2);
    }

    #[test]
    fn test_provenance_counter_mapping() {
        assert_eq!(Counter::from(Provenance::ExifOnly), Counter::ExifOnly);
        assert_eq!(Counter::from(Provenance::Unknown), Counter::Unknown);
        assert!(Counter::Renamed.is_applied_change());
        assert!(!Counter::SignatureMismatchCount.is_applied_change());
    }
}
