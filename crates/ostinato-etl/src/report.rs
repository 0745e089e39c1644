//! The final statistics report.
//!
//! Produced after all files are loaded; this is the single surface for
//! detecting data-quality issues. It carries per-stage row outcomes
//! from the run itself plus the resulting entity totals read back from
//! the store.

use serde::Serialize;
use std::fmt;

use ostinato_core::schema::Database;
use ostinato_core::Result;

/// Row outcomes for one import stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    /// Rows written (inserted or, under overwrite, updated).
    pub written: u64,
    /// Rows whose composite key already existed and were skipped.
    pub conflicts: u64,
    /// Rows that failed field or type validation and were dropped.
    pub malformed: u64,
    /// Rows referencing an artist or tag that does not exist.
    pub referential_violations: u64,
}

impl StageCounts {
    pub(crate) fn merge(&mut self, other: Self) {
        self.written += other.written;
        self.conflicts += other.conflicts;
        self.malformed += other.malformed;
        self.referential_violations += other.referential_violations;
    }
}

/// Entity totals read back from the store after the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreTotals {
    pub artists: i64,
    pub users: i64,
    pub tags: i64,
    pub listens: i64,
    pub taggings: i64,
    pub friendships: i64,
    /// Taggings kept with a timestamp that produced no calendar date.
    pub undated_taggings: i64,
}

impl StoreTotals {
    pub fn collect(db: &Database) -> Result<Self> {
        Ok(Self {
            artists: db.count_artists()?,
            users: db.count_users()?,
            tags: db.count_tags()?,
            listens: db.count_listens()?,
            taggings: db.count_taggings()?,
            friendships: db.count_friendships()?,
            undated_taggings: db.count_undated_taggings()?,
        })
    }
}

/// The outcome of a full import run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub artists: StageCounts,
    pub tags: StageCounts,
    pub listens: StageCounts,
    pub taggings: StageCounts,
    pub friendships: StageCounts,
    /// Users synthesized while loading listens and friendships.
    pub users_created: u64,
    /// Stages that aborted (stage name, error message).
    pub failed_stages: Vec<(String, String)>,
    pub totals: StoreTotals,
}

impl ImportReport {
    /// Total rows dropped across all stages, for a quick health read.
    #[must_use]
    pub fn total_skipped(&self) -> u64 {
        [
            self.artists,
            self.tags,
            self.listens,
            self.taggings,
            self.friendships,
        ]
        .iter()
        .map(|s| s.malformed + s.referential_violations)
        .sum()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Import statistics")?;
        writeln!(f, "=================")?;
        writeln!(f, "  {:<16} {:>10}", "Artists", self.totals.artists)?;
        writeln!(f, "  {:<16} {:>10}", "Users", self.totals.users)?;
        writeln!(f, "  {:<16} {:>10}", "Tags", self.totals.tags)?;
        writeln!(f, "  {:<16} {:>10}", "Listens", self.totals.listens)?;
        writeln!(f, "  {:<16} {:>10}", "Taggings", self.totals.taggings)?;
        writeln!(f, "  {:<16} {:>10}", "Friendships", self.totals.friendships)?;
        writeln!(f)?;

        for (name, counts) in [
            ("artists", self.artists),
            ("tags", self.tags),
            ("listens", self.listens),
            ("taggings", self.taggings),
            ("friendships", self.friendships),
        ] {
            writeln!(
                f,
                "  {name}: {} written, {} conflicts, {} malformed, {} referential",
                counts.written, counts.conflicts, counts.malformed, counts.referential_violations
            )?;
        }
        writeln!(f, "  users synthesized: {}", self.users_created)?;

        if self.totals.undated_taggings > 0 {
            writeln!(
                f,
                "  warning: {} taggings kept with undecodable timestamps",
                self.totals.undated_taggings
            )?;
        }
        for (stage, error) in &self.failed_stages {
            writeln!(f, "  FAILED stage {stage}: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_skipped() {
        let mut report = ImportReport::default();
        report.listens.malformed = 2;
        report.taggings.referential_violations = 3;
        assert_eq!(report.total_skipped(), 5);
    }

    #[test]
    fn test_display_mentions_undated_taggings() {
        let report = ImportReport {
            totals: StoreTotals {
                undated_taggings: 7,
                ..StoreTotals::default()
            },
            ..ImportReport::default()
        };
        let rendered = report.to_string();
        assert!(rendered.contains("7 taggings kept with undecodable timestamps"));
    }
}
