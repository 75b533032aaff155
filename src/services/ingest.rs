//! Row writers shared by the flows and the per-record outcome types they report.
//!
//! Entity tables are written with upsert-ignore: a row whose key already exists
//! is left untouched and reported as [`RecordStatus::Unchanged`]. Rankings are a
//! plain append.

use chrono::{DateTime, Utc};
use diesel::PgConnection;
use diesel::prelude::*;
use log::{info, warn};
use std::fmt::{Display, Formatter};

use crate::client::Resource;
use crate::db::models::{Category, Competition, Competitor, Complex, NewCompetitorRanking, Venue};
use crate::db::store::StoreError;
use crate::schema;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Table {
    Categories,
    Competitions,
    Complexes,
    Venues,
    Competitors,
    CompetitorRankings,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Categories => "categories",
            Table::Competitions => "competitions",
            Table::Complexes => "complexes",
            Table::Venues => "venues",
            Table::Competitors => "competitors",
            Table::CompetitorRankings => "competitor_rankings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record has no usable identifier.
    MissingId,
    /// The required parent (category, complex) is absent from the record.
    MissingParent(&'static str),
    /// The parent record was itself skipped.
    ParentSkipped(String),
    /// Ranking entry lacks the competitor id or one of the ranking values.
    MissingFields(Vec<&'static str>),
    /// The record could not be decoded at all.
    Malformed(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingId => write!(f, "missing id"),
            SkipReason::MissingParent(parent) => write!(f, "missing {} id", parent),
            SkipReason::ParentSkipped(parent) => write!(f, "parent {} skipped", parent),
            SkipReason::MissingFields(fields) => write!(f, "missing or null: {}", fields.join(", ")),
            SkipReason::Malformed(e) => write!(f, "malformed record: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Inserted,
    /// Key already present; existing row kept as is.
    Unchanged,
    Skipped(SkipReason),
}

impl RecordStatus {
    fn from_affected(rows: usize) -> Self {
        if rows == 0 {
            RecordStatus::Unchanged
        } else {
            RecordStatus::Inserted
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub table: Table,
    /// Provider id when present, otherwise the record's position in the listing.
    pub key: String,
    pub status: RecordStatus,
}

impl RecordOutcome {
    pub fn new(table: Table, key: impl Into<String>, status: RecordStatus) -> Self {
        RecordOutcome {
            table,
            key: key.into(),
            status,
        }
    }

    pub fn skipped(table: Table, key: impl Into<String>, reason: SkipReason) -> Self {
        Self::new(table, key, RecordStatus::Skipped(reason))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub inserted: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Result of one committed flow.
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub flow: Resource,
    /// Records in the fetched listing (ranking entries for the rankings flow).
    pub records_seen: usize,
    pub outcomes: Vec<RecordOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FlowReport {
    pub fn counts(&self, table: Table) -> TableCounts {
        self.outcomes
            .iter()
            .filter(|o| o.table == table)
            .fold(TableCounts::default(), |mut acc, o| {
                match o.status {
                    RecordStatus::Inserted => acc.inserted += 1,
                    RecordStatus::Unchanged => acc.unchanged += 1,
                    RecordStatus::Skipped(_) => acc.skipped += 1,
                }
                acc
            })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&RecordOutcome, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            RecordStatus::Skipped(reason) => Some((o, reason)),
            _ => None,
        })
    }

    pub fn tables(&self) -> &'static [Table] {
        match self.flow {
            Resource::Competitions => &[Table::Categories, Table::Competitions],
            Resource::Complexes => &[Table::Complexes, Table::Venues],
            Resource::DoublesRankings => &[Table::Competitors, Table::CompetitorRankings],
        }
    }

    pub fn log(&self) {
        for (outcome, reason) in self.skipped() {
            warn!(
                "{}: skipped {} record {}: {}",
                self.flow,
                outcome.table.name(),
                outcome.key,
                reason
            );
        }
        let per_table = self
            .tables()
            .iter()
            .map(|t| {
                let c = self.counts(*t);
                format!(
                    "{} inserted={} unchanged={} skipped={}",
                    t.name(),
                    c.inserted,
                    c.unchanged,
                    c.skipped
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        info!(
            "{}: committed {} record(s) in {} ms ({})",
            self.flow,
            self.records_seen,
            (self.finished_at - self.started_at).num_milliseconds(),
            per_table
        );
    }
}

pub fn insert_category(conn: &mut PgConnection, row: &Category) -> Result<RecordStatus, StoreError> {
    use schema::categories::dsl as C;

    let n = diesel::insert_into(C::categories)
        .values(row)
        .on_conflict(C::category_id)
        .do_nothing()
        .execute(conn)?;
    Ok(RecordStatus::from_affected(n))
}

pub fn insert_competition(conn: &mut PgConnection, row: &Competition) -> Result<RecordStatus, StoreError> {
    use schema::competitions::dsl as C;

    let n = diesel::insert_into(C::competitions)
        .values(row)
        .on_conflict(C::competition_id)
        .do_nothing()
        .execute(conn)?;
    Ok(RecordStatus::from_affected(n))
}

pub fn insert_complex(conn: &mut PgConnection, row: &Complex) -> Result<RecordStatus, StoreError> {
    use schema::complexes::dsl as C;

    let n = diesel::insert_into(C::complexes)
        .values(row)
        .on_conflict(C::complex_id)
        .do_nothing()
        .execute(conn)?;
    Ok(RecordStatus::from_affected(n))
}

pub fn insert_venue(conn: &mut PgConnection, row: &Venue) -> Result<RecordStatus, StoreError> {
    use schema::venues::dsl as V;

    let n = diesel::insert_into(V::venues)
        .values(row)
        .on_conflict(V::venue_id)
        .do_nothing()
        .execute(conn)?;
    Ok(RecordStatus::from_affected(n))
}

pub fn insert_competitor(conn: &mut PgConnection, row: &Competitor) -> Result<RecordStatus, StoreError> {
    use schema::competitors::dsl as C;

    let n = diesel::insert_into(C::competitors)
        .values(row)
        .on_conflict(C::competitor_id)
        .do_nothing()
        .execute(conn)?;
    Ok(RecordStatus::from_affected(n))
}

/// No conflict handling: every call adds a row.
pub fn append_ranking(conn: &mut PgConnection, row: &NewCompetitorRanking) -> Result<RecordStatus, StoreError> {
    use schema::competitor_rankings::dsl as R;

    diesel::insert_into(R::competitor_rankings).values(row).execute(conn)?;
    Ok(RecordStatus::Inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(outcomes: Vec<RecordOutcome>) -> FlowReport {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        FlowReport {
            flow: Resource::Complexes,
            records_seen: 2,
            outcomes,
            started_at: at,
            finished_at: at,
        }
    }

    #[test]
    fn counts_are_per_table() {
        let r = report(vec![
            RecordOutcome::new(Table::Complexes, "sr:complex:1", RecordStatus::Inserted),
            RecordOutcome::new(Table::Venues, "sr:venue:1", RecordStatus::Inserted),
            RecordOutcome::new(Table::Venues, "sr:venue:2", RecordStatus::Unchanged),
            RecordOutcome::skipped(Table::Venues, "sr:complex:1/venues[2]", SkipReason::MissingId),
            RecordOutcome::skipped(Table::Complexes, "complexes[1]", SkipReason::MissingId),
        ]);
        assert_eq!(
            r.counts(Table::Venues),
            TableCounts {
                inserted: 1,
                unchanged: 1,
                skipped: 1
            }
        );
        assert_eq!(r.counts(Table::Complexes).skipped, 1);
        assert_eq!(r.skipped().count(), 2);
        assert_eq!(r.counts(Table::Competitors), TableCounts::default());
    }

    #[test]
    fn skip_reasons_read_well_in_logs() {
        let reason = SkipReason::MissingFields(vec!["points", "movement"]);
        assert_eq!(reason.to_string(), "missing or null: points, movement");
        assert_eq!(SkipReason::MissingParent("category").to_string(), "missing category id");
        assert_eq!(
            SkipReason::ParentSkipped("complexes[3]".to_string()).to_string(),
            "parent complexes[3] skipped"
        );
    }

    #[test]
    fn affected_rows_map_to_status() {
        assert_eq!(RecordStatus::from_affected(1), RecordStatus::Inserted);
        assert_eq!(RecordStatus::from_affected(0), RecordStatus::Unchanged);
    }
}
