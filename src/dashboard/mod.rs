//! Read side: cached, failure-tolerant access to the dashboard queries.
//!
//! Nothing here returns an error. A failed query is logged and comes back as an
//! empty result carrying a notice, so every view can still render.

pub mod cache;
pub mod filters;
pub mod queries;
pub mod render;

use diesel::PgConnection;
use diesel::QueryResult;
use log::{error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::dashboard::cache::{Clock, QueryCache, SystemClock};
use crate::dashboard::filters::{
    DEFAULT_MAX_COMPETITIONS_PLAYED, DEFAULT_MAX_POINTS, Filters, NameMatch,
};
use crate::dashboard::queries::{
    CategoryCount, CompetitionRow, CompetitorDetail, CountryStats, DistinctLookup, LeaderboardRow, TopCompetitor,
};
use crate::db::store;

const NO_CONNECTION: &str = "Database unavailable; showing no data.";

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome<T> {
    pub rows: Vec<T>,
    /// Set when the query failed and `rows` is a stand-in.
    pub notice: Option<String>,
}

impl<T> QueryOutcome<T> {
    fn ok(rows: Vec<T>) -> Self {
        QueryOutcome { rows, notice: None }
    }

    fn failed(notice: impl Into<String>) -> Self {
        QueryOutcome {
            rows: Vec::new(),
            notice: Some(notice.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_competitors: QueryOutcome<i64>,
    pub countries_represented: QueryOutcome<i64>,
    pub highest_points: QueryOutcome<TopCompetitor>,
    pub most_competitions_played: QueryOutcome<TopCompetitor>,
}

pub struct Dashboard<C: Clock = SystemClock> {
    conn: Option<PgConnection>,
    cache: QueryCache<C>,
}

impl Dashboard<SystemClock> {
    /// A failed connection is not fatal: every query then degrades to empty.
    pub fn connect(cfg: &Config) -> Self {
        let conn = match store::connect(&cfg.database_url) {
            Ok(c) => Some(c),
            Err(e) => {
                error!("Dashboard: {}", e);
                None
            }
        };
        Dashboard::new(conn, QueryCache::new(cfg.query_cache_ttl))
    }
}

impl<C: Clock> Dashboard<C> {
    pub fn new(conn: Option<PgConnection>, cache: QueryCache<C>) -> Self {
        Dashboard { conn, cache }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn run<T, P, F>(&mut self, query: &'static str, params: &P, load: F) -> QueryOutcome<T>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize + ?Sized,
        F: FnOnce(&mut PgConnection) -> QueryResult<Vec<T>>,
    {
        let Some(conn) = self.conn.as_mut() else {
            warn!("Dashboard: {} skipped, no database connection", query);
            return QueryOutcome::failed(NO_CONNECTION);
        };
        match self.cache.get_or_load(query, params, || load(conn)) {
            Ok(rows) => QueryOutcome::ok(rows),
            Err(e) => {
                error!("Dashboard: {} failed: {}", query, e);
                QueryOutcome::failed(format!("Could not load {}: {}", query.replace('_', " "), e))
            }
        }
    }

    fn run_scalar<T, F>(&mut self, query: &'static str, load: F) -> QueryOutcome<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut PgConnection) -> QueryResult<T>,
    {
        self.run(query, &(), |conn| load(conn).map(|v| vec![v]))
    }

    pub fn leaderboard(&mut self, filters: &Filters) -> QueryOutcome<LeaderboardRow> {
        self.run("leaderboard", filters, |conn| queries::leaderboard(conn, filters))
    }

    /// Empty when no competitor is selected.
    pub fn competitor_detail(&mut self, filters: &Filters) -> QueryOutcome<CompetitorDetail> {
        let Some(name) = filters.competitor.as_ref() else {
            return QueryOutcome::ok(Vec::new());
        };
        self.run("competitor_detail", name, |conn| queries::competitor_detail(conn, name))
    }

    pub fn country_analysis(&mut self, filters: &Filters) -> QueryOutcome<CountryStats> {
        let country = filters.country.as_deref();
        self.run("country_analysis", &country, |conn| queries::country_analysis(conn, country))
    }

    pub fn category_counts(&mut self, filters: &Filters) -> QueryOutcome<CategoryCount> {
        let category = filters.category.as_deref();
        self.run("category_counts", &category, |conn| queries::category_counts(conn, category))
    }

    pub fn competitions_in_category(&mut self, category: &str) -> QueryOutcome<CompetitionRow> {
        self.run("competitions_in_category", category, |conn| {
            queries::competitions_in_category(conn, category)
        })
    }

    pub fn summary(&mut self) -> Summary {
        Summary {
            total_competitors: self.run_scalar("total_competitors", queries::total_competitors),
            countries_represented: self.run_scalar("countries_represented", queries::countries_represented),
            highest_points: self.run("highest_points", &(), queries::highest_points),
            most_competitions_played: self.run("most_competitions_played", &(), queries::most_competitions_played),
        }
    }

    pub fn distinct_values(&mut self, lookup: DistinctLookup) -> QueryOutcome<String> {
        self.run("distinct_values", &lookup, |conn| queries::distinct_values(conn, lookup))
    }

    /// Slider bounds from the stored data, falling back to fixed defaults.
    pub fn seeded_filters(&mut self) -> Filters {
        let max_points = self
            .run_scalar("max_points", queries::max_points)
            .rows
            .first()
            .copied()
            .unwrap_or(DEFAULT_MAX_POINTS);
        let max_played = self
            .run_scalar("max_competitions_played", queries::max_competitions_played)
            .rows
            .first()
            .copied()
            .unwrap_or(DEFAULT_MAX_COMPETITIONS_PLAYED);
        Filters::seeded(max_points, max_played)
    }

    /// Select the competitor by exact name, as the competitor picker does.
    pub fn select_competitor(filters: &Filters, name: &str) -> Filters {
        Filters {
            competitor: Some(NameMatch::Exact(name.to_string())),
            ..filters.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::cache::test_clock::ManualClock;
    use crate::dashboard::filters::Range;
    use crate::db::store::test_support::test_connection;
    use std::rc::Rc;
    use std::time::Duration;

    fn offline() -> Dashboard<Rc<ManualClock>> {
        Dashboard::new(
            None,
            QueryCache::with_clock(Duration::from_secs(3600), Rc::new(ManualClock::new())),
        )
    }

    #[test]
    fn without_connection_everything_degrades_to_empty() {
        let mut d = offline();
        assert!(!d.is_connected());
        let board = d.leaderboard(&Filters::default());
        assert!(board.is_empty());
        assert_eq!(board.notice.as_deref(), Some(NO_CONNECTION));

        let summary = d.summary();
        assert!(summary.total_competitors.is_empty());
        assert!(summary.highest_points.notice.is_some());
        assert!(d.distinct_values(DistinctLookup::CompetitorNames).is_empty());
    }

    #[test]
    fn seeded_filters_fall_back_to_defaults() {
        let mut d = offline();
        let f = d.seeded_filters();
        assert_eq!(f.points, Range::new(0, DEFAULT_MAX_POINTS));
        assert_eq!(f.competitions_played, Range::new(0, DEFAULT_MAX_COMPETITIONS_PLAYED));
    }

    #[test]
    fn detail_needs_a_selected_competitor() {
        let mut d = offline();
        let none = d.competitor_detail(&Filters::default());
        assert!(none.is_empty());
        assert!(none.notice.is_none());
        let picked = Dashboard::<SystemClock>::select_competitor(&Filters::default(), "Pavic, Mate");
        assert_eq!(picked.competitor, Some(NameMatch::Exact("Pavic, Mate".into())));
    }

    #[test]
    fn stale_results_are_served_until_expiry() {
        let Some(conn) = test_connection() else {
            return;
        };
        let clock = Rc::new(ManualClock::new());
        let mut d = Dashboard::new(
            Some(conn),
            QueryCache::with_clock(Duration::from_secs(60), Rc::clone(&clock)),
        );
        let before = d.summary().total_competitors.rows[0];

        if let Some(conn) = d.conn.as_mut() {
            crate::services::ingest::insert_competitor(
                conn,
                &crate::db::models::Competitor {
                    competitor_id: "sr:competitor:cache-probe".into(),
                    name: "Qcache".into(),
                    country: String::new(),
                    country_code: String::new(),
                    abbreviation: String::new(),
                },
            )
            .unwrap();
        }
        assert_eq!(d.summary().total_competitors.rows[0], before);
        clock.advance(Duration::from_secs(60));
        assert_eq!(d.summary().total_competitors.rows[0], before + 1);
    }

    #[test]
    fn query_failure_becomes_a_notice() {
        let Some(conn) = test_connection() else {
            return;
        };
        let mut d = Dashboard::new(
            Some(conn),
            QueryCache::with_clock(Duration::from_secs(60), Rc::new(ManualClock::new())),
        );
        let out: QueryOutcome<i64> = d.run("broken", &(), |conn| {
            use diesel::RunQueryDsl;
            diesel::sql_query("SELECT * FROM no_such_table").execute(conn).map(|_| Vec::new())
        });
        assert!(out.is_empty());
        assert!(out.notice.unwrap().starts_with("Could not load broken:"));
    }
}
