//! Runs the fetch → plan → write flows in order, each independent of the others.

use chrono::Utc;
use diesel::PgConnection;
use log::{error, info};
use std::fmt::{Display, Formatter};

use crate::client::{Resource, SourceError, TennisSource};
use crate::db::store::StoreError;
use crate::services::ingest::{FlowReport, RecordOutcome};
use crate::services::{competitions, complexes, rankings};

#[derive(Debug)]
pub enum FlowError {
    /// Fetch or decode failed; nothing was written.
    Source(SourceError),
    /// Write failed; the flow's transaction was rolled back.
    Store(StoreError),
}

impl Display for FlowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowError::Source(e) => write!(f, "fetch failed, nothing written: {}", e),
            FlowError::Store(e) => write!(f, "write failed, rolled back: {}", e),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::Source(e) => Some(e),
            FlowError::Store(e) => Some(e),
        }
    }
}

impl From<SourceError> for FlowError {
    fn from(value: SourceError) -> Self {
        FlowError::Source(value)
    }
}

impl From<StoreError> for FlowError {
    fn from(value: StoreError) -> Self {
        FlowError::Store(value)
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub flows: Vec<(Resource, Result<FlowReport, FlowError>)>,
}

impl PipelineReport {
    pub fn get(&self, flow: Resource) -> Option<&Result<FlowReport, FlowError>> {
        self.flows.iter().find(|(r, _)| *r == flow).map(|(_, res)| res)
    }

    pub fn failed(&self) -> usize {
        self.flows.iter().filter(|(_, r)| r.is_err()).count()
    }
}

pub fn run_flow(conn: &mut PgConnection, source: &dyn TennisSource, flow: Resource) -> Result<FlowReport, FlowError> {
    let started_at = Utc::now();
    let items = source.fetch(flow)?;

    let (records_seen, outcomes): (usize, Vec<RecordOutcome>) = match flow {
        Resource::Competitions => {
            let plans = competitions::plan(items);
            (plans.len(), competitions::apply(conn, &plans)?)
        }
        Resource::Complexes => {
            let plans = complexes::plan(items);
            (plans.len(), complexes::apply(conn, &plans)?)
        }
        Resource::DoublesRankings => {
            let plans = rankings::plan(items);
            (plans.len(), rankings::apply(conn, &plans)?)
        }
    };

    Ok(FlowReport {
        flow,
        records_seen,
        outcomes,
        started_at,
        finished_at: Utc::now(),
    })
}

/// Run the given flows sequentially. A failed flow is logged and reported; the
/// next flow still runs.
pub fn run_all(conn: &mut PgConnection, source: &dyn TennisSource, flows: &[Resource]) -> PipelineReport {
    let mut report = PipelineReport { flows: Vec::new() };
    for flow in flows {
        info!("{}: starting flow", flow);
        let res = run_flow(conn, source, *flow);
        match &res {
            Ok(r) => r.log(),
            Err(e) => error!("{}: {}", flow, e),
        }
        report.flows.push((*flow, res));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::parse_listing;
    use crate::db::store::test_support::test_connection;
    use crate::services::ingest::Table;
    use serde_json::Value;
    use std::cell::RefCell;

    /// Serves the JSON fixtures, or a canned error for chosen resources.
    struct FixtureSource {
        failing: Vec<Resource>,
        calls: RefCell<Vec<Resource>>,
    }

    impl FixtureSource {
        fn new(failing: Vec<Resource>) -> Self {
            FixtureSource {
                failing,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl TennisSource for FixtureSource {
        fn fetch(&self, resource: Resource) -> Result<Vec<Value>, SourceError> {
            self.calls.borrow_mut().push(resource);
            if self.failing.contains(&resource) {
                return Err(SourceError::Http {
                    status: 403,
                    message: "<h1>Developer Inactive</h1>".to_string(),
                });
            }
            let file = match resource {
                Resource::Competitions => "tests/data/competitions.json",
                Resource::Complexes => "tests/data/complexes.json",
                Resource::DoublesRankings => "tests/data/rankings.json",
            };
            let body = std::fs::read_to_string(file).expect("fixture present");
            parse_listing(&body, resource.listing_key())
        }
    }

    #[test]
    fn flow_error_messages() {
        let e = FlowError::from(SourceError::Transport("dns failure".into()));
        assert_eq!(e.to_string(), "fetch failed, nothing written: transport error: dns failure");
        let e = FlowError::from(StoreError::Connection("server closed the connection".into()));
        assert!(e.to_string().starts_with("write failed, rolled back:"));
    }

    #[test]
    fn failed_fetch_does_not_stop_later_flows() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let source = FixtureSource::new(vec![Resource::Competitions]);
        let report = run_all(&mut conn, &source, &Resource::ALL);

        assert_eq!(*source.calls.borrow(), Resource::ALL.to_vec());
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.get(Resource::Competitions),
            Some(Err(FlowError::Source(SourceError::Http { status: 403, .. })))
        ));

        let complexes = report.get(Resource::Complexes).unwrap().as_ref().unwrap();
        assert_eq!(complexes.records_seen, 3);
        assert_eq!(complexes.counts(Table::Venues).skipped, 0);

        let rankings = report.get(Resource::DoublesRankings).unwrap().as_ref().unwrap();
        assert_eq!(rankings.counts(Table::CompetitorRankings).inserted, 3);
        assert_eq!(rankings.counts(Table::CompetitorRankings).skipped, 3);
    }

    #[test]
    fn selected_flows_only() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let source = FixtureSource::new(Vec::new());
        let report = run_all(&mut conn, &source, &[Resource::Complexes]);
        assert_eq!(*source.calls.borrow(), vec![Resource::Complexes]);
        assert_eq!(report.flows.len(), 1);
        assert_eq!(report.failed(), 0);
    }
}
