//! Rankings flow: competitors are upserted, ranking rows are appended.
//!
//! A ranking row needs the competitor id and all of rank, movement, points and
//! competitions_played. Anything less skips the entry without writing a
//! partial row; the competitor itself is still kept when it has an id.

use diesel::Connection;
use diesel::PgConnection;
use log::debug;
use serde_json::Value;

use crate::db::models::{Competitor, NewCompetitorRanking};
use crate::db::store::StoreError;
use crate::models::sportradar::{RankingEntryRecord, RankingGroupRecord, decode_record};
use crate::services::ingest::{
    RecordOutcome, SkipReason, Table, append_ranking, insert_competitor,
};
use crate::utils::{non_empty_id, or_empty};

#[derive(Debug, Clone, PartialEq)]
pub struct RankingPlan {
    pub key: String,
    pub competitor: Option<Competitor>,
    pub ranking: Result<NewCompetitorRanking, SkipReason>,
}

/// Flatten every group's entries, in listing order.
pub fn plan(groups: Vec<Value>) -> Vec<RankingPlan> {
    let mut plans = Vec::new();
    for (gidx, group) in groups.into_iter().enumerate() {
        let group_key = format!("rankings[{}]", gidx);
        let group: RankingGroupRecord = match decode_record(group) {
            Ok(g) => g,
            Err(e) => {
                plans.push(RankingPlan {
                    key: group_key,
                    competitor: None,
                    ranking: Err(SkipReason::Malformed(e)),
                });
                continue;
            }
        };
        debug!(
            "ranking group {} ({} {}w{}): {} entr(ies)",
            group_key,
            group.name.as_deref().unwrap_or("-"),
            group.year.map(|y| y.to_string()).unwrap_or_default(),
            group.week.map(|w| w.to_string()).unwrap_or_default(),
            group.competitor_rankings.len()
        );
        for (eidx, entry) in group.competitor_rankings.into_iter().enumerate() {
            plans.push(plan_entry(&group_key, eidx, entry));
        }
    }
    plans
}

fn plan_entry(group_key: &str, idx: usize, item: Value) -> RankingPlan {
    let position = format!("{}/competitor_rankings[{}]", group_key, idx);
    let rec: RankingEntryRecord = match decode_record(item) {
        Ok(r) => r,
        Err(e) => {
            return RankingPlan {
                key: position,
                competitor: None,
                ranking: Err(SkipReason::Malformed(e)),
            };
        }
    };

    let competitor = rec.competitor.as_ref().and_then(|c| {
        non_empty_id(c.id.as_deref()).map(|competitor_id| Competitor {
            competitor_id,
            name: or_empty(c.name.as_deref()),
            country: or_empty(c.country.as_deref()),
            country_code: or_empty(c.country_code.as_deref()),
            abbreviation: or_empty(c.abbreviation.as_deref()),
        })
    });
    let key = competitor
        .as_ref()
        .map(|c| c.competitor_id.clone())
        .unwrap_or(position);

    let ranking = match (
        competitor.as_ref(),
        rec.rank,
        rec.movement,
        rec.points,
        rec.competitions_played,
    ) {
        (Some(c), Some(rank), Some(movement), Some(points), Some(competitions_played)) => Ok(NewCompetitorRanking {
            rank,
            movement,
            points,
            competitions_played,
            competitor_id: c.competitor_id.clone(),
        }),
        _ => {
            let missing = [
                ("competitor.id", competitor.is_none()),
                ("rank", rec.rank.is_none()),
                ("movement", rec.movement.is_none()),
                ("points", rec.points.is_none()),
                ("competitions_played", rec.competitions_played.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(SkipReason::MissingFields(missing))
        }
    };

    RankingPlan {
        key,
        competitor,
        ranking,
    }
}

/// Write all plans in one transaction; any database error rolls back every
/// ranking appended in this run.
pub fn apply(conn: &mut PgConnection, plans: &[RankingPlan]) -> Result<Vec<RecordOutcome>, StoreError> {
    conn.transaction(|conn| {
        let mut outcomes = Vec::with_capacity(plans.len() * 2);
        for p in plans {
            if let Some(competitor) = &p.competitor {
                let status = insert_competitor(conn, competitor)?;
                outcomes.push(RecordOutcome::new(Table::Competitors, p.key.clone(), status));
            }
            match &p.ranking {
                Ok(row) => {
                    let status = append_ranking(conn, row)?;
                    outcomes.push(RecordOutcome::new(Table::CompetitorRankings, p.key.clone(), status));
                }
                Err(reason) => {
                    outcomes.push(RecordOutcome::skipped(
                        Table::CompetitorRankings,
                        p.key.clone(),
                        reason.clone(),
                    ));
                }
            }
        }
        Ok(outcomes)
    })
}
