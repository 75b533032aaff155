//! Competitions flow: categories first, then the competitions referencing them.

use diesel::Connection;
use diesel::PgConnection;
use log::debug;
use serde_json::Value;

use crate::db::models::{Category, Competition};
use crate::db::store::StoreError;
use crate::models::sportradar::{CompetitionRecord, decode_record};
use crate::services::ingest::{RecordOutcome, SkipReason, Table, insert_category, insert_competition};
use crate::utils::{non_empty_id, or_empty};

#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionPlan {
    pub key: String,
    /// Written whenever the embedded category carries an id.
    pub category: Option<Category>,
    pub competition: Result<Competition, SkipReason>,
}

pub fn plan(items: Vec<Value>) -> Vec<CompetitionPlan> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| plan_one(idx, item))
        .collect()
}

fn plan_one(idx: usize, item: Value) -> CompetitionPlan {
    let position = format!("competitions[{}]", idx);
    let rec: CompetitionRecord = match decode_record(item) {
        Ok(r) => r,
        Err(e) => {
            return CompetitionPlan {
                key: position,
                category: None,
                competition: Err(SkipReason::Malformed(e)),
            };
        }
    };

    let category = rec.category.as_ref().and_then(|c| {
        non_empty_id(c.id.as_deref()).map(|category_id| Category {
            category_id,
            category_name: or_empty(c.name.as_deref()),
        })
    });

    let competition_id = non_empty_id(rec.id.as_deref());
    let key = competition_id.clone().unwrap_or(position);

    let competition = match (competition_id, category.as_ref()) {
        (None, _) => Err(SkipReason::MissingId),
        (Some(_), None) => Err(SkipReason::MissingParent("category")),
        (Some(competition_id), Some(cat)) => Ok(Competition {
            competition_id,
            competition_name: or_empty(rec.name.as_deref()),
            parent_id: non_empty_id(rec.parent_id.as_deref()),
            competition_type: rec.competition_type.clone(),
            gender: rec.gender.clone(),
            category_id: cat.category_id.clone(),
        }),
    };

    CompetitionPlan {
        key,
        category,
        competition,
    }
}

/// Write all plans in one transaction; any database error rolls back the lot.
pub fn apply(conn: &mut PgConnection, plans: &[CompetitionPlan]) -> Result<Vec<RecordOutcome>, StoreError> {
    conn.transaction(|conn| {
        let mut outcomes = Vec::with_capacity(plans.len() * 2);
        for p in plans {
            if let Some(category) = &p.category {
                let status = insert_category(conn, category)?;
                outcomes.push(RecordOutcome::new(
                    Table::Categories,
                    category.category_id.clone(),
                    status,
                ));
            }
            match &p.competition {
                Ok(competition) => {
                    let status = insert_competition(conn, competition)?;
                    debug!("competition {}: {:?}", competition.competition_id, status);
                    outcomes.push(RecordOutcome::new(Table::Competitions, p.key.clone(), status));
                }
                Err(reason) => {
                    outcomes.push(RecordOutcome::skipped(Table::Competitions, p.key.clone(), reason.clone()));
                }
            }
        }
        Ok(outcomes)
    })
}
