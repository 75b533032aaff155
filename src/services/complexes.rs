//! Complexes flow: each complex row precedes the venues nested under it.

use diesel::Connection;
use diesel::PgConnection;
use serde_json::Value;

use crate::db::models::{Complex, Venue};
use crate::db::store::StoreError;
use crate::models::sportradar::{ComplexRecord, VenueRecord, decode_record};
use crate::services::ingest::{RecordOutcome, SkipReason, Table, insert_complex, insert_venue};
use crate::utils::{non_empty_id, or_empty};

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexPlan {
    pub key: String,
    pub complex: Result<Complex, SkipReason>,
    pub venues: Vec<VenuePlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VenuePlan {
    pub key: String,
    pub venue: Result<Venue, SkipReason>,
}

pub fn plan(items: Vec<Value>) -> Vec<ComplexPlan> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| plan_one(idx, item))
        .collect()
}

fn plan_one(idx: usize, item: Value) -> ComplexPlan {
    let position = format!("complexes[{}]", idx);
    let rec: ComplexRecord = match decode_record(item) {
        Ok(r) => r,
        Err(e) => {
            return ComplexPlan {
                key: position,
                complex: Err(SkipReason::Malformed(e)),
                venues: Vec::new(),
            };
        }
    };

    let complex = match non_empty_id(rec.id.as_deref()) {
        Some(complex_id) => Ok(Complex {
            complex_id,
            complex_name: or_empty(rec.name.as_deref()),
        }),
        None => Err(SkipReason::MissingId),
    };
    let key = complex.as_ref().map(|c| c.complex_id.clone()).unwrap_or(position);

    let venues = rec
        .venues
        .into_iter()
        .enumerate()
        .map(|(vidx, v)| plan_venue(&key, complex.as_ref().ok(), vidx, v))
        .collect();

    ComplexPlan { key, complex, venues }
}

fn plan_venue(parent_key: &str, parent: Option<&Complex>, idx: usize, item: Value) -> VenuePlan {
    let position = format!("{}/venues[{}]", parent_key, idx);
    let rec: VenueRecord = match decode_record(item) {
        Ok(r) => r,
        Err(e) => {
            return VenuePlan {
                key: position,
                venue: Err(SkipReason::Malformed(e)),
            };
        }
    };
    let venue_id = non_empty_id(rec.id.as_deref());
    let key = venue_id.clone().unwrap_or(position);

    let venue = match (venue_id, parent) {
        (_, None) => Err(SkipReason::ParentSkipped(parent_key.to_string())),
        (None, Some(_)) => Err(SkipReason::MissingId),
        (Some(venue_id), Some(complex)) => Ok(Venue {
            venue_id,
            venue_name: or_empty(rec.name.as_deref()),
            city_name: or_empty(rec.city_name.as_deref()),
            country_name: or_empty(rec.country_name.as_deref()),
            country_code: or_empty(rec.country_code.as_deref()),
            timezone: or_empty(rec.timezone.as_deref()),
            complex_id: complex.complex_id.clone(),
        }),
    };
    VenuePlan { key, venue }
}

/// Write all plans in one transaction; any database error rolls back the lot.
pub fn apply(conn: &mut PgConnection, plans: &[ComplexPlan]) -> Result<Vec<RecordOutcome>, StoreError> {
    conn.transaction(|conn| {
        let mut outcomes = Vec::new();
        for p in plans {
            match &p.complex {
                Ok(complex) => {
                    let status = insert_complex(conn, complex)?;
                    outcomes.push(RecordOutcome::new(Table::Complexes, p.key.clone(), status));
                }
                Err(reason) => {
                    outcomes.push(RecordOutcome::skipped(Table::Complexes, p.key.clone(), reason.clone()));
                }
            }
            for v in &p.venues {
                match &v.venue {
                    Ok(venue) => {
                        let status = insert_venue(conn, venue)?;
                        outcomes.push(RecordOutcome::new(Table::Venues, v.key.clone(), status));
                    }
                    Err(reason) => {
                        outcomes.push(RecordOutcome::skipped(Table::Venues, v.key.clone(), reason.clone()));
                    }
                }
            }
        }
        Ok(outcomes)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::test_support::test_connection;
    use crate::schema;
    use crate::services::ingest::{RecordStatus, Table};
    use diesel::prelude::*;
    use serde_json::json;

    fn fixture() -> Vec<Value> {
        let body = std::fs::read_to_string("tests/data/complexes.json").expect("fixture present");
        crate::client::parse_listing(&body, "complexes").expect("parse complexes")
    }

    #[test]
    fn missing_venue_strings_are_coerced() {
        let plans = plan(vec![json!({
            "id": "sr:complex:705",
            "name": "Nacional Tenis Club",
            "venues": [{"id": "sr:venue:1708", "name": "Cancha Central", "city_name": "Guayaquil", "country_code": null}]
        })]);
        let venue = plans[0].venues[0].venue.as_ref().unwrap();
        assert_eq!(venue.timezone, "");
        assert_eq!(venue.country_code, "");
        assert_eq!(venue.country_name, "");
        assert_eq!(venue.city_name, "Guayaquil");
        assert_eq!(venue.complex_id, "sr:complex:705");
    }

    #[test]
    fn venues_of_a_skipped_complex_are_skipped() {
        let plans = plan(vec![json!({
            "name": "Anonymous complex",
            "venues": [{"id": "sr:venue:1"}, {"id": "sr:venue:2"}]
        })]);
        assert_eq!(plans[0].complex, Err(SkipReason::MissingId));
        assert_eq!(plans[0].venues.len(), 2);
        for v in &plans[0].venues {
            assert_eq!(v.venue, Err(SkipReason::ParentSkipped("complexes[0]".into())));
        }
    }

    #[test]
    fn venue_without_id_is_skipped_alone() {
        let plans = plan(vec![json!({
            "id": "sr:complex:9",
            "venues": [{"name": "Court 7"}, {"id": "sr:venue:90", "name": "Court 8"}, 42]
        })]);
        assert!(plans[0].complex.is_ok());
        assert_eq!(plans[0].venues[0].key, "sr:complex:9/venues[0]");
        assert_eq!(plans[0].venues[0].venue, Err(SkipReason::MissingId));
        assert!(plans[0].venues[1].venue.is_ok());
        assert!(matches!(plans[0].venues[2].venue, Err(SkipReason::Malformed(_))));
    }

    #[test]
    fn fixture_shapes() {
        let plans = plan(fixture());
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].venues.len(), 2);
        // "venues": null
        assert!(plans[2].venues.is_empty());
    }

    #[test]
    fn venues_land_after_their_complex_and_rerun_is_idempotent() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let plans = plan(fixture());
        let first = apply(&mut conn, &plans).unwrap();
        let inserted_venues = first
            .iter()
            .filter(|o| o.table == Table::Venues && o.status == RecordStatus::Inserted)
            .count();
        assert_eq!(inserted_venues, 3);

        use schema::complexes::dsl as C;
        use schema::venues::dsl as V;
        let orphans: i64 = V::venues
            .left_join(C::complexes)
            .filter(C::complex_id.is_null())
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(orphans, 0);

        let tz: String = V::venues
            .find("sr:venue:71853")
            .select(V::timezone)
            .first(&mut conn)
            .unwrap();
        assert_eq!(tz, "");

        let venue_ids = ["sr:venue:1708", "sr:venue:1709", "sr:venue:71853"];
        let before: i64 = V::venues
            .filter(V::venue_id.eq_any(venue_ids))
            .count()
            .get_result(&mut conn)
            .unwrap();
        let second = apply(&mut conn, &plans).unwrap();
        assert!(
            second
                .iter()
                .all(|o| matches!(o.status, RecordStatus::Unchanged | RecordStatus::Skipped(_)))
        );
        let after: i64 = V::venues
            .filter(V::venue_id.eq_any(venue_ids))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(before, after);
    }
}
