//! Diesel model structs for the tennis reference tables and the rankings fact table.
//!
//! Entity tables are keyed by provider identifiers, so the same struct is used
//! for reading and inserting. Rankings carry a database-generated surrogate key
//! and therefore have a separate insert struct.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::categories)]
#[diesel(primary_key(category_id))]
pub struct Category {
    pub category_id: String,
    pub category_name: String,
}

#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, Insertable, Serialize, Deserialize,
)]
#[diesel(table_name = schema::competitions)]
#[diesel(primary_key(competition_id))]
#[diesel(belongs_to(Category))]
pub struct Competition {
    pub competition_id: String,
    pub competition_name: String,
    pub parent_id: Option<String>,
    pub competition_type: Option<String>,
    pub gender: Option<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::complexes)]
#[diesel(primary_key(complex_id))]
pub struct Complex {
    pub complex_id: String,
    pub complex_name: String,
}

#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, Insertable, Serialize, Deserialize,
)]
#[diesel(table_name = schema::venues)]
#[diesel(primary_key(venue_id))]
#[diesel(belongs_to(Complex))]
pub struct Venue {
    pub venue_id: String,
    pub venue_name: String,
    pub city_name: String,
    pub country_name: String,
    pub country_code: String,
    pub timezone: String,
    pub complex_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::competitors)]
#[diesel(primary_key(competitor_id))]
pub struct Competitor {
    pub competitor_id: String,
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub abbreviation: String,
}

#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, Serialize, Deserialize,
)]
#[diesel(table_name = schema::competitor_rankings)]
#[diesel(primary_key(rank_id))]
#[diesel(belongs_to(Competitor))]
pub struct CompetitorRanking {
    pub rank_id: i64,
    pub rank: i32,
    pub movement: i32,
    pub points: i32,
    pub competitions_played: i32,
    pub competitor_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::competitor_rankings)]
pub struct NewCompetitorRanking {
    pub rank: i32,
    pub movement: i32,
    pub points: i32,
    pub competitions_played: i32,
    pub competitor_id: String,
}
