//! Read-only queries behind the dashboard views.
//!
//! Row queries use the Diesel DSL; aggregates use `sql_query` with bound
//! parameters. No identifier is ever built from input: distinct-value lookups
//! are a closed set of columns.

use diesel::dsl::{count, max};
use diesel::{PgConnection, PgTextExpressionMethods};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, Text};
use serde::{Deserialize, Serialize};

use crate::dashboard::filters::{DEFAULT_MAX_COMPETITIONS_PLAYED, DEFAULT_MAX_POINTS, Filters, NameMatch};
use crate::schema;

/// Upper bound on rows returned by any listing query.
pub const MAX_ROWS: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub competitor_name: String,
    pub country: String,
    pub rank: i32,
    pub points: i32,
    pub movement: i32,
    pub competitions_played: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize, Deserialize)]
pub struct CompetitorDetail {
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub rank: i32,
    pub movement: i32,
    pub points: i32,
    pub competitions_played: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, QueryableByName, Serialize, Deserialize)]
pub struct TopCompetitor {
    #[diesel(sql_type = Text)]
    pub competitor_name: String,
    #[diesel(sql_type = Integer)]
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize, Deserialize)]
pub struct CountryStats {
    #[diesel(sql_type = Text)]
    pub country: String,
    #[diesel(sql_type = BigInt)]
    pub total_competitors: i64,
    #[diesel(sql_type = Double)]
    pub average_points: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, QueryableByName, Serialize, Deserialize)]
pub struct CategoryCount {
    #[diesel(sql_type = Text)]
    pub category_name: String,
    #[diesel(sql_type = BigInt)]
    pub competitions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize, Deserialize)]
pub struct CompetitionRow {
    pub competition_id: String,
    pub competition_name: String,
    pub competition_type: Option<String>,
    pub gender: Option<String>,
    pub category_name: String,
}

/// Columns the dashboard may list distinct values of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistinctLookup {
    CompetitorNames,
    CompetitorCountries,
    CategoryNames,
}

/// Ranking rows joined with their competitor, ordered by rank.
pub fn leaderboard(conn: &mut PgConnection, f: &Filters) -> QueryResult<Vec<LeaderboardRow>> {
    use schema::competitor_rankings::dsl as R;
    use schema::competitors::dsl as C;

    let mut q = R::competitor_rankings
        .inner_join(C::competitors)
        .select((C::name, C::country, R::rank, R::points, R::movement, R::competitions_played))
        .filter(R::rank.between(f.rank.min, f.rank.max))
        .filter(R::points.between(f.points.min, f.points.max))
        .filter(R::competitions_played.between(f.competitions_played.min, f.competitions_played.max))
        .into_boxed();

    if let Some(m) = &f.competitor {
        q = q.filter(C::name.ilike(m.ilike_pattern()));
    }
    if let Some(country) = &f.country {
        q = q.filter(C::country.eq(country.clone()));
    }

    q.order((R::rank.asc(), C::name.asc()))
        .limit(MAX_ROWS)
        .load::<LeaderboardRow>(conn)
}

/// Best (lowest) rank of the named competitor; at most one row.
pub fn competitor_detail(conn: &mut PgConnection, name: &NameMatch) -> QueryResult<Vec<CompetitorDetail>> {
    use schema::competitor_rankings::dsl as R;
    use schema::competitors::dsl as C;

    C::competitors
        .inner_join(R::competitor_rankings)
        .select((
            C::name,
            C::country,
            C::country_code,
            R::rank,
            R::movement,
            R::points,
            R::competitions_played,
        ))
        .filter(C::name.ilike(name.ilike_pattern()))
        .order(R::rank.asc())
        .limit(1)
        .load::<CompetitorDetail>(conn)
}

pub fn total_competitors(conn: &mut PgConnection) -> QueryResult<i64> {
    use schema::competitors::dsl as C;
    C::competitors.count().get_result(conn)
}

/// Distinct non-empty competitor countries.
pub fn countries_represented(conn: &mut PgConnection) -> QueryResult<i64> {
    use schema::competitors::dsl as C;
    C::competitors
        .filter(C::country.ne(""))
        .select(count(C::country).aggregate_distinct())
        .get_result(conn)
}

pub fn highest_points(conn: &mut PgConnection) -> QueryResult<Vec<TopCompetitor>> {
    diesel::sql_query(
        "SELECT c.name AS competitor_name, MAX(cr.points) AS value \
         FROM competitors c \
         JOIN competitor_rankings cr ON c.competitor_id = cr.competitor_id \
         GROUP BY c.name \
         ORDER BY value DESC, c.name ASC \
         LIMIT 1",
    )
    .load(conn)
}

pub fn most_competitions_played(conn: &mut PgConnection) -> QueryResult<Vec<TopCompetitor>> {
    diesel::sql_query(
        "SELECT c.name AS competitor_name, MAX(cr.competitions_played) AS value \
         FROM competitors c \
         JOIN competitor_rankings cr ON c.competitor_id = cr.competitor_id \
         GROUP BY c.name \
         ORDER BY value DESC, c.name ASC \
         LIMIT 1",
    )
    .load(conn)
}

/// Competitor count and average points per country, largest first.
pub fn country_analysis(conn: &mut PgConnection, country: Option<&str>) -> QueryResult<Vec<CountryStats>> {
    diesel::sql_query(
        "SELECT c.country AS country, \
                COUNT(DISTINCT c.competitor_id) AS total_competitors, \
                AVG(cr.points)::float8 AS average_points \
         FROM competitors c \
         JOIN competitor_rankings cr ON c.competitor_id = cr.competitor_id \
         WHERE ($1::text IS NULL OR c.country = $1) \
         GROUP BY c.country \
         ORDER BY total_competitors DESC, c.country ASC \
         LIMIT $2",
    )
    .bind::<Nullable<Text>, _>(country)
    .bind::<BigInt, _>(MAX_ROWS)
    .load(conn)
}

/// Number of competitions per category, largest first.
pub fn category_counts(conn: &mut PgConnection, category: Option<&str>) -> QueryResult<Vec<CategoryCount>> {
    diesel::sql_query(
        "SELECT cat.category_name AS category_name, \
                COUNT(comp.competition_id) AS competitions \
         FROM categories cat \
         LEFT JOIN competitions comp ON comp.category_id = cat.category_id \
         WHERE ($1::text IS NULL OR cat.category_name = $1) \
         GROUP BY cat.category_id, cat.category_name \
         ORDER BY competitions DESC, cat.category_name ASC \
         LIMIT $2",
    )
    .bind::<Nullable<Text>, _>(category)
    .bind::<BigInt, _>(MAX_ROWS)
    .load(conn)
}

pub fn competitions_in_category(conn: &mut PgConnection, category: &str) -> QueryResult<Vec<CompetitionRow>> {
    use schema::categories::dsl as Cat;
    use schema::competitions::dsl as Comp;

    Comp::competitions
        .inner_join(Cat::categories)
        .select((
            Comp::competition_id,
            Comp::competition_name,
            Comp::competition_type,
            Comp::gender,
            Cat::category_name,
        ))
        .filter(Cat::category_name.eq(category))
        .order((Comp::competition_name.asc(), Comp::competition_id.asc()))
        .limit(MAX_ROWS)
        .load::<CompetitionRow>(conn)
}

pub fn max_points(conn: &mut PgConnection) -> QueryResult<i32> {
    use schema::competitor_rankings::dsl as R;
    let v: Option<i32> = R::competitor_rankings.select(max(R::points)).first(conn)?;
    Ok(v.unwrap_or(DEFAULT_MAX_POINTS))
}

pub fn max_competitions_played(conn: &mut PgConnection) -> QueryResult<i32> {
    use schema::competitor_rankings::dsl as R;
    let v: Option<i32> = R::competitor_rankings.select(max(R::competitions_played)).first(conn)?;
    Ok(v.unwrap_or(DEFAULT_MAX_COMPETITIONS_PLAYED))
}

/// Sorted distinct non-empty values of one of the allowed columns.
pub fn distinct_values(conn: &mut PgConnection, lookup: DistinctLookup) -> QueryResult<Vec<String>> {
    use schema::categories::dsl as Cat;
    use schema::competitors::dsl as C;

    match lookup {
        DistinctLookup::CompetitorNames => C::competitors
            .select(C::name)
            .filter(C::name.ne(""))
            .distinct()
            .order(C::name.asc())
            .load(conn),
        DistinctLookup::CompetitorCountries => C::competitors
            .select(C::country)
            .filter(C::country.ne(""))
            .distinct()
            .order(C::country.asc())
            .load(conn),
        DistinctLookup::CategoryNames => Cat::categories
            .select(Cat::category_name)
            .filter(Cat::category_name.ne(""))
            .distinct()
            .order(Cat::category_name.asc())
            .load(conn),
    }
}
