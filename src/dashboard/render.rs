//! Plain-text rendering of the dashboard views.

use std::fmt::Write;

use crate::dashboard::cache::Clock;
use crate::dashboard::filters::{Filters, NameMatch};
use crate::dashboard::queries::{
    CategoryCount, CompetitionRow, CompetitorDetail, CountryStats, DistinctLookup, LeaderboardRow, TopCompetitor,
};
use crate::dashboard::{Dashboard, QueryOutcome, Summary};

pub const NO_DATA: &str = "No data";
const GENDER_NOTE: &str = "Gender filter: no gender data is stored; the selection is ignored.";

pub trait TableRow {
    const HEADERS: &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

impl TableRow for LeaderboardRow {
    const HEADERS: &'static [&'static str] = &["Rank", "Competitor", "Country", "Points", "Movement", "Played"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            self.competitor_name.clone(),
            self.country.clone(),
            self.points.to_string(),
            self.movement.to_string(),
            self.competitions_played.to_string(),
        ]
    }
}

impl TableRow for CompetitorDetail {
    const HEADERS: &'static [&'static str] = &[
        "Name",
        "Country",
        "Code",
        "Rank",
        "Movement",
        "Points",
        "Played",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.country.clone(),
            self.country_code.clone(),
            self.rank.to_string(),
            self.movement.to_string(),
            self.points.to_string(),
            self.competitions_played.to_string(),
        ]
    }
}

impl TableRow for CountryStats {
    const HEADERS: &'static [&'static str] = &["Country", "Competitors", "Avg points"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.country.clone(),
            self.total_competitors.to_string(),
            format!("{:.1}", self.average_points),
        ]
    }
}

impl TableRow for CategoryCount {
    const HEADERS: &'static [&'static str] = &["Category", "Competitions"];

    fn cells(&self) -> Vec<String> {
        vec![self.category_name.clone(), self.competitions.to_string()]
    }
}

impl TableRow for CompetitionRow {
    const HEADERS: &'static [&'static str] = &["Id", "Competition", "Type", "Gender", "Category"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.competition_id.clone(),
            self.competition_name.clone(),
            self.competition_type.clone().unwrap_or_default(),
            self.gender.clone().unwrap_or_default(),
            self.category_name.clone(),
        ]
    }
}

fn pad_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect();
    padded.join(" | ").trim_end().to_string()
}

/// Left-aligned columns sized to the widest cell.
pub fn table<R: TableRow>(rows: &[R]) -> String {
    let body: Vec<Vec<String>> = rows.iter().map(TableRow::cells).collect();
    let mut widths: Vec<usize> = R::HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = pad_line(R::HEADERS, &widths);
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &body {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&pad_line(&cells, &widths));
        out.push('\n');
    }
    out
}

/// The table, or the notice / "No data" line when there is nothing to show.
pub fn view<R: TableRow>(outcome: &QueryOutcome<R>) -> String {
    let mut out = String::new();
    if let Some(notice) = &outcome.notice {
        out.push_str(notice);
        out.push('\n');
    }
    if outcome.rows.is_empty() {
        out.push_str(NO_DATA);
        out.push('\n');
    } else {
        out.push_str(&table(&outcome.rows));
    }
    out
}

fn scalar(outcome: &QueryOutcome<i64>) -> String {
    outcome.rows.first().map_or_else(|| "-".to_string(), i64::to_string)
}

fn top(outcome: &QueryOutcome<TopCompetitor>) -> String {
    outcome
        .rows
        .first()
        .map_or_else(|| "-".to_string(), |t| format!("{} ({})", t.competitor_name, t.value))
}

pub fn summary(s: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total competitors:        {}", scalar(&s.total_competitors));
    let _ = writeln!(out, "Countries represented:    {}", scalar(&s.countries_represented));
    let _ = writeln!(out, "Highest points:           {}", top(&s.highest_points));
    let _ = writeln!(out, "Most competitions played: {}", top(&s.most_competitions_played));
    let notices = [
        &s.total_competitors.notice,
        &s.countries_represented.notice,
        &s.highest_points.notice,
        &s.most_competitions_played.notice,
    ];
    for notice in notices.into_iter().flatten() {
        let _ = writeln!(out, "{}", notice);
    }
    out
}

fn section(out: &mut String, title: &str, body: &str) {
    let _ = writeln!(out, "== {} ==", title);
    out.push_str(body);
    out.push('\n');
}

/// Note for a filter value that matches none of the stored choices. Silent
/// when the choices could not be loaded.
fn unknown_choice<C: Clock>(
    dashboard: &mut Dashboard<C>,
    lookup: DistinctLookup,
    label: &str,
    value: &str,
) -> Option<String> {
    let known = dashboard.distinct_values(lookup);
    if known.notice.is_some() || known.rows.iter().any(|v| v.to_lowercase() == value.to_lowercase()) {
        return None;
    }
    Some(format!("No {} named '{}' is stored.", label, value))
}

fn filter_line(filters: &Filters) -> String {
    let mut parts = vec![
        format!("rank {}", filters.rank),
        format!("points {}", filters.points),
        format!("played {}", filters.competitions_played),
    ];
    match &filters.competitor {
        Some(NameMatch::Exact(name)) => parts.push(format!("competitor '{}'", name)),
        Some(NameMatch::Partial(fragment)) => parts.push(format!("competitor contains '{}'", fragment)),
        None => {}
    }
    if let Some(country) = &filters.country {
        parts.push(format!("country '{}'", country));
    }
    if let Some(category) = &filters.category {
        parts.push(format!("category '{}'", category));
    }
    format!("Filters: {}\n", parts.join(", "))
}

/// All four views for one filter set, plus the category listing when a
/// category is selected. Without a selected competitor the detail view shows
/// the leaderboard's first entry.
pub fn render_dashboard<C: Clock>(dashboard: &mut Dashboard<C>, filters: &Filters) -> String {
    let board = dashboard.leaderboard(filters);
    let detail_filters = match (&filters.competitor, board.rows.first()) {
        (None, Some(first)) => Dashboard::<C>::select_competitor(filters, &first.competitor_name),
        _ => filters.clone(),
    };

    let mut out = filter_line(filters);
    let choices = [
        (
            DistinctLookup::CompetitorNames,
            "competitor",
            match &filters.competitor {
                Some(NameMatch::Exact(name)) => Some(name.as_str()),
                _ => None,
            },
        ),
        (DistinctLookup::CompetitorCountries, "country", filters.country.as_deref()),
        (DistinctLookup::CategoryNames, "category", filters.category.as_deref()),
    ];
    for (lookup, label, value) in choices {
        if let Some(note) = value.and_then(|v| unknown_choice(dashboard, lookup, label, v)) {
            out.push_str(&note);
            out.push('\n');
        }
    }
    out.push('\n');

    section(&mut out, "Summary Statistics", &summary(&dashboard.summary()));
    section(
        &mut out,
        "Competitor Details Viewer",
        &view(&dashboard.competitor_detail(&detail_filters)),
    );
    section(&mut out, "Country-Wise Analysis", &view(&dashboard.country_analysis(filters)));
    let mut leader = String::new();
    if filters.gender.is_some() {
        leader.push_str(GENDER_NOTE);
        leader.push('\n');
    }
    leader.push_str(&view(&board));
    section(&mut out, "Leader Board", &leader);

    if let Some(category) = &filters.category {
        let mut body = view(&dashboard.category_counts(filters));
        body.push('\n');
        body.push_str(&view(&dashboard.competitions_in_category(category)));
        section(&mut out, "Competitions by Category", &body);
    }
    out
}
