// Mirrors migrations/2025-06-01-000000_create_tennis_schema.

diesel::table! {
    categories (category_id) {
        category_id -> Text,
        category_name -> Text,
    }
}

diesel::table! {
    competitions (competition_id) {
        competition_id -> Text,
        competition_name -> Text,
        parent_id -> Nullable<Text>,
        #[sql_name = "type"]
        competition_type -> Nullable<Text>,
        gender -> Nullable<Text>,
        category_id -> Text,
    }
}

diesel::table! {
    complexes (complex_id) {
        complex_id -> Text,
        complex_name -> Text,
    }
}

diesel::table! {
    venues (venue_id) {
        venue_id -> Text,
        venue_name -> Text,
        city_name -> Text,
        country_name -> Text,
        country_code -> Text,
        timezone -> Text,
        complex_id -> Text,
    }
}

diesel::table! {
    competitors (competitor_id) {
        competitor_id -> Text,
        name -> Text,
        country -> Text,
        country_code -> Text,
        abbreviation -> Text,
    }
}

// Append-only: rank_id is a surrogate, nothing is unique over the data columns.
diesel::table! {
    competitor_rankings (rank_id) {
        rank_id -> Int8,
        rank -> Int4,
        movement -> Int4,
        points -> Int4,
        competitions_played -> Int4,
        competitor_id -> Text,
    }
}

diesel::joinable!(competitions -> categories (category_id));
diesel::joinable!(venues -> complexes (complex_id));
diesel::joinable!(competitor_rankings -> competitors (competitor_id));

diesel::allow_tables_to_appear_in_same_query!(
    categories,
    competitions,
    complexes,
    venues,
    competitors,
    competitor_rankings,
);
