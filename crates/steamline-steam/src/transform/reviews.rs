//! Split cleaned reviews into `reviews` and `users` tables

use steamline_core::{Table, Value};

use super::clean::{CleanOptions, clean, dedupe_rows};
use crate::record::Record;

/// Columns of the `users` table
pub const USER_COLUMNS: [&str; 3] = ["steamid", "num_games_owned", "num_reviews"];

/// Columns of the `reviews` table
pub const REVIEW_COLUMNS: [&str; 19] = [
    "appid",
    "recommendationid",
    "language",
    "timestamp_created",
    "timestamp_updated",
    "voted_up",
    "votes_up",
    "votes_funny",
    "weighted_vote_score",
    "comment_count",
    "steam_purchase",
    "received_for_free",
    "written_during_early_access",
    "primarily_steam_deck",
    "steamid",
    "playtime_at_review",
    "playtime_forever",
    "playtime_last_two_weeks",
    "last_played",
];

/// Reviews of one app, ready for persistence
#[derive(Debug, Clone, Default)]
pub struct ReviewTables {
    pub reviews: Table,
    pub users: Table,
}

fn round2(v: &Value) -> Value {
    match v {
        Value::Float(x) => Value::Float((x * 100.0).round() / 100.0),
        other => other.clone(),
    }
}

fn select_logged(table: &Table, columns: &[&str], name: &str) -> Table {
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() && !table.is_empty() {
        log::warn!("{name}: columns not present after cleaning: {}", missing.join(", "));
    }
    table.select(columns)
}

/// Clean the reviews of `appid` and split them into review and user rows.
pub fn transform_reviews(appid: i64, records: &[Record], opts: &CleanOptions) -> ReviewTables {
    let mut table = clean(records, opts);
    if table.is_empty() {
        return ReviewTables::default();
    }
    table.set_constant_column("appid", Value::Int(appid));
    table.map_column("weighted_vote_score", round2);

    let mut users = select_logged(&table, &USER_COLUMNS, "users");
    dedupe_rows(&mut users);
    let reviews = select_logged(&table, &REVIEW_COLUMNS, "reviews");

    log::info!(
        "App {appid}: {} reviews from {} users",
        reviews.len(),
        users.len()
    );
    ReviewTables { reviews, users }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::record::RecordShape;

    fn review(id: &str, steamid: &str, score: &str) -> Record {
        let raw = json!({
            "recommendationid": id,
            "language": "english",
            "timestamp_created": 1_700_000_000,
            "timestamp_updated": 1_700_000_100,
            "voted_up": true,
            "votes_up": 3,
            "votes_funny": 0,
            "weighted_vote_score": score,
            "comment_count": 1,
            "steam_purchase": true,
            "received_for_free": false,
            "written_during_early_access": false,
            "primarily_steam_deck": false,
            "review": "Loved it",
            "author": {
                "steamid": steamid,
                "num_games_owned": 120,
                "num_reviews": 7,
                "playtime_forever": 600,
                "playtime_last_two_weeks": 30,
                "playtime_at_review": 480,
                "last_played": 1_700_000_500
            }
        });
        match raw {
            serde_json::Value::Object(m) => RecordShape::default().normalize(m),
            _ => unreachable!(),
        }
    }

    #[test]
    fn splits_into_reviews_and_users() {
        let records = vec![
            review("1", "76561198000000001", "0.523809"),
            review("2", "76561198000000001", "0.5"),
            review("3", "76561198000000002", "0.777"),
        ];
        let tables = transform_reviews(730, &records, &CleanOptions::steam_reviews());

        assert_eq!(tables.reviews.columns(), REVIEW_COLUMNS);
        assert_eq!(tables.reviews.len(), 3);
        assert_eq!(tables.users.columns(), USER_COLUMNS);
        assert_eq!(tables.users.len(), 2);
    }

    #[test]
    fn appid_added_and_score_rounded() {
        let records = vec![review("1", "76561198000000001", "0.523809")];
        let tables = transform_reviews(730, &records, &CleanOptions::steam_reviews());

        assert_eq!(tables.reviews.get(0, "appid"), Some(&Value::Int(730)));
        assert_eq!(tables.reviews.get(0, "weighted_vote_score"), Some(&Value::Float(0.52)));
        assert_eq!(
            tables.reviews.get(0, "recommendationid"),
            Some(&Value::Int(1))
        );
        assert!(matches!(
            tables.reviews.get(0, "last_played"),
            Some(Value::Timestamp(_))
        ));
    }

    #[test]
    fn missing_columns_are_skipped() {
        let mut fields = serde_json::Map::new();
        fields.insert("recommendationid".to_string(), json!("9"));
        fields.insert("steamid".to_string(), json!("76561198000000009"));
        let tables =
            transform_reviews(440, &[Record::new(fields)], &CleanOptions::steam_reviews());

        assert_eq!(tables.reviews.columns(), ["appid", "recommendationid", "steamid"]);
        assert_eq!(tables.users.columns(), ["steamid"]);
    }

    #[test]
    fn no_records_gives_empty_tables() {
        let tables = transform_reviews(730, &[], &CleanOptions::steam_reviews());
        assert!(tables.reviews.is_empty());
        assert!(tables.users.is_empty());
    }
}
