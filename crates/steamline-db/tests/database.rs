use chrono::NaiveDate;
use steamline_core::{Table, Value};
use steamline_db::Database;
use tempfile::TempDir;

fn users(rows: &[(i64, i64)]) -> Table {
    let mut t = Table::new(vec!["steamid".into(), "num_reviews".into()]);
    for &(id, n) in rows {
        t.push_row(vec![Value::Int(id), Value::Int(n)]);
    }
    t
}

fn games() -> Table {
    let mut t = Table::new(vec!["appid".into(), "name".into()]);
    t.push_row(vec![Value::Int(10), "counter-strike".into()]);
    t.push_row(vec![Value::Int(70), "half-life".into()]);
    t
}

#[test]
fn replace_overwrites_previous_contents() {
    let mut db = Database::in_memory().unwrap();
    assert_eq!(db.replace("games", &games()).unwrap(), 2);

    let mut smaller = Table::new(vec!["appid".into(), "name".into()]);
    smaller.push_row(vec![Value::Int(400), "portal".into()]);
    db.replace("games", &smaller).unwrap();

    assert_eq!(db.count("games").unwrap(), 1);
    let name: String = db
        .connection()
        .query_row("SELECT name FROM games", [], |r| r.get(0))
        .unwrap();
    assert_eq!(name, "portal");
}

#[test]
fn append_skips_existing_and_repeated_keys() {
    let mut db = Database::in_memory().unwrap();

    let first = db.append("users", &users(&[(1, 3), (2, 5)]), Some("steamid")).unwrap();
    assert_eq!(first, 2);

    // 2 already stored, 3 repeated within the batch
    let second = db
        .append("users", &users(&[(2, 6), (3, 1), (3, 1)]), Some("steamid"))
        .unwrap();
    assert_eq!(second, 1);
    assert_eq!(db.count("users").unwrap(), 3);
}

#[test]
fn first_row_per_key_wins_within_a_batch() {
    let mut db = Database::in_memory().unwrap();
    let batch = users(&[(7, 1), (8, 4), (7, 2), (7, 3), (8, 9)]);
    assert_eq!(db.append("users", &batch, Some("steamid")).unwrap(), 2);

    let kept: Vec<(i64, i64)> = {
        let mut stmt = db
            .connection()
            .prepare("SELECT steamid, num_reviews FROM users ORDER BY steamid")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    };
    assert_eq!(kept, [(7, 1), (8, 4)]);
}

#[test]
fn append_without_key_keeps_everything() {
    let mut db = Database::in_memory().unwrap();
    db.append("users", &users(&[(1, 3)]), None).unwrap();
    db.append("users", &users(&[(1, 3)]), None).unwrap();
    assert_eq!(db.count("users").unwrap(), 2);
}

#[test]
fn append_adds_new_columns() {
    let mut db = Database::in_memory().unwrap();
    db.append("users", &users(&[(1, 3)]), Some("steamid")).unwrap();

    let mut wider = Table::new(vec!["steamid".into(), "num_reviews".into(), "num_games_owned".into()]);
    wider.push_row(vec![Value::Int(2), Value::Int(1), Value::Int(40)]);
    assert_eq!(db.append("users", &wider, Some("steamid")).unwrap(), 1);

    let owned: Option<i64> = db
        .connection()
        .query_row("SELECT num_games_owned FROM users WHERE steamid = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(owned, None);
}

#[test]
fn append_requires_key_column() {
    let mut db = Database::in_memory().unwrap();
    let err = db.append("users", &users(&[(1, 3)]), Some("recommendationid")).unwrap_err();
    assert!(err.to_string().contains("recommendationid"), "{err}");
}

#[test]
fn empty_append_is_a_no_op() {
    let mut db = Database::in_memory().unwrap();
    assert_eq!(db.append("users", &users(&[]), Some("steamid")).unwrap(), 0);
    assert!(!db.table_exists("users").unwrap());
}

#[test]
fn value_types_round_trip() {
    let mut db = Database::in_memory().unwrap();
    let created = NaiveDate::from_ymd_opt(2023, 11, 14)
        .unwrap()
        .and_hms_opt(22, 13, 20)
        .unwrap();
    let mut t = Table::new(vec![
        "recommendationid".into(),
        "voted_up".into(),
        "weighted_vote_score".into(),
        "timestamp_created".into(),
    ]);
    t.push_row(vec![
        Value::Int(1),
        Value::Bool(true),
        Value::Float(0.52),
        Value::Timestamp(created),
    ]);
    db.replace("reviews", &t).unwrap();

    let (voted, score, ts): (bool, f64, String) = db
        .connection()
        .query_row(
            "SELECT voted_up, weighted_vote_score, CAST(timestamp_created AS VARCHAR) FROM reviews",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert!(voted);
    assert_eq!(score, 0.52);
    assert_eq!(ts, "2023-11-14 22:13:20");
}

#[test]
fn export_writes_one_csv_per_existing_table() {
    let dir = TempDir::new().unwrap();
    let mut db = Database::in_memory().unwrap();
    db.replace("games", &games()).unwrap();
    db.append("users", &users(&[(1, 3)]), Some("steamid")).unwrap();

    let out = dir.path().join("csv");
    let written = db.export_csv(&["games", "reviews", "users"], &out).unwrap();

    assert_eq!(written, vec![out.join("games.csv"), out.join("users.csv")]);
    let games_csv = std::fs::read_to_string(out.join("games.csv")).unwrap();
    let mut lines = games_csv.lines();
    assert_eq!(lines.next(), Some("appid,name"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn table_counts_lists_stored_tables() {
    let mut db = Database::in_memory().unwrap();
    db.replace("games", &games()).unwrap();
    db.append("users", &users(&[(1, 3), (2, 5), (3, 1)]), Some("steamid")).unwrap();

    assert_eq!(
        db.table_counts().unwrap(),
        vec![("games".to_string(), 2), ("users".to_string(), 3)]
    );
}

#[test]
fn file_database_persists_between_connections() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("steam.duckdb");

    {
        let mut db = Database::connect(&path).unwrap();
        db.replace("games", &games()).unwrap();
    }

    let db = Database::connect(&path).unwrap();
    assert_eq!(db.count("games").unwrap(), 2);
}
