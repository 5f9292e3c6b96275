//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use trellis_orm::entity;
use trellis_sql::{Backend, Column, ConnectOptions, Connection, DataType, RawRow, SqlDefault};

entity! {
    table = "exercises",
    has_many = [Question => "exercises_id", Fulfillment => "exercises_id"],
    has_one = [Detail => "id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Exercise {
        pub id: i64,
        pub title: String,
        pub state: String,
    }
}

entity! {
    table = "questions",
    has_many = [Response => "questions_id"],
    belongs_to = [Exercise => "exercises_id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Question {
        pub id: i64,
        pub label: String,
        pub kind: Option<String>,
        pub exercises_id: i64,
    }
}

entity! {
    table = "fulfillments",
    has_many = [Response => "fulfillments_id"],
    belongs_to = [Exercise => "exercises_id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Fulfillment {
        pub id: i64,
        pub timestamp: DateTime<Utc>,
        pub exercises_id: i64,
    }
}

entity! {
    table = "responses",
    belongs_to = [Question => "questions_id", Fulfillment => "fulfillments_id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Response {
        pub id: i64,
        pub answer: Option<String>,
        pub questions_id: i64,
        pub fulfillments_id: i64,
    }
}

entity! {
    table = "details",
    #[derive(Debug, Clone, PartialEq)]
    pub struct Detail {
        pub id: i64,
        pub notes: String,
    }
}

// `posts.note` exists in the table but not on the entity
entity! {
    table = "posts",
    has_many = [Comment => "posts_id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Post {
        pub id: i64,
        pub title: String,
    }
}

// `comments.flagged` exists in the table but not on the entity
entity! {
    table = "comments",
    belongs_to = [Post => "posts_id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Comment {
        pub id: i64,
        pub body: String,
        pub note: Option<String>,
        pub posts_id: i64,
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE exercises (id INTEGER PRIMARY KEY, title TEXT NOT NULL, state TEXT NOT NULL)",
    "CREATE TABLE questions (id INTEGER PRIMARY KEY, label TEXT NOT NULL, kind TEXT, \
     exercises_id INTEGER NOT NULL)",
    "CREATE TABLE fulfillments (id INTEGER PRIMARY KEY, timestamp TEXT NOT NULL, \
     exercises_id INTEGER NOT NULL)",
    "CREATE TABLE responses (id INTEGER PRIMARY KEY, answer TEXT, questions_id INTEGER NOT NULL, \
     fulfillments_id INTEGER NOT NULL)",
    "CREATE TABLE details (id INTEGER PRIMARY KEY, notes TEXT NOT NULL)",
    "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL, note TEXT)",
    "CREATE TABLE comments (id INTEGER PRIMARY KEY, body TEXT NOT NULL, note TEXT, \
     flagged INTEGER NOT NULL DEFAULT 0, posts_id INTEGER NOT NULL)",
];

const FIXTURES: &[&str] = &[
    "INSERT INTO exercises (id, title, state) VALUES \
     (1, 'Exercise 1', 'building'), (2, 'Exercise 2', 'answering'), \
     (3, 'Exercise 3', 'building'), (4, 'Exercise 4', 'closed'), \
     (5, 'Exercise 5', 'answering'), (6, 'Exercise 6', 'building'), \
     (7, 'Exercise 7', 'closed'), (8, 'Exercise 8', 'answering'), \
     (9, 'Exercise 9', 'answering'), (10, 'Exercise 10', 'building')",
    "INSERT INTO questions (id, label, kind, exercises_id) VALUES \
     (5, 'Q1', 'single_line', 2), (10, 'Q8a', 'single_line', 8), (11, 'Q8b', NULL, 8)",
    "INSERT INTO fulfillments (id, timestamp, exercises_id) VALUES \
     (1, '2024-01-15 10:30:45', 8), (2, '2024-01-16 09:00:00', 8)",
    "INSERT INTO responses (id, answer, questions_id, fulfillments_id) VALUES \
     (1, 'A1', 10, 1), (2, 'A2', 11, 1), (3, 'A3', 10, 2)",
    "INSERT INTO details (id, notes) VALUES (2, 'has notes')",
    "INSERT INTO posts (id, title, note) VALUES (1, 'hello', 'post-internal'), (2, 'quiet', NULL)",
    "INSERT INTO comments (id, body, note, flagged, posts_id) VALUES \
     (7, 'hi', 'comment-note', 1, 1), (8, 'again', NULL, 0, 1)",
];

/// An in-memory database with the exercise schema and fixtures loaded.
pub async fn seeded() -> Arc<dyn Connection> {
    init_tracing();

    let backend = SqlDefault::connect_with(ConnectOptions {
        database: ":memory:".to_string(),
    })
    .await
    .expect("connect");
    let conn = backend.open();

    for statement in SCHEMA.iter().chain(FIXTURES) {
        conn.exec((*statement).to_string(), vec![]).await.expect("seed");
    }
    conn
}

/// Install a test subscriber; `RUST_LOG=trellis_orm=debug` shows generated SQL.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a raw row as the executor would return it under `FetchMode::Named`.
pub fn raw_row(columns: &[(&str, Column)]) -> RawRow {
    columns.iter().map(|(name, column)| ((*name).to_string(), column.clone())).collect()
}

pub fn int(value: i64) -> DataType {
    DataType::Int64(Some(value))
}

pub fn text(value: &str) -> DataType {
    DataType::Str(Some(value.to_string()))
}

pub const NULL: DataType = DataType::Int64(None);

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop identifier quotes (outside string literals) and collapse whitespace.
fn canonicalize_sql(sql: &str) -> String {
    let mut in_literal = false;
    let cleaned: String = sql
        .chars()
        .filter(|ch| {
            if *ch == '\'' {
                in_literal = !in_literal;
            }
            *ch != '"' || in_literal
        })
        .collect();
    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments, in order, ignoring
/// identifier quoting and whitespace differences.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        match actual_canonical[search_start..].find(&fragment_canonical) {
            Some(pos) => search_start += pos + fragment_canonical.len(),
            None => panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            ),
        }
    }
}
