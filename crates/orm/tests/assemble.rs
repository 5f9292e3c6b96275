//! Folding joined rows into result forests, using hand-built rows.

#![allow(missing_docs)]

mod common;

use common::{Exercise, Fulfillment, NULL, Question, Response, int, raw_row, text};
use trellis_orm::{Column, DataType, Entity, Error, Join, RawRow, ResolutionError, assemble};

fn many(values: &[DataType]) -> Column {
    Column::PerOccurrence(values.to_vec())
}

fn one(value: DataType) -> Column {
    Column::Scalar(value)
}

/// `SELECT * FROM exercises LEFT JOIN questions`
fn exercise_question(exercise: i64, title: &str, question: Option<(i64, &str)>) -> RawRow {
    let (question_id, label, exercises_id) = match question {
        Some((id, label)) => (int(id), text(label), int(exercise)),
        None => (NULL, DataType::Str(None), NULL),
    };
    raw_row(&[
        ("id", many(&[int(exercise), question_id])),
        ("title", one(text(title))),
        ("state", one(text("answering"))),
        ("label", one(label)),
        ("kind", one(DataType::Str(None))),
        ("exercises_id", one(exercises_id)),
    ])
}

#[test]
fn relation_without_rows_gives_empty_slot() {
    let rows = [exercise_question(1, "A", None)];
    let forest = assemble(Exercise::model(), &[Join::entity::<Question>()], &rows).unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].fetch::<i64>("id").unwrap(), 1);
    assert_eq!(forest[0].related("questions").map(<[_]>::len), Some(0));
}

#[test]
fn matching_row_is_flattened_into_slot() {
    let rows = [exercise_question(2, "B", Some((5, "Q1")))];
    let forest = assemble(Exercise::model(), &[Join::entity::<Question>()], &rows).unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].fetch::<String>("title").unwrap(), "B");

    let questions = forest[0].related_entities::<Question>().unwrap();
    assert_eq!(
        questions,
        vec![Question {
            id: 5,
            label: "Q1".to_string(),
            kind: None,
            exercises_id: 2,
        }]
    );
}

#[test]
fn roots_are_unique_and_keep_row_order() {
    let rows = [
        exercise_question(8, "H", Some((10, "Q8a"))),
        exercise_question(2, "B", Some((5, "Q1"))),
        exercise_question(8, "H", Some((11, "Q8b"))),
        exercise_question(1, "A", None),
    ];
    let forest = assemble(Exercise::model(), &[Join::entity::<Question>()], &rows).unwrap();

    let ids: Vec<i64> = forest.iter().map(|root| root.fetch("id").unwrap()).collect();
    assert_eq!(ids, [8, 2, 1]);

    let sizes: Vec<usize> =
        forest.iter().map(|root| root.related("questions").unwrap().len()).collect();
    assert_eq!(sizes, [2, 1, 0]);

    let labels: Vec<String> = forest[0]
        .related("questions")
        .unwrap()
        .iter()
        .map(|question| question.fetch("label").unwrap())
        .collect();
    assert_eq!(labels, ["Q8a", "Q8b"]);
}

/// `SELECT * FROM exercises LEFT JOIN questions LEFT JOIN fulfillments`
fn exercise_question_fulfillment(question: i64, fulfillment: i64) -> RawRow {
    raw_row(&[
        ("id", many(&[int(8), int(question), int(fulfillment)])),
        ("title", one(text("H"))),
        ("state", one(text("answering"))),
        ("label", one(text(&format!("Q{question}")))),
        ("kind", one(DataType::Str(None))),
        ("exercises_id", many(&[int(8), int(8)])),
        ("timestamp", one(text("2024-01-15 10:30:45"))),
    ])
}

#[test]
fn multiplied_rows_do_not_duplicate_children() {
    let rows = [
        exercise_question_fulfillment(10, 1),
        exercise_question_fulfillment(10, 2),
        exercise_question_fulfillment(11, 1),
        exercise_question_fulfillment(11, 2),
    ];
    let joins = [Join::entity::<Question>(), Join::entity::<Fulfillment>()];
    let forest = assemble(Exercise::model(), &joins, &rows).unwrap();

    assert_eq!(forest.len(), 1);
    let slots: Vec<_> = forest[0].relations().map(|(slot, records)| (slot, records.len())).collect();
    assert_eq!(slots, [("questions", 2), ("fulfillments", 2)]);

    let fulfillments = forest[0].related_entities::<Fulfillment>().unwrap();
    assert_eq!(fulfillments.iter().map(|f| f.id).collect::<Vec<_>>(), [1, 2]);
    assert!(fulfillments.iter().all(|f| f.exercises_id == 8));
}

#[test]
fn missing_occurrence_is_reported() {
    let row = raw_row(&[
        ("id", many(&[int(8), int(10)])),
        ("title", one(text("H"))),
        ("state", one(text("answering"))),
        ("exercises_id", one(int(8))),
    ]);
    let joins = [Join::entity::<Question>(), Join::entity::<Fulfillment>()];
    let err = assemble(Exercise::model(), &joins, &[row]).unwrap_err();

    assert!(matches!(
        err,
        Error::Resolution(ResolutionError::UnresolvedJoinIndex {
            ref column,
            table: "fulfillments",
            index: 2,
            occurrences: 2,
        }) if column == "id"
    ));
}

/// `exercises -> fulfillments -> responses`, one row per response.
fn nested_row(fulfillment: Option<i64>, response: Option<(i64, &str)>) -> RawRow {
    let (response_id, answer, fulfillments_id) = match response {
        Some((id, answer)) => (int(id), text(answer), fulfillment.map_or(NULL, int)),
        None => (NULL, DataType::Str(None), NULL),
    };
    raw_row(&[
        ("id", many(&[int(8), fulfillment.map_or(NULL, int), response_id])),
        ("title", one(text("H"))),
        ("state", one(text("answering"))),
        ("timestamp", one(text("2024-01-15 10:30:45"))),
        ("exercises_id", one(int(8))),
        ("answer", one(answer)),
        ("questions_id", one(int(10))),
        ("fulfillments_id", one(fulfillments_id)),
    ])
}

#[test]
fn nested_relations_attach_under_their_parent() {
    let rows = [
        nested_row(Some(1), Some((1, "A1"))),
        nested_row(Some(1), Some((2, "A2"))),
        nested_row(Some(2), Some((3, "A3"))),
        nested_row(Some(3), None),
    ];
    let joins = [Join::entity::<Fulfillment>().with(Join::entity::<Response>())];
    let forest = assemble(Exercise::model(), &joins, &rows).unwrap();

    assert_eq!(forest.len(), 1);
    let fulfillments = forest[0].related("fulfillments").unwrap();
    assert_eq!(fulfillments.len(), 3);

    let answers: Vec<Vec<String>> = fulfillments
        .iter()
        .map(|fulfillment| {
            fulfillment
                .related_entities::<Response>()
                .unwrap()
                .into_iter()
                .filter_map(|response| response.answer)
                .collect()
        })
        .collect();
    assert_eq!(answers, vec![vec!["A1", "A2"], vec!["A3"], vec![]]);
}

#[test]
fn nested_slots_exist_when_parent_has_no_rows() {
    let row = nested_row(None, None);
    let joins = [Join::entity::<Fulfillment>().with(Join::entity::<Response>())];
    let forest = assemble(Exercise::model(), &joins, &[row]).unwrap();

    assert_eq!(forest[0].related("fulfillments").map(<[_]>::len), Some(0));
}

#[test]
fn rows_without_primary_key_are_separate_roots() {
    let rows = [
        raw_row(&[("state", one(text("answering"))), ("total", one(int(4)))]),
        raw_row(&[("state", one(text("building"))), ("total", one(int(4)))]),
    ];
    let forest = assemble(Exercise::model(), &[], &rows).unwrap();

    assert_eq!(forest.len(), 2);
    assert_eq!(forest[1].fetch::<String>("state").unwrap(), "building");
    assert!(forest[0].get("total").is_none());
}
