mod test_utils;

use std::collections::HashSet;

use heapdb::{
    error::DbError,
    execution::{Aggregate, AggregateOp, OpIterator, SeqScan},
    storage::{
        schema::{Field, Schema, Type},
        tuple::{Cell, Tuple},
    },
    transaction::Transaction,
    utils::HandyRwLock,
};

use crate::test_utils::{insert_tuples, new_int_table, new_table, setup};

fn drain(op: &mut dyn OpIterator) -> Vec<Tuple> {
    let mut tuples = Vec::new();
    while op.has_next().unwrap() {
        tuples.push(op.next().unwrap());
    }
    tuples
}

fn scan(tx: &Transaction, table_id: u32) -> Box<dyn OpIterator> {
    Box::new(SeqScan::new(tx, table_id, "t").unwrap())
}

#[test]
fn test_sum_without_grouping() {
    setup();

    let table_rc = new_int_table("agg_sum", 1);
    insert_tuples(
        &table_rc,
        vec![
            Tuple::new_int_tuple(&[1]),
            Tuple::new_int_tuple(&[2]),
            Tuple::new_int_tuple(&[3]),
        ],
    );

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut agg = Aggregate::new(
        scan(&tx, table_rc.rl().get_id()),
        0,
        None,
        AggregateOp::Sum,
    )
    .unwrap();

    agg.open().unwrap();
    let results = drain(&mut agg);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get_cell(0).get_int().unwrap(), 6);

    assert_eq!(agg.get_schema().get_field_name(0), "SUM(t.int-column-0)");

    agg.close();
    tx.commit().unwrap();
}

#[test]
fn test_min_max_count_without_grouping() {
    setup();

    let table_rc = new_int_table("agg_min_max", 1);
    insert_tuples(
        &table_rc,
        [5, -7, 12, 0].iter().map(|v| Tuple::new_int_tuple(&[*v])).collect(),
    );
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    tx.start().unwrap();

    for (op, expected) in [
        (AggregateOp::Min, -7),
        (AggregateOp::Max, 12),
        (AggregateOp::Count, 4),
    ] {
        let mut agg = Aggregate::new(scan(&tx, table_id), 0, None, op).unwrap();
        agg.open().unwrap();
        let results = drain(&mut agg);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get_cell(0).get_int().unwrap(), expected);
        agg.close();
    }

    tx.commit().unwrap();
}

#[test]
fn test_grouped_average_by_string_key() {
    setup();

    let schema = Schema::new(vec![
        Field::new("g", Type::Char(8)),
        Field::new("x", Type::Int),
    ]);
    let table_rc = new_table("agg_avg_groups", &schema);
    insert_tuples(
        &table_rc,
        vec![
            Tuple::new(schema.clone(), vec![Cell::new_string("a"), Cell::Int(2)]),
            Tuple::new(schema.clone(), vec![Cell::new_string("a"), Cell::Int(4)]),
            Tuple::new(schema.clone(), vec![Cell::new_string("b"), Cell::Int(7)]),
        ],
    );

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut agg = Aggregate::new(
        scan(&tx, table_rc.rl().get_id()),
        1,
        Some(0),
        AggregateOp::Avg,
    )
    .unwrap();

    agg.open().unwrap();
    let results: HashSet<(String, i32)> = drain(&mut agg)
        .iter()
        .map(|t| {
            (
                t.get_cell(0).get_string().unwrap().to_string(),
                t.get_cell(1).get_int().unwrap(),
            )
        })
        .collect();

    // group order is unspecified
    let expected: HashSet<(String, i32)> =
        [("a".to_string(), 3), ("b".to_string(), 7)].into_iter().collect();
    assert_eq!(results, expected);

    assert_eq!(agg.get_schema().get_field_name(1), "AVG(t.x)");

    agg.close();
    tx.commit().unwrap();
}

#[test]
fn test_grouped_count_by_int_key() {
    setup();

    let table_rc = new_int_table("agg_count_groups", 2);
    insert_tuples(
        &table_rc,
        vec![
            Tuple::new_int_tuple(&[1, 10]),
            Tuple::new_int_tuple(&[1, 20]),
            Tuple::new_int_tuple(&[1, 30]),
            Tuple::new_int_tuple(&[2, 40]),
        ],
    );

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut agg = Aggregate::new(
        scan(&tx, table_rc.rl().get_id()),
        1,
        Some(0),
        AggregateOp::Count,
    )
    .unwrap();

    agg.open().unwrap();
    let results: HashSet<(i32, i32)> = drain(&mut agg)
        .iter()
        .map(|t| {
            (
                t.get_cell(0).get_int().unwrap(),
                t.get_cell(1).get_int().unwrap(),
            )
        })
        .collect();

    let expected: HashSet<(i32, i32)> = [(1, 3), (2, 1)].into_iter().collect();
    assert_eq!(results, expected);

    // rewind replays the same groups
    agg.rewind().unwrap();
    assert_eq!(drain(&mut agg).len(), 2);

    agg.close();
    tx.commit().unwrap();
}

#[test]
fn test_string_column_supports_count_only() {
    setup();

    let schema = Schema::new(vec![Field::new("name", Type::Char(8))]);
    let table_rc = new_table("agg_string_count", &schema);
    insert_tuples(
        &table_rc,
        vec![
            Tuple::new(schema.clone(), vec![Cell::new_string("x")]),
            Tuple::new(schema.clone(), vec![Cell::new_string("y")]),
        ],
    );
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    tx.start().unwrap();

    let mut agg = Aggregate::new(scan(&tx, table_id), 0, None, AggregateOp::Count).unwrap();
    agg.open().unwrap();
    let results = drain(&mut agg);
    assert_eq!(results[0].get_cell(0).get_int().unwrap(), 2);
    agg.close();

    // anything else on a string column is refused up front
    let result = Aggregate::new(scan(&tx, table_id), 0, None, AggregateOp::Min);
    assert!(matches!(result, Err(DbError::Unsupported(_))));

    tx.commit().unwrap();
}
