mod test_utils;

use heapdb::{
    execution::{Filter, Insert, Join, JoinPredicate, Op, OpIterator, Predicate, SeqScan},
    storage::tuple::{Cell, Tuple},
    transaction::Transaction,
    utils::HandyRwLock,
};

use crate::test_utils::{insert_tuples, int_rows, new_int_table, setup};

/// Drain an operator into a vector, closing it afterwards.
fn drain(op: &mut dyn OpIterator) -> Vec<Tuple> {
    let mut tuples = Vec::new();
    while op.has_next().unwrap() {
        tuples.push(op.next().unwrap());
    }
    tuples
}

#[test]
fn test_scan_spans_pages() {
    setup();

    // 1000 two-column rows do not fit on a single 4096-byte page
    let table_rc = new_int_table("scan_spans_pages", 2);
    insert_tuples(&table_rc, int_rows(1000, 2));
    assert!(table_rc.rl().num_pages().unwrap() > 1);

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut scan = SeqScan::new(&tx, table_rc.rl().get_id(), "t").unwrap();

    scan.open().unwrap();
    let tuples = drain(&mut scan);
    assert_eq!(tuples.len(), 1000);

    // field names carry the alias prefix
    assert_eq!(scan.get_schema().get_field_name(0), "t.int-column-0");
    assert_eq!(scan.get_alias(), "t");

    scan.close();
    tx.commit().unwrap();
}

#[test]
fn test_scan_rewind_yields_same_multiset() {
    setup();

    let table_rc = new_int_table("scan_rewind", 2);
    insert_tuples(&table_rc, int_rows(600, 2));

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut scan = SeqScan::new(&tx, table_rc.rl().get_id(), "t").unwrap();

    scan.open().unwrap();
    let mut first: Vec<i32> = drain(&mut scan)
        .iter()
        .map(|t| t.get_cell(0).get_int().unwrap())
        .collect();

    scan.rewind().unwrap();
    let mut second: Vec<i32> = drain(&mut scan)
        .iter()
        .map(|t| t.get_cell(0).get_int().unwrap())
        .collect();

    first.sort();
    second.sort();
    assert_eq!(first, second);

    // double close is a no-op
    scan.close();
    scan.close();
    assert!(!scan.has_next().unwrap());
    assert!(scan.next().is_err());

    tx.commit().unwrap();
}

#[test]
fn test_next_before_open_is_an_error() {
    setup();

    let table_rc = new_int_table("next_before_open", 2);
    insert_tuples(&table_rc, int_rows(3, 2));

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut scan = SeqScan::new(&tx, table_rc.rl().get_id(), "t").unwrap();

    assert!(scan.next().is_err());
    assert!(!scan.has_next().unwrap());

    tx.commit().unwrap();
}

#[test]
fn test_filter_selects_matching_rows() {
    setup();

    let table_rc = new_int_table("filter_rows", 2);
    insert_tuples(&table_rc, int_rows(100, 2));

    let tx = Transaction::new();
    tx.start().unwrap();
    let scan = SeqScan::new(&tx, table_rc.rl().get_id(), "t").unwrap();
    let predicate = Predicate::new(0, Op::GreaterThanOrEq, &Cell::Int(90));
    let mut filter = Filter::new(predicate, Box::new(scan));

    filter.open().unwrap();
    let tuples = drain(&mut filter);
    assert_eq!(tuples.len(), 10);
    assert!(tuples
        .iter()
        .all(|t| t.get_cell(0).get_int().unwrap() >= 90));

    filter.close();
    tx.commit().unwrap();
}

#[test]
fn test_nested_loop_join() {
    setup();

    let left_rc = new_int_table("join_left", 2);
    let right_rc = new_int_table("join_right", 2);

    insert_tuples(&left_rc, int_rows(20, 2));
    // rows 10..30: ids 10..19 exist on both sides
    insert_tuples(
        &right_rc,
        (10..30).map(|i| Tuple::new_int_tuple(&[i, i])).collect(),
    );

    let tx = Transaction::new();
    tx.start().unwrap();
    let outer = SeqScan::new(&tx, left_rc.rl().get_id(), "l").unwrap();
    let inner = SeqScan::new(&tx, right_rc.rl().get_id(), "r").unwrap();

    let mut join = Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        Box::new(outer),
        Box::new(inner),
    );

    // output descriptor is the concatenation of both inputs
    assert_eq!(join.get_schema().num_fields(), 4);
    assert_eq!(join.get_schema().get_field_name(2), "r.int-column-0");

    join.open().unwrap();
    let tuples = drain(&mut join);
    assert_eq!(tuples.len(), 10);
    for t in &tuples {
        assert_eq!(
            t.get_cell(0).get_int().unwrap(),
            t.get_cell(2).get_int().unwrap()
        );
    }

    join.close();
    tx.commit().unwrap();
}

#[test]
fn test_insert_operator_reports_count() {
    setup();

    let source_rc = new_int_table("insert_op_source", 2);
    let dest_rc = new_int_table("insert_op_dest", 2);
    insert_tuples(&source_rc, int_rows(25, 2));

    let tx = Transaction::new();
    tx.start().unwrap();
    let scan = SeqScan::new(&tx, source_rc.rl().get_id(), "s").unwrap();
    let mut insert = Insert::new(&tx, Box::new(scan), dest_rc.rl().get_id()).unwrap();

    insert.open().unwrap();
    assert!(insert.has_next().unwrap());
    let count = insert.next().unwrap();
    assert_eq!(count.get_cell(0).get_int().unwrap(), 25);

    // a second pull comes back empty
    assert!(!insert.has_next().unwrap());
    assert!(insert.next().is_err());

    insert.close();
    tx.commit().unwrap();

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut scan = SeqScan::new(&tx, dest_rc.rl().get_id(), "d").unwrap();
    scan.open().unwrap();
    assert_eq!(drain(&mut scan).len(), 25);
    scan.close();
    tx.commit().unwrap();
}

#[test]
fn test_delete_operator_removes_filtered_rows() {
    setup();

    let table_rc = new_int_table("delete_op", 2);
    insert_tuples(&table_rc, int_rows(50, 2));
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    tx.start().unwrap();
    let scan = SeqScan::new(&tx, table_id, "t").unwrap();
    let predicate = Predicate::new(0, Op::LessThan, &Cell::Int(20));
    let filter = Filter::new(predicate, Box::new(scan));
    let mut delete = heapdb::execution::Delete::new(&tx, Box::new(filter));

    delete.open().unwrap();
    let count = delete.next().unwrap();
    assert_eq!(count.get_cell(0).get_int().unwrap(), 20);
    delete.close();
    tx.commit().unwrap();

    let tx = Transaction::new();
    tx.start().unwrap();
    let mut scan = SeqScan::new(&tx, table_id, "t").unwrap();
    scan.open().unwrap();
    let remaining = drain(&mut scan);
    assert_eq!(remaining.len(), 30);
    assert!(remaining
        .iter()
        .all(|t| t.get_cell(0).get_int().unwrap() >= 20));
    scan.close();
    tx.commit().unwrap();
}
