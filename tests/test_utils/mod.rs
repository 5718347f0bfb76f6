use std::sync::{Arc, RwLock};

use heapdb::{
    storage::{heap_table::HeapTable, schema::Schema, tuple::Tuple},
    transaction::Transaction,
    types::Pod,
    utils::{self, HandyRwLock},
    Database,
};

/// Conduct the per-test initialization: logging only. The database
/// singleton is shared by every test in the binary, so tests keep to their
/// own tables instead of resetting global state.
pub fn setup() {
    utils::init_log();
}

/// Create an empty all-int table backed by a fresh file in the temp
/// directory, and register it in the catalog. Any file left over from an
/// earlier run is removed first so the table really starts empty.
pub fn new_int_table(name: &str, columns: usize) -> Pod<HeapTable> {
    let path = std::env::temp_dir().join(format!("heapdb_{}_{}.db", name, std::process::id()));
    let _ = std::fs::remove_file(&path);

    let schema = Schema::small_int_schema(columns);
    new_table_at(&path, name, &schema)
}

/// Same as `new_int_table` for an arbitrary schema.
pub fn new_table(name: &str, schema: &Schema) -> Pod<HeapTable> {
    let path = std::env::temp_dir().join(format!("heapdb_{}_{}.db", name, std::process::id()));
    let _ = std::fs::remove_file(&path);

    new_table_at(&path, name, schema)
}

fn new_table_at(path: &std::path::Path, name: &str, schema: &Schema) -> Pod<HeapTable> {
    let table = HeapTable::new(path, name, schema).unwrap();
    let table_rc = Arc::new(RwLock::new(table));
    Database::mut_catalog().add_table(table_rc.clone());
    table_rc
}

/// Insert the given tuples in one committed transaction.
pub fn insert_tuples(table_rc: &Pod<HeapTable>, tuples: Vec<Tuple>) {
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    tx.start().unwrap();
    for mut tuple in tuples {
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &mut tuple)
            .unwrap();
    }
    tx.commit().unwrap();
}

/// `rows` all-int tuples `(base, base, ...)` for `columns` columns.
pub fn int_rows(rows: usize, columns: usize) -> Vec<Tuple> {
    (0..rows)
        .map(|i| Tuple::new_int_tuple(&vec![i as i32; columns]))
        .collect()
}
