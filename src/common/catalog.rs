use std::collections::HashMap;

use crate::{storage::heap_table::HeapTable, storage::schema::Schema, types::Pod, utils::HandyRwLock};

/// In-memory table directory: table id to the table object. Stable for the
/// process lifetime; persistence lives outside the engine.
pub struct Catalog {
    map: HashMap<Key, Value>,
}

type Key = u32;
type Value = Pod<HeapTable>;

impl Catalog {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn add_table(&mut self, table_rc: Value) {
        let table_id = table_rc.rl().get_id();
        self.map.insert(table_id, table_rc);
    }

    pub fn get_table(&self, table_id: &Key) -> Option<Value> {
        self.map.get(table_id).cloned()
    }

    pub fn get_schema(&self, table_id: &Key) -> Option<Schema> {
        self.map.get(table_id).map(|t| t.rl().get_schema().clone())
    }

    pub fn get_table_name(&self, table_id: &Key) -> Option<String> {
        self.map.get(table_id).map(|t| t.rl().get_name().to_string())
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
