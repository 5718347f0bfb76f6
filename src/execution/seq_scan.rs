use crate::{
    error::{DbError, DbResult},
    execution::op_iterator::{not_open_error, OpIterator},
    storage::{
        heap_table::HeapTableIterator,
        schema::{Field, Schema},
        tuple::Tuple,
    },
    transaction::Transaction,
    Database,
};

/// Sequential scan over one table. Output field names are prefixed with the
/// table alias, `alias.fieldName`.
pub struct SeqScan {
    tx: Transaction,
    table_id: u32,
    table_alias: String,
    schema: Schema,

    iter: Option<HeapTableIterator>,
}

impl SeqScan {
    pub fn new(tx: &Transaction, table_id: u32, table_alias: &str) -> Result<Self, DbError> {
        let base_schema = Database::catalog()
            .get_schema(&table_id)
            .ok_or_else(|| DbError::Db(format!("table {} not found", table_id)))?;

        let fields = base_schema
            .fields
            .iter()
            .map(|f| Field::new(&format!("{}.{}", table_alias, f.name), f.t))
            .collect();

        Ok(Self {
            tx: *tx,
            table_id,
            table_alias: table_alias.to_string(),
            schema: Schema::new(fields),
            iter: None,
        })
    }

    pub fn get_table_name(&self) -> Option<String> {
        Database::catalog().get_table_name(&self.table_id)
    }

    pub fn get_alias(&self) -> &str {
        &self.table_alias
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> DbResult {
        let table_rc = Database::catalog()
            .get_table(&self.table_id)
            .ok_or_else(|| DbError::Db(format!("table {} not found", self.table_id)))?;

        let mut iter = HeapTableIterator::new(&self.tx, table_rc);
        iter.open()?;
        self.iter = Some(iter);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        match self.iter.as_mut() {
            Some(iter) => iter.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        let iter = self.iter.as_mut().ok_or_else(not_open_error)?;
        let tuple = iter.next()?;

        // rebrand with the aliased field names, keeping the record id
        let mut out = Tuple::new(self.schema.clone(), tuple.get_cells().to_vec());
        out.set_record_id(tuple.get_record_id());
        Ok(out)
    }

    fn rewind(&mut self) -> DbResult {
        let iter = self.iter.as_mut().ok_or_else(not_open_error)?;
        iter.rewind()
    }

    fn close(&mut self) {
        if let Some(iter) = self.iter.as_mut() {
            iter.close();
        }
        self.iter = None;
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
