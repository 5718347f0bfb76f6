use crate::{
    error::{DbError, DbResult},
    execution::op_iterator::{exhausted_error, not_open_error, OpIterator},
    storage::{
        schema::{Field, Schema, Type},
        tuple::{Cell, Tuple},
    },
    transaction::Transaction,
    Database,
};

/// Drains its child and inserts every tuple into the target table, then
/// yields a single one-field tuple holding the inserted count.
pub struct Insert {
    tx: Transaction,
    child: Box<dyn OpIterator>,
    table_id: u32,
    schema: Schema,

    result: Option<Tuple>,
    delivered: bool,
}

impl Insert {
    pub fn new(
        tx: &Transaction,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Self, DbError> {
        let table_schema = Database::catalog()
            .get_schema(&table_id)
            .ok_or_else(|| DbError::Db(format!("table {} not found", table_id)))?;
        if &table_schema != child.get_schema() {
            return Err(DbError::Db(format!(
                "child schema {} does not match table schema {}",
                child.get_schema(),
                table_schema
            )));
        }

        Ok(Self {
            tx: *tx,
            child,
            table_id,
            schema: Schema::new(vec![Field::new("inserted", Type::Int)]),
            result: None,
            delivered: false,
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> DbResult {
        self.child.open()?;

        let mut count = 0;
        while self.child.has_next()? {
            let mut tuple = self.child.next()?;
            // values move to the new table; their old location is irrelevant
            tuple.set_record_id(None);
            Database::buffer_pool().insert_tuple(&self.tx, self.table_id, &mut tuple)?;
            count += 1;
        }
        self.child.close();

        self.result = Some(Tuple::new(self.schema.clone(), vec![Cell::Int(count)]));
        self.delivered = false;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        Ok(self.result.is_some() && !self.delivered)
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        let result = self.result.as_ref().ok_or_else(not_open_error)?;
        if self.delivered {
            return Err(exhausted_error());
        }
        self.delivered = true;
        Ok(result.clone())
    }

    fn rewind(&mut self) -> DbResult {
        if self.result.is_none() {
            return Err(not_open_error());
        }
        self.delivered = false;
        Ok(())
    }

    fn close(&mut self) {
        self.result = None;
        self.delivered = false;
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
