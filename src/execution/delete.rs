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

/// Drains its child and deletes every tuple by record id, then yields a
/// single one-field tuple holding the deleted count.
pub struct Delete {
    tx: Transaction,
    child: Box<dyn OpIterator>,
    schema: Schema,

    result: Option<Tuple>,
    delivered: bool,
}

impl Delete {
    pub fn new(tx: &Transaction, child: Box<dyn OpIterator>) -> Self {
        Self {
            tx: *tx,
            child,
            schema: Schema::new(vec![Field::new("deleted", Type::Int)]),
            result: None,
            delivered: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> DbResult {
        self.child.open()?;

        let mut count = 0;
        while self.child.has_next()? {
            let mut tuple = self.child.next()?;
            Database::buffer_pool().delete_tuple(&self.tx, &mut tuple)?;
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
