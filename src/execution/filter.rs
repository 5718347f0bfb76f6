use crate::{
    error::{DbError, DbResult},
    execution::{
        op_iterator::{exhausted_error, OpIterator},
        predicate::Predicate,
    },
    storage::{schema::Schema, tuple::Tuple},
};

/// Passes through the child tuples the predicate accepts.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,

    // look-ahead slot filled by has_next
    next_tuple: Option<Tuple>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicate,
            child,
            next_tuple: None,
        }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> DbResult {
        self.next_tuple = None;
        self.child.open()
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if self.next_tuple.is_some() {
            return Ok(true);
        }
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.filter(&tuple)? {
                self.next_tuple = Some(tuple);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(exhausted_error());
        }
        Ok(self.next_tuple.take().unwrap())
    }

    fn rewind(&mut self) -> DbResult {
        self.next_tuple = None;
        self.child.rewind()
    }

    fn close(&mut self) {
        self.next_tuple = None;
        self.child.close();
    }

    fn get_schema(&self) -> &Schema {
        self.child.get_schema()
    }
}
