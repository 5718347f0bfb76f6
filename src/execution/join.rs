use crate::{
    error::{DbError, DbResult},
    execution::{
        op_iterator::{exhausted_error, OpIterator},
        predicate::JoinPredicate,
    },
    storage::{schema::Schema, tuple::Tuple},
};

/// Nested-loop join: for every outer tuple the inner child is scanned in
/// full (rewound at each new outer tuple); matches are emitted as the
/// concatenation outer ++ inner.
pub struct Join {
    predicate: JoinPredicate,
    outer: Box<dyn OpIterator>,
    inner: Box<dyn OpIterator>,
    schema: Schema,

    outer_tuple: Option<Tuple>,
    next_match: Option<Tuple>,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        outer: Box<dyn OpIterator>,
        inner: Box<dyn OpIterator>,
    ) -> Self {
        let schema = Schema::merge(outer.get_schema(), inner.get_schema());
        Self {
            predicate,
            outer,
            inner,
            schema,
            outer_tuple: None,
            next_match: None,
        }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> DbResult {
        self.outer_tuple = None;
        self.next_match = None;
        self.outer.open()?;
        self.inner.open()
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if self.next_match.is_some() {
            return Ok(true);
        }

        loop {
            if self.outer_tuple.is_none() {
                if !self.outer.has_next()? {
                    return Ok(false);
                }
                self.outer_tuple = Some(self.outer.next()?);
            }

            let outer_tuple = self.outer_tuple.clone().unwrap();
            while self.inner.has_next()? {
                let inner_tuple = self.inner.next()?;
                if self.predicate.filter(&outer_tuple, &inner_tuple)? {
                    self.next_match = Some(Tuple::merge(&outer_tuple, &inner_tuple));
                    return Ok(true);
                }
            }

            // inner exhausted for this outer tuple
            self.inner.rewind()?;
            self.outer_tuple = None;
        }
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(exhausted_error());
        }
        Ok(self.next_match.take().unwrap())
    }

    fn rewind(&mut self) -> DbResult {
        self.outer_tuple = None;
        self.next_match = None;
        self.outer.rewind()?;
        self.inner.rewind()
    }

    fn close(&mut self) {
        self.outer_tuple = None;
        self.next_match = None;
        self.inner.close();
        self.outer.close();
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
