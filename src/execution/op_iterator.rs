use crate::{
    error::{DbError, DbResult},
    storage::{schema::Schema, tuple::Tuple},
};

/// Pull-model operator: `open -> (has_next -> next)* -> close`, with
/// `rewind` resetting to the post-open state.
///
/// `next` before `open` or after `close` is a `DbError`; `has_next` on a
/// closed operator reports false; closing twice is a no-op.
pub trait OpIterator {
    fn open(&mut self) -> DbResult;

    fn has_next(&mut self) -> Result<bool, DbError>;

    fn next(&mut self) -> Result<Tuple, DbError>;

    fn rewind(&mut self) -> DbResult;

    fn close(&mut self);

    fn get_schema(&self) -> &Schema;
}

pub(crate) fn not_open_error() -> DbError {
    DbError::Db("operator must be opened before pulling tuples".to_string())
}

pub(crate) fn exhausted_error() -> DbError {
    DbError::Db("no more tuples".to_string())
}
