use core::fmt;
use std::cmp::Ordering;

use crate::{error::DbError, storage::tuple::{Cell, Tuple}};

/// Comparison operators. `Like` is substring containment and is defined
/// only on strings.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    NotEquals,
    Like,
}

impl Op {
    /// Apply the operator to two cells of the same type.
    pub fn compare(&self, lhs: &Cell, rhs: &Cell) -> Result<bool, DbError> {
        if let Op::Like = self {
            return match (lhs, rhs) {
                (Cell::String(a), Cell::String(b)) => Ok(a.contains(b.as_str())),
                _ => Err(DbError::Unsupported(
                    "LIKE is only defined on string fields".to_string(),
                )),
            };
        }

        let ordering = match (lhs, rhs) {
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::String(a), Cell::String(b)) => a.cmp(b),
            _ => {
                return Err(DbError::Db(format!(
                    "cannot compare {:?} with {:?}",
                    lhs, rhs
                )))
            }
        };

        Ok(match self {
            Op::Equals => ordering == Ordering::Equal,
            Op::NotEquals => ordering != Ordering::Equal,
            Op::GreaterThan => ordering == Ordering::Greater,
            Op::GreaterThanOrEq => ordering != Ordering::Less,
            Op::LessThan => ordering == Ordering::Less,
            Op::LessThanOrEq => ordering != Ordering::Greater,
            Op::Like => unreachable!(),
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::NotEquals => "<>",
            Op::Like => "LIKE",
        };
        write!(f, "{}", symbol)
    }
}

/// Compares one tuple field against a literal.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub cell: Cell,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, cell: &Cell) -> Self {
        Self {
            field_index,
            op,
            cell: cell.clone(),
        }
    }

    pub fn filter(&self, tuple: &Tuple) -> Result<bool, DbError> {
        self.op.compare(&tuple.get_cell(self.field_index), &self.cell)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "field[{}] {} {}", self.field_index, self.op, self.cell)
    }
}

/// Compares a field of one tuple against a field of another, for joins.
#[derive(Clone, Debug)]
pub struct JoinPredicate {
    pub field_index1: usize,
    pub op: Op,
    pub field_index2: usize,
}

impl JoinPredicate {
    pub fn new(field_index1: usize, op: Op, field_index2: usize) -> Self {
        Self {
            field_index1,
            op,
            field_index2,
        }
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> Result<bool, DbError> {
        self.op.compare(
            &left.get_cell(self.field_index1),
            &right.get_cell(self.field_index2),
        )
    }
}
