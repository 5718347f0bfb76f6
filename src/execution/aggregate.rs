use core::fmt;
use std::collections::HashMap;

use crate::{
    error::{DbError, DbResult},
    execution::op_iterator::{exhausted_error, not_open_error, OpIterator},
    storage::{
        schema::{Field, Schema, Type},
        tuple::{Cell, Tuple},
    },
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Count => "COUNT",
        };
        write!(f, "{}", name)
    }
}

/// Running state of one group. Everything is tracked so a single merge path
/// serves every operator; the emit step picks what the operator asks for.
struct IntAccumulator {
    count: i32,
    sum: i32,
    min: i32,
    max: i32,
}

impl Default for IntAccumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        }
    }
}

impl IntAccumulator {
    fn merge(&mut self, value: i32) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// AVG is integer sum/count, computed at emission time.
    fn emit(&self, op: AggregateOp) -> i32 {
        match op {
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
            AggregateOp::Sum => self.sum,
            AggregateOp::Avg => self.sum / self.count,
            AggregateOp::Count => self.count,
        }
    }
}

/// Grouping accumulators. The group key is `None` when the aggregate runs
/// without grouping, so no sentinel value is needed.
enum Aggregator {
    Int {
        groups: HashMap<Option<Cell>, IntAccumulator>,
    },
    Str {
        // only COUNT reaches here, a plain counter per group suffices
        groups: HashMap<Option<Cell>, i32>,
    },
}

impl Aggregator {
    fn new(aggregate_type: Type) -> Self {
        match aggregate_type {
            Type::Int => Aggregator::Int {
                groups: HashMap::new(),
            },
            Type::Char(_) => Aggregator::Str {
                groups: HashMap::new(),
            },
        }
    }

    fn merge(
        &mut self,
        tuple: &Tuple,
        aggregate_field: usize,
        group_by_field: Option<usize>,
    ) -> DbResult {
        let key = group_by_field.map(|g| tuple.get_cell(g));
        match self {
            Aggregator::Int { groups } => {
                let value = tuple.get_cell(aggregate_field).get_int()?;
                groups.entry(key).or_default().merge(value);
            }
            Aggregator::Str { groups } => {
                *groups.entry(key).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    /// One output tuple per group: `(groupValue?, aggregateValue)`. Group
    /// order is unspecified.
    fn results(&self, op: AggregateOp, schema: &Schema) -> Vec<Tuple> {
        let emit = |key: &Option<Cell>, value: i32| {
            let cells = match key {
                Some(group) => vec![group.clone(), Cell::Int(value)],
                None => vec![Cell::Int(value)],
            };
            Tuple::new(schema.clone(), cells)
        };

        match self {
            Aggregator::Int { groups } => groups
                .iter()
                .map(|(key, acc)| emit(key, acc.emit(op)))
                .collect(),
            Aggregator::Str { groups } => {
                groups.iter().map(|(key, count)| emit(key, *count)).collect()
            }
        }
    }
}

/// Grouped aggregation over one column, with an optional group-by column.
///
/// The aggregate output field is named `OP(childFieldName)`, e.g.
/// `MAX(t.score)`. String aggregate columns support COUNT only.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    aggregate_field: usize,
    group_by_field: Option<usize>,
    op: AggregateOp,
    schema: Schema,

    results: Option<Vec<Tuple>>,
    cursor: usize,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        aggregate_field: usize,
        group_by_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self, DbError> {
        let child_schema = child.get_schema();

        if let Type::Char(_) = child_schema.get_type(aggregate_field) {
            if op != AggregateOp::Count {
                return Err(DbError::Unsupported(format!(
                    "{} is not defined on string fields, only COUNT is",
                    op
                )));
            }
        }

        let aggregate_name = format!(
            "{}({})",
            op,
            child_schema.get_field_name(aggregate_field)
        );
        let schema = match group_by_field {
            None => Schema::new(vec![Field::new(&aggregate_name, Type::Int)]),
            Some(g) => Schema::new(vec![
                Field::new(
                    child_schema.get_field_name(g),
                    child_schema.get_type(g),
                ),
                Field::new(&aggregate_name, Type::Int),
            ]),
        };

        Ok(Self {
            child,
            aggregate_field,
            group_by_field,
            op,
            schema,
            results: None,
            cursor: 0,
        })
    }

    pub fn get_aggregate_op(&self) -> AggregateOp {
        self.op
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> DbResult {
        self.child.open()?;

        let mut aggregator =
            Aggregator::new(self.child.get_schema().get_type(self.aggregate_field));
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            aggregator.merge(&tuple, self.aggregate_field, self.group_by_field)?;
        }
        self.child.close();

        self.results = Some(aggregator.results(self.op, &self.schema));
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        match self.results.as_ref() {
            Some(results) => Ok(self.cursor < results.len()),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        let results = self.results.as_ref().ok_or_else(not_open_error)?;
        if self.cursor >= results.len() {
            return Err(exhausted_error());
        }
        let tuple = results[self.cursor].clone();
        self.cursor += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> DbResult {
        if self.results.is_none() {
            return Err(not_open_error());
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.results = None;
        self.cursor = 0;
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }
}
