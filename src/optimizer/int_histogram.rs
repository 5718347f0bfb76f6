use core::fmt;
use std::collections::HashMap;

use crate::{error::DbError, execution::Op};

/// Fixed-width histogram over one integer column, used for selectivity
/// estimation. Space and time are constant in the number of values added:
/// only a sparse bucket map and a running total are kept.
///
/// Built once per column by a scan, then queried read-only.
pub struct IntHistogram {
    buckets: HashMap<i64, usize>,
    min: i32,
    max: i32,
    bucket_width: i64,
    total: usize,
}

impl IntHistogram {
    pub fn new(buckets: usize, min: i32, max: i32) -> Self {
        let span = (max as i64 - min as i64) as f64;
        let bucket_width = (span / buckets as f64).ceil() as i64;
        Self {
            buckets: HashMap::with_capacity(buckets),
            min,
            max,
            bucket_width: bucket_width.max(1),
            total: 0,
        }
    }

    fn bucket_of(&self, v: i32) -> i64 {
        (v as i64 - self.min as i64) / self.bucket_width
    }

    pub fn add_value(&mut self, v: i32) {
        *self.buckets.entry(self.bucket_of(v)).or_insert(0) += 1;
        self.total += 1;
    }

    /// Estimated fraction of values satisfying `value op v`.
    ///
    /// Sums the buckets matched by the predicate; for equality the bucket
    /// count is divided by the bucket width before normalizing.
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> Result<f64, DbError> {
        if op == Op::Like {
            return Err(DbError::Unsupported(
                "LIKE has no histogram estimate".to_string(),
            ));
        }
        if self.total == 0 {
            return Ok(0.0);
        }

        let key = self.bucket_of(v);
        let mut count: usize = self
            .buckets
            .iter()
            .filter(|(bucket, _)| match op {
                Op::Equals => **bucket == key,
                Op::GreaterThan => **bucket > key,
                Op::GreaterThanOrEq => **bucket >= key,
                Op::LessThan => **bucket < key,
                Op::LessThanOrEq => **bucket <= key,
                Op::NotEquals => **bucket != key,
                Op::Like => false,
            })
            .map(|(_, c)| *c)
            .sum();

        if op == Op::Equals {
            count /= self.bucket_width as usize;
        }

        Ok(count as f64 / self.total as f64)
    }

    /// Coarse stand-in used by join ordering; deliberately constant.
    pub fn avg_selectivity(&self) -> f64 {
        1.0
    }
}

impl fmt::Display for IntHistogram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content = format!(
            "IntHistogram(min: {}, max: {}, width: {}) {{",
            self.min, self.max, self.bucket_width
        );
        for (bucket, count) in &self.buckets {
            content.push_str(&format!("{}: {}, ", bucket, count));
        }
        content.push('}');
        write!(f, "{}", content)
    }
}
