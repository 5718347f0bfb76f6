use std::fmt;

use crate::{
    error::DbError,
    io::{read_exact, read_i32},
    storage::{
        page_id::RecordID,
        schema::{Schema, Type},
    },
};

/// A single field value. Ordering between cells is defined by the
/// comparison operators in the execution layer; only values of the same
/// type compare.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Int(i32),
    String(String),
}

impl Cell {
    pub fn new_string(v: &str) -> Self {
        Cell::String(v.to_string())
    }

    pub fn get_int(&self) -> Result<i32, DbError> {
        match self {
            Cell::Int(v) => Ok(*v),
            _ => Err(DbError::Db("cell is not an int".to_string())),
        }
    }

    pub fn get_string(&self) -> Result<&str, DbError> {
        match self {
            Cell::String(v) => Ok(v),
            _ => Err(DbError::Db("cell is not a string".to_string())),
        }
    }

    pub fn matches_type(&self, t: &Type) -> bool {
        matches!(
            (self, t),
            (Cell::Int(_), Type::Int) | (Cell::String(_), Type::Char(_))
        )
    }

    /// Serialize to the on-disk record format. Ints are 4 big-endian bytes;
    /// a `Char(n)` field is a 4-byte big-endian length followed by the
    /// content, zero-padded to `n` bytes. Over-long strings are truncated to
    /// the declared width.
    pub fn to_bytes(&self, t: &Type) -> Result<Vec<u8>, DbError> {
        match (self, t) {
            (Cell::Int(v), Type::Int) => Ok(v.to_be_bytes().to_vec()),
            (Cell::String(v), Type::Char(size)) => {
                let mut payload = v.as_bytes().to_vec();
                payload.truncate(*size);

                let mut buf = Vec::with_capacity(4 + size);
                buf.extend_from_slice(&(payload.len() as i32).to_be_bytes());
                buf.extend_from_slice(&payload);
                buf.resize(4 + size, 0);
                Ok(buf)
            }
            _ => Err(DbError::Db(format!(
                "cell {:?} does not match field type {:?}",
                self, t
            ))),
        }
    }

    pub fn read_from<R: std::io::Read>(reader: &mut R, t: &Type) -> Result<Self, DbError> {
        match t {
            Type::Int => Ok(Cell::Int(read_i32(reader)?)),
            Type::Char(size) => {
                let len = read_i32(reader)? as usize;
                if len > *size {
                    return Err(DbError::Db(format!(
                        "string length {} exceeds field width {}",
                        len, size
                    )));
                }
                let bytes = read_exact(reader, *size)?;
                let content = String::from_utf8(bytes[..len].to_vec())
                    .map_err(|e| DbError::Db(format!("invalid utf8 in record: {}", e)))?;
                Ok(Cell::String(content))
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::String(v) => write!(f, "\"{}\"", v),
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A row: its schema, one cell per field, and the slot it occupies once it
/// has been placed on a page.
#[derive(Clone)]
pub struct Tuple {
    schema: Schema,
    cells: Vec<Cell>,
    record_id: Option<RecordID>,
}

impl Tuple {
    pub fn new(schema: Schema, cells: Vec<Cell>) -> Self {
        Self {
            schema,
            cells,
            record_id: None,
        }
    }

    pub fn new_int_tuple(values: &[i32]) -> Self {
        let schema = Schema::small_int_schema(values.len());
        let cells = values.iter().map(|v| Cell::Int(*v)).collect();
        Self::new(schema, cells)
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn set_cell(&mut self, i: usize, cell: Cell) {
        self.cells[i] = cell;
    }

    pub fn get_record_id(&self) -> Option<RecordID> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordID>) {
        self.record_id = rid;
    }

    /// Concatenation of two tuples; the result has no record id.
    pub fn merge(left: &Tuple, right: &Tuple) -> Tuple {
        let schema = Schema::merge(&left.schema, &right.schema);
        let mut cells = left.cells.clone();
        cells.extend(right.cells.iter().cloned());
        Tuple::new(schema, cells)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DbError> {
        let mut bytes = Vec::with_capacity(self.schema.get_size());
        for (i, cell) in self.cells.iter().enumerate() {
            bytes.extend_from_slice(&cell.to_bytes(&self.schema.get_type(i))?);
        }
        Ok(bytes)
    }

    pub fn read_from<R: std::io::Read>(reader: &mut R, schema: &Schema) -> Result<Self, DbError> {
        let mut cells = Vec::with_capacity(schema.num_fields());
        for field in &schema.fields {
            cells.push(Cell::read_from(reader, &field.t)?);
        }
        Ok(Self::new(schema.clone(), cells))
    }
}

/// Record ids never participate in equality, only the values do.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        if self.schema != other.schema {
            return false;
        }
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            content.push_str(&format!("{}, ", cell));
        }
        if content.len() > 1 {
            content.truncate(content.len() - 2);
        }
        content.push('}');
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::storage::schema::Field;

    #[test]
    fn test_int_tuple_round_trip() {
        let tuple = Tuple::new_int_tuple(&[7, -3]);
        let bytes = tuple.to_bytes().unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &7i32.to_be_bytes());

        let parsed = Tuple::read_from(&mut Cursor::new(bytes), tuple.get_schema()).unwrap();
        assert_eq!(parsed, tuple);
    }

    #[test]
    fn test_string_cell_padding_and_truncation() {
        let t = Type::Char(8);
        let bytes = Cell::new_string("hi").to_bytes(&t).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &2i32.to_be_bytes());
        assert_eq!(&bytes[4..6], b"hi");
        assert!(bytes[6..].iter().all(|b| *b == 0));

        let cell = Cell::read_from(&mut Cursor::new(bytes), &t).unwrap();
        assert_eq!(cell, Cell::new_string("hi"));

        // over-long content is cut down to the declared width
        let bytes = Cell::new_string("a-very-long-value").to_bytes(&t).unwrap();
        let cell = Cell::read_from(&mut Cursor::new(bytes), &t).unwrap();
        assert_eq!(cell, Cell::new_string("a-very-l"));
    }

    #[test]
    fn test_mixed_tuple_round_trip() {
        let schema = Schema::new(vec![
            Field::new("id", Type::Int),
            Field::new("name", Type::Char(12)),
        ]);
        let tuple = Tuple::new(
            schema.clone(),
            vec![Cell::Int(42), Cell::new_string("alice")],
        );
        let bytes = tuple.to_bytes().unwrap();
        assert_eq!(bytes.len(), schema.get_size());

        let parsed = Tuple::read_from(&mut Cursor::new(bytes), &schema).unwrap();
        assert_eq!(parsed, tuple);
    }
}
