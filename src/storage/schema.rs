use std::fmt;

/// Field types. Strings are fixed-width: `Char(n)` holds up to `n`
/// characters and occupies `4 + n` bytes on disk (4-byte length prefix).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Int,
    Char(usize),
}

impl Type {
    /// On-disk width of the type in bytes.
    pub fn get_disk_size(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Char(size) => 4 + size,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub t: Type,
}

impl Field {
    pub fn new(name: &str, t: Type) -> Self {
        Self {
            name: name.to_string(),
            t,
        }
    }
}

/// Ordered list of fields. Two schemas are equal iff their type sequences
/// are equal; field names never participate in equality.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn small_int_schema(width: usize) -> Self {
        let mut fields = Vec::new();
        for i in 0..width {
            fields.push(Field::new(&format!("int-column-{}", i), Type::Int));
        }
        Self { fields }
    }

    /// Tuple size in bytes.
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.t.get_disk_size()).sum()
    }

    pub fn get_field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn get_type(&self, i: usize) -> Type {
        self.fields[i].t
    }

    pub fn get_field_name(&self, i: usize) -> &str {
        &self.fields[i].name
    }

    pub fn get_field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Concatenation of two schemas, for join outputs.
    pub fn merge(left: &Schema, right: &Schema) -> Schema {
        let mut fields = left.fields.clone();
        fields.extend(right.fields.iter().cloned());
        Schema { fields }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .zip(other.fields.iter())
            .all(|(a, b)| a.t == b.t)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "(".to_owned();
        for field in &self.fields {
            content.push_str(&format!("{}: {:?}, ", field.name, field.t));
        }
        if content.len() > 1 {
            content.truncate(content.len() - 2);
        }
        content.push(')');
        write!(f, "{}", content)
    }
}
