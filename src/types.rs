//! Data types and schemas for logical plan nodes.
//!
//! A [`Schema`] describes the output of a plan node as an ordered list of
//! [`Field`]s. Schemas carry no data; resolution only ever needs names,
//! types, and nullability.

use smol_str::SmolStr;
use std::fmt;

/// Scalar data types understood by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    /// Returns true if this type can be compared with `other`.
    ///
    /// Comparisons require identical types, except that the two numeric
    /// types are mutually comparable.
    pub fn comparable_with(self, other: DataType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }

    /// Returns true for `Integer` and `Float`.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "integer"),
            DataType::Float => write!(f, "float"),
            DataType::Text => write!(f, "text"),
            DataType::Boolean => write!(f, "boolean"),
        }
    }
}

/// A single named, typed column in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: SmolStr,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    /// Creates a non-nullable field.
    pub fn new(name: impl Into<SmolStr>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }

    /// Creates a nullable field.
    pub fn nullable(name: impl Into<SmolStr>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)?;
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// An ordered list of fields describing a plan node's output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Looks up a field by name under the given case policy.
    ///
    /// Names are stored case-preserved; an exact match always wins. Under
    /// the insensitive policy the first field matching ignoring ASCII case
    /// is returned.
    pub fn resolve(&self, name: &str, case_sensitive: bool) -> Option<&Field> {
        if let Some(field) = self.fields.iter().find(|f| f.name == name) {
            return Some(field);
        }
        if case_sensitive {
            return None;
        }
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Renders the field names as a bracketed list, for error messages.
    pub fn field_names(&self) -> String {
        let names: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        format!("[{}]", names.join(", "))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, "]")
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
