//! Expression model for logical plans.
//!
//! Expressions start out unresolved (bare column names, `*`) and are rewritten
//! by the analyzer into resolved form ([`Expr::Column`]) by binding names
//! against the input schema of the enclosing plan node.

use crate::types::{DataType, Field};
use smol_str::SmolStr;
use std::fmt;

/// A literal scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(SmolStr),
    Boolean(bool),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// Binary operators usable in predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    And,
    Or,
}

impl BinaryOp {
    /// Returns true for `And` / `Or`.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        };
        write!(f, "{symbol}")
    }
}

/// A column reference that has been bound to a concrete field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub name: SmolStr,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnRef {
    /// Builds a resolved reference from the field it was bound to.
    ///
    /// The reference keeps the field's stored spelling, not the spelling at
    /// the reference site, so case-insensitive resolution is observable in
    /// the resolved tree.
    pub fn from_field(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            data_type: field.data_type,
            nullable: field.nullable,
        }
    }

    pub fn to_field(&self) -> Field {
        Field {
            name: self.name.clone(),
            data_type: self.data_type,
            nullable: self.nullable,
        }
    }
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column name not yet bound to any input field.
    UnresolvedColumn { name: SmolStr },
    /// A column reference bound to a concrete input field.
    Column(ColumnRef),
    /// `*` in a projection list, expanded during resolution.
    Star,
    Literal(Value),
    Alias { expr: Box<Expr>, name: SmolStr },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// An unresolved column reference.
    pub fn col(name: impl Into<SmolStr>) -> Self {
        Expr::UnresolvedColumn { name: name.into() }
    }

    /// A resolved column reference for the given field.
    pub fn bound(field: &Field) -> Self {
        Expr::Column(ColumnRef::from_field(field))
    }

    pub fn lit(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Value::Integer(value))
    }

    pub fn text(value: impl Into<SmolStr>) -> Self {
        Expr::Literal(Value::Text(value.into()))
    }

    pub fn alias(self, name: impl Into<SmolStr>) -> Self {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    pub fn binary(self, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    pub fn eq(self, right: Expr) -> Self {
        self.binary(BinaryOp::Eq, right)
    }

    pub fn gt(self, right: Expr) -> Self {
        self.binary(BinaryOp::Gt, right)
    }

    pub fn and(self, right: Expr) -> Self {
        self.binary(BinaryOp::And, right)
    }

    /// Returns true when no unresolved columns or `*` remain in this tree.
    pub fn is_resolved(&self) -> bool {
        match self {
            Expr::UnresolvedColumn { .. } | Expr::Star => false,
            Expr::Column(_) | Expr::Literal(_) => true,
            Expr::Alias { expr, .. } => expr.is_resolved(),
            Expr::Binary { left, right, .. } => left.is_resolved() && right.is_resolved(),
        }
    }

    /// The output type of this expression, if it is fully resolved.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Expr::UnresolvedColumn { .. } | Expr::Star => None,
            Expr::Column(column) => Some(column.data_type),
            Expr::Literal(value) => Some(value.data_type()),
            Expr::Alias { expr, .. } => expr.data_type(),
            Expr::Binary { left, right, .. } => {
                left.data_type()?;
                right.data_type()?;
                Some(DataType::Boolean)
            }
        }
    }

    /// The output field this expression contributes to a projection schema.
    ///
    /// `None` while the expression is unresolved; schemas are only derivable
    /// from resolved trees.
    pub fn to_field(&self) -> Option<Field> {
        match self {
            Expr::UnresolvedColumn { .. } | Expr::Star => None,
            Expr::Column(column) => Some(column.to_field()),
            Expr::Literal(value) => Some(Field::new(value.to_string(), value.data_type())),
            Expr::Alias { expr, name } => {
                let inner = expr.to_field()?;
                Some(Field {
                    name: name.clone(),
                    ..inner
                })
            }
            Expr::Binary { .. } => {
                let data_type = self.data_type()?;
                Some(Field::nullable(self.to_string(), data_type))
            }
        }
    }

    /// Rewrites this expression bottom-up.
    pub fn transform_up(self, f: &mut impl FnMut(Expr) -> Expr) -> Expr {
        let mapped = match self {
            Expr::Alias { expr, name } => Expr::Alias {
                expr: Box::new(expr.transform_up(f)),
                name,
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(left.transform_up(f)),
                right: Box::new(right.transform_up(f)),
            },
            leaf => leaf,
        };
        f(mapped)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::UnresolvedColumn { name } => write!(f, "?{name}"),
            Expr::Column(column) => write!(f, "{}:{}", column.name, column.data_type),
            Expr::Star => write!(f, "*"),
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Alias { expr, name } => write!(f, "{expr} AS {name}"),
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
        }
    }
}
