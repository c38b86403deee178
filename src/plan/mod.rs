//! Logical plan trees.
//!
//! A [`LogicalPlan`] is an immutable tree of relational operators, prior to
//! any execution concern. Plans are compared by deep structural equality and
//! rendered as indented trees for assertion messages. A node's output schema
//! is a pure function of its own fields and its children's schemas.

use crate::expr::Expr;
use crate::types::Schema;
use smol_str::SmolStr;
use std::fmt;

/// A named, schema-only leaf relation.
///
/// Only resolution is ever exercised, so relations carry a schema and no
/// rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationNode {
    pub name: SmolStr,
    pub schema: Schema,
}

impl RelationNode {
    pub fn new(name: impl Into<SmolStr>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A logical plan tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// A relation name not yet bound against the catalog.
    UnresolvedRelation { name: SmolStr },
    /// A concrete leaf relation.
    Relation(RelationNode),
    Project {
        exprs: Vec<Expr>,
        input: Box<LogicalPlan>,
    },
    Filter {
        predicate: Expr,
        input: Box<LogicalPlan>,
    },
    /// Alias bookkeeping introduced for subqueries; eliminated early by the
    /// analyzer so it never leaks into plan comparisons.
    SubqueryAlias {
        alias: SmolStr,
        input: Box<LogicalPlan>,
    },
    /// Marks that `child` is the already-analyzed body of a stored view.
    View {
        name: SmolStr,
        global: bool,
        child: Box<LogicalPlan>,
    },
}

impl LogicalPlan {
    pub fn unresolved_relation(name: impl Into<SmolStr>) -> Self {
        LogicalPlan::UnresolvedRelation { name: name.into() }
    }

    pub fn relation(node: RelationNode) -> Self {
        LogicalPlan::Relation(node)
    }

    /// Wraps this plan in a projection.
    pub fn project(self, exprs: Vec<Expr>) -> Self {
        LogicalPlan::Project {
            exprs,
            input: Box::new(self),
        }
    }

    /// Wraps this plan in a filter.
    pub fn filter(self, predicate: Expr) -> Self {
        LogicalPlan::Filter {
            predicate,
            input: Box::new(self),
        }
    }

    /// Wraps this plan in a subquery alias.
    pub fn subquery_alias(self, alias: impl Into<SmolStr>) -> Self {
        LogicalPlan::SubqueryAlias {
            alias: alias.into(),
            input: Box::new(self),
        }
    }

    /// Wraps this plan in a stored-view marker.
    pub fn into_view(self, name: impl Into<SmolStr>, global: bool) -> Self {
        LogicalPlan::View {
            name: name.into(),
            global,
            child: Box::new(self),
        }
    }

    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::UnresolvedRelation { .. } | LogicalPlan::Relation(_) => Vec::new(),
            LogicalPlan::Project { input, .. }
            | LogicalPlan::Filter { input, .. }
            | LogicalPlan::SubqueryAlias { input, .. } => vec![input],
            LogicalPlan::View { child, .. } => vec![child],
        }
    }

    /// The output schema, once every name below this node has been bound.
    ///
    /// Returns `None` while any part of the subtree is still unresolved.
    pub fn output_schema(&self) -> Option<Schema> {
        match self {
            LogicalPlan::UnresolvedRelation { .. } => None,
            LogicalPlan::Relation(node) => Some(node.schema.clone()),
            LogicalPlan::Project { exprs, input } => {
                input.output_schema()?;
                exprs.iter().map(Expr::to_field).collect::<Option<Schema>>()
            }
            LogicalPlan::Filter { input, .. } => input.output_schema(),
            LogicalPlan::SubqueryAlias { input, .. } => input.output_schema(),
            LogicalPlan::View { child, .. } => child.output_schema(),
        }
    }

    /// Returns true when no unresolved relations or expressions remain.
    pub fn is_resolved(&self) -> bool {
        match self {
            LogicalPlan::UnresolvedRelation { .. } => false,
            LogicalPlan::Relation(_) => true,
            LogicalPlan::Project { exprs, input } => {
                exprs.iter().all(Expr::is_resolved) && input.is_resolved()
            }
            LogicalPlan::Filter { predicate, input } => {
                predicate.is_resolved() && input.is_resolved()
            }
            LogicalPlan::SubqueryAlias { input, .. } => input.is_resolved(),
            LogicalPlan::View { child, .. } => child.is_resolved(),
        }
    }

    /// Rebuilds this node with its direct children mapped through `f`.
    pub fn map_children(self, f: &mut impl FnMut(LogicalPlan) -> LogicalPlan) -> LogicalPlan {
        match self {
            leaf @ (LogicalPlan::UnresolvedRelation { .. } | LogicalPlan::Relation(_)) => leaf,
            LogicalPlan::Project { exprs, input } => LogicalPlan::Project {
                exprs,
                input: Box::new(f(*input)),
            },
            LogicalPlan::Filter { predicate, input } => LogicalPlan::Filter {
                predicate,
                input: Box::new(f(*input)),
            },
            LogicalPlan::SubqueryAlias { alias, input } => LogicalPlan::SubqueryAlias {
                alias,
                input: Box::new(f(*input)),
            },
            LogicalPlan::View {
                name,
                global,
                child,
            } => LogicalPlan::View {
                name,
                global,
                child: Box::new(f(*child)),
            },
        }
    }

    /// Rewrites the tree bottom-up: children first, then the node itself.
    pub fn transform_up(self, f: &mut impl FnMut(LogicalPlan) -> LogicalPlan) -> LogicalPlan {
        let mapped = self.map_children(&mut |child| child.transform_up(f));
        f(mapped)
    }

    /// Normal form used for structural comparison.
    ///
    /// Alias bookkeeping carries no resolution semantics: `SubqueryAlias`
    /// nodes are removed and directly nested expression aliases collapse to
    /// the outermost one.
    pub fn canonicalized(&self) -> LogicalPlan {
        self.clone().transform_up(&mut |node| {
            let node = match node {
                LogicalPlan::SubqueryAlias { input, .. } => *input,
                other => other,
            };
            match node {
                LogicalPlan::Project { exprs, input } => LogicalPlan::Project {
                    exprs: exprs.into_iter().map(canonicalize_expr).collect(),
                    input,
                },
                LogicalPlan::Filter { predicate, input } => LogicalPlan::Filter {
                    predicate: canonicalize_expr(predicate),
                    input,
                },
                other => other,
            }
        })
    }
}

fn canonicalize_expr(expr: Expr) -> Expr {
    expr.transform_up(&mut |e| match e {
        Expr::Alias { expr, name } => match *expr {
            Expr::Alias { expr: inner, .. } => Expr::Alias { expr: inner, name },
            inner => Expr::Alias {
                expr: Box::new(inner),
                name,
            },
        },
        other => other,
    })
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render(plan: &LogicalPlan, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for _ in 0..depth {
                write!(f, "  ")?;
            }
            match plan {
                LogicalPlan::UnresolvedRelation { name } => {
                    writeln!(f, "UnresolvedRelation {name}")?
                }
                LogicalPlan::Relation(node) => {
                    writeln!(f, "Relation {} {}", node.name, node.schema)?
                }
                LogicalPlan::Project { exprs, .. } => {
                    let list: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                    writeln!(f, "Project [{}]", list.join(", "))?
                }
                LogicalPlan::Filter { predicate, .. } => writeln!(f, "Filter {predicate}")?,
                LogicalPlan::SubqueryAlias { alias, .. } => {
                    writeln!(f, "SubqueryAlias {alias}")?
                }
                LogicalPlan::View { name, global, .. } => {
                    let scope = if *global { "global" } else { "session" };
                    writeln!(f, "View {name} ({scope})")?
                }
            }
            for child in plan.children() {
                render(child, depth + 1, f)?;
            }
            Ok(())
        }
        render(self, 0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field};

    fn orders() -> RelationNode {
        RelationNode::new(
            "orders",
            Schema::new(vec![
                Field::new("id", DataType::Integer),
                Field::new("amount", DataType::Float),
            ]),
        )
    }

    #[test]
    fn schema_of_unresolved_tree_is_unknown() {
        let plan = LogicalPlan::unresolved_relation("orders").project(vec![Expr::col("id")]);
        assert!(plan.output_schema().is_none());
        assert!(!plan.is_resolved());
    }

    #[test]
    fn schema_propagates_through_filter_and_alias() {
        let rel = orders();
        let plan = LogicalPlan::relation(rel.clone())
            .filter(Expr::bound(&rel.schema.fields()[0]).eq(Expr::int(1)))
            .subquery_alias("o");
        assert_eq!(plan.output_schema().unwrap(), rel.schema);
    }

    #[test]
    fn projection_schema_follows_exprs() {
        let rel = orders();
        let plan = LogicalPlan::relation(rel.clone())
            .project(vec![Expr::bound(&rel.schema.fields()[1]).alias("total")]);
        let schema = plan.output_schema().unwrap();
        assert_eq!(schema.fields()[0].name, "total");
        assert_eq!(schema.fields()[0].data_type, DataType::Float);
    }

    #[test]
    fn canonicalization_drops_subquery_aliases() {
        let rel = orders();
        let aliased = LogicalPlan::relation(rel.clone())
            .subquery_alias("o")
            .project(vec![Expr::bound(&rel.schema.fields()[0])]);
        let plain = LogicalPlan::relation(rel.clone())
            .project(vec![Expr::bound(&rel.schema.fields()[0])]);
        assert_eq!(aliased.canonicalized(), plain.canonicalized());
    }

    #[test]
    fn canonicalization_collapses_nested_aliases() {
        let rel = orders();
        let id = Expr::bound(&rel.schema.fields()[0]);
        let doubly = LogicalPlan::relation(rel.clone())
            .project(vec![id.clone().alias("a").alias("b")]);
        let singly = LogicalPlan::relation(rel).project(vec![id.alias("b")]);
        assert_eq!(doubly.canonicalized(), singly.canonicalized());
    }

    #[test]
    fn rendering_indents_children() {
        let plan = LogicalPlan::unresolved_relation("orders")
            .filter(Expr::col("id").eq(Expr::int(1)))
            .project(vec![Expr::Star]);
        let text = plan.to_string();
        assert!(text.starts_with("Project [*]\n  Filter"));
        assert!(text.contains("\n    UnresolvedRelation orders"));
    }
}
