//! Common test utilities
//!
//! Shared helpers and fixtures used across the integration-test modules.
//!
//! # Plan Helpers
//! - [`select_star_from`] - An unresolved `SELECT * FROM <name>` plan
//! - [`select_cols_from`] - An unresolved projection of named columns
//! - [`resolved_view_scan`] - The tree a fixture view resolves to

#![allow(dead_code)]

use sql_analyzer::expr::Expr;
use sql_analyzer::plan::{LogicalPlan, RelationNode};

/// An unresolved `SELECT * FROM <name>` plan.
pub fn select_star_from(name: &str) -> LogicalPlan {
    LogicalPlan::unresolved_relation(name).project(vec![Expr::Star])
}

/// An unresolved projection of the given column names.
pub fn select_cols_from(name: &str, columns: &[&str]) -> LogicalPlan {
    LogicalPlan::unresolved_relation(name)
        .project(columns.iter().map(|c| Expr::col(*c)).collect())
}

/// The resolved tree produced when `SELECT * FROM <view>` binds against a
/// stored fixture view: every field projected over the view wrapper.
pub fn resolved_view_scan(relation: RelationNode, global: bool) -> LogicalPlan {
    let exprs: Vec<Expr> = relation.schema.fields().iter().map(Expr::bound).collect();
    let name = relation.name.clone();
    LogicalPlan::relation(relation)
        .into_view(name, global)
        .project(exprs)
}
