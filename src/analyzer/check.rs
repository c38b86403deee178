//! Post-resolution consistency checks.
//!
//! Resolution rules leave unbindable names in place; this pass is where
//! analysis actually fails. The first offence found in a bottom-up walk
//! wins, so error messages always describe the deepest problem.

use crate::analyzer::error::{AnalysisError, AnalysisErrorKind};
use crate::expr::Expr;
use crate::plan::LogicalPlan;
use crate::types::DataType;

/// Verifies that a plan is fully resolved and internally consistent.
pub fn check_analysis(plan: &LogicalPlan) -> Result<(), AnalysisError> {
    for child in plan.children() {
        check_analysis(child)?;
    }
    match plan {
        LogicalPlan::UnresolvedRelation { name } => Err(AnalysisError::new(
            AnalysisErrorKind::UnresolvedRelation,
            format!("cannot resolve table or view '{name}'"),
        )),
        LogicalPlan::Project { exprs, input } => {
            for expr in exprs {
                check_expr(expr, input)?;
            }
            Ok(())
        }
        LogicalPlan::Filter { predicate, input } => {
            check_expr(predicate, input)?;
            match predicate.data_type() {
                Some(DataType::Boolean) => Ok(()),
                Some(other) => Err(AnalysisError::new(
                    AnalysisErrorKind::TypeMismatch,
                    format!("filter predicate must be boolean, got {other} in {predicate}"),
                )),
                None => Ok(()),
            }
        }
        LogicalPlan::Relation(_) | LogicalPlan::SubqueryAlias { .. } | LogicalPlan::View { .. } => {
            Ok(())
        }
    }
}

fn check_expr(expr: &Expr, input: &LogicalPlan) -> Result<(), AnalysisError> {
    match expr {
        Expr::UnresolvedColumn { name } => {
            let columns = input
                .output_schema()
                .map(|s| s.field_names())
                .unwrap_or_else(|| "[]".to_string());
            Err(AnalysisError::new(
                AnalysisErrorKind::UnresolvedColumn,
                format!("cannot resolve column '{name}' given input columns {columns}"),
            ))
        }
        Expr::Star => Err(AnalysisError::new(
            AnalysisErrorKind::UnresolvedColumn,
            "cannot resolve '*': input schema is unknown".to_string(),
        )),
        Expr::Column(_) | Expr::Literal(_) => Ok(()),
        Expr::Alias { expr, .. } => check_expr(expr, input),
        Expr::Binary { op, left, right } => {
            check_expr(left, input)?;
            check_expr(right, input)?;
            // Both sides passed, so their types are known.
            let (Some(lhs), Some(rhs)) = (left.data_type(), right.data_type()) else {
                return Ok(());
            };
            if op.is_logical() {
                if lhs != DataType::Boolean || rhs != DataType::Boolean {
                    return Err(AnalysisError::new(
                        AnalysisErrorKind::TypeMismatch,
                        format!("operator {op} requires boolean operands, got {lhs} and {rhs}"),
                    ));
                }
            } else if !lhs.comparable_with(rhs) {
                return Err(AnalysisError::new(
                    AnalysisErrorKind::TypeMismatch,
                    format!("cannot compare {lhs} with {rhs} in {expr}"),
                ));
            }
            Ok(())
        }
    }
}
