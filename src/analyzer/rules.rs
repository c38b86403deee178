//! Built-in resolution rules.

use super::{AnalyzerRule, RuleContext};
use crate::analyzer::error::AnalysisError;
use crate::catalog::ViewScope;
use crate::expr::Expr;
use crate::plan::LogicalPlan;
use crate::types::Schema;

/// Removes `SubqueryAlias` nodes so alias bookkeeping never reaches plan
/// comparisons. Always the first configured rule.
#[derive(Debug, Default)]
pub struct EliminateSubqueryAliases;

impl AnalyzerRule for EliminateSubqueryAliases {
    fn name(&self) -> &'static str {
        "EliminateSubqueryAliases"
    }

    fn apply(
        &self,
        plan: LogicalPlan,
        _ctx: &RuleContext<'_>,
    ) -> Result<LogicalPlan, AnalysisError> {
        Ok(plan.transform_up(&mut |node| match node {
            LogicalPlan::SubqueryAlias { input, .. } => *input,
            other => other,
        }))
    }
}

/// Binds `UnresolvedRelation` names to stored views.
///
/// A match is wrapped in a `View` node carrying the stored (case-preserved)
/// name, so the resolved tree records which binding was used even under the
/// case-insensitive policy. Names with no binding are left in place for the
/// check pass to report.
#[derive(Debug, Default)]
pub struct ResolveRelations;

impl AnalyzerRule for ResolveRelations {
    fn name(&self) -> &'static str {
        "ResolveRelations"
    }

    fn apply(
        &self,
        plan: LogicalPlan,
        ctx: &RuleContext<'_>,
    ) -> Result<LogicalPlan, AnalysisError> {
        let case_sensitive = ctx.conf.case_sensitive();
        Ok(plan.transform_up(&mut |node| match node {
            LogicalPlan::UnresolvedRelation { name } => {
                match ctx.catalog.lookup_view(&name, case_sensitive) {
                    Some(view) => LogicalPlan::View {
                        name: view.name,
                        global: view.scope == ViewScope::Global,
                        child: Box::new(view.plan.as_ref().clone()),
                    },
                    None => LogicalPlan::UnresolvedRelation { name },
                }
            }
            other => other,
        }))
    }
}

/// Binds column names and expands `*` against each node's input schema.
///
/// Nodes whose input schema is not yet known (the relation below is still
/// unresolved) are skipped; the fixpoint loop revisits them once
/// `ResolveRelations` has done its part.
#[derive(Debug, Default)]
pub struct ResolveColumns;

impl AnalyzerRule for ResolveColumns {
    fn name(&self) -> &'static str {
        "ResolveColumns"
    }

    fn apply(
        &self,
        plan: LogicalPlan,
        ctx: &RuleContext<'_>,
    ) -> Result<LogicalPlan, AnalysisError> {
        let case_sensitive = ctx.conf.case_sensitive();
        Ok(plan.transform_up(&mut |node| match node {
            LogicalPlan::Project { exprs, input } => match input.output_schema() {
                Some(schema) => {
                    let exprs = exprs
                        .into_iter()
                        .flat_map(|e| expand_and_bind(e, &schema, case_sensitive))
                        .collect();
                    LogicalPlan::Project { exprs, input }
                }
                None => LogicalPlan::Project { exprs, input },
            },
            LogicalPlan::Filter { predicate, input } => match input.output_schema() {
                Some(schema) => LogicalPlan::Filter {
                    predicate: bind_expr(predicate, &schema, case_sensitive),
                    input,
                },
                None => LogicalPlan::Filter { predicate, input },
            },
            other => other,
        }))
    }
}

fn expand_and_bind(expr: Expr, schema: &Schema, case_sensitive: bool) -> Vec<Expr> {
    match expr {
        Expr::Star => schema.fields().iter().map(Expr::bound).collect(),
        other => vec![bind_expr(other, schema, case_sensitive)],
    }
}

fn bind_expr(expr: Expr, schema: &Schema, case_sensitive: bool) -> Expr {
    expr.transform_up(&mut |e| match e {
        Expr::UnresolvedColumn { name } => match schema.resolve(&name, case_sensitive) {
            Some(field) => Expr::bound(field),
            None => Expr::UnresolvedColumn { name },
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GlobalTempViews, SessionCatalog};
    use crate::conf::AnalyzerConf;
    use crate::plan::RelationNode;
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

    fn catalog_with_orders() -> SessionCatalog {
        let catalog = SessionCatalog::new(GlobalTempViews::new());
        catalog
            .create_temp_view("orders", LogicalPlan::relation(orders()), true)
            .unwrap();
        catalog
    }

    #[test]
    fn relations_resolve_to_view_wrappers() {
        let catalog = catalog_with_orders();
        let conf = AnalyzerConf::new();
        let ctx = RuleContext {
            catalog: &catalog,
            conf: &conf,
        };
        let plan = LogicalPlan::unresolved_relation("orders");
        let resolved = ResolveRelations.apply(plan, &ctx).unwrap();
        match resolved {
            LogicalPlan::View { name, global, child } => {
                assert_eq!(name, "orders");
                assert!(!global);
                assert!(child.is_resolved());
            }
            other => panic!("expected View wrapper, got:\n{other}"),
        }
    }

    #[test]
    fn unknown_relation_left_for_check_pass() {
        let catalog = catalog_with_orders();
        let conf = AnalyzerConf::new();
        let ctx = RuleContext {
            catalog: &catalog,
            conf: &conf,
        };
        let plan = LogicalPlan::unresolved_relation("missing");
        let resolved = ResolveRelations.apply(plan, &ctx).unwrap();
        assert!(matches!(resolved, LogicalPlan::UnresolvedRelation { .. }));
    }

    #[test]
    fn star_expands_to_input_columns() {
        let catalog = catalog_with_orders();
        let conf = AnalyzerConf::new();
        let ctx = RuleContext {
            catalog: &catalog,
            conf: &conf,
        };
        let plan = LogicalPlan::relation(orders()).project(vec![Expr::Star]);
        let resolved = ResolveColumns.apply(plan, &ctx).unwrap();
        let LogicalPlan::Project { exprs, .. } = &resolved else {
            panic!("expected Project, got:\n{resolved}");
        };
        assert_eq!(exprs.len(), 2);
        assert!(exprs.iter().all(Expr::is_resolved));
    }

    #[test]
    fn column_binding_honors_case_policy() {
        let catalog = catalog_with_orders();
        let conf = AnalyzerConf::new();
        let ctx = RuleContext {
            catalog: &catalog,
            conf: &conf,
        };
        let plan = LogicalPlan::relation(orders()).project(vec![Expr::col("AMOUNT")]);

        let strict = ResolveColumns.apply(plan.clone(), &ctx).unwrap();
        let LogicalPlan::Project { exprs, .. } = &strict else {
            unreachable!()
        };
        assert!(!exprs[0].is_resolved());

        conf.set(crate::conf::keys::CASE_SENSITIVE, "false");
        let lax = ResolveColumns.apply(plan, &ctx).unwrap();
        let LogicalPlan::Project { exprs, .. } = &lax else {
            unreachable!()
        };
        assert_eq!(exprs[0].to_field().unwrap().name, "amount");
    }
}
