//! Rule-based semantic analysis of logical plans.
//!
//! The analyzer rewrites a candidate plan with an ordered rule chain run to
//! a fixpoint, then (optionally) verifies the result with a consistency
//! check pass. Resolution and checking are deliberately separate: rules
//! never raise on unbindable names, so a resolution-only pass can be used
//! to inspect how far a broken plan got.
//!
//! # Architecture
//!
//! 1. Built-in rules: relation binding, column binding and `*` expansion
//! 2. Configured chain: alias elimination plus caller extension rules
//! 3. Check pass: raises [`AnalysisError`] on the first inconsistency

pub mod check;
pub mod error;
pub mod rules;

pub use check::check_analysis;
pub use error::{AnalysisError, AnalysisErrorKind};

use crate::catalog::SessionCatalog;
use crate::conf::AnalyzerConf;
use crate::plan::LogicalPlan;
use rules::{ResolveColumns, ResolveRelations};
use std::sync::Arc;

/// One rewrite rule in the analyzer's chain.
///
/// Rules receive the whole plan and return the (possibly unchanged) plan.
/// A rule that cannot make progress must return its input untouched rather
/// than raise; raising is reserved for the check pass and for internal
/// rule failures.
pub trait AnalyzerRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        plan: LogicalPlan,
        ctx: &RuleContext<'_>,
    ) -> Result<LogicalPlan, AnalysisError>;
}

/// Everything a rule may consult while rewriting.
pub struct RuleContext<'a> {
    pub catalog: &'a SessionCatalog,
    pub conf: &'a AnalyzerConf,
}

/// Records which rules ran and which of them changed the plan.
#[derive(Debug, Clone, Default)]
pub struct RuleTracker {
    applications: Vec<(&'static str, bool)>,
}

impl RuleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, rule: &'static str, changed: bool) {
        self.applications.push((rule, changed));
    }

    /// Total rule invocations across all iterations.
    pub fn total_runs(&self) -> usize {
        self.applications.len()
    }

    /// Invocations that actually transformed the plan.
    pub fn effective_runs(&self) -> usize {
        self.applications.iter().filter(|(_, changed)| *changed).count()
    }

    /// Names of the rules that transformed the plan, in application order.
    pub fn effective_rules(&self) -> Vec<&'static str> {
        self.applications
            .iter()
            .filter(|(_, changed)| *changed)
            .map(|(name, _)| *name)
            .collect()
    }
}

/// The analyzer: borrows a catalog, owns a conf handle and a rule chain.
pub struct Analyzer<'c> {
    catalog: &'c SessionCatalog,
    conf: AnalyzerConf,
    builtin_rules: Vec<Arc<dyn AnalyzerRule>>,
    extension_rules: Vec<Arc<dyn AnalyzerRule>>,
}

impl<'c> Analyzer<'c> {
    /// Creates an analyzer with only the built-in resolution rules.
    pub fn new(catalog: &'c SessionCatalog, conf: AnalyzerConf) -> Self {
        Self {
            catalog,
            conf,
            builtin_rules: vec![Arc::new(ResolveRelations), Arc::new(ResolveColumns)],
            extension_rules: Vec::new(),
        }
    }

    /// Appends a configured rule chain, preserving the given order.
    pub fn with_extension_rules(mut self, rules: Vec<Arc<dyn AnalyzerRule>>) -> Self {
        self.extension_rules = rules;
        self
    }

    pub fn conf(&self) -> &AnalyzerConf {
        &self.conf
    }

    /// Resolution only: applies the rule chain to a fixpoint.
    ///
    /// Never raises for unbindable names; the returned tree may be
    /// partially resolved.
    pub fn execute(&self, plan: &LogicalPlan) -> Result<LogicalPlan, AnalysisError> {
        let mut tracker = RuleTracker::new();
        self.execute_with_tracker(plan, &mut tracker)
    }

    /// Resolution only, recording rule applications into `tracker`.
    pub fn execute_with_tracker(
        &self,
        plan: &LogicalPlan,
        tracker: &mut RuleTracker,
    ) -> Result<LogicalPlan, AnalysisError> {
        let ctx = RuleContext {
            catalog: self.catalog,
            conf: &self.conf,
        };
        let max_iterations = self.conf.max_iterations();
        let mut current = plan.clone();
        for iteration in 0..max_iterations {
            let before = current.clone();
            for rule in self.builtin_rules.iter().chain(&self.extension_rules) {
                let applied = rule.apply(current.clone(), &ctx)?;
                let changed = applied != current;
                tracker.record(rule.name(), changed);
                if changed {
                    log::debug!(
                        "rule {} transformed the plan (iteration {})",
                        rule.name(),
                        iteration
                    );
                }
                current = applied;
            }
            if current == before {
                log::trace!("analysis reached fixpoint after {} iterations", iteration + 1);
                return Ok(current);
            }
        }
        Err(AnalysisError::new(
            AnalysisErrorKind::Internal,
            format!("analysis did not reach a fixpoint within {max_iterations} iterations"),
        ))
    }

    /// Resolution plus the consistency check pass.
    pub fn execute_and_check(
        &self,
        plan: &LogicalPlan,
        tracker: &mut RuleTracker,
    ) -> Result<LogicalPlan, AnalysisError> {
        let resolved = self.execute_with_tracker(plan, tracker)?;
        log::debug!(
            "analysis finished: {}/{} rule runs were effective",
            tracker.effective_runs(),
            tracker.total_runs()
        );
        check_analysis(&resolved)?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GlobalTempViews;
    use crate::expr::Expr;
    use crate::plan::RelationNode;
    use crate::types::{DataType, Field, Schema};

    fn catalog() -> SessionCatalog {
        let catalog = SessionCatalog::new(GlobalTempViews::new());
        catalog
            .create_temp_view(
                "orders",
                LogicalPlan::relation(RelationNode::new(
                    "orders",
                    Schema::new(vec![
                        Field::new("id", DataType::Integer),
                        Field::new("amount", DataType::Float),
                    ]),
                )),
                true,
            )
            .unwrap();
        catalog
    }

    #[test]
    fn execute_resolves_relation_and_columns_together() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog, AnalyzerConf::new());
        let plan = LogicalPlan::unresolved_relation("orders").project(vec![Expr::col("id")]);
        let resolved = analyzer.execute(&plan).unwrap();
        assert!(resolved.is_resolved());
        assert!(check_analysis(&resolved).is_ok());
    }

    #[test]
    fn execute_leaves_unknown_names_unresolved() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog, AnalyzerConf::new());
        let plan = LogicalPlan::unresolved_relation("missing").project(vec![Expr::col("id")]);
        let partial = analyzer.execute(&plan).unwrap();
        assert!(!partial.is_resolved());
    }

    #[test]
    fn execute_and_check_raises_for_unknown_names() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog, AnalyzerConf::new());
        let plan = LogicalPlan::unresolved_relation("orders").project(vec![Expr::col("nope")]);
        let mut tracker = RuleTracker::new();
        let err = analyzer.execute_and_check(&plan, &mut tracker).unwrap_err();
        assert_eq!(err.kind(), AnalysisErrorKind::UnresolvedColumn);
        assert!(tracker.effective_runs() > 0);
    }

    #[test]
    fn extension_rules_participate_in_the_fixpoint() {
        struct SortProjections;
        impl AnalyzerRule for SortProjections {
            fn name(&self) -> &'static str {
                "SortProjections"
            }
            fn apply(
                &self,
                plan: LogicalPlan,
                _ctx: &RuleContext<'_>,
            ) -> Result<LogicalPlan, AnalysisError> {
                Ok(plan.transform_up(&mut |node| match node {
                    LogicalPlan::Project { mut exprs, input } => {
                        exprs.sort_by_key(|e| e.to_string());
                        LogicalPlan::Project { exprs, input }
                    }
                    other => other,
                }))
            }
        }

        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog, AnalyzerConf::new())
            .with_extension_rules(vec![Arc::new(SortProjections)]);
        let plan = LogicalPlan::unresolved_relation("orders").project(vec![Expr::Star]);
        let resolved = analyzer.execute(&plan).unwrap();
        let schema = resolved.output_schema().unwrap();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["amount", "id"]);
    }
}
