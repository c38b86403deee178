//! Verification harness for driving the analyzer in tests.
//!
//! The harness is the crate's test fixture: it builds a small, fully
//! deterministic catalog environment, runs the analyzer over a candidate
//! plan under a chosen case policy, and verifies the outcome: structural
//! equivalence to an expected tree, or a semantic error whose message
//! contains a required set of substrings.
//!
//! Every assertion builds a **fresh** catalog, conf, and analyzer, so test
//! cases are order-independent and cannot leak state into one another. The
//! case policy is installed through a scoped override and restored on every
//! exit path.
//!
//! # Fixture environment
//!
//! One database `default` (empty location, no properties) and five view
//! bindings backed by schema-only relations:
//!
//! | name         | scope   | schema                          |
//! |--------------|---------|---------------------------------|
//! | `orders`     | session | id: integer, amount: float      |
//! | `customers`  | session | id: integer, name: text         |
//! | `OrdersView` | session | id: integer, amount: float      |
//! | `stats`      | global  | metric: text, value: float      |
//! | `AuditLog`   | global  | id: integer, event: text        |
//!
//! The mixed-case names exist so case-policy behavior can be exercised
//! against fixture state directly.

use crate::analyzer::{check_analysis, Analyzer, AnalyzerRule, RuleTracker};
use crate::analyzer::error::AnalysisError;
use crate::catalog::{DatabaseDescriptor, GlobalTempViews, SessionCatalog};
use crate::conf::{keys, with_setting, AnalyzerConf};
use crate::parser::ParseError;
use crate::plan::{LogicalPlan, RelationNode};
use crate::types::{DataType, Field, Schema};
use std::sync::Arc;

pub fn orders_relation() -> RelationNode {
    RelationNode::new(
        "orders",
        Schema::new(vec![
            Field::new("id", DataType::Integer),
            Field::new("amount", DataType::Float),
        ]),
    )
}

pub fn customers_relation() -> RelationNode {
    RelationNode::new(
        "customers",
        Schema::new(vec![
            Field::new("id", DataType::Integer),
            Field::new("name", DataType::Text),
        ]),
    )
}

pub fn orders_view_relation() -> RelationNode {
    RelationNode::new("OrdersView", orders_relation().schema)
}

pub fn stats_relation() -> RelationNode {
    RelationNode::new(
        "stats",
        Schema::new(vec![
            Field::new("metric", DataType::Text),
            Field::new("value", DataType::Float),
        ]),
    )
}

pub fn audit_log_relation() -> RelationNode {
    RelationNode::new(
        "AuditLog",
        Schema::new(vec![
            Field::new("id", DataType::Integer),
            Field::nullable("event", DataType::Text),
        ]),
    )
}

/// The analysis test fixture.
///
/// Holds only the caller's extension rules; all catalog and analyzer state
/// is rebuilt per assertion.
#[derive(Default)]
pub struct AnalysisFixture {
    extension_rules: Vec<Arc<dyn AnalyzerRule>>,
}

impl AnalysisFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fixture whose analyzers run the given extension rules, in order,
    /// after the fixed alias-elimination rule.
    pub fn with_rules(extension_rules: Vec<Arc<dyn AnalyzerRule>>) -> Self {
        Self { extension_rules }
    }

    /// Builds the fixture catalog.
    ///
    /// A fresh global registry is created per build, so independent harness
    /// runs never observe each other's global views.
    ///
    /// # Panics
    ///
    /// Panics if the fresh catalog already contains the `default` database;
    /// that would mean the catalog itself is broken, not the test.
    pub fn catalog(&self) -> SessionCatalog {
        let catalog = SessionCatalog::new(GlobalTempViews::new());
        catalog
            .create_database(DatabaseDescriptor::bare("default"), false)
            .expect("fresh catalog must not contain the default database");

        for relation in [orders_relation(), customers_relation(), orders_view_relation()] {
            let name = relation.name.clone();
            catalog
                .create_temp_view(name, LogicalPlan::relation(relation), true)
                .expect("view registration with override cannot fail");
        }
        for relation in [stats_relation(), audit_log_relation()] {
            let name = relation.name.clone();
            catalog
                .create_global_temp_view(name, LogicalPlan::relation(relation), true)
                .expect("view registration with override cannot fail");
        }
        catalog
    }

    /// Builds an analyzer over `catalog`.
    ///
    /// The configured chain starts with the fixed alias-elimination rule,
    /// followed by this fixture's extension rules in their given order.
    pub fn analyzer<'c>(&self, catalog: &'c SessionCatalog, conf: &AnalyzerConf) -> Analyzer<'c> {
        let mut chain: Vec<Arc<dyn AnalyzerRule>> =
            vec![Arc::new(crate::analyzer::rules::EliminateSubqueryAliases)];
        chain.extend(self.extension_rules.iter().cloned());
        Analyzer::new(catalog, conf.clone()).with_extension_rules(chain)
    }

    /// Asserts that `plan` analyzes without a semantic error.
    ///
    /// # Panics
    ///
    /// On a semantic error, panics with a message embedding the input tree
    /// and the partially resolved tree from a resolution-only pass.
    pub fn assert_analysis_succeeds(&self, plan: &LogicalPlan, case_sensitive: bool) {
        let catalog = self.catalog();
        let conf = AnalyzerConf::new();
        let analyzer = self.analyzer(&catalog, &conf);
        let failure = with_case(&conf, case_sensitive, || {
            let mut tracker = RuleTracker::new();
            match analyzer.execute_and_check(plan, &mut tracker) {
                Ok(_) => None,
                Err(error) => Some((error, analyzer.execute(plan))),
            }
        });
        if let Some((error, partial)) = failure {
            let partial = match partial {
                Ok(tree) => tree.to_string(),
                Err(err) => format!("(resolution itself failed: {err})"),
            };
            panic!(
                "analysis was expected to succeed but failed: {error}\n\
                 input plan:\n{plan}\n\
                 partially resolved plan:\n{partial}"
            );
        }
    }

    /// Asserts that `input` resolves to a tree structurally equal to
    /// `expected`.
    ///
    /// The expected tree is never re-validated; expected trees in tests are
    /// sometimes deliberately left partially unresolved.
    pub fn assert_resolves_to(
        &self,
        input: &LogicalPlan,
        expected: &LogicalPlan,
        case_sensitive: bool,
    ) {
        let actual = self.analyze_or_panic(input, case_sensitive);
        assert_plans_equal(expected, &actual, false);
    }

    /// Like [`assert_resolves_to`], but strips stored-view wrapper nodes
    /// from the resolved tree first, so the comparison reflects the view's
    /// underlying logic rather than its wrapper.
    ///
    /// [`assert_resolves_to`]: AnalysisFixture::assert_resolves_to
    pub fn assert_resolves_to_view_body(
        &self,
        input: &LogicalPlan,
        expected: &LogicalPlan,
        case_sensitive: bool,
    ) {
        let actual = self.analyze_or_panic(input, case_sensitive);
        let unwrapped = unwrap_view_nodes(actual);
        assert_plans_equal(expected, &unwrapped, false);
    }

    /// Asserts that analyzing `plan` raises a semantic error whose message
    /// contains every fragment, matched case-insensitively.
    ///
    /// # Panics
    ///
    /// Panics if analysis succeeds, or if any fragment is missing from the
    /// error message; the failure lists all expected fragments and the
    /// actual message.
    pub fn assert_analysis_error(
        &self,
        plan: &LogicalPlan,
        expected_fragments: &[&str],
        case_sensitive: bool,
    ) {
        match self.analyze(plan, case_sensitive) {
            Ok(resolved) => panic!(
                "analysis was expected to fail with a message containing \
                 {expected_fragments:?}, but it succeeded\n\
                 input plan:\n{plan}\n\
                 resolved plan:\n{resolved}"
            ),
            Err(error) => {
                let message = error.message().to_lowercase();
                let missing: Vec<&&str> = expected_fragments
                    .iter()
                    .filter(|fragment| !message.contains(&fragment.to_lowercase()))
                    .collect();
                if !missing.is_empty() {
                    panic!(
                        "analysis error message is missing expected fragments\n\
                         expected fragments: {expected_fragments:?}\n\
                         actual message: {}",
                        error.message()
                    );
                }
            }
        }
    }

    /// Runs resolution and validation under the given case policy.
    pub fn analyze(
        &self,
        plan: &LogicalPlan,
        case_sensitive: bool,
    ) -> Result<LogicalPlan, AnalysisError> {
        let catalog = self.catalog();
        let conf = AnalyzerConf::new();
        let analyzer = self.analyzer(&catalog, &conf);
        with_case(&conf, case_sensitive, || {
            let mut tracker = RuleTracker::new();
            analyzer.execute_and_check(plan, &mut tracker)
        })
    }

    fn analyze_or_panic(&self, plan: &LogicalPlan, case_sensitive: bool) -> LogicalPlan {
        match self.analyze(plan, case_sensitive) {
            Ok(resolved) => resolved,
            Err(error) => panic!(
                "analysis failed unexpectedly: {error}\ninput plan:\n{plan}"
            ),
        }
    }
}

fn with_case<T>(conf: &AnalyzerConf, case_sensitive: bool, body: impl FnOnce() -> T) -> T {
    let value = if case_sensitive { "true" } else { "false" };
    with_setting(conf, keys::CASE_SENSITIVE, value, body)
}

/// Replaces every stored-view wrapper with its already-analyzed child,
/// bottom-up. Nothing else in the tree is touched.
pub fn unwrap_view_nodes(plan: LogicalPlan) -> LogicalPlan {
    plan.transform_up(&mut |node| match node {
        LogicalPlan::View { child, .. } => *child,
        other => other,
    })
}

/// Asserts structural equality of two plans after canonicalization.
///
/// `revalidate` re-runs the consistency check on both trees first; the
/// fixture's own assertions always pass `false` because expected trees may
/// be deliberately partially unresolved.
///
/// # Panics
///
/// Panics with both canonicalized trees rendered when they differ.
pub fn assert_plans_equal(expected: &LogicalPlan, actual: &LogicalPlan, revalidate: bool) {
    if revalidate {
        for (side, plan) in [("expected", expected), ("actual", actual)] {
            if let Err(error) = check_analysis(plan) {
                panic!("{side} plan fails validation: {error}\n{plan}");
            }
        }
    }
    let expected_canonical = expected.canonicalized();
    let actual_canonical = actual.canonicalized();
    assert!(
        expected_canonical == actual_canonical,
        "plans are not structurally equal\nexpected:\n{expected_canonical}\nactual:\n{actual_canonical}"
    );
}

/// Calls `parse_fn` on `sql`, requires a syntax error, and asserts each
/// fragment is contained in the error message. Matching is case-sensitive,
/// unlike semantic-error fragments.
///
/// # Panics
///
/// Panics if parsing succeeds or any fragment is missing.
pub fn intercept_parse_error<T>(
    parse_fn: impl FnOnce(&str) -> Result<T, ParseError>,
    sql: &str,
    expected_fragments: &[&str],
) {
    match parse_fn(sql) {
        Ok(_) => panic!(
            "parsing was expected to fail with a message containing \
             {expected_fragments:?}, but it succeeded for `{sql}`"
        ),
        Err(error) => {
            let missing: Vec<&&str> = expected_fragments
                .iter()
                .filter(|fragment| !error.message().contains(**fragment))
                .collect();
            if !missing.is_empty() {
                panic!(
                    "syntax error message is missing expected fragments\n\
                     expected fragments: {expected_fragments:?}\n\
                     actual message: {}",
                    error.message()
                );
            }
        }
    }
}
