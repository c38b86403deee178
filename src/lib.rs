//! SQL semantic analyzer with a verification harness.
//!
//! This library resolves logical query plans against a catalog of stored
//! views using an ordered rule chain, and ships the test harness used to
//! verify analysis outcomes: structural equivalence of resolved trees, or
//! semantic errors carrying required message fragments.
//!
//! # Example
//!
//! ```
//! use sql_analyzer::harness::AnalysisFixture;
//! use sql_analyzer::parser::parse;
//!
//! let fixture = AnalysisFixture::new();
//! let plan = parse("SELECT id, amount FROM orders").unwrap();
//! fixture.assert_analysis_succeeds(&plan, true);
//! ```

pub mod analyzer;
pub mod catalog;
pub mod conf;
pub mod expr;
pub mod harness;
pub mod lexer;
pub mod parser;
pub mod plan;
pub mod types;

// Re-export the types most callers touch.
pub use analyzer::{AnalysisError, AnalysisErrorKind, Analyzer, AnalyzerRule, RuleTracker};
pub use catalog::{
    CatalogError, DatabaseDescriptor, GlobalTempViews, ResolvedView, SessionCatalog, ViewScope,
};
pub use conf::{with_setting, AnalyzerConf, ScopedSetting};
pub use expr::{BinaryOp, ColumnRef, Expr, Value};
pub use parser::{parse, ParseError};
pub use plan::{LogicalPlan, RelationNode};
pub use types::{DataType, Field, Schema};
