//! Recursive-descent parser for the SELECT subset.
//!
//! Grammar:
//!
//! ```text
//! query       := SELECT select_list FROM identifier [WHERE expr]
//! select_list := '*' | item (',' item)*
//! item        := expr [AS identifier]
//! expr        := and_expr (OR and_expr)*
//! and_expr    := cmp_expr (AND cmp_expr)*
//! cmp_expr    := primary [('=' | '!=' | '<' | '>') primary]
//! primary     := identifier | literal | '(' expr ')'
//! ```
//!
//! The parser produces an unresolved [`LogicalPlan`]
//! (`Project [→ Filter] → UnresolvedRelation`); binding names is the
//! analyzer's job. Syntax errors carry a message and a source span and can
//! be rendered as miette reports.

use crate::expr::{BinaryOp, Expr, Value};
use crate::lexer::{self, Span, Token, TokenKind};
use crate::plan::LogicalPlan;
use miette::{LabeledSpan, MietteDiagnostic, Report};
use smol_str::SmolStr;
use std::fmt;

/// A syntax error from the parser or lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    span: Option<Span>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> Option<Span> {
        self.span.clone()
    }

    /// Renders this error against its source text as a miette report.
    pub fn to_report(&self, source: &str) -> Report {
        let mut diagnostic = MietteDiagnostic::new(self.message.clone());
        if let Some(span) = &self.span {
            let start = span.start.min(source.len());
            let end = span.end.min(source.len()).max(start);
            diagnostic =
                diagnostic.with_label(LabeledSpan::at(start..end, "here"));
        }
        Report::new(diagnostic).with_source_code(source.to_string())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses one SELECT query into an unresolved logical plan.
pub fn parse(source: &str) -> Result<LogicalPlan, ParseError> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens, source.len()).parse_query()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end: source_len,
        }
    }

    fn parse_query(mut self) -> Result<LogicalPlan, ParseError> {
        self.expect(&TokenKind::Select, "SELECT")?;
        let exprs = self.parse_select_list()?;
        self.expect(&TokenKind::From, "FROM")?;
        let relation = self.expect_identifier("a relation name")?;

        let mut plan = LogicalPlan::unresolved_relation(relation);
        if self.eat(&TokenKind::Where) {
            let predicate = self.parse_expr()?;
            plan = plan.filter(predicate);
        }
        if let Some(token) = self.peek() {
            return Err(self.unexpected(token.clone(), "end of input"));
        }
        Ok(plan.project(exprs))
    }

    fn parse_select_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        if self.eat(&TokenKind::Star) {
            return Ok(vec![Expr::Star]);
        }
        let mut items = vec![self.parse_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_item()?);
        }
        Ok(items)
    }

    fn parse_item(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if self.eat(&TokenKind::As) {
            let name = self.expect_identifier("an alias name")?;
            return Ok(expr.alias(name));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = left.binary(BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_comparison()?;
            left = left.binary(BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_primary()?;
        let op = match self.peek().map(|t| &t.kind) {
            Some(&TokenKind::Eq) => BinaryOp::Eq,
            Some(&TokenKind::NotEq) => BinaryOp::NotEq,
            Some(&TokenKind::Lt) => BinaryOp::Lt,
            Some(&TokenKind::Gt) => BinaryOp::Gt,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_primary()?;
        Ok(left.binary(op, right))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::new(
                "expected an expression, found end of input",
                Some(self.end..self.end),
            ));
        };
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::col(name))
            }
            TokenKind::Integer(v) => {
                self.advance();
                Ok(Expr::Literal(Value::Integer(v)))
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(v)))
            }
            TokenKind::Text(v) => {
                self.advance();
                Ok(Expr::Literal(Value::Text(v)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Boolean(false)))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, ")")?;
                Ok(expr)
            }
            _ => Err(self.unexpected(token, "an expression")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, description: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(self.unexpected(token.clone(), description)),
            None => Err(ParseError::new(
                format!("expected {description}, found end of input"),
                Some(self.end..self.end),
            )),
        }
    }

    fn expect_identifier(&mut self, description: &str) -> Result<SmolStr, ParseError> {
        match self.peek().cloned() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => {
                self.advance();
                Ok(name)
            }
            Some(token) => Err(self.unexpected(token, description)),
            None => Err(ParseError::new(
                format!("expected {description}, found end of input"),
                Some(self.end..self.end),
            )),
        }
    }

    fn unexpected(&self, token: Token, description: &str) -> ParseError {
        ParseError::new(
            format!("expected {description}, found `{}`", token.kind),
            Some(token.span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_star_projection() {
        let plan = parse("SELECT * FROM orders").unwrap();
        let LogicalPlan::Project { exprs, input } = &plan else {
            panic!("expected Project, got:\n{plan}");
        };
        assert_eq!(exprs, &[Expr::Star]);
        assert!(matches!(
            input.as_ref(),
            LogicalPlan::UnresolvedRelation { name } if name == "orders"
        ));
    }

    #[test]
    fn parses_columns_aliases_and_where() {
        let plan = parse("select id, amount as total from orders where amount > 10.5").unwrap();
        let LogicalPlan::Project { exprs, input } = &plan else {
            panic!("expected Project, got:\n{plan}");
        };
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1], Expr::col("amount").alias("total"));
        assert!(matches!(input.as_ref(), LogicalPlan::Filter { .. }));
    }

    #[test]
    fn parses_boolean_connectives_with_precedence() {
        let plan = parse("SELECT * FROM t WHERE a = 1 AND b = 2 OR c = 3").unwrap();
        let LogicalPlan::Project { input, .. } = &plan else {
            unreachable!()
        };
        let LogicalPlan::Filter { predicate, .. } = input.as_ref() else {
            panic!("expected Filter, got:\n{input}");
        };
        // OR binds loosest.
        assert!(matches!(
            predicate,
            Expr::Binary {
                op: BinaryOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn missing_from_is_reported_with_span() {
        let err = parse("SELECT *").unwrap_err();
        assert_eq!(err.message(), "expected FROM, found end of input");
        assert_eq!(err.span(), Some(8..8));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse("SELECT * FROM t t2").unwrap_err();
        assert!(err.message().contains("expected end of input"));
    }

    #[test]
    fn report_rendering_includes_the_message() {
        let source = "SELECT FROM t";
        let err = parse(source).unwrap_err();
        let report = err.to_report(source);
        assert!(format!("{report:?}").contains("expected an expression"));
    }
}
