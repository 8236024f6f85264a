//! SQL compiler that renders filter trees as `SELECT` statements using sea-query.

use sea_query::{
    Asterisk, Cond, Condition, Expr, Iden, MysqlQueryBuilder, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr, SqliteQueryBuilder, Value,
};

use crate::ast::{Literal, Logic, Operand, Operator};
use crate::config::{CompilerConfig, Dialect};
use crate::error::FilterError;
use crate::query_compiler::{CompOp, QueryCompiler, QuerySink};
use crate::tree::NodeRef;

/// Table identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

#[derive(Debug, Clone)]
enum Clause {
    Expr(SimpleExpr),
    Group(Condition),
}

/// [`QuerySink`] collecting sea-query conditions.
///
/// Clauses are kept in call order with their connectors and folded the way
/// SQL reads a flat `WHERE` list: AND binds tighter than OR.
#[derive(Debug, Clone, Default)]
pub struct SeaQuerySink {
    clauses: Vec<(Logic, Clause)>,
}

impl SeaQuerySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// `None` when nothing was emitted.
    pub fn into_condition(self) -> Option<Condition> {
        let mut runs: Vec<Vec<Clause>> = Vec::new();
        for (logic, clause) in self.clauses {
            match runs.last_mut() {
                Some(run) if logic == Logic::And => run.push(clause),
                _ => runs.push(vec![clause]),
            }
        }

        match runs.len() {
            0 => None,
            1 => runs.pop().map(all_of),
            _ => Some(runs.into_iter().fold(Cond::any(), |any, run| {
                if run.len() == 1 {
                    run.into_iter().fold(any, add_clause)
                } else {
                    any.add(all_of(run))
                }
            })),
        }
    }

    fn push(&mut self, connector: Logic, expr: SimpleExpr) {
        self.clauses.push((connector, Clause::Expr(expr)));
    }
}

fn add_clause(condition: Condition, clause: Clause) -> Condition {
    match clause {
        Clause::Expr(expr) => condition.add(expr),
        Clause::Group(group) => condition.add(group),
    }
}

fn all_of(run: Vec<Clause>) -> Condition {
    run.into_iter().fold(Cond::all(), add_clause)
}

/// Converts an AST literal to a sea-query value
fn literal_to_value(literal: Literal, operator: Operator) -> Result<Value, FilterError> {
    match literal {
        Literal::Null => Ok(Value::String(None)),
        Literal::Bool(v) => Ok(Value::Bool(Some(v))),
        Literal::Int(v) => Ok(Value::BigInt(Some(v))),
        Literal::Float(v) => Ok(Value::Double(Some(v))),
        Literal::String(v) => Ok(Value::String(Some(Box::new(v)))),
        Literal::List(_) => Err(FilterError::InvalidOperand {
            operator,
            reason: "a nested list",
        }),
    }
}

fn operand_to_expr(operand: Operand, operator: Operator) -> Result<SimpleExpr, FilterError> {
    match operand {
        Operand::Identifier(id) => Ok(Expr::col(ColumnName(id.0)).into()),
        Operand::Literal(Literal::List(_)) => Err(FilterError::InvalidOperand {
            operator,
            reason: "a list in a scalar comparison",
        }),
        Operand::Literal(literal) => Ok(Expr::val(literal_to_value(literal, operator)?).into()),
    }
}

/// Operator to blame in errors raised while lowering `op`.
fn source_operator(op: CompOp) -> Operator {
    match op {
        CompOp::Eq => Operator::Eq,
        CompOp::NotEq => Operator::NotEq,
        CompOp::Gt => Operator::Gt,
        CompOp::Gte => Operator::Gte,
        CompOp::Lt => Operator::Lt,
        CompOp::Lte => Operator::Lte,
        CompOp::Like => Operator::Contain,
    }
}

impl QuerySink for SeaQuerySink {
    fn where_compare(
        &mut self,
        left: Operand,
        op: CompOp,
        right: Operand,
        connector: Logic,
    ) -> Result<(), FilterError> {
        let operator = source_operator(op);
        let left = Expr::expr(operand_to_expr(left, operator)?);

        let expr = match (op, right) {
            (CompOp::Like, Operand::Literal(Literal::String(pattern))) => left.like(pattern),
            (CompOp::Like, _) => {
                return Err(FilterError::InvalidOperand {
                    operator,
                    reason: "a non-text pattern",
                })
            }
            (CompOp::Eq, Operand::Literal(Literal::Null)) => left.is_null(),
            (CompOp::NotEq, Operand::Literal(Literal::Null)) => left.is_not_null(),
            (CompOp::Eq, right) => left.eq(operand_to_expr(right, operator)?),
            (CompOp::NotEq, right) => left.ne(operand_to_expr(right, operator)?),
            (CompOp::Gt, right) => left.gt(operand_to_expr(right, operator)?),
            (CompOp::Gte, right) => left.gte(operand_to_expr(right, operator)?),
            (CompOp::Lt, right) => left.lt(operand_to_expr(right, operator)?),
            (CompOp::Lte, right) => left.lte(operand_to_expr(right, operator)?),
        };

        self.push(connector, expr);
        Ok(())
    }

    fn where_in(
        &mut self,
        field: Operand,
        values: Vec<Literal>,
        connector: Logic,
        negate: bool,
    ) -> Result<(), FilterError> {
        let operator = if negate { Operator::NotIn } else { Operator::In };
        let column = Expr::expr(operand_to_expr(field, operator)?);
        let values = values
            .into_iter()
            .map(|v| literal_to_value(v, operator))
            .collect::<Result<Vec<_>, _>>()?;

        let expr = if negate {
            column.is_not_in(values)
        } else {
            column.is_in(values)
        };
        self.push(connector, expr);
        Ok(())
    }

    fn where_null(
        &mut self,
        field: Operand,
        connector: Logic,
        negate: bool,
    ) -> Result<(), FilterError> {
        let operator = if negate { Operator::NotNull } else { Operator::IsNull };
        let column = Expr::expr(operand_to_expr(field, operator)?);
        let expr = if negate {
            column.is_not_null()
        } else {
            column.is_null()
        };
        self.push(connector, expr);
        Ok(())
    }

    fn where_nested<F>(&mut self, connector: Logic, body: F) -> Result<(), FilterError>
    where
        F: FnOnce(&mut Self) -> Result<(), FilterError>,
    {
        let mut nested = SeaQuerySink::new();
        body(&mut nested)?;
        if let Some(group) = nested.into_condition() {
            self.clauses.push((connector, Clause::Group(group)));
        }
        Ok(())
    }
}

/// Renders filter trees as `SELECT * FROM <table> [WHERE ...]`.
#[derive(Debug)]
pub struct SqlCompiler {
    config: CompilerConfig,
    compiler: QueryCompiler,
}

impl Default for SqlCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self::from_config(CompilerConfig::default())
    }

    /// Column renames from the config are applied to every field reference.
    pub fn from_config(config: CompilerConfig) -> Self {
        let mapping = config.clone();
        let compiler =
            QueryCompiler::new().with_name_mapper(move |field| mapping.column_name(field));
        Self { config, compiler }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn select<'a>(&self, node: impl Into<NodeRef<'a>>) -> Result<SelectStatement, FilterError> {
        let mut sink = SeaQuerySink::new();
        self.compiler.compile(node, &mut sink)?;

        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(TableName(self.config.table.clone()));
        if let Some(condition) = sink.into_condition() {
            select.cond_where(condition);
        }
        Ok(select)
    }

    /// Renders with the configured dialect.
    pub fn to_sql(&self, select: &SelectStatement) -> String {
        match self.config.dialect {
            Dialect::Postgres => select.to_string(PostgresQueryBuilder),
            Dialect::Mysql => select.to_string(MysqlQueryBuilder),
            Dialect::Sqlite => select.to_string(SqliteQueryBuilder),
        }
    }

    pub fn compile<'a>(&self, node: impl Into<NodeRef<'a>>) -> Result<String, FilterError> {
        let select = self.select(node)?;
        let sql = self.to_sql(&select);
        tracing::trace!(%sql, "query compiled");
        Ok(sql)
    }
}
