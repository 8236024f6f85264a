//! Factory functions building single-field [`Expression`]s.
//!
//! The left side is always the named field; the right side is wrapped as a
//! [`Literal`] unless the caller already passed an [`Identifier`] or literal.
//!
//! [`Literal`]: crate::ast::Literal
//! [`Identifier`]: crate::ast::Identifier

use crate::ast::{Expression, Identifier, IntoOperator, Literal, Operand, Operator};
use crate::error::FilterError;

fn compare(name: &str, operator: Operator, value: impl Into<Operand>) -> Expression {
    Expression::new(
        Identifier::new(name).into(),
        operator,
        Some(value.into()),
    )
}

fn list<I, V>(values: I) -> Operand
where
    I: IntoIterator<Item = V>,
    V: Into<Literal>,
{
    Operand::Literal(Literal::List(values.into_iter().map(Into::into).collect()))
}

pub fn equal(name: &str, value: impl Into<Operand>) -> Expression {
    compare(name, Operator::Eq, value)
}

pub fn not_equal(name: &str, value: impl Into<Operand>) -> Expression {
    compare(name, Operator::NotEq, value)
}

pub fn greater_than(name: &str, value: impl Into<Operand>) -> Expression {
    compare(name, Operator::Gt, value)
}

pub fn greater_equal(name: &str, value: impl Into<Operand>) -> Expression {
    compare(name, Operator::Gte, value)
}

pub fn less_than(name: &str, value: impl Into<Operand>) -> Expression {
    compare(name, Operator::Lt, value)
}

pub fn less_equal(name: &str, value: impl Into<Operand>) -> Expression {
    compare(name, Operator::Lte, value)
}

pub fn is_in<I, V>(name: &str, values: I) -> Expression
where
    I: IntoIterator<Item = V>,
    V: Into<Literal>,
{
    compare(name, Operator::In, list(values))
}

pub fn not_in<I, V>(name: &str, values: I) -> Expression
where
    I: IntoIterator<Item = V>,
    V: Into<Literal>,
{
    compare(name, Operator::NotIn, list(values))
}

pub fn is_null(name: &str) -> Expression {
    Expression::new(Identifier::new(name).into(), Operator::IsNull, None)
}

pub fn not_null(name: &str) -> Expression {
    Expression::new(Identifier::new(name).into(), Operator::NotNull, None)
}

pub fn contain(name: &str, value: &str) -> Expression {
    compare(name, Operator::Contain, value)
}

pub fn start_with(name: &str, value: &str) -> Expression {
    compare(name, Operator::StartWith, value)
}

pub fn end_with(name: &str, value: &str) -> Expression {
    compare(name, Operator::EndWith, value)
}

/// Builds an expression from an operator given as [`Operator`] or as a text token.
/// The value is dropped for `is null` / `not null`.
pub fn make(
    name: &str,
    operator: impl IntoOperator,
    value: impl Into<Operand>,
) -> Result<Expression, FilterError> {
    let operator = operator.into_operator()?;
    Ok(compare(name, operator, value))
}
