//! General-purpose conditions and the fluent builder surface shared with [`Filter`].
//!
//! [`Filter`]: crate::filter::Filter

use crate::ast::{Expression, IntoOperator, Literal, Logic, Operand};
use crate::error::FilterError;
use crate::explainer::Explainer;
use crate::expr;
use crate::tree::{ExpressionTree, Node, NodeRef};

/// Fluent builder over an [`ExpressionTree`].
///
/// Every helper appends under `Logic::And`; the `or_*` sibling appends under
/// `Logic::Or`. The connector of a group is fixed by its second child, so a
/// chain that mixes `and` and `or` helpers at one level fails with
/// [`FilterError::LogicConflict`].
pub trait ConditionBuilder: Sized {
    /// Appends a child, running any checks the implementing type enforces.
    fn append(&mut self, node: Node, logic: Option<Logic>) -> Result<&mut Self, FilterError>;

    fn tree(&self) -> &ExpressionTree;

    /// A fresh node of the same kind, used for nested groups.
    fn new_group(&self) -> Self;

    fn into_node(self) -> Node;

    fn as_node_ref(&self) -> NodeRef<'_>;

    fn logic(&self) -> Option<Logic> {
        self.tree().logic()
    }

    fn is_empty(&self) -> bool {
        self.tree().is_empty()
    }

    fn explain(&self) -> Result<String, FilterError> {
        Explainer::new().compile(self.as_node_ref())
    }

    fn push(&mut self, expression: Expression, logic: Logic) -> Result<&mut Self, FilterError> {
        self.append(Node::Expression(expression), Some(logic))
    }

    /// Creates a nested group, fills it through `callback` and appends it under `logic`.
    ///
    /// The connector is validated before the callback runs; if the callback
    /// fails nothing is appended.
    fn group<F>(&mut self, logic: Logic, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Self) -> Result<(), FilterError>,
    {
        self.tree().check_logic(Some(logic))?;
        let mut group = self.new_group();
        callback(&mut group)?;
        self.append(group.into_node(), Some(logic))
    }

    fn and<F>(&mut self, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Self) -> Result<(), FilterError>,
    {
        self.group(Logic::And, callback)
    }

    fn or<F>(&mut self, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Self) -> Result<(), FilterError>,
    {
        self.group(Logic::Or, callback)
    }

    fn where_group<F>(&mut self, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Self) -> Result<(), FilterError>,
    {
        self.group(Logic::And, callback)
    }

    fn or_where_group<F>(&mut self, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Self) -> Result<(), FilterError>,
    {
        self.group(Logic::Or, callback)
    }

    /// `where(name, operator, value)`; the operator may be given as text.
    fn where_(
        &mut self,
        name: &str,
        operator: impl IntoOperator,
        value: impl Into<Operand>,
    ) -> Result<&mut Self, FilterError> {
        let expression = expr::make(name, operator, value)?;
        self.push(expression, Logic::And)
    }

    fn or_where(
        &mut self,
        name: &str,
        operator: impl IntoOperator,
        value: impl Into<Operand>,
    ) -> Result<&mut Self, FilterError> {
        let expression = expr::make(name, operator, value)?;
        self.push(expression, Logic::Or)
    }

    /// Two-argument `where`: equality.
    fn where_eq(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.equal(name, value)
    }

    fn or_where_eq(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.or_equal(name, value)
    }

    fn equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::equal(name, value), Logic::And)
    }

    fn or_equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::equal(name, value), Logic::Or)
    }

    fn not_equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::not_equal(name, value), Logic::And)
    }

    fn or_not_equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::not_equal(name, value), Logic::Or)
    }

    fn greater_than(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::greater_than(name, value), Logic::And)
    }

    fn or_greater_than(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::greater_than(name, value), Logic::Or)
    }

    fn greater_equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::greater_equal(name, value), Logic::And)
    }

    fn or_greater_equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::greater_equal(name, value), Logic::Or)
    }

    fn less_than(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::less_than(name, value), Logic::And)
    }

    fn or_less_than(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::less_than(name, value), Logic::Or)
    }

    fn less_equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::less_equal(name, value), Logic::And)
    }

    fn or_less_equal(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.push(expr::less_equal(name, value), Logic::Or)
    }

    fn is_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.push(expr::is_in(name, values), Logic::And)
    }

    fn or_is_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.push(expr::is_in(name, values), Logic::Or)
    }

    fn where_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.is_in(name, values)
    }

    fn or_where_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.or_is_in(name, values)
    }

    fn not_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.push(expr::not_in(name, values), Logic::And)
    }

    fn or_not_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.push(expr::not_in(name, values), Logic::Or)
    }

    fn where_not_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.not_in(name, values)
    }

    fn or_where_not_in<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.or_not_in(name, values)
    }

    fn is_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::is_null(name), Logic::And)
    }

    fn or_is_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::is_null(name), Logic::Or)
    }

    fn where_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.is_null(name)
    }

    fn or_where_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.or_is_null(name)
    }

    fn not_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::not_null(name), Logic::And)
    }

    fn or_not_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::not_null(name), Logic::Or)
    }

    fn where_not_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.not_null(name)
    }

    fn or_where_not_null(&mut self, name: &str) -> Result<&mut Self, FilterError> {
        self.or_not_null(name)
    }

    fn contain(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::contain(name, value), Logic::And)
    }

    fn or_contain(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::contain(name, value), Logic::Or)
    }

    fn where_contain(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.contain(name, value)
    }

    fn or_where_contain(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.or_contain(name, value)
    }

    fn start_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::start_with(name, value), Logic::And)
    }

    fn or_start_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::start_with(name, value), Logic::Or)
    }

    fn where_start_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.start_with(name, value)
    }

    fn or_where_start_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.or_start_with(name, value)
    }

    fn end_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::end_with(name, value), Logic::And)
    }

    fn or_end_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.push(expr::end_with(name, value), Logic::Or)
    }

    fn where_end_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.end_with(name, value)
    }

    fn or_where_end_with(&mut self, name: &str, value: &str) -> Result<&mut Self, FilterError> {
        self.or_end_with(name, value)
    }
}

/// A free-form tree over any number of fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    tree: ExpressionTree,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConditionBuilder for Condition {
    fn append(&mut self, node: Node, logic: Option<Logic>) -> Result<&mut Self, FilterError> {
        self.tree.append(node, logic)?;
        Ok(self)
    }

    fn tree(&self) -> &ExpressionTree {
        &self.tree
    }

    fn new_group(&self) -> Self {
        Self::new()
    }

    fn into_node(self) -> Node {
        Node::Tree(self.tree)
    }

    fn as_node_ref(&self) -> NodeRef<'_> {
        NodeRef::Tree(&self.tree)
    }
}

impl From<Condition> for Node {
    fn from(v: Condition) -> Self {
        v.into_node()
    }
}

impl<'a> From<&'a Condition> for NodeRef<'a> {
    fn from(v: &'a Condition) -> Self {
        v.as_node_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Identifier, Operator};

    fn explain(condition: &Condition) -> String {
        condition.explain().unwrap()
    }

    #[test]
    fn test_comparison_syntax() {
        let cases: Vec<(&str, Vec<Condition>)> = vec![
            (
                r#"foo = "a""#,
                vec![
                    {
                        let mut c = Condition::new();
                        c.where_eq("foo", "a").unwrap();
                        c
                    },
                    {
                        let mut c = Condition::new();
                        c.where_("foo", "=", "a").unwrap();
                        c
                    },
                    {
                        let mut c = Condition::new();
                        c.where_("foo", Operator::Eq, "a").unwrap();
                        c
                    },
                    {
                        let mut c = Condition::new();
                        c.equal("foo", "a").unwrap();
                        c
                    },
                ],
            ),
            (
                r#"foo != "a""#,
                vec![
                    {
                        let mut c = Condition::new();
                        c.where_("foo", "<>", "a").unwrap();
                        c
                    },
                    {
                        let mut c = Condition::new();
                        c.where_("foo", "!=", "a").unwrap();
                        c
                    },
                    {
                        let mut c = Condition::new();
                        c.not_equal("foo", "a").unwrap();
                        c
                    },
                ],
            ),
        ];

        for (expected, conditions) in cases {
            for (index, condition) in conditions.iter().enumerate() {
                assert_eq!(explain(condition), expected, "case index = {}", index);
            }
        }
    }

    #[test]
    fn test_single_operator_syntax() {
        let mut c = Condition::new();
        c.greater_than("a", 1).unwrap();
        assert_eq!(explain(&c), "a > 1");

        let mut c = Condition::new();
        c.where_("a", ">=", 1).unwrap();
        assert_eq!(explain(&c), "a >= 1");

        let mut c = Condition::new();
        c.less_than("a", 1).unwrap();
        assert_eq!(explain(&c), "a < 1");

        let mut c = Condition::new();
        c.where_("a", Operator::Lte, 1).unwrap();
        assert_eq!(explain(&c), "a <= 1");

        let mut c = Condition::new();
        c.where_null("a").unwrap();
        assert_eq!(explain(&c), "a is null");

        let mut c = Condition::new();
        c.where_("a", Operator::NotNull, Literal::Null).unwrap();
        assert_eq!(explain(&c), "a not null");

        let mut c = Condition::new();
        c.where_("a", "in", vec![1, 2, 3]).unwrap();
        assert_eq!(explain(&c), "a in 1,2,3");

        let mut c = Condition::new();
        c.where_not_in("a", [1, 2, 3]).unwrap();
        assert_eq!(explain(&c), "a not in 1,2,3");

        let mut c = Condition::new();
        c.where_("foo", "contain", "a").unwrap();
        assert_eq!(explain(&c), r#"foo contain "a""#);

        let mut c = Condition::new();
        c.start_with("foo", "a").unwrap();
        assert_eq!(explain(&c), r#"foo start with "a""#);

        let mut c = Condition::new();
        c.where_end_with("foo", "a").unwrap();
        assert_eq!(explain(&c), r#"foo end with "a""#);
    }

    #[test]
    fn test_or_syntax() {
        let mut c = Condition::new();
        c.or_where_eq("foo", "a").unwrap().or_where_eq("foo", "b").unwrap();
        assert_eq!(explain(&c), r#"foo = "a" or foo = "b""#);

        let mut c = Condition::new();
        c.or_less_than("a", 1).unwrap().or_less_than("a", 0).unwrap();
        assert_eq!(explain(&c), "a < 1 or a < 0");

        let mut c = Condition::new();
        c.or_where_not_in("a", [1, 2]).unwrap().or_not_in("a", [3, 4]).unwrap();
        assert_eq!(explain(&c), "a not in 1,2 or a not in 3,4");

        let mut c = Condition::new();
        c.or_is_null("a").unwrap().or_where_null("b").unwrap();
        assert_eq!(explain(&c), "a is null or b is null");

        let mut c = Condition::new();
        c.or_not_null("a").unwrap().or_where_not_null("b").unwrap();
        assert_eq!(explain(&c), "a not null or b not null");

        let mut c = Condition::new();
        c.or_where("a", "in", vec![1, 2]).unwrap().or_where_in("a", [3, 4]).unwrap();
        assert_eq!(explain(&c), "a in 1,2 or a in 3,4");

        let mut c = Condition::new();
        c.or_contain("foo", "a").unwrap().or_where_contain("foo", "b").unwrap();
        assert_eq!(explain(&c), r#"foo contain "a" or foo contain "b""#);

        let mut c = Condition::new();
        c.or_start_with("foo", "a").unwrap().or_where_start_with("foo", "b").unwrap();
        assert_eq!(explain(&c), r#"foo start with "a" or foo start with "b""#);

        let mut c = Condition::new();
        c.or_end_with("foo", "a").unwrap().or_where_end_with("foo", "b").unwrap();
        assert_eq!(explain(&c), r#"foo end with "a" or foo end with "b""#);

        let mut c = Condition::new();
        c.or_greater_equal("a", 1).unwrap().or_greater_equal("a", 0).unwrap();
        assert_eq!(explain(&c), "a >= 1 or a >= 0");

        let mut c = Condition::new();
        c.or_where("foo", "!=", "a").unwrap().or_not_equal("foo", "b").unwrap();
        assert_eq!(explain(&c), r#"foo != "a" or foo != "b""#);
    }

    #[test]
    fn test_or_after_where() {
        let mut c = Condition::new();
        c.where_("foo", "=", "a").unwrap().or_where("foo", "=", "b").unwrap();
        assert_eq!(explain(&c), r#"foo = "a" or foo = "b""#);

        let mut c = Condition::new();
        c.where_eq("foo", "a").unwrap().where_eq("bar", "b").unwrap();
        assert_eq!(explain(&c), r#"foo = "a" and bar = "b""#);
    }

    #[test]
    fn test_nested_group() {
        let mut c = Condition::new();
        c.where_eq("foo", "a")
            .unwrap()
            .where_group(|g| {
                g.where_eq("bar", "b")?.or_where_eq("baz", "c")?;
                Ok(())
            })
            .unwrap();
        assert_eq!(explain(&c), r#"foo = "a" and (bar = "b" or baz = "c")"#);
    }

    #[test]
    fn test_two_or_groups_joined_by_and() {
        let mut c = Condition::new();
        c.where_group(|g| {
            g.where_eq("foo", "a")?.or_where_eq("foo", "b")?;
            Ok(())
        })
        .unwrap()
        .where_group(|g| {
            g.where_eq("bar", "b")?.or_where_eq("baz", "c")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(
            explain(&c),
            r#"(foo = "a" or foo = "b") and (bar = "b" or baz = "c")"#
        );
    }

    #[test]
    fn test_redundant_parentheses_are_removed() {
        let mut c = Condition::new();
        c.where_group(|g1| {
            g1.where_eq("foo", 1)?.or_where_group(|g2| {
                g2.where_eq("foo", 2)?.where_eq("bar", 3)?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap()
        .or_where_group(|g3| {
            g3.where_eq("foo", 3)?.where_eq("bar", 4)?;
            Ok(())
        })
        .unwrap()
        .or_is_in("baz", [7, 8, 9])
        .unwrap();

        assert_eq!(
            explain(&c),
            "foo = 1 or (foo = 2 and bar = 3) or (foo = 3 and bar = 4) or baz in 7,8,9"
        );
    }

    #[test]
    fn test_mixing_connectors_fails() {
        let mut c = Condition::new();
        let err = c
            .where_eq("a", 1)
            .unwrap()
            .where_eq("b", 2)
            .unwrap()
            .or_where_eq("c", 3)
            .unwrap_err();
        assert!(matches!(err, FilterError::LogicConflict { .. }));
    }

    #[test]
    fn test_group_checks_connector_before_callback() {
        let mut c = Condition::new();
        c.where_eq("a", 1).unwrap().where_eq("b", 2).unwrap();

        let mut called = false;
        let err = c
            .or(|_| {
                called = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, FilterError::LogicConflict { .. }));
        assert!(!called);
    }

    #[test]
    fn test_failing_callback_appends_nothing() {
        let mut c = Condition::new();
        c.where_eq("a", 1).unwrap();
        let err = c
            .and(|g| {
                g.where_("b", "between", 1)?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err, FilterError::UnsupportedOperator("between".to_string()));
        assert_eq!(c.tree().len(), 1);
    }

    #[test]
    fn test_identifier_on_the_right() {
        let mut c = Condition::new();
        c.where_("a", ">", Identifier::new("b")).unwrap();
        assert_eq!(explain(&c), "a > b");
    }

    #[test]
    fn test_explain_is_idempotent() {
        let mut c = Condition::new();
        c.where_eq("a", 1)
            .unwrap()
            .or(|g| {
                g.where_eq("b", 2)?.where_eq("c", 3)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(explain(&c), explain(&c));
    }
}
