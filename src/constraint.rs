//! Comparisons scoped to a single field.

use crate::ast::{Expression, IntoOperator, Literal, Logic, Operand};
use crate::error::FilterError;
use crate::explainer::Explainer;
use crate::expr;
use crate::filter::FieldGuard;
use crate::tree::{ExpressionTree, Node, NodeRef};

/// An expression tree bound to one field name.
///
/// Every helper builds an expression whose left side is that field, so
/// `Constraint::new("age").greater_than(18)?.or_is_null()?` reads as
/// `age > 18 or age is null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    name: String,
    tree: ExpressionTree,
    guard: FieldGuard,
}

impl Constraint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tree: ExpressionTree::new(),
            guard: FieldGuard::default(),
        }
    }

    pub(crate) fn with_guard(mut self, guard: FieldGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &ExpressionTree {
        &self.tree
    }

    pub fn logic(&self) -> Option<Logic> {
        self.tree.logic()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// An empty constraint contributes nothing when compiled.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn explain(&self) -> Result<String, FilterError> {
        Explainer::new().compile_expression_tree(&self.tree)
    }

    pub fn append(
        &mut self,
        node: impl Into<Node>,
        logic: Option<Logic>,
    ) -> Result<&mut Self, FilterError> {
        let node = node.into();
        self.guard.check_node(&node)?;
        self.tree.append(node, logic)?;
        Ok(self)
    }

    fn push(&mut self, expression: Expression, logic: Logic) -> Result<&mut Self, FilterError> {
        self.append(expression, Some(logic))
    }

    /// Nested group over the same field.
    pub fn group<F>(&mut self, logic: Logic, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Constraint) -> Result<(), FilterError>,
    {
        self.tree.check_logic(Some(logic))?;
        let mut group = Constraint::new(self.name.clone()).with_guard(self.guard.clone());
        callback(&mut group)?;
        self.append(group, Some(logic))
    }

    pub fn and<F>(&mut self, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Constraint) -> Result<(), FilterError>,
    {
        self.group(Logic::And, callback)
    }

    pub fn or<F>(&mut self, callback: F) -> Result<&mut Self, FilterError>
    where
        F: FnOnce(&mut Constraint) -> Result<(), FilterError>,
    {
        self.group(Logic::Or, callback)
    }

    pub fn where_(
        &mut self,
        operator: impl IntoOperator,
        value: impl Into<Operand>,
    ) -> Result<&mut Self, FilterError> {
        let expression = expr::make(&self.name, operator, value)?;
        self.push(expression, Logic::And)
    }

    pub fn or_where(
        &mut self,
        operator: impl IntoOperator,
        value: impl Into<Operand>,
    ) -> Result<&mut Self, FilterError> {
        let expression = expr::make(&self.name, operator, value)?;
        self.push(expression, Logic::Or)
    }

    pub fn equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::equal(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::equal(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn not_equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::not_equal(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_not_equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::not_equal(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn greater_than(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::greater_than(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_greater_than(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::greater_than(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn greater_equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::greater_equal(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_greater_equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::greater_equal(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn less_than(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::less_than(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_less_than(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::less_than(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn less_equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::less_equal(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_less_equal(&mut self, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        let expression = expr::less_equal(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn is_in<I, V>(&mut self, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let expression = expr::is_in(&self.name, values);
        self.push(expression, Logic::And)
    }

    pub fn or_is_in<I, V>(&mut self, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let expression = expr::is_in(&self.name, values);
        self.push(expression, Logic::Or)
    }

    pub fn not_in<I, V>(&mut self, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let expression = expr::not_in(&self.name, values);
        self.push(expression, Logic::And)
    }

    pub fn or_not_in<I, V>(&mut self, values: I) -> Result<&mut Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let expression = expr::not_in(&self.name, values);
        self.push(expression, Logic::Or)
    }

    pub fn is_null(&mut self) -> Result<&mut Self, FilterError> {
        let expression = expr::is_null(&self.name);
        self.push(expression, Logic::And)
    }

    pub fn or_is_null(&mut self) -> Result<&mut Self, FilterError> {
        let expression = expr::is_null(&self.name);
        self.push(expression, Logic::Or)
    }

    pub fn not_null(&mut self) -> Result<&mut Self, FilterError> {
        let expression = expr::not_null(&self.name);
        self.push(expression, Logic::And)
    }

    pub fn or_not_null(&mut self) -> Result<&mut Self, FilterError> {
        let expression = expr::not_null(&self.name);
        self.push(expression, Logic::Or)
    }

    pub fn contain(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let expression = expr::contain(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_contain(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let expression = expr::contain(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn start_with(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let expression = expr::start_with(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_start_with(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let expression = expr::start_with(&self.name, value);
        self.push(expression, Logic::Or)
    }

    pub fn end_with(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let expression = expr::end_with(&self.name, value);
        self.push(expression, Logic::And)
    }

    pub fn or_end_with(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let expression = expr::end_with(&self.name, value);
        self.push(expression, Logic::Or)
    }
}

impl From<Constraint> for Node {
    fn from(v: Constraint) -> Self {
        Node::Tree(v.tree)
    }
}

impl<'a> From<&'a Constraint> for NodeRef<'a> {
    fn from(v: &'a Constraint) -> Self {
        NodeRef::Tree(&v.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Identifier;

    #[test]
    fn test_equal() {
        let mut constraint = Constraint::new("foo");
        constraint.equal("a").unwrap();
        assert_eq!(constraint.explain().unwrap(), r#"foo = "a""#);
    }

    #[test]
    fn test_or_equal() {
        let mut constraint = Constraint::new("foo");
        constraint.equal("a").unwrap().or_equal("b").unwrap();
        assert_eq!(constraint.explain().unwrap(), r#"foo = "a" or foo = "b""#);
    }

    #[test]
    fn test_range() {
        let mut constraint = Constraint::new("baz");
        constraint.greater_than(0).unwrap().or_less_than(10).unwrap();
        assert_eq!(constraint.explain().unwrap(), "baz > 0 or baz < 10");
        assert_eq!(constraint.logic(), Some(Logic::Or));
    }

    #[test]
    fn test_where_with_token() {
        let mut constraint = Constraint::new("qux");
        constraint.where_(">=", 10).unwrap().where_("<=", 15).unwrap();
        assert_eq!(constraint.explain().unwrap(), "qux >= 10 and qux <= 15");
    }

    #[test]
    fn test_group_keeps_field() {
        let mut constraint = Constraint::new("age");
        constraint
            .is_null()
            .unwrap()
            .or(|c| {
                c.greater_equal(18)?.less_than(65)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            constraint.explain().unwrap(),
            "age is null or (age >= 18 and age < 65)"
        );
    }

    #[test]
    fn test_empty_nested_groups() {
        let mut constraint = Constraint::new("foo");
        constraint
            .group(Logic::And, |c| {
                c.group(Logic::And, |_| Ok(()))?;
                Ok(())
            })
            .unwrap();
        assert!(constraint.is_empty());
        assert_eq!(constraint.len(), 1);
        assert_eq!(constraint.explain().unwrap(), "");
    }

    #[test]
    fn test_guard_checks_right_identifier() {
        let guard = FieldGuard::new(["foo"]);
        let mut constraint = Constraint::new("foo").with_guard(guard);
        constraint.equal("bar").unwrap();

        let err = constraint.or_equal(Identifier::new("bar")).unwrap_err();
        assert_eq!(err, FilterError::FieldNotAllowed("bar".to_string()));
    }
}
