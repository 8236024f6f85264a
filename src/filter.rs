//! Root-level filters: named per-field constraints plus free-form condition groups.
//!
//! Constraints and the condition section are always ANDed at the root of a
//! filter, with constraints emitted first. A connector passed to the first
//! condition-level call therefore never joins it to the constraints:
//!
//! ```text
//! filter.set("foo", "a")?;
//! filter.or_where_eq("baz", "c")?;   // foo = "a" and baz = "c"
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::ast::{Expression, Logic, Operand};
use crate::condition::{Condition, ConditionBuilder};
use crate::constraint::Constraint;
use crate::error::FilterError;
use crate::tree::{ExpressionTree, Node, NodeRef};

/// Optional allow-list of field names shared by a filter, its nested groups
/// and the constraints it owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FieldGuard {
    allowed: Option<Arc<BTreeSet<String>>>,
}

impl FieldGuard {
    pub(crate) fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(Arc::new(fields.into_iter().map(Into::into).collect())),
        }
    }

    pub(crate) fn fields(&self) -> Option<&BTreeSet<String>> {
        self.allowed.as_deref()
    }

    pub(crate) fn check(&self, name: &str) -> Result<(), FilterError> {
        match &self.allowed {
            Some(allowed) if !allowed.contains(name) => {
                tracing::debug!(field = name, "field rejected by allow-list");
                Err(FilterError::FieldNotAllowed(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn check_expression(&self, expression: &Expression) -> Result<(), FilterError> {
        expression
            .identifiers()
            .try_for_each(|id| self.check(id.name()))
    }

    pub(crate) fn check_tree(&self, tree: &ExpressionTree) -> Result<(), FilterError> {
        tree.children()
            .iter()
            .try_for_each(|child| self.check_node(child))
    }

    /// Walks every expression beneath `node`.
    pub(crate) fn check_node(&self, node: &Node) -> Result<(), FilterError> {
        if self.allowed.is_none() {
            return Ok(());
        }
        match node {
            Node::Expression(expression) => self.check_expression(expression),
            Node::Tree(tree) => self.check_tree(tree),
            Node::Filter(filter) => {
                for constraint in &filter.constraints {
                    self.check(constraint.name())?;
                    self.check_tree(constraint.tree())?;
                }
                self.check_tree(filter.condition.tree())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    condition: Condition,
    /// Insertion ordered, unique by name.
    constraints: Vec<Constraint>,
    guard: FieldGuard,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter that only accepts the given field names, here and in every nested group.
    pub fn with_allowed_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            guard: FieldGuard::new(fields),
            ..Self::default()
        }
    }

    /// `None` when every field is allowed.
    pub fn allowed_fields(&self) -> Option<&BTreeSet<String>> {
        self.guard.fields()
    }

    /// Constraint for `name`, created empty on first access.
    pub fn field(&mut self, name: &str) -> Result<&mut Constraint, FilterError> {
        self.guard.check(name)?;

        let index = match self.constraints.iter().position(|c| c.name() == name) {
            Some(index) => index,
            None => {
                tracing::trace!(field = name, "constraint created");
                self.constraints
                    .push(Constraint::new(name).with_guard(self.guard.clone()));
                self.constraints.len() - 1
            }
        };
        Ok(&mut self.constraints[index])
    }

    /// Replaces the constraint for `name` with a single equality.
    pub fn set(&mut self, name: &str, value: impl Into<Operand>) -> Result<&mut Self, FilterError> {
        self.guard.check(name)?;

        let mut constraint = Constraint::new(name).with_guard(self.guard.clone());
        constraint.equal(value)?;
        self.store(constraint);
        Ok(self)
    }

    /// Stores a prepared constraint under `name`, which must match its own name.
    pub fn set_constraint(
        &mut self,
        name: &str,
        constraint: Constraint,
    ) -> Result<&mut Self, FilterError> {
        if constraint.name() != name {
            return Err(FilterError::InconsistentName {
                expected: name.to_string(),
                found: constraint.name().to_string(),
            });
        }
        self.guard.check(name)?;
        self.guard.check_tree(constraint.tree())?;

        self.store(constraint.with_guard(self.guard.clone()));
        Ok(self)
    }

    fn store(&mut self, constraint: Constraint) {
        match self
            .constraints
            .iter_mut()
            .find(|c| c.name() == constraint.name())
        {
            Some(slot) => *slot = constraint,
            None => self.constraints.push(constraint),
        }
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name() == name)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn count_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.iter().all(Constraint::is_empty) && self.condition.tree().is_empty()
    }

    /// Non-empty constraints in insertion order, followed by the condition
    /// section when it holds anything.
    pub fn sections(&self) -> Vec<&ExpressionTree> {
        let mut sections: Vec<&ExpressionTree> = self
            .constraints
            .iter()
            .filter(|c| !c.is_empty())
            .map(Constraint::tree)
            .collect();
        if !self.condition.tree().is_empty() {
            sections.push(self.condition.tree());
        }
        sections
    }

    /// Sections are ANDed, so several of them always join with `and`.
    pub fn outer_logic(&self) -> Option<Logic> {
        match self.sections().as_slice() {
            [] => None,
            [only] => only.outer_logic(),
            _ => Some(Logic::And),
        }
    }
}

impl ConditionBuilder for Filter {
    fn append(&mut self, node: Node, logic: Option<Logic>) -> Result<&mut Self, FilterError> {
        self.guard.check_node(&node)?;
        self.condition.append(node, logic)?;
        Ok(self)
    }

    fn tree(&self) -> &ExpressionTree {
        self.condition.tree()
    }

    fn new_group(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            ..Self::default()
        }
    }

    fn into_node(self) -> Node {
        Node::Filter(self)
    }

    fn as_node_ref(&self) -> NodeRef<'_> {
        NodeRef::Filter(self)
    }

    fn is_empty(&self) -> bool {
        Filter::is_empty(self)
    }
}
