//! Expression trees and the single-connector invariant.
//!
//! Every group joins its children with exactly one connector. The connector is
//! fixed by the second child; appending under a different connector later is an
//! error, so mixed AND/OR has to be written as nested groups:
//!
//! ```text
//! ✔ foo = a and baz = c
//! ✔ foo = a or bar = b or baz = c
//! ✘ foo = a and bar = b or baz = c
//! ✔ foo = a and (bar = b or baz = c)
//! ```
//!
//! Both compilers rely on this to drop redundant parentheses: a nested group
//! only needs wrapping when its top-level connector differs from its parent's,
//! which [`ExpressionTree::outer_logic`] reports.

use crate::ast::{Expression, Logic};
use crate::error::FilterError;
use crate::filter::Filter;

/// A child of an [`ExpressionTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expression(Expression),
    /// Nested Condition or Constraint group.
    Tree(ExpressionTree),
    /// Nested Filter group, which keeps its own constraints.
    Filter(Filter),
}

impl Node {
    /// True when no expression exists anywhere beneath this node.
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Expression(_) => false,
            Node::Tree(tree) => tree.is_empty(),
            Node::Filter(filter) => filter.is_empty(),
        }
    }

    /// Connector at the top level of this node once compiled, `None` for a single term.
    pub fn outer_logic(&self) -> Option<Logic> {
        match self {
            Node::Expression(_) => None,
            Node::Tree(tree) => tree.outer_logic(),
            Node::Filter(filter) => filter.outer_logic(),
        }
    }
}

impl From<Expression> for Node {
    fn from(v: Expression) -> Self {
        Node::Expression(v)
    }
}

impl From<ExpressionTree> for Node {
    fn from(v: ExpressionTree) -> Self {
        Node::Tree(v)
    }
}

impl From<Filter> for Node {
    fn from(v: Filter) -> Self {
        Node::Filter(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionTree {
    children: Vec<Node>,
    logic: Option<Logic>,
}

impl ExpressionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// The group connector; unset until a second child is appended.
    pub fn logic(&self) -> Option<Logic> {
        self.logic
    }

    /// Validates `logic` for the next append without touching the tree and
    /// returns the connector the group would have afterwards.
    pub fn check_logic(&self, logic: Option<Logic>) -> Result<Option<Logic>, FilterError> {
        if self.children.is_empty() {
            return Ok(self.logic);
        }
        let logic = logic.ok_or(FilterError::LogicRequired)?;
        match self.logic {
            None => Ok(Some(logic)),
            Some(current) if current == logic => Ok(Some(current)),
            Some(current) => Err(FilterError::LogicConflict {
                expected: current,
                found: logic,
            }),
        }
    }

    /// Appends a child. `logic` is ignored for the first child and required afterwards.
    pub fn append(
        &mut self,
        node: impl Into<Node>,
        logic: Option<Logic>,
    ) -> Result<&mut Self, FilterError> {
        let resolved = self.check_logic(logic)?;
        if let (None, Some(fixed)) = (self.logic, resolved) {
            tracing::trace!(logic = %fixed, "group connector fixed");
        }
        self.logic = resolved;
        self.children.push(node.into());
        Ok(self)
    }

    /// True when no expression exists anywhere beneath this tree.
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(Node::is_empty)
    }

    /// Connector joining this tree's compiled terms at the top level.
    ///
    /// Empty children contribute no term. A tree with a single remaining term
    /// reports that term's own outer logic.
    pub fn outer_logic(&self) -> Option<Logic> {
        let mut terms = self.children.iter().filter(|child| !child.is_empty());
        match (terms.next(), terms.next()) {
            (None, _) => None,
            (Some(only), None) => only.outer_logic(),
            _ => self.logic,
        }
    }
}

/// Whether a child with outer logic `child` must be grouped under a parent joining with `parent`.
pub(crate) fn needs_group(child: Option<Logic>, parent: Logic) -> bool {
    matches!(child, Some(logic) if logic != parent)
}

/// Borrowed view of anything the compilers accept.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Expression(&'a Expression),
    Tree(&'a ExpressionTree),
    Filter(&'a Filter),
}

impl NodeRef<'_> {
    pub fn outer_logic(&self) -> Option<Logic> {
        match self {
            NodeRef::Expression(_) => None,
            NodeRef::Tree(tree) => tree.outer_logic(),
            NodeRef::Filter(filter) => filter.outer_logic(),
        }
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Expression(expr) => NodeRef::Expression(expr),
            Node::Tree(tree) => NodeRef::Tree(tree),
            Node::Filter(filter) => NodeRef::Filter(filter),
        }
    }
}

impl<'a> From<&'a Expression> for NodeRef<'a> {
    fn from(v: &'a Expression) -> Self {
        NodeRef::Expression(v)
    }
}

impl<'a> From<&'a ExpressionTree> for NodeRef<'a> {
    fn from(v: &'a ExpressionTree) -> Self {
        NodeRef::Tree(v)
    }
}

impl<'a> From<&'a Filter> for NodeRef<'a> {
    fn from(v: &'a Filter) -> Self {
        NodeRef::Filter(v)
    }
}
