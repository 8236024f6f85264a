//! Compiles expression trees into their canonical, human-readable form.
//!
//! ```text
//! foo = "a" and (bar = "b" or baz = "c")
//! ```
//!
//! The output is meant for debugging and tests; it is stable but not designed
//! to be parsed back.

use crate::ast::{Expression, Literal, Logic, Operand};
use crate::error::FilterError;
use crate::filter::Filter;
use crate::tree::{needs_group, ExpressionTree, Node, NodeRef};

#[derive(Debug, Clone, Copy, Default)]
pub struct Explainer;

impl Explainer {
    pub fn new() -> Self {
        Self
    }

    /// The root itself is never parenthesized.
    pub fn compile<'a>(&self, node: impl Into<NodeRef<'a>>) -> Result<String, FilterError> {
        let node = node.into();
        self.compile_node(node, node.outer_logic().unwrap_or(Logic::And))
    }

    /// Constraints first, then the free-form section, joined with `and`.
    pub fn compile_filter(&self, filter: &Filter) -> Result<String, FilterError> {
        self.compile(filter)
    }

    pub fn compile_expression_tree(&self, tree: &ExpressionTree) -> Result<String, FilterError> {
        self.compile(tree)
    }

    /// `context` is the connector surrounding the node. A group holding a
    /// single term is transparent and hands it down unchanged.
    fn compile_node(&self, node: NodeRef<'_>, context: Logic) -> Result<String, FilterError> {
        match node {
            NodeRef::Expression(expression) => Ok(self.compile_expression(expression)),
            NodeRef::Tree(tree) => self.tree_to_string(tree, context),
            NodeRef::Filter(filter) => self.filter_to_string(filter, context),
        }
    }

    fn filter_to_string(&self, filter: &Filter, context: Logic) -> Result<String, FilterError> {
        let sections = filter.sections();
        let parent = if sections.len() > 1 { Logic::And } else { context };

        let mut terms = Vec::with_capacity(sections.len());
        for section in sections {
            terms.push(self.term(NodeRef::Tree(section), section.outer_logic(), parent)?);
        }
        self.join(terms, Some(Logic::And))
    }

    fn tree_to_string(&self, tree: &ExpressionTree, context: Logic) -> Result<String, FilterError> {
        let live: Vec<&Node> = tree.children().iter().filter(|c| !c.is_empty()).collect();
        let parent = match tree.logic() {
            Some(logic) if live.len() > 1 => logic,
            _ => context,
        };

        let mut terms = Vec::with_capacity(live.len());
        for child in live {
            terms.push(self.term(child.into(), child.outer_logic(), parent)?);
        }
        self.join(terms, tree.logic())
    }

    fn term(
        &self,
        node: NodeRef<'_>,
        outer: Option<Logic>,
        parent: Logic,
    ) -> Result<String, FilterError> {
        let text = self.compile_node(node, outer.unwrap_or(parent))?;
        Ok(self.wrap(text, needs_group(outer, parent)))
    }

    pub fn compile_expression(&self, expression: &Expression) -> String {
        let mut text = format!(
            "{} {}",
            self.operand_to_string(expression.left()),
            expression.operator()
        );
        if let Some(right) = expression.right() {
            let right = self.operand_to_string(right);
            if !right.is_empty() {
                text.push(' ');
                text.push_str(&right);
            }
        }
        text
    }

    pub fn operand_to_string(&self, operand: &Operand) -> String {
        match operand {
            Operand::Identifier(id) => id.name().to_string(),
            Operand::Literal(literal) => self.literal_to_string(literal),
        }
    }

    fn literal_to_string(&self, literal: &Literal) -> String {
        match literal {
            Literal::Null => "null".to_string(),
            Literal::Bool(v) => v.to_string(),
            Literal::Int(v) => v.to_string(),
            Literal::Float(v) => v.to_string(),
            Literal::String(v) => format!("\"{}\"", v),
            Literal::List(items) => items
                .iter()
                .map(|item| match item {
                    // list items are written bare
                    Literal::String(v) => v.clone(),
                    other => self.literal_to_string(other),
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    fn wrap(&self, text: String, parenthesize: bool) -> String {
        if parenthesize {
            format!("({})", text)
        } else {
            text
        }
    }

    fn join(&self, terms: Vec<String>, logic: Option<Logic>) -> Result<String, FilterError> {
        if terms.len() < 2 {
            return Ok(terms.concat());
        }
        let logic = logic.ok_or(FilterError::MissingLogicForFold(terms.len()))?;
        Ok(terms.join(&format!(" {} ", logic)))
    }
}
