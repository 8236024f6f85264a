//! Drives a query builder ("sink") from an expression tree.
//!
//! Dispatch and parenthesis elision mirror the [`Explainer`](crate::explainer::Explainer):
//! wherever the text form would open a parenthesis, the sink is asked for a
//! nested scope instead.

use std::fmt;

use crate::ast::{Expression, Identifier, Literal, Logic, Operand, Operator};
use crate::error::FilterError;
use crate::filter::Filter;
use crate::tree::{needs_group, ExpressionTree, Node, NodeRef};

/// Comparison emitted to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CompOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompOp::Eq => "=",
            CompOp::NotEq => "<>",
            CompOp::Gt => ">",
            CompOp::Gte => ">=",
            CompOp::Lt => "<",
            CompOp::Lte => "<=",
            CompOp::Like => "like",
        }
    }
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query builder driven by [`QueryCompiler`].
///
/// `connector` joins the call to whatever the current scope already holds;
/// the first call in a scope may ignore it.
pub trait QuerySink {
    fn where_compare(
        &mut self,
        left: Operand,
        op: CompOp,
        right: Operand,
        connector: Logic,
    ) -> Result<(), FilterError>;

    fn where_in(
        &mut self,
        field: Operand,
        values: Vec<Literal>,
        connector: Logic,
        negate: bool,
    ) -> Result<(), FilterError>;

    fn where_null(&mut self, field: Operand, connector: Logic, negate: bool)
        -> Result<(), FilterError>;

    /// Opens a nested scope; everything `body` emits lands inside it.
    fn where_nested<F>(&mut self, connector: Logic, body: F) -> Result<(), FilterError>
    where
        F: FnOnce(&mut Self) -> Result<(), FilterError>;
}

type NameMapper = Box<dyn Fn(&str) -> String + Send + Sync>;
type ValueMapper = Box<dyn Fn(&str, Literal) -> Literal + Send + Sync>;

#[derive(Default)]
pub struct QueryCompiler {
    name_mapper: Option<NameMapper>,
    value_mapper: Option<ValueMapper>,
}

impl fmt::Debug for QueryCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("name_mapper", &self.name_mapper.is_some())
            .field("value_mapper", &self.value_mapper.is_some())
            .finish()
    }
}

impl QueryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites every field name before it reaches the sink.
    pub fn with_name_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.name_mapper = Some(Box::new(mapper));
        self
    }

    /// Rewrites literals compared against a field. The mapper receives the
    /// field name as written in the tree, before name mapping.
    pub fn with_value_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str, Literal) -> Literal + Send + Sync + 'static,
    {
        self.value_mapper = Some(Box::new(mapper));
        self
    }

    pub fn compile<'a, S: QuerySink>(
        &self,
        node: impl Into<NodeRef<'a>>,
        sink: &mut S,
    ) -> Result<(), FilterError> {
        let node = node.into();
        let context = node.outer_logic().unwrap_or(Logic::And);
        self.compile_node(node, sink, context, Logic::And)
    }

    pub fn compile_filter<S: QuerySink>(&self, filter: &Filter, sink: &mut S) -> Result<(), FilterError> {
        self.compile(filter, sink)
    }

    pub fn compile_expression_tree<S: QuerySink>(
        &self,
        tree: &ExpressionTree,
        sink: &mut S,
    ) -> Result<(), FilterError> {
        self.compile(tree, sink)
    }

    /// `lead` is the connector for the first call this node emits.
    fn compile_node<S: QuerySink>(
        &self,
        node: NodeRef<'_>,
        sink: &mut S,
        context: Logic,
        lead: Logic,
    ) -> Result<(), FilterError> {
        match node {
            NodeRef::Expression(expression) => self.compile_expression(expression, sink, lead),
            NodeRef::Tree(tree) => self.compile_tree(tree, sink, context, lead),
            NodeRef::Filter(filter) => self.compile_sections(filter, sink, context, lead),
        }
    }

    fn compile_sections<S: QuerySink>(
        &self,
        filter: &Filter,
        sink: &mut S,
        context: Logic,
        lead: Logic,
    ) -> Result<(), FilterError> {
        let sections = filter.sections();
        let parent = if sections.len() > 1 { Logic::And } else { context };

        for (index, section) in sections.into_iter().enumerate() {
            let connector = if index == 0 { lead } else { Logic::And };
            self.compile_term(NodeRef::Tree(section), section.outer_logic(), parent, sink, connector)?;
        }
        Ok(())
    }

    fn compile_tree<S: QuerySink>(
        &self,
        tree: &ExpressionTree,
        sink: &mut S,
        context: Logic,
        lead: Logic,
    ) -> Result<(), FilterError> {
        let live: Vec<&Node> = tree.children().iter().filter(|c| !c.is_empty()).collect();
        let parent = if live.len() > 1 {
            tree.logic()
                .ok_or(FilterError::MissingLogicForFold(live.len()))?
        } else {
            context
        };

        for (index, child) in live.into_iter().enumerate() {
            let connector = if index == 0 { lead } else { parent };
            self.compile_term(child.into(), child.outer_logic(), parent, sink, connector)?;
        }
        Ok(())
    }

    fn compile_term<S: QuerySink>(
        &self,
        node: NodeRef<'_>,
        outer: Option<Logic>,
        parent: Logic,
        sink: &mut S,
        connector: Logic,
    ) -> Result<(), FilterError> {
        let context = outer.unwrap_or(parent);
        if needs_group(outer, parent) {
            tracing::debug!(%connector, logic = %context, "nested scope opened");
            sink.where_nested(connector, |nested| {
                self.compile_node(node, nested, context, connector)
            })
        } else {
            self.compile_node(node, sink, context, connector)
        }
    }

    fn compile_expression<S: QuerySink>(
        &self,
        expression: &Expression,
        sink: &mut S,
        connector: Logic,
    ) -> Result<(), FilterError> {
        let operator = expression.operator();
        let (left, right) = self.ensure_operands(expression);

        let compare = |op: CompOp, right: Option<Operand>, sink: &mut S| -> Result<(), FilterError> {
            let right = right.ok_or(FilterError::InvalidOperand {
                operator,
                reason: "a missing right operand",
            })?;
            sink.where_compare(left.clone(), op, right, connector)
        };

        match operator {
            Operator::Eq => compare(CompOp::Eq, right, sink),
            Operator::NotEq => compare(CompOp::NotEq, right, sink),
            Operator::Gt => compare(CompOp::Gt, right, sink),
            Operator::Gte => compare(CompOp::Gte, right, sink),
            Operator::Lt => compare(CompOp::Lt, right, sink),
            Operator::Lte => compare(CompOp::Lte, right, sink),
            Operator::In | Operator::NotIn => {
                let values = match right {
                    Some(Operand::Literal(Literal::List(values))) => values,
                    Some(Operand::Literal(value)) => vec![value],
                    Some(Operand::Identifier(_)) => {
                        return Err(FilterError::InvalidOperand {
                            operator,
                            reason: "a field reference",
                        })
                    }
                    None => {
                        return Err(FilterError::InvalidOperand {
                            operator,
                            reason: "a missing right operand",
                        })
                    }
                };
                sink.where_in(left.clone(), values, connector, operator == Operator::NotIn)
            }
            Operator::IsNull => sink.where_null(left.clone(), connector, false),
            Operator::NotNull => sink.where_null(left.clone(), connector, true),
            Operator::Contain | Operator::StartWith | Operator::EndWith => {
                let text = pattern_text(operator, right)?;
                let pattern = match operator {
                    Operator::Contain => format!("%{}%", text),
                    Operator::StartWith => format!("{}%", text),
                    _ => format!("%{}", text),
                };
                compare(CompOp::Like, Some(Literal::String(pattern).into()), sink)
            }
        }
    }

    /// Resolves both sides of an expression the way the sink will see them.
    ///
    /// Field references go through the name mapper. Literals go through the
    /// value mapper when the other side is a field.
    pub fn ensure_operands(&self, expression: &Expression) -> (Operand, Option<Operand>) {
        let left_field = expression.left().as_identifier().map(Identifier::name);
        let right_field = expression
            .right()
            .and_then(Operand::as_identifier)
            .map(Identifier::name);

        let left = self.resolve(expression.left(), right_field);
        let right = expression.right().map(|r| self.resolve(r, left_field));
        (left, right)
    }

    fn resolve(&self, operand: &Operand, other_field: Option<&str>) -> Operand {
        match operand {
            Operand::Identifier(id) => match &self.name_mapper {
                Some(mapper) => Identifier::new(mapper(id.name())).into(),
                None => id.clone().into(),
            },
            Operand::Literal(literal) => match (&self.value_mapper, other_field) {
                (Some(mapper), Some(field)) => mapper(field, literal.clone()).into(),
                _ => literal.clone().into(),
            },
        }
    }
}

fn pattern_text(operator: Operator, right: Option<Operand>) -> Result<String, FilterError> {
    match right {
        Some(Operand::Literal(Literal::String(text))) => Ok(text),
        Some(Operand::Literal(Literal::Int(v))) => Ok(v.to_string()),
        Some(Operand::Literal(Literal::Float(v))) => Ok(v.to_string()),
        Some(Operand::Literal(Literal::Bool(v))) => Ok(v.to_string()),
        Some(Operand::Identifier(id)) => Ok(id.0),
        Some(Operand::Literal(Literal::Null)) => Err(FilterError::InvalidOperand {
            operator,
            reason: "a null pattern",
        }),
        Some(Operand::Literal(Literal::List(_))) => Err(FilterError::InvalidOperand {
            operator,
            reason: "a list pattern",
        }),
        None => Err(FilterError::InvalidOperand {
            operator,
            reason: "a missing right operand",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, ConditionBuilder};
    use crate::explainer::Explainer;
    use crate::expr;

    /// Records every call as one line; nested scopes are bracketed.
    #[derive(Debug, Default)]
    struct RecordingSink {
        calls: Vec<String>,
    }

    fn show(operand: &Operand) -> String {
        Explainer::new().operand_to_string(operand)
    }

    impl QuerySink for RecordingSink {
        fn where_compare(
            &mut self,
            left: Operand,
            op: CompOp,
            right: Operand,
            connector: Logic,
        ) -> Result<(), FilterError> {
            self.calls
                .push(format!("{} {} {} {}", connector, show(&left), op, show(&right)));
            Ok(())
        }

        fn where_in(
            &mut self,
            field: Operand,
            values: Vec<Literal>,
            connector: Logic,
            negate: bool,
        ) -> Result<(), FilterError> {
            let op = if negate { "not in" } else { "in" };
            let values = show(&Literal::List(values).into());
            self.calls
                .push(format!("{} {} {} [{}]", connector, show(&field), op, values));
            Ok(())
        }

        fn where_null(
            &mut self,
            field: Operand,
            connector: Logic,
            negate: bool,
        ) -> Result<(), FilterError> {
            let op = if negate { "is not null" } else { "is null" };
            self.calls.push(format!("{} {} {}", connector, show(&field), op));
            Ok(())
        }

        fn where_nested<F>(&mut self, connector: Logic, body: F) -> Result<(), FilterError>
        where
            F: FnOnce(&mut Self) -> Result<(), FilterError>,
        {
            self.calls.push(format!("{} (", connector));
            body(self)?;
            self.calls.push(")".to_string());
            Ok(())
        }
    }

    fn record<'a>(compiler: &QueryCompiler, node: impl Into<NodeRef<'a>>) -> Vec<String> {
        let mut sink = RecordingSink::default();
        compiler.compile(node, &mut sink).unwrap();
        sink.calls
    }

    #[test]
    fn test_flat_and() {
        let mut c = Condition::new();
        c.where_eq("foo", "a").unwrap().where_eq("bar", "b").unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &c),
            vec![r#"and foo = "a""#, r#"and bar = "b""#]
        );
    }

    #[test]
    fn test_operator_mapping() {
        let mut c = Condition::new();
        c.not_equal("a", 1)
            .unwrap()
            .greater_equal("b", 2)
            .unwrap()
            .not_in("c", [1, 2])
            .unwrap()
            .not_null("d")
            .unwrap()
            .contain("e", "x")
            .unwrap()
            .start_with("f", "y")
            .unwrap()
            .end_with("g", "z")
            .unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &c),
            vec![
                "and a <> 1",
                "and b >= 2",
                "and c not in [1,2]",
                "and d is not null",
                r#"and e like "%x%""#,
                r#"and f like "y%""#,
                r#"and g like "%z""#,
            ]
        );
    }

    #[test]
    fn test_like_uses_group_connector() {
        let mut c = Condition::new();
        c.contain("a", "x").unwrap().or_start_with("b", "y").unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &c),
            vec![r#"and a like "%x%""#, r#"or b like "y%""#]
        );
    }

    #[test]
    fn test_nested_scope_for_different_connector() {
        let mut c = Condition::new();
        c.where_eq("foo", "a")
            .unwrap()
            .where_group(|g| {
                g.where_eq("bar", "b")?.or_where_eq("baz", "c")?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &c),
            vec![
                r#"and foo = "a""#,
                "and (",
                r#"and bar = "b""#,
                r#"or baz = "c""#,
                ")",
            ]
        );
    }

    #[test]
    fn test_same_connector_group_is_inlined() {
        let mut c = Condition::new();
        c.where_eq("a", 1)
            .unwrap()
            .or(|g| {
                g.where_eq("b", 2)?.or_where_eq("c", 3)?;
                Ok(())
            })
            .unwrap();
        // the inlined group's first term takes the connector of its position
        assert_eq!(
            record(&QueryCompiler::new(), &c),
            vec!["and a = 1", "or b = 2", "or c = 3"]
        );
    }

    #[test]
    fn test_nested_scope_takes_position_connector() {
        let mut c = Condition::new();
        c.where_eq("a", 1)
            .unwrap()
            .or(|g| {
                g.where_eq("b", 2)?.where_eq("c", 3)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &c),
            vec!["and a = 1", "or (", "or b = 2", "and c = 3", ")"]
        );
    }

    #[test]
    fn test_filter_sections_are_anded() {
        let mut filter = Filter::new();
        filter.set("foo", "a").unwrap();
        filter.or_where_eq("bar", "b").unwrap().or_where_eq("baz", "c").unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &filter),
            vec![
                r#"and foo = "a""#,
                "and (",
                r#"and bar = "b""#,
                r#"or baz = "c""#,
                ")",
            ]
        );
    }

    #[test]
    fn test_or_constraint_opens_nested_scope() {
        let mut filter = Filter::new();
        filter.field("s").unwrap().equal(1).unwrap().or_equal(2).unwrap();
        filter.set("t", 3).unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &filter),
            vec!["and (", "and s = 1", "or s = 2", ")", "and t = 3"]
        );

        let mut filter = Filter::new();
        filter.set("t", 3).unwrap();
        filter.field("s").unwrap().equal(1).unwrap().or_equal(2).unwrap();
        assert_eq!(
            record(&QueryCompiler::new(), &filter),
            vec!["and t = 3", "and (", "and s = 1", "or s = 2", ")"]
        );
    }

    #[test]
    fn test_empty_filter_issues_no_calls() {
        let mut filter = Filter::new();
        filter.field("foo").unwrap();
        filter
            .where_group(|f| {
                f.where_group(|_| Ok(()))?;
                Ok(())
            })
            .unwrap();
        assert!(record(&QueryCompiler::new(), &filter).is_empty());
        assert!(record(&QueryCompiler::new(), &Filter::new()).is_empty());
    }

    #[test]
    fn test_mappers() {
        let compiler = QueryCompiler::new()
            .with_name_mapper(|name| format!("t_{}", name))
            .with_value_mapper(|field, value| match (field, value) {
                ("status", Literal::String(s)) => Literal::String(s.to_uppercase()),
                (_, value) => value,
            });

        let mut c = Condition::new();
        c.where_eq("status", "open")
            .unwrap()
            .where_eq("other", "open")
            .unwrap()
            .where_("a", "=", Identifier::new("b"))
            .unwrap()
            .push(
                Expression::new(
                    Literal::from("closed").into(),
                    Operator::Lt,
                    Some(Identifier::new("status").into()),
                ),
                Logic::And,
            )
            .unwrap();
        assert_eq!(
            record(&compiler, &c),
            vec![
                r#"and t_status = "OPEN""#,
                r#"and t_other = "open""#,
                "and t_a = t_b",
                r#"and "CLOSED" < t_status"#,
            ]
        );
    }

    #[test]
    fn test_ensure_operands_keeps_literal_pairs() {
        let compiler = QueryCompiler::new().with_value_mapper(|_, _| Literal::Null);
        let expression = Expression::new(
            Literal::Int(1).into(),
            Operator::Eq,
            Some(Literal::Int(1).into()),
        );
        let (left, right) = compiler.ensure_operands(&expression);
        assert_eq!(left, Operand::Literal(Literal::Int(1)));
        assert_eq!(right, Some(Operand::Literal(Literal::Int(1))));
    }

    #[test]
    fn test_scalar_in_becomes_single_item_list() {
        let expression = expr::make("a", "in", 5).unwrap();
        assert_eq!(record(&QueryCompiler::new(), &expression), vec!["and a in [5]"]);
    }

    #[test]
    fn test_field_reference_in_list_is_rejected() {
        let expression = expr::make("a", "in", Identifier::new("b")).unwrap();
        let mut sink = RecordingSink::default();
        let err = QueryCompiler::new().compile(&expression, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            FilterError::InvalidOperand {
                operator: Operator::In,
                ..
            }
        ));
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_compiling_twice_is_stable() {
        let mut c = Condition::new();
        c.where_eq("a", 1)
            .unwrap()
            .or(|g| {
                g.where_eq("b", 2)?.where_eq("c", 3)?;
                Ok(())
            })
            .unwrap();
        let compiler = QueryCompiler::new();
        assert_eq!(record(&compiler, &c), record(&compiler, &c));
    }
}
