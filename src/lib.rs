//! Composable filter blocks: build AND/OR condition trees with named per-field
//! constraints, then render them as text or drive a query builder with them.
//!
//! ```
//! use filter_blocks::prelude::*;
//!
//! let mut filter = Filter::new();
//! filter.set("foo", "a")?;
//! filter.where_eq("bar", "b")?.or_where_eq("baz", "c")?;
//! assert_eq!(filter.explain()?, r#"foo = "a" and (bar = "b" or baz = "c")"#);
//! # Ok::<(), filter_blocks::FilterError>(())
//! ```

pub mod ast;
pub mod condition;
pub mod config;
pub mod constraint;
pub mod error;
pub mod explainer;
pub mod expr;
pub mod filter;
pub mod query_compiler;
pub mod sql_compiler;
pub mod tree;

pub use error::{FilterError, Result};

pub mod prelude {
    pub use crate::ast::{Expression, Identifier, IntoOperator, Literal, Logic, Operand, Operator};
    pub use crate::condition::{Condition, ConditionBuilder};
    pub use crate::config::{CompilerConfig, ConfigError, Dialect};
    pub use crate::constraint::Constraint;
    pub use crate::error::FilterError;
    pub use crate::explainer::Explainer;
    pub use crate::expr;
    pub use crate::filter::Filter;
    pub use crate::query_compiler::{CompOp, QueryCompiler, QuerySink};
    pub use crate::sql_compiler::{SeaQuerySink, SqlCompiler};
    pub use crate::tree::{ExpressionTree, Node, NodeRef};
}
