//! Errors raised while building or compiling filter trees.

use thiserror::Error;

use crate::ast::{Logic, Operator};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// AND and OR were mixed inside one group.
    #[error("mixed AND/OR operators in the same group: group joins with `{expected}`, got `{found}`")]
    LogicConflict { expected: Logic, found: Logic },
    #[error("a connector is required for every expression after the first in a group")]
    LogicRequired,
    #[error("field `{0}` is not allowed in this filter")]
    FieldNotAllowed(String),
    #[error("constraint for `{found}` cannot be assigned to field `{expected}`")]
    InconsistentName { expected: String, found: String },
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),
    #[error("operator `{operator}` cannot take {reason}")]
    InvalidOperand {
        operator: Operator,
        reason: &'static str,
    },
    /// A group holds several terms but never had its connector fixed.
    /// `append` makes this unreachable, so seeing it means the tree was corrupted.
    #[error("group joins {0} terms without a connector")]
    MissingLogicForFold(usize),
}

pub type Result<T, E = FilterError> = std::result::Result<T, E>;
