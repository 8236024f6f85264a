//! 表达式树的叶子类型：连接符、运算符、标识符、字面量与单条比较表达式

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// 同组兄弟节点之间的布尔连接符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "and",
            Logic::Or => "or",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,        // =
    NotEq,     // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    In,        // in
    NotIn,     // not in
    IsNull,    // is null
    NotNull,   // not null
    Contain,   // contain
    StartWith, // start with
    EndWith,   // end with
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::NotNull,
        Operator::Contain,
        Operator::StartWith,
        Operator::EndWith,
    ];

    /// 解释输出中使用的固定文本
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::IsNull => "is null",
            Operator::NotNull => "not null",
            Operator::Contain => "contain",
            Operator::StartWith => "start with",
            Operator::EndWith => "end with",
        }
    }

    /// 空值判断不带右操作数
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::NotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    /// 大小写不敏感，同时接受常见的别名写法
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_uppercase();
        let op = match normalized.as_str() {
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "IN" => Operator::In,
            "NOT IN" | "NOT_IN" => Operator::NotIn,
            "IS NULL" | "IS_NULL" | "NULL" => Operator::IsNull,
            "IS NOT NULL" | "IS_NOT_NULL" | "NOT NULL" | "NOT_NULL" => Operator::NotNull,
            "CONTAIN" | "CONTAINS" => Operator::Contain,
            "START WITH" | "START_WITH" => Operator::StartWith,
            "END WITH" | "END_WITH" => Operator::EndWith,
            _ => return Err(FilterError::UnsupportedOperator(input.to_string())),
        };
        Ok(op)
    }
}

/// 可以转换为运算符的参数：运算符本身或其文本写法
pub trait IntoOperator {
    fn into_operator(self) -> Result<Operator, FilterError>;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Result<Operator, FilterError> {
        Ok(self)
    }
}

impl IntoOperator for &str {
    fn into_operator(self) -> Result<Operator, FilterError> {
        self.parse()
    }
}

impl IntoOperator for String {
    fn into_operator(self) -> Result<Operator, FilterError> {
        self.parse()
    }
}

/// 字段引用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// 字面量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// IN / NOT IN 使用的值列表
    List(Vec<Literal>),
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v as i64)
    }
}

impl From<u32> for Literal {
    fn from(v: u32) -> Self {
        Literal::Int(v as i64)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(v: Vec<T>) -> Self {
        Literal::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(v: Option<T>) -> Self {
        v.map_or(Literal::Null, Into::into)
    }
}

/// 表达式的一侧：字段引用或常量
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Identifier(Identifier),
    Literal(Literal),
}

impl Operand {
    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Operand::Identifier(id) => Some(id),
            Operand::Literal(_) => None,
        }
    }
}

impl From<Identifier> for Operand {
    fn from(v: Identifier) -> Self {
        Operand::Identifier(v)
    }
}

impl From<Literal> for Operand {
    fn from(v: Literal) -> Self {
        Operand::Literal(v)
    }
}

/// 非 Identifier/Literal 的值一律包装为 Literal
macro_rules! operand_from_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Literal(Literal::from(v))
                }
            }
        )*
    };
}

operand_from_literal!(bool, i32, u32, i64, f64, &str, String);

impl<T: Into<Literal>> From<Vec<T>> for Operand {
    fn from(v: Vec<T>) -> Self {
        Operand::Literal(Literal::from(v))
    }
}

impl<T: Into<Literal>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::Literal(Literal::from(v))
    }
}

/// 单条比较表达式 `(left, operator, right)`，构造后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    left: Operand,
    operator: Operator,
    /// 仅 IS NULL / NOT NULL 时为空
    right: Option<Operand>,
}

impl Expression {
    pub fn new(left: Operand, operator: Operator, right: Option<Operand>) -> Self {
        let right = if operator.takes_value() { right } else { None };
        Self {
            left,
            operator,
            right,
        }
    }

    pub fn left(&self) -> &Operand {
        &self.left
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn right(&self) -> Option<&Operand> {
        self.right.as_ref()
    }

    /// 表达式两侧引用到的字段名
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        std::iter::once(&self.left)
            .chain(self.right.as_ref())
            .filter_map(Operand::as_identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse_aliases() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!(" not in ".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!("IS_NOT_NULL".parse::<Operator>().unwrap(), Operator::NotNull);
        assert_eq!("contains".parse::<Operator>().unwrap(), Operator::Contain);
        assert_eq!("Start With".parse::<Operator>().unwrap(), Operator::StartWith);
    }

    #[test]
    fn test_operator_parse_unknown() {
        let err = "between".parse::<Operator>().unwrap_err();
        assert_eq!(err, FilterError::UnsupportedOperator("between".to_string()));
    }

    #[test]
    fn test_every_token_parses_back() {
        for op in Operator::ALL {
            assert_eq!(op.token().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(Literal::from(vec![1, 2]), Literal::List(vec![Literal::Int(1), Literal::Int(2)]));
        assert_eq!(Literal::from(Option::<i64>::None), Literal::Null);
        assert_eq!(Operand::from("a"), Operand::Literal(Literal::String("a".to_string())));
        assert_eq!(
            Operand::from(Identifier::new("bar")),
            Operand::Identifier(Identifier("bar".to_string()))
        );
    }

    #[test]
    fn test_literal_from_json() {
        let lit: Literal = serde_json::from_str(r#"[1, 2.5, "x", null, true]"#).unwrap();
        assert_eq!(
            lit,
            Literal::List(vec![
                Literal::Int(1),
                Literal::Float(2.5),
                Literal::String("x".to_string()),
                Literal::Null,
                Literal::Bool(true),
            ])
        );
        assert!(serde_json::from_str::<Literal>(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_null_operators_drop_right_operand() {
        let expr = Expression::new(
            Identifier::new("a").into(),
            Operator::IsNull,
            Some(Literal::Int(1).into()),
        );
        assert!(expr.right().is_none());
        assert_eq!(expr.identifiers().count(), 1);
    }
}
