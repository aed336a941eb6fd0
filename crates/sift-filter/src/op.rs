//! Condition operators and group logic.
//!
//! The [`Op`] enum is the closed operator vocabulary of the filter language.
//! Unknown operator names are rejected when parsing or building a filter, so
//! the evaluator never sees an operator it cannot dispatch.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Comparison operator of a condition.
///
/// Operators are grouped by how they treat their operands:
/// - **Equality**: `Eq`, `Neq` (loose comparison)
/// - **Null checks**: `IsNull`, `IsNotNull`
/// - **Ordering**: `Lt`, `Lte`, `Gt`, `Gte`
/// - **Text**: `StartsWith`, `EndsWith`, `Contains`, `DoesNotContain`
/// - **Emptiness**: `IsEmpty`, `IsNotEmpty`
/// - **Membership**: `In`, `Nin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Neq,
    IsNull,
    IsNotNull,
    Lt,
    Lte,
    Gt,
    Gte,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    IsEmpty,
    IsNotEmpty,
    In,
    Nin,
}

impl Op {
    /// Every operator, in vocabulary order.
    pub const ALL: [Op; 16] = [
        Op::Eq,
        Op::Neq,
        Op::IsNull,
        Op::IsNotNull,
        Op::Lt,
        Op::Lte,
        Op::Gt,
        Op::Gte,
        Op::StartsWith,
        Op::EndsWith,
        Op::Contains,
        Op::DoesNotContain,
        Op::IsEmpty,
        Op::IsNotEmpty,
        Op::In,
        Op::Nin,
    ];

    /// Returns the short token of this operator (lowercase).
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::IsNull => "isnull",
            Op::IsNotNull => "isnotnull",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::StartsWith => "startswith",
            Op::EndsWith => "endswith",
            Op::Contains => "contains",
            Op::DoesNotContain => "doesnotcontain",
            Op::IsEmpty => "isempty",
            Op::IsNotEmpty => "isnotempty",
            Op::In => "in",
            Op::Nin => "nin",
        }
    }

    /// Returns the canonical (upper-case) spelling used in filter text.
    pub fn canonical(self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    /// Returns `true` if this operator compares against a literal value.
    ///
    /// The null and emptiness checks are unary.
    pub fn takes_value(self) -> bool {
        !matches!(
            self,
            Op::IsNull | Op::IsNotNull | Op::IsEmpty | Op::IsNotEmpty
        )
    }

    /// Returns `true` for the ordering operators.
    pub fn is_ordering(self) -> bool {
        matches!(self, Op::Lt | Op::Lte | Op::Gt | Op::Gte)
    }

    /// Returns `true` for operators that compare text renderings.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Op::StartsWith | Op::EndsWith | Op::Contains | Op::DoesNotContain
        )
    }

    /// Evaluates an ordering operator given the ordering of field vs operand.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Neq => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }

    /// Finds the longest operator token that prefixes `input`
    /// (case-insensitively) and ends at a word boundary.
    ///
    /// Returns the operator and the byte length it spans.
    pub fn longest_prefix(input: &str) -> Option<(Op, usize)> {
        Op::ALL
            .iter()
            .filter_map(|op| {
                let token = op.as_str();
                let head = input.get(..token.len())?;
                if !head.eq_ignore_ascii_case(token) {
                    return None;
                }
                let at_boundary = input[token.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
                at_boundary.then_some((*op, token.len()))
            })
            .max_by_key(|(_, len)| *len)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Op::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownOperator { name: s.to_string() })
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// How the children of a group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Logic {
    /// All children must match.
    #[default]
    And,
    /// At least one child must match.
    Or,
}

impl Logic {
    /// Returns the lowercase name used in the structured tree form.
    pub fn as_str(self) -> &'static str {
        match self {
            Logic::And => "and",
            Logic::Or => "or",
        }
    }

    /// Returns the keyword used in filter text.
    pub fn keyword(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }

    /// Recognizes a logic keyword at the start of `input`, case-insensitively,
    /// ending at a word boundary.
    pub fn keyword_prefix(input: &str) -> Option<(Logic, usize)> {
        [Logic::And, Logic::Or].into_iter().find_map(|logic| {
            let kw = logic.keyword();
            let head = input.get(..kw.len())?;
            let at_boundary = input[kw.len()..]
                .chars()
                .next()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
            (head.eq_ignore_ascii_case(kw) && at_boundary).then_some((logic, kw.len()))
        })
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Logic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Logic::And),
            "or" => Ok(Logic::Or),
            _ => Err(ValidationError::UnknownLogic { name: s.to_string() }),
        }
    }
}

impl Serialize for Logic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Logic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
