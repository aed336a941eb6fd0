//! Evaluation of a filter against a record.
//!
//! Groups combine their children with AND/OR and short-circuit; an empty
//! filter matches everything. Conditions resolve their field on the record
//! (missing fields resolve to [`Value::Absent`]) and apply the operator using
//! the loose comparison rules of [`Value`].

use serde::{Deserialize, Serialize};

use crate::filter::{Condition, Filter, Node, NodeId};
use crate::op::{Logic, Op};
use crate::record::Resolve;
use crate::value::Value;

/// Evaluation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvalOptions {
    /// Treat `a.b.c` field names as paths into nested objects and arrays
    /// instead of literal keys.
    pub dotted_paths: bool,
}

/// Applies filters to records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    options: EvalOptions,
}

impl Evaluator {
    pub fn new(options: EvalOptions) -> Self {
        Evaluator { options }
    }

    /// An evaluator that resolves dotted paths.
    pub fn dotted() -> Self {
        Evaluator::new(EvalOptions { dotted_paths: true })
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    /// Returns `true` if `record` satisfies `filter`.
    pub fn matches<R: Resolve + ?Sized>(&self, filter: &Filter, record: &R) -> bool {
        match filter.root() {
            Some(root) => self.node_matches(filter, root, record),
            None => true,
        }
    }

    /// Returns `true` if `record` satisfies a single condition.
    pub fn condition_matches<R: Resolve + ?Sized>(&self, condition: &Condition, record: &R) -> bool {
        let actual = if self.options.dotted_paths {
            record.resolve_path(&condition.field)
        } else {
            record.resolve(&condition.field)
        };
        condition.matches(&actual)
    }

    fn node_matches<R: Resolve + ?Sized>(&self, filter: &Filter, id: NodeId, record: &R) -> bool {
        match filter.node(id) {
            Some(Node::Condition(condition)) => self.condition_matches(condition, record),
            Some(Node::Group(group)) => {
                let mut children = group.children.iter();
                match group.logic {
                    Logic::And => children.all(|&child| self.node_matches(filter, child, record)),
                    Logic::Or => {
                        group.children.is_empty()
                            || children.any(|&child| self.node_matches(filter, child, record))
                    }
                }
            }
            None => true,
        }
    }
}

impl Filter {
    /// Evaluates this filter with default options.
    pub fn matches<R: Resolve + ?Sized>(&self, record: &R) -> bool {
        Evaluator::default().matches(self, record)
    }
}

impl Condition {
    /// Checks whether a resolved field value satisfies this condition.
    pub fn matches(&self, actual: &Value) -> bool {
        let operand = self.value.as_ref().unwrap_or(&Value::Absent);

        match self.op {
            Op::Eq => actual.loose_eq(operand),
            Op::Neq => !actual.loose_eq(operand),

            Op::IsNull => actual.is_nullish(),
            Op::IsNotNull => !actual.is_nullish(),

            Op::Lt | Op::Lte | Op::Gt | Op::Gte => actual
                .loose_cmp(operand)
                .is_some_and(|ordering| self.op.eval_ordering(ordering)),

            Op::StartsWith => actual.to_text().starts_with(&operand.to_text()),
            Op::EndsWith => actual.to_text().ends_with(&operand.to_text()),
            Op::Contains => actual.to_text().contains(&operand.to_text()),
            Op::DoesNotContain => !actual.to_text().contains(&operand.to_text()),

            Op::IsEmpty => actual.is_blank(),
            Op::IsNotEmpty => !actual.is_blank(),

            Op::In => membership(actual, operand).unwrap_or(false),
            Op::Nin => membership(actual, operand).is_some_and(|found| !found),
        }
    }
}

/// Whether `actual` is a member of `operand`; `None` when the operand is
/// neither an array nor a string.
fn membership(actual: &Value, operand: &Value) -> Option<bool> {
    match operand {
        Value::Array(items) => Some(items.iter().any(|item| actual.loose_eq(item))),
        Value::String(haystack) => Some(haystack.contains(&actual.to_text())),
        _ => None,
    }
}
