//! The condition tree.
//!
//! A [`Filter`] owns an arena of [`Node`]s and the id of its root [`Group`].
//! Builder calls never hand out node references; they append to the root and,
//! when the logic changes mid-chain, allocate a new root above the old one.
//!
//! # Building
//!
//! ```
//! use sift_filter::{Filter, Op};
//!
//! let filter = Filter::new()
//!     .and("Age", Op::Gte, 18)?
//!     .and_group(|g| g.or("Name", Op::Contains, "Jo")?.or("Name", Op::Contains, "Ann"))?;
//!
//! assert_eq!(
//!     filter.to_string(),
//!     r#"[Age] GTE 18 AND ([Name] CONTAINS "Jo" OR [Name] CONTAINS "Ann")"#
//! );
//! # Ok::<(), sift_filter::FilterError>(())
//! ```
//!
//! # Switching logic
//!
//! Same-logic calls flatten into one group. Switching logic with two or more
//! accumulated children nests them, left-associatively:
//!
//! ```
//! use sift_filter::{Filter, Op};
//!
//! let filter = Filter::new()
//!     .and("A", Op::Eq, 1)?
//!     .and("B", Op::Eq, 2)?
//!     .or("C", Op::Eq, 3)?;
//!
//! assert_eq!(filter.to_string(), "([A] EQ 1 AND [B] EQ 2) OR [C] EQ 3");
//! # Ok::<(), sift_filter::FilterError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{FilterError, Result, ValidationError};
use crate::op::{Logic, Op};
use crate::value::Value;

/// Maximum number of nested group levels, the root group included.
pub const MAX_DEPTH: usize = 64;

/// Index of a node inside its filter's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single field/operator/value test.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    /// `None` for unary operators and for value operators written without a
    /// literal; such conditions compare against [`Value::Absent`].
    pub value: Option<Value>,
}

impl Condition {
    /// Creates a validated condition.
    ///
    /// Unary operators accept only [`Value::Absent`] (stored as no value).
    pub fn new(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Result<Self> {
        let field = field.into();
        validate_field(&field)?;
        let value = value.into();

        let value = if op.takes_value() {
            validate_value(&value)?;
            Some(value)
        } else if value.is_absent() {
            None
        } else {
            return Err(ValidationError::UnexpectedValue { op: op.as_str() }.into());
        };

        Ok(Condition { field, op, value })
    }

    /// Creates a validated condition with no value.
    pub fn without_value(field: impl Into<String>, op: Op) -> Result<Self> {
        let field = field.into();
        validate_field(&field)?;
        Ok(Condition {
            field,
            op,
            value: None,
        })
    }

    /// Creates a condition from an operator name (case-insensitive).
    pub fn named(field: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self> {
        let op = op.parse::<Op>()?;
        Condition::new(field, op, value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.op.canonical())?;
        if !self.op.takes_value() {
            return Ok(());
        }
        match &self.value {
            Some(value) => write!(f, " {value}"),
            None => write!(f, " {}", Value::Absent),
        }
    }
}

pub(crate) fn validate_field(field: &str) -> std::result::Result<(), ValidationError> {
    if field.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: "field names must not be empty",
        });
    }
    if field.contains(['[', ']']) {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: "field names must not contain '[' or ']'",
        });
    }
    Ok(())
}

pub(crate) fn validate_value(value: &Value) -> std::result::Result<(), ValidationError> {
    match value {
        Value::Number(n) if !n.to_f64().is_finite() => Err(ValidationError::NonFiniteNumber {
            value: n.to_string(),
        }),
        Value::Array(items) => items.iter().try_for_each(|item| match item {
            Value::Array(_) => Err(ValidationError::NestedArray),
            item => validate_value(item),
        }),
        _ => Ok(()),
    }
}

/// A logic-joined list of children.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub logic: Logic,
    pub children: Vec<NodeId>,
}

/// An arena node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(Group),
    Condition(Condition),
}

/// Something that can be appended to a filter.
#[derive(Debug, Clone)]
pub enum Item {
    Condition(Condition),
    /// A whole filter, appended as a nested group.
    Group(Filter),
}

impl From<Condition> for Item {
    fn from(condition: Condition) -> Self {
        Item::Condition(condition)
    }
}

impl From<Filter> for Item {
    fn from(filter: Filter) -> Self {
        Item::Group(filter)
    }
}

/// A boolean condition tree.
///
/// An empty filter (no root, or an empty root group) matches every record.
/// Equality is structural: two filters are equal when their trees have the
/// same shape, logic and conditions, regardless of arena layout.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    // Group levels under the live root, kept current by every mutation.
    depth: usize,
}

impl Filter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses canonical filter text.
    pub fn parse(text: &str) -> Result<Self> {
        crate::parser::parse(text)
    }

    /// Returns `true` if the filter has no conditions at all.
    pub fn is_empty(&self) -> bool {
        self.live_root().is_none()
    }

    /// Id of the root group, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Logic of the root group.
    pub fn logic(&self) -> Option<Logic> {
        self.root.and_then(|id| self.group(id)).map(|g| g.logic)
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Looks up a group node.
    pub fn group(&self, id: NodeId) -> Option<&Group> {
        match self.node(id) {
            Some(Node::Group(group)) => Some(group),
            _ => None,
        }
    }

    /// Every condition in the tree, depth-first, left to right.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_conditions(root, &mut out);
        }
        out
    }

    fn collect_conditions<'a>(&'a self, id: NodeId, out: &mut Vec<&'a Condition>) {
        match self.node(id) {
            Some(Node::Condition(c)) => out.push(c),
            Some(Node::Group(g)) => {
                for &child in &g.children {
                    self.collect_conditions(child, out);
                }
            }
            None => {}
        }
    }

    /// Number of nested group levels; 0 for an empty filter.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn node_depth(&self, id: NodeId) -> usize {
        match self.node(id) {
            Some(Node::Group(g)) => {
                1 + g
                    .children
                    .iter()
                    .map(|&c| self.node_depth(c))
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Appends a condition or nested filter under `logic`.
    ///
    /// Appending an empty nested filter leaves this filter unchanged.
    pub fn add(mut self, logic: Logic, item: impl Into<Item>) -> Result<Self> {
        let (child, child_depth) = match item.into() {
            Item::Condition(condition) => (self.alloc(Node::Condition(condition)), 0),
            Item::Group(nested) => {
                let nested_depth = nested.depth;
                match self.graft(nested) {
                    Some(id) => (id, nested_depth),
                    None => return Ok(self),
                }
            }
        };
        self.push(logic, child, child_depth);

        if self.depth > MAX_DEPTH {
            return Err(ValidationError::TooDeep { max: MAX_DEPTH }.into());
        }
        Ok(self)
    }

    /// Appends `[field] op value` under AND.
    ///
    /// Pass [`Value::Absent`] for unary operators.
    pub fn and(self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Result<Self> {
        let condition = Condition::new(field, op, value)?;
        self.add(Logic::And, condition)
    }

    /// Appends `[field] op value` under OR.
    pub fn or(self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Result<Self> {
        let condition = Condition::new(field, op, value)?;
        self.add(Logic::Or, condition)
    }

    /// Appends a condition given by operator name; unknown names are rejected.
    pub fn add_named(
        self,
        logic: Logic,
        field: impl Into<String>,
        op: &str,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let condition = Condition::named(field, op, value)?;
        self.add(logic, condition)
    }

    /// Builds a nested filter with `build` and appends it under AND.
    pub fn and_group<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(Filter) -> Result<Filter>,
    {
        let nested = build(Filter::new())?;
        self.add(Logic::And, nested)
    }

    /// Builds a nested filter with `build` and appends it under OR.
    pub fn or_group<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(Filter) -> Result<Filter>,
    {
        let nested = build(Filter::new())?;
        self.add(Logic::Or, nested)
    }

    /// Parses `text` and appends it as a nested group under `logic`.
    pub fn add_text(self, logic: Logic, text: &str) -> Result<Self> {
        let nested = Filter::parse(text)?;
        self.add(logic, nested)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn alloc_group(&mut self, logic: Logic) -> NodeId {
        self.alloc(Node::Group(Group {
            logic,
            children: Vec::new(),
        }))
    }

    pub(crate) fn alloc_condition(&mut self, condition: Condition) -> NodeId {
        self.alloc(Node::Condition(condition))
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(Node::Group(group)) = self.nodes.get_mut(parent.0) {
            group.children.push(child);
        }
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
        self.depth = self.live_root().map_or(0, |root| self.node_depth(root));
    }

    /// Root id, ignoring an empty root group.
    fn live_root(&self) -> Option<NodeId> {
        let root = self.root?;
        match self.group(root) {
            Some(group) if group.children.is_empty() => None,
            _ => Some(root),
        }
    }

    /// Appends `child` (spanning `child_depth` group levels) to the root under
    /// `logic`, re-rooting on a logic switch.
    fn push(&mut self, logic: Logic, child: NodeId, child_depth: usize) {
        let root = match self.root {
            None => {
                let id = self.alloc_group(logic);
                self.root = Some(id);
                id
            }
            Some(root) => {
                let (current, len) = match self.group(root) {
                    Some(group) => (group.logic, group.children.len()),
                    None => (logic, 0),
                };
                if current == logic {
                    root
                } else if len <= 1 {
                    if let Some(Node::Group(group)) = self.nodes.get_mut(root.0) {
                        group.logic = logic;
                    }
                    root
                } else {
                    let id = self.alloc(Node::Group(Group {
                        logic,
                        children: vec![root],
                    }));
                    self.root = Some(id);
                    self.depth += 1;
                    id
                }
            }
        };
        self.attach(root, child);
        self.depth = self.depth.max(child_depth + 1);
    }

    /// Moves another filter's nodes into this arena and returns its root id.
    fn graft(&mut self, other: Filter) -> Option<NodeId> {
        let root = other.live_root()?;
        let base = self.nodes.len();
        self.nodes.extend(other.nodes.into_iter().map(|node| match node {
            Node::Group(mut group) => {
                for child in &mut group.children {
                    child.0 += base;
                }
                Node::Group(group)
            }
            condition => condition,
        }));
        Some(NodeId(root.0 + base))
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, nested: bool) -> fmt::Result {
        match self.node(id) {
            Some(Node::Condition(condition)) => write!(f, "{condition}"),
            Some(Node::Group(group)) => {
                if nested {
                    f.write_str("(")?;
                }
                for (i, &child) in group.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", group.logic)?;
                    }
                    self.write_node(f, child, true)?;
                }
                if nested {
                    f.write_str(")")?;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn same_node(&self, a: NodeId, other: &Filter, b: NodeId) -> bool {
        match (self.node(a), other.node(b)) {
            (Some(Node::Condition(x)), Some(Node::Condition(y))) => x == y,
            (Some(Node::Group(x)), Some(Node::Group(y))) => {
                x.logic == y.logic
                    && x.children.len() == y.children.len()
                    && x
                        .children
                        .iter()
                        .zip(&y.children)
                        .all(|(&ca, &cb)| self.same_node(ca, other, cb))
            }
            _ => false,
        }
    }
}

/// Canonical text form; an empty filter renders as the empty string.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.live_root() {
            Some(root) => self.write_node(f, root, false),
            None => Ok(()),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        Filter::parse(s)
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (self.live_root(), other.live_root()) {
            (None, None) => true,
            (Some(a), Some(b)) => self.same_node(a, other, b),
            _ => false,
        }
    }
}
