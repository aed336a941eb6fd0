//! Structured tree form of a filter.
//!
//! ```json
//! {
//!   "logic": "and",
//!   "filters": [
//!     { "field": "Age", "op": "gte", "value": 18 },
//!     { "logic": "or", "filters": [
//!       { "field": "Name", "op": "contains", "value": "Jo" },
//!       { "field": "Email", "op": "isnull" }
//!     ]}
//!   ]
//! }
//! ```
//!
//! `Filter` serializes to this form. It deserializes from either this form or
//! a canonical text string, so option payloads may carry whichever is handier.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

use crate::error::{Result, ValidationError};
use crate::filter::{validate_field, validate_value, Condition, Filter, Node, NodeId, MAX_DEPTH};
use crate::op::{Logic, Op};
use crate::value::Value;

impl Filter {
    /// Builds a filter from its structured tree form.
    ///
    /// The top-level object must be a group. Nested empty groups are rejected
    /// since they have no text form.
    pub fn from_tree(tree: &Json) -> Result<Self> {
        let object = tree.as_object().ok_or_else(|| malformed("expected a group object"))?;
        if !object.contains_key("logic") && !object.contains_key("filters") {
            return Err(malformed("expected a group object with 'logic' and 'filters'").into());
        }

        let mut filter = Filter::new();
        let root = build_group(&mut filter, object, 1)?;
        filter.set_root(root);
        Ok(filter)
    }

    /// Renders the structured tree form.
    ///
    /// An empty filter renders as an AND group with no children.
    pub fn to_tree(&self) -> Json {
        match self.root() {
            Some(root) => self.node_tree(root),
            None => serde_json::json!({ "logic": Logic::And.as_str(), "filters": [] }),
        }
    }

    /// Appends a condition or group given as a tree object under `logic`.
    ///
    /// A leaf object (`{"field", "op", "value"?}`) becomes a condition; a group
    /// object becomes a nested group.
    pub fn add_tree(self, logic: Logic, tree: &Json) -> Result<Self> {
        let object = tree
            .as_object()
            .ok_or_else(|| malformed("expected a condition or group object"))?;
        if object.contains_key("field") {
            let condition = build_condition(object)?;
            self.add(logic, condition)
        } else {
            let nested = Filter::from_tree(tree)?;
            self.add(logic, nested)
        }
    }

    fn node_tree(&self, id: NodeId) -> Json {
        match self.node(id) {
            Some(Node::Condition(condition)) => condition_tree(condition),
            Some(Node::Group(group)) => serde_json::json!({
                "logic": group.logic.as_str(),
                "filters": group
                    .children
                    .iter()
                    .map(|&child| self.node_tree(child))
                    .collect::<Vec<_>>(),
            }),
            None => Json::Null,
        }
    }
}

fn condition_tree(condition: &Condition) -> Json {
    let mut object = Map::new();
    object.insert("field".into(), Json::String(condition.field.clone()));
    object.insert("op".into(), Json::String(condition.op.as_str().into()));
    match &condition.value {
        Some(value) if !value.is_absent() => {
            object.insert("value".into(), value.to_json());
        }
        _ => {}
    }
    Json::Object(object)
}

fn malformed(reason: &str) -> ValidationError {
    ValidationError::MalformedTree {
        reason: reason.to_string(),
    }
}

fn build_group(filter: &mut Filter, object: &Map<String, Json>, depth: usize) -> Result<NodeId> {
    if depth > MAX_DEPTH {
        return Err(ValidationError::TooDeep { max: MAX_DEPTH }.into());
    }

    let logic = match object.get("logic") {
        None | Some(Json::Null) => Logic::And,
        Some(Json::String(name)) => name.parse::<Logic>()?,
        Some(_) => return Err(malformed("'logic' must be a string").into()),
    };
    let children = match object.get("filters") {
        None | Some(Json::Null) => &[][..],
        Some(Json::Array(items)) => items.as_slice(),
        Some(_) => return Err(malformed("'filters' must be an array").into()),
    };

    let group = filter.alloc_group(logic);
    for child in children {
        let child = child
            .as_object()
            .ok_or_else(|| malformed("each entry of 'filters' must be an object"))?;
        let id = if child.contains_key("field") {
            let condition = build_condition(child)?;
            filter.alloc_condition(condition)
        } else {
            if child
                .get("filters")
                .and_then(Json::as_array)
                .map_or(true, Vec::is_empty)
            {
                return Err(malformed("nested groups must not be empty").into());
            }
            build_group(filter, child, depth + 1)?
        };
        filter.attach(group, id);
    }
    Ok(group)
}

fn build_condition(object: &Map<String, Json>) -> Result<Condition> {
    let field = match object.get("field") {
        Some(Json::String(field)) => field.clone(),
        _ => return Err(malformed("'field' must be a string").into()),
    };
    validate_field(&field)?;

    let op = match object.get("op") {
        Some(Json::String(name)) => name.parse::<Op>()?,
        _ => return Err(malformed("'op' must be a string").into()),
    };

    let value = match object.get("value") {
        None => None,
        Some(Json::Null) if !op.takes_value() => None,
        Some(json) => {
            if !op.takes_value() {
                return Err(ValidationError::UnexpectedValue { op: op.as_str() }.into());
            }
            let value = Value::from_json(json);
            validate_value(&value)?;
            Some(value)
        }
    };

    Ok(Condition { field, op, value })
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_tree().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Json::deserialize(deserializer)? {
            Json::Null => Ok(Filter::new()),
            Json::String(text) => Filter::parse(&text).map_err(D::Error::custom),
            tree => Filter::from_tree(&tree).map_err(D::Error::custom),
        }
    }
}
