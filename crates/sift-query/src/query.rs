//! Query builder and executor.
//!
//! The [`Query`] struct provides a fluent builder API for constructing queries
//! and [`Query::execute`] for running them against record collections.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sift_filter::{EvalOptions, Evaluator, Filter, Resolve, Value};
use tracing::debug;

use crate::error::Result;
use crate::ordering::{compare_by_sorts, Dir, Sort};

/// A record: a JSON object keyed by field name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The outcome of executing a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Matching records after paging and projection. Empty for count queries.
    pub items: Vec<Record>,
    /// Number of matches after filtering and distinct, before paging.
    pub total: usize,
    /// Number of matches after paging.
    pub returned: usize,
}

/// A query over a record collection.
///
/// Execution runs a fixed pipeline:
///
/// ```text
/// filter → distinct → sort → total → skip/take → count | projection
/// ```
///
/// Queries deserialize from the options object accepted by
/// [`Engine::handle`](crate::Engine::handle); the `where` key holds either
/// canonical filter text or the structured tree form.
///
/// # Example
///
/// ```
/// use sift_query::{Dir, Query};
///
/// let query = Query::new()
///     .where_text("[Age] GTE 18")?
///     .order_by("Age", Dir::Desc)
///     .order_asc("Name")
///     .skip(10)
///     .take(20)
///     .select(["Name", "Age"])
///     .build();
/// # Ok::<(), sift_query::QueryError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Query {
    #[serde(rename = "where", alias = "filter")]
    filter: Filter,
    distinct: bool,
    sorts: Vec<Sort>,
    skip: Option<i64>,
    take: Option<i64>,
    count: bool,
    properties: Option<Vec<String>>,
    #[serde(alias = "dotted_paths")]
    dotted_paths: bool,
}

impl Query {
    /// Creates a new empty query.
    ///
    /// An empty query returns every record in its original order.
    pub fn new() -> Self {
        Query::default()
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    /// Sets the filter records must match.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Parses filter text and sets it as the filter.
    pub fn where_text(self, text: &str) -> Result<Self> {
        let filter = Filter::parse(text)?;
        Ok(self.filter(filter))
    }

    /// Removes structurally identical records, keeping the first of each.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Resolves filter and sort fields as dotted paths into nested objects.
    pub fn dotted_paths(mut self, enabled: bool) -> Self {
        self.dotted_paths = enabled;
        self
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Adds a sort key.
    pub fn order_by(mut self, field: &str, dir: Dir) -> Self {
        self.sorts.push(Sort::new(field, dir));
        self
    }

    /// Adds an ascending sort key.
    pub fn order_asc(self, field: &str) -> Self {
        self.order_by(field, Dir::Asc)
    }

    /// Adds a descending sort key.
    pub fn order_desc(self, field: &str) -> Self {
        self.order_by(field, Dir::Desc)
    }

    // ========================================================================
    // Paging
    // ========================================================================

    /// Sets the number of matches to skip. Non-positive values skip nothing.
    pub fn skip(mut self, n: i64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Sets the maximum number of matches to return. Non-positive values
    /// leave the result unbounded.
    pub fn take(mut self, n: i64) -> Self {
        self.take = Some(n);
        self
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Returns only the counts, with no items.
    pub fn count_only(mut self) -> Self {
        self.count = true;
        self
    }

    /// Keeps only the named top-level fields in returned records.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Finalizes the query.
    pub fn build(self) -> Self {
        self
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Returns the filter.
    pub fn get_filter(&self) -> &Filter {
        &self.filter
    }

    /// Returns `true` if duplicates are removed.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Returns the sort keys.
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    /// Returns the skip count, if set.
    pub fn get_skip(&self) -> Option<i64> {
        self.skip
    }

    /// Returns the take count, if set.
    pub fn get_take(&self) -> Option<i64> {
        self.take
    }

    /// Returns `true` if this is a count-only query.
    pub fn is_count_only(&self) -> bool {
        self.count
    }

    /// Returns the projected fields, if set.
    pub fn properties(&self) -> Option<&[String]> {
        self.properties.as_deref()
    }

    /// Returns the evaluation options derived from this query.
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            dotted_paths: self.dotted_paths,
        }
    }

    /// Returns `true` if this query has no filter (matches everything).
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Tests if a single record matches this query's filter.
    pub fn matches(&self, record: &Record) -> bool {
        Evaluator::new(self.eval_options()).matches(&self.filter, record)
    }

    /// Runs the query against a collection.
    ///
    /// Returned items are copies; the collection is never modified.
    pub fn execute(&self, records: &[Record]) -> QueryResult {
        let evaluator = Evaluator::new(self.eval_options());

        let mut items: Vec<Record> = records
            .iter()
            .filter(|record| evaluator.matches(&self.filter, *record))
            .cloned()
            .collect();
        let matched = items.len();

        if self.distinct {
            items = dedupe(items);
        }

        if !self.sorts.is_empty() && !self.count {
            items = self.sorted(items);
        }

        let total = items.len();

        let skip = positive(self.skip).unwrap_or(0);
        if skip > 0 {
            items.drain(..skip.min(items.len()));
        }
        if let Some(take) = positive(self.take) {
            items.truncate(take);
        }

        let returned = items.len();

        if self.count {
            items.clear();
        } else if let Some(properties) = &self.properties {
            for item in &mut items {
                item.retain(|key, _| properties.iter().any(|p| p == key));
            }
        }

        debug!(
            candidates = records.len(),
            matched,
            total,
            returned,
            count_only = self.count,
            "executed query"
        );

        QueryResult {
            items,
            total,
            returned,
        }
    }

    /// Stable sort by the query's keys, resolving each key once per record.
    fn sorted(&self, items: Vec<Record>) -> Vec<Record> {
        let mut keyed: Vec<(Vec<Value>, Record)> = items
            .into_iter()
            .map(|record| {
                let keys = self
                    .sorts
                    .iter()
                    .map(|sort| self.resolve(&record, &sort.field))
                    .collect();
                (keys, record)
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| compare_by_sorts(a, b, &self.sorts));
        keyed.into_iter().map(|(_, record)| record).collect()
    }

    fn resolve(&self, record: &Record, field: &str) -> Value {
        if self.dotted_paths {
            record.resolve_path(field)
        } else {
            record.resolve(field)
        }
    }
}

/// Keeps the first of each structurally identical record.
///
/// Numbers compare by value, so `1` and `1.0` are the same.
fn dedupe(items: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|record| {
            let key = normalize(&Json::Object(record.clone()));
            match serde_json::to_string(&key) {
                Ok(key) => seen.insert(key),
                Err(_) => true,
            }
        })
        .collect()
}

/// Rewrites integral floats as integers, recursively.
fn normalize(value: &Json) -> Json {
    const I64_MIN: f64 = -9_223_372_036_854_775_808.0;
    const U64_END: f64 = 18_446_744_073_709_551_616.0;

    match value {
        Json::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && (I64_MIN..-I64_MIN).contains(&f) => {
                Json::from(f as i64)
            }
            Some(f) if f.fract() == 0.0 && (0.0..U64_END).contains(&f) => Json::from(f as u64),
            _ => value.clone(),
        },
        Json::Array(items) => Json::Array(items.iter().map(normalize).collect()),
        Json::Object(map) => Json::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), normalize(value)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn positive(n: Option<i64>) -> Option<usize> {
    n.filter(|n| *n > 0)
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: serde_json::Value) -> Vec<Record> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn people() -> Vec<Record> {
        records(json!([
            {"Name": "John", "Age": 31, "Team": "red"},
            {"Name": "Annie", "Age": 17, "Team": "blue"},
            {"Name": "Bob", "Age": 40, "Team": "red"},
            {"Name": "Cara", "Age": 31, "Team": "blue"},
        ]))
    }

    fn names(result: &QueryResult) -> Vec<&str> {
        result
            .items
            .iter()
            .filter_map(|r| r.get("Name").and_then(|n| n.as_str()))
            .collect()
    }

    #[test]
    fn empty_query_returns_everything() {
        let result = Query::new().execute(&people());
        assert_eq!(names(&result), ["John", "Annie", "Bob", "Cara"]);
        assert_eq!(result.total, 4);
        assert_eq!(result.returned, 4);
    }

    #[test]
    fn builder_sets_options() {
        let query = Query::new()
            .distinct()
            .order_desc("Age")
            .skip(1)
            .take(2)
            .count_only()
            .select(["Name"])
            .dotted_paths(true)
            .build();

        assert!(query.is_distinct());
        assert_eq!(query.sorts(), &[Sort::desc("Age")]);
        assert_eq!(query.get_skip(), Some(1));
        assert_eq!(query.get_take(), Some(2));
        assert!(query.is_count_only());
        assert_eq!(query.properties(), Some(&["Name".to_string()][..]));
        assert!(query.eval_options().dotted_paths);
        assert!(query.is_empty());
    }

    #[test]
    fn where_text_reports_syntax_errors() {
        let err = Query::new().where_text("[Age] GTE").unwrap_err();
        assert!(matches!(err, crate::QueryError::Filter(_)));
    }

    #[test]
    fn filters_records() {
        let query = Query::new().where_text("[Team] EQ red").unwrap();
        let result = query.execute(&people());
        assert_eq!(names(&result), ["John", "Bob"]);
        assert!(query.matches(&people()[0]));
        assert!(!query.matches(&people()[1]));
    }

    #[test]
    fn sorts_stably_by_composite_keys() {
        let result = Query::new().order_desc("Age").execute(&people());
        // John and Cara tie on Age and keep their relative order
        assert_eq!(names(&result), ["Bob", "John", "Cara", "Annie"]);

        let result = Query::new()
            .order_asc("Team")
            .order_desc("Name")
            .execute(&people());
        assert_eq!(names(&result), ["Cara", "Annie", "John", "Bob"]);
    }

    #[test]
    fn missing_sort_fields_sort_last() {
        let rows = records(json!([{"n": 2}, {}, {"n": null}, {"n": 1}]));
        let result = Query::new().order_asc("n").execute(&rows);
        let ns: Vec<_> = result.items.iter().map(|r| r.get("n").cloned()).collect();
        assert_eq!(ns, [Some(json!(1)), Some(json!(2)), None, Some(json!(null))]);
    }

    #[test]
    fn paging() {
        let page = |skip, take| {
            let result = Query::new().skip(skip).take(take).execute(&people());
            let joined = names(&result).join(",");
            (joined, result.total, result.returned)
        };

        assert_eq!(page(1, 2), ("Annie,Bob".to_string(), 4, 2));
        assert_eq!(page(3, 5), ("Cara".to_string(), 4, 1));
        assert_eq!(page(9, 1), (String::new(), 4, 0));
        assert_eq!(page(0, 0), ("John,Annie,Bob,Cara".to_string(), 4, 4));
        assert_eq!(page(-2, -1), ("John,Annie,Bob,Cara".to_string(), 4, 4));
    }

    #[test]
    fn distinct_keeps_first_seen() {
        let rows = records(json!([
            {"a": 1, "b": [1, 2]},
            {"b": [1, 2], "a": 1},
            {"a": 2},
            {"a": 1, "b": [2, 1]},
        ]));
        let result = Query::new().distinct().execute(&rows);
        assert_eq!(result.total, 3);
        assert_eq!(result.items[0], rows[0]);
        assert_eq!(result.items[1], rows[2]);
    }

    #[test]
    fn distinct_compares_numbers_by_value() {
        let rows = records(json!([
            {"a": 1, "b": [2, {"c": 3}]},
            {"a": 1.0, "b": [2.0, {"c": 3.0}]},
            {"a": -0.0, "b": []},
            {"a": 0, "b": []},
            {"a": 1.5, "b": []},
            {"a": 18446744073709551615u64, "b": []},
        ]));
        let result = Query::new().distinct().execute(&rows);
        assert_eq!(result.total, 4);
        assert_eq!(result.items[0], rows[0]);
        assert_eq!(result.items[1], rows[2]);
        assert_eq!(result.items[2], rows[4]);
        assert_eq!(result.items[3], rows[5]);
    }

    #[test]
    fn count_only_discards_items() {
        let result = Query::new()
            .where_text("[Age] GT 18")
            .unwrap()
            .take(2)
            .count_only()
            .execute(&people());
        assert!(result.items.is_empty());
        assert_eq!(result.total, 3);
        assert_eq!(result.returned, 2);
    }

    #[test]
    fn projection_keeps_listed_fields() {
        let result = Query::new().select(["Name", "Missing"]).execute(&people());
        assert_eq!(result.items[0], records(json!([{"Name": "John"}]))[0]);

        let result = Query::new().select(Vec::<String>::new()).execute(&people());
        assert!(result.items.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn results_are_copies() {
        let source = people();
        let mut result = Query::new().execute(&source);
        result.items[0].insert("Name".into(), json!("Changed"));
        assert_eq!(source[0]["Name"], json!("John"));
    }

    #[test]
    fn dotted_paths_apply_to_filter_and_sort() {
        let rows = records(json!([
            {"id": 1, "geo": {"lat": 50}},
            {"id": 2, "geo": {"lat": 10}},
            {"id": 3, "geo": {"lat": 30}},
        ]));
        let query = Query::new()
            .where_text("[geo.lat] GT 20")
            .unwrap()
            .order_asc("geo.lat")
            .dotted_paths(true);
        let ids: Vec<_> = query
            .execute(&rows)
            .items
            .iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, [json!(3), json!(1)]);

        let flat = query.dotted_paths(false).execute(&rows);
        assert_eq!(flat.total, 0);
    }

    #[test]
    fn deserializes_options() {
        let query: Query = serde_json::from_value(json!({
            "where": "[Age] GTE 18",
            "distinct": true,
            "sorts": [{"field": "Age", "dir": "desc"}],
            "skip": 1,
            "take": 5,
            "count": false,
            "properties": ["Name"],
            "dottedPaths": true
        }))
        .unwrap();

        let expected = Query::new()
            .where_text("[Age] GTE 18")
            .unwrap()
            .distinct()
            .order_desc("Age")
            .skip(1)
            .take(5)
            .select(["Name"])
            .dotted_paths(true);
        assert_eq!(query, expected);

        let empty: Query = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, Query::new());
    }

    #[test]
    fn where_accepts_tree_form() {
        let query: Query = serde_json::from_value(json!({
            "where": {"logic": "or", "filters": [
                {"field": "Name", "op": "eq", "value": "Bob"},
                {"field": "Name", "op": "eq", "value": "Cara"}
            ]}
        }))
        .unwrap();
        assert_eq!(names(&query.execute(&people())), ["Bob", "Cara"]);
    }

    #[test]
    fn serializes_options() {
        let query = Query::new().where_text("[A] EQ 1").unwrap().take(3);
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["where"]["filters"][0]["op"], json!("eq"));
        assert_eq!(value["take"], json!(3));
        assert_eq!(value["dottedPaths"], json!(false));

        let back: Query = serde_json::from_value(value).unwrap();
        assert_eq!(back, query);
    }
}
