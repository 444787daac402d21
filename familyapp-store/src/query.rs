//! Equality / lower-bound filters and ordering over JSON rows.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| match f {
            Filter::Eq(col, want) => row.get(col).is_some_and(|v| v == want),
            Filter::Gte(col, bound) => row
                .get(col)
                .is_some_and(|v| compare_values(v, bound) != Ordering::Less),
        })
    }

    /// Filter, order and truncate `rows`. The sort is stable.
    pub fn apply<'a>(&self, rows: impl Iterator<Item = &'a Value>) -> Vec<Value> {
        let mut out: Vec<Value> = rows.filter(|r| self.matches(r)).cloned().collect();
        if let Some(order) = &self.order {
            out.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending { ord } else { ord.reverse() }
            });
        }
        if let Some(n) = self.limit {
            out.truncate(n);
        }
        out
    }
}

fn as_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    v.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Timestamps compare as instants, numbers numerically, everything else
/// by its string form. Nulls sort first.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => match (as_timestamp(a), as_timestamp(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => value_text(a).cmp(&value_text(b)),
        },
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_compare_as_instants() {
        // lexicographic order would put the fractional one first
        let a = json!("2026-10-19T08:00:00.500Z");
        let b = json!("2026-10-19T08:00:00Z");
        assert_eq!(compare_values(&a, &b), Ordering::Greater);
    }

    #[test]
    fn eq_gte_order_limit() {
        let rows = vec![
            json!({"id": "1", "owner_id": "a", "n": 3}),
            json!({"id": "2", "owner_id": "b", "n": 9}),
            json!({"id": "3", "owner_id": "a", "n": 7}),
            json!({"id": "4", "owner_id": "a", "n": 1}),
        ];
        let q = Query::new()
            .eq("owner_id", "a")
            .gte("n", 2)
            .order_by("n", false)
            .limit(5);
        let got: Vec<_> = q.apply(rows.iter()).into_iter().map(|r| r["id"].clone()).collect();
        assert_eq!(got, vec![json!("3"), json!("1")]);
    }

    #[test]
    fn missing_column_never_matches() {
        let q = Query::new().eq("owner_id", "a");
        assert!(!q.matches(&json!({"id": "x"})));
    }
}
