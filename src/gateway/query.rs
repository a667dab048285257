use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqFilter {
    pub column: String,
    pub value: String,
}

/// Row selection passed to [`super::Gateway::fetch_rows`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub filters: Vec<EqFilter>,
    pub order: Vec<OrderClause>,
    pub limit: Option<usize>,
}

impl RowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(EqFilter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Accepts clauses like `"created_at desc"` or `"created_at desc, title"`
    pub fn order(mut self, clause: &str) -> Self {
        self.order.extend(parse_order_string(clause));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query parameters: `select=*`, `col=eq.value`, `order=col.desc`, `limit=n`
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for f in &self.filters {
            params.push((f.column.clone(), format!("eq.{}", f.value)));
        }
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, o.sort.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Whether an in-memory row satisfies every equality filter
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| match row.get(&f.column) {
            Some(Value::String(s)) => s == &f.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == f.value,
        })
    }

    /// Sort and truncate rows the way the store would
    pub fn apply(&self, mut rows: Vec<Value>) -> Vec<Value> {
        rows.retain(|row| self.matches(row));
        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                for clause in &self.order {
                    let ord = compare_values(a.get(&clause.column), b.get(&clause.column));
                    let ord = match clause.sort {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

fn parse_order_string(s: &str) -> Vec<OrderClause> {
    // split on commas, then each token into column and direction
    let mut out = Vec::new();
    for part in s.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut it = trimmed.split_whitespace();
        if let Some(col) = it.next() {
            let dir = it.next().unwrap_or("asc");
            let sort = if dir.eq_ignore_ascii_case("desc") {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            out.push(OrderClause {
                column: col.to_string(),
                sort,
            });
        }
    }
    out
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
