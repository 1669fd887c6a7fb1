//! Aggregate counts over grouped records.

use serde_json::Value;

use crate::domain::{YesNo, fields::is_truthy};

/// Label for groups whose value is unset.
pub const UNDEFINED: &str = "Undefined";

/// How grouped values are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One row per distinct value.
    Plain,
    /// Collapse values to whether the field is set (`YES`/`NO`).
    RecordExists,
}

/// The groupings reported by `rr stats`, in order.
pub const DEFAULT_GROUPINGS: [(&str, Grouping); 3] = [
    ("version", Grouping::Plain),
    ("parent_id", Grouping::RecordExists),
    ("subscription_id", Grouping::RecordExists),
];

/// A group label and the number of records in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    /// Group label.
    pub group: String,
    /// Record count.
    pub count: u64,
}

/// Turns raw `read_group` rows for `field` into labelled counts.
///
/// The count is read from `__count`, or `<field>_count` on servers that use
/// the older naming.
#[must_use]
pub fn collect(rows: &[Value], field: &str, grouping: Grouping) -> Vec<StatRow> {
    let legacy_count = format!("{field}_count");
    let count_of = |row: &Value| {
        row.get("__count")
            .or_else(|| row.get(&legacy_count))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    let value_of = |row: &Value| row.get(field).cloned().unwrap_or(Value::Null);

    match grouping {
        Grouping::Plain => rows
            .iter()
            .map(|row| StatRow {
                group: label(&value_of(row)),
                count: count_of(row),
            })
            .collect(),
        Grouping::RecordExists => {
            let mut merged: Vec<StatRow> = Vec::new();
            for row in rows {
                let group = YesNo(is_truthy(&value_of(row))).to_string();
                let count = count_of(row);
                match merged.iter_mut().find(|stat| stat.group == group) {
                    Some(stat) => stat.count += count,
                    None => merged.push(StatRow { group, count }),
                }
            }
            merged
        }
    }
}

fn label(value: &Value) -> String {
    match value {
        Value::String(s) if !s.is_empty() => s.clone(),
        // many2one groups are [id, display name]
        Value::Array(items) => items
            .get(1)
            .and_then(Value::as_str)
            .map_or_else(|| UNDEFINED.to_string(), str::to_string),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => YesNo(true).to_string(),
        _ => UNDEFINED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_grouping_keeps_server_order() {
        let rows = vec![
            json!({"version": "17.0", "__count": 12}),
            json!({"version": false, "__count": 2}),
            json!({"version": "saas~17.2", "version_count": 5}),
        ];

        assert_eq!(collect(&rows, "version", Grouping::Plain), vec![
            StatRow {
                group: "17.0".to_string(),
                count: 12
            },
            StatRow {
                group: UNDEFINED.to_string(),
                count: 2
            },
            StatRow {
                group: "saas~17.2".to_string(),
                count: 5
            },
        ]);
    }

    #[test]
    fn record_exists_collapses_to_yes_no() {
        let rows = vec![
            json!({"parent_id": [4, "main-db"], "__count": 3}),
            json!({"parent_id": false, "__count": 10}),
            json!({"parent_id": [9, "other-db"], "__count": 1}),
        ];

        assert_eq!(collect(&rows, "parent_id", Grouping::RecordExists), vec![
            StatRow {
                group: "YES".to_string(),
                count: 4
            },
            StatRow {
                group: "NO".to_string(),
                count: 10
            },
        ]);
    }

    #[test]
    fn many2one_groups_use_display_name() {
        let rows = vec![json!({"subscription_id": [7, "S00007"], "__count": 1})];
        assert_eq!(
            collect(&rows, "subscription_id", Grouping::Plain)[0].group,
            "S00007"
        );
    }
}
