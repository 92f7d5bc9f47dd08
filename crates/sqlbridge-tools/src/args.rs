//! Argument types accepted by each tool

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Row limit applied by `select_data` when the caller does not pass one
pub const DEFAULT_SELECT_LIMIT: u64 = 100;

fn default_limit() -> u64 {
    DEFAULT_SELECT_LIMIT
}

/// One column of a `create_table` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL data type, e.g. `VARCHAR(255)`
    #[serde(rename = "type")]
    pub data_type: String,
    /// Optional constraints, e.g. `NOT NULL PRIMARY KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
}

/// Arguments for `create_table`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CreateTableArgs {
    /// Table name
    pub table_name: String,
    /// Column definitions, in table order
    pub columns: Vec<ColumnDefinition>,
}

/// Arguments for `insert_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsertDataArgs {
    /// Table name
    pub table_name: String,
    /// Column to value mapping for the new row
    pub data: IndexMap<String, serde_json::Value>,
}

/// Arguments for `select_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectDataArgs {
    /// Table name
    pub table_name: String,
    /// Columns to return; all columns when omitted
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Raw WHERE condition, without the `WHERE` keyword
    #[serde(default)]
    pub where_clause: Option<String>,
    /// Maximum number of rows to return
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// Arguments for `update_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateDataArgs {
    /// Table name
    pub table_name: String,
    /// Column to new value mapping
    pub data: IndexMap<String, serde_json::Value>,
    /// Raw WHERE condition selecting the rows to change
    pub where_clause: String,
}

/// Arguments for `delete_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteDataArgs {
    /// Table name
    pub table_name: String,
    /// Raw WHERE condition selecting the rows to delete
    pub where_clause: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_select_defaults() {
        let args: SelectDataArgs = serde_json::from_value(json!({ "table_name": "users" })).unwrap();
        assert_eq!(args.columns, None);
        assert_eq!(args.where_clause, None);
        assert_eq!(args.limit, DEFAULT_SELECT_LIMIT);
    }

    #[test]
    fn test_column_definition_uses_type_key() {
        let column: ColumnDefinition =
            serde_json::from_value(json!({ "name": "id", "type": "INT", "constraints": "PRIMARY KEY" }))
                .unwrap();
        assert_eq!(column.data_type, "INT");
        assert_eq!(column.constraints.as_deref(), Some("PRIMARY KEY"));
    }

    #[test]
    fn test_data_keeps_caller_order() {
        let args: InsertDataArgs = serde_json::from_value(json!({
            "table_name": "t",
            "data": { "zeta": 1, "alpha": 2, "mid": 3 }
        }))
        .unwrap();
        let keys: Vec<&str> = args.data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_negative_limit_is_rejected() {
        let result = serde_json::from_value::<SelectDataArgs>(json!({ "table_name": "t", "limit": -1 }));
        assert!(result.is_err());
    }
}
