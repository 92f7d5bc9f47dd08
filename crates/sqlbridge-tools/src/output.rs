//! Successful tool results and their text rendering

use indexmap::IndexMap;
use serde::Serialize;
use sqlbridge_connection::PoolStats;
use sqlbridge_core::{MaskedDatabaseConfig, Result};

pub const NO_DATA_FOUND: &str = "No data found";
pub const NO_TABLES: &str = "No tables in database";

/// Connection details reported by `get_database_info`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseInfo {
    #[serde(flatten)]
    pub config: MaskedDatabaseConfig,
    pub mysql_version: String,
    pub current_database: String,
    pub connection_status: String,
    pub pool: PoolStats,
}

/// The payload of a successful tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    TableCreated(String),
    Inserted(u64),
    Updated(u64),
    Deleted(u64),
    Rows(Vec<IndexMap<String, serde_json::Value>>),
    Tables(Vec<String>),
    DatabaseInfo(Box<DatabaseInfo>),
}

impl ToolOutput {
    /// Render the payload as the text returned to the caller
    pub fn render(&self) -> Result<String> {
        let text = match self {
            ToolOutput::TableCreated(table) => format!("Table '{}' created successfully", table),
            ToolOutput::Inserted(rows) => {
                format!("Data inserted successfully, affected rows: {}", rows)
            }
            ToolOutput::Updated(rows) => {
                format!("Data updated successfully, affected rows: {}", rows)
            }
            ToolOutput::Deleted(rows) => {
                format!("Data deleted successfully, affected rows: {}", rows)
            }
            ToolOutput::Rows(rows) if rows.is_empty() => NO_DATA_FOUND.to_string(),
            ToolOutput::Rows(rows) => serde_json::to_string_pretty(rows)?,
            ToolOutput::Tables(tables) if tables.is_empty() => NO_TABLES.to_string(),
            ToolOutput::Tables(tables) => {
                let mut text = format!("Tables in database ({}):", tables.len());
                for table in tables {
                    text.push_str("\n- ");
                    text.push_str(table);
                }
                text
            }
            ToolOutput::DatabaseInfo(info) => serde_json::to_string_pretty(info)?,
        };
        Ok(text)
    }
}
