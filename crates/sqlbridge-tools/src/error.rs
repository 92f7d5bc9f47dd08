//! Tool failures

use sqlbridge_core::{DbError, ErrorKind};
use thiserror::Error;

use crate::ToolOutput;

/// The operations exposed by the tool registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateTable,
    InsertData,
    SelectData,
    UpdateData,
    DeleteData,
    ShowTables,
    GetDatabaseInfo,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::CreateTable,
        Operation::InsertData,
        Operation::SelectData,
        Operation::UpdateData,
        Operation::DeleteData,
        Operation::ShowTables,
        Operation::GetDatabaseInfo,
    ];

    /// Tool name as exposed to callers
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateTable => "create_table",
            Operation::InsertData => "insert_data",
            Operation::SelectData => "select_data",
            Operation::UpdateData => "update_data",
            Operation::DeleteData => "delete_data",
            Operation::ShowTables => "show_tables",
            Operation::GetDatabaseInfo => "get_database_info",
        }
    }

    /// Verb phrase used in failure messages
    pub fn action(&self) -> &'static str {
        match self {
            Operation::CreateTable => "create table",
            Operation::InsertData => "insert data",
            Operation::SelectData => "query data",
            Operation::UpdateData => "update data",
            Operation::DeleteData => "delete data",
            Operation::ShowTables => "show tables",
            Operation::GetDatabaseInfo => "get database info",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed tool call, tagged with the operation that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to {}: {}", .operation.action(), .source)]
pub struct ToolError {
    pub operation: Operation,
    #[source]
    pub source: DbError,
}

impl ToolError {
    pub fn new(operation: Operation, source: DbError) -> Self {
        Self { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// The underlying cause without the operation prefix
    pub fn message(&self) -> &str {
        self.source.message()
    }
}

pub type ToolResult = std::result::Result<ToolOutput, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
        }
        assert_eq!(Operation::from_name("drop_database"), None);
    }

    #[test]
    fn test_error_message_names_action_and_cause() {
        let err = ToolError::new(
            Operation::InsertData,
            DbError::Statement("Table 'test01.missing' doesn't exist".into()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to insert data: Statement error: Table 'test01.missing' doesn't exist"
        );
        assert_eq!(err.kind(), ErrorKind::Statement);
    }
}
