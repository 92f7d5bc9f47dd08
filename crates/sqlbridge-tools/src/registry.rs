//! Tool catalog and name-based dispatch

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlbridge_core::DbError;
use thiserror::Error;

use crate::args::{
    CreateTableArgs, DeleteDataArgs, InsertDataArgs, SelectDataArgs, UpdateDataArgs,
};
use crate::context::ToolContext;
use crate::error::{Operation, ToolError, ToolResult};
use crate::handlers;

/// Arguments of tools that take none
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

/// A tool as advertised to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: serde_json::Value,
}

/// Rendered outcome of a tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

fn description(op: Operation) -> &'static str {
    match op {
        Operation::CreateTable => {
            "Create a MySQL table. Each column has a name, a type and optional constraints."
        }
        Operation::InsertData => "Insert one row into a table from a column/value mapping.",
        Operation::SelectData => {
            "Query rows from a table. Returns a JSON array of rows, at most `limit` (default 100)."
        }
        Operation::UpdateData => "Update the rows of a table that match a WHERE condition.",
        Operation::DeleteData => "Delete the rows of a table that match a WHERE condition.",
        Operation::ShowTables => "List all tables in the current database.",
        Operation::GetDatabaseInfo => {
            "Show the current connection settings, server version and pool status."
        }
    }
}

fn input_schema(op: Operation) -> serde_json::Value {
    let schema = match op {
        Operation::CreateTable => schema_for!(CreateTableArgs),
        Operation::InsertData => schema_for!(InsertDataArgs),
        Operation::SelectData => schema_for!(SelectDataArgs),
        Operation::UpdateData => schema_for!(UpdateDataArgs),
        Operation::DeleteData => schema_for!(DeleteDataArgs),
        Operation::ShowTables | Operation::GetDatabaseInfo => schema_for!(NoArgs),
    };
    schema.to_value()
}

fn parse<T: DeserializeOwned>(op: Operation, arguments: serde_json::Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| {
        ToolError::new(
            op,
            DbError::InvalidArgument(format!("invalid arguments: {}", e)),
        )
    })
}

/// Routes tool calls by name to their handlers
#[derive(Clone)]
pub struct ToolRegistry {
    ctx: ToolContext,
}

impl ToolRegistry {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    /// Every tool with its JSON input schema
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        Operation::ALL
            .into_iter()
            .map(|op| ToolDescriptor {
                name: op.name(),
                description: description(op),
                input_schema: input_schema(op),
            })
            .collect()
    }

    /// Run a tool and render its outcome.
    ///
    /// Handler failures come back as a response with `is_error` set; only an
    /// unknown tool name is an error at this level.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResponse, DispatchError> {
        let op = Operation::from_name(name).ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
        tracing::debug!(tool = name, "dispatching tool call");

        let result = self.call(op, arguments).await.and_then(|output| {
            output.render().map_err(|e| ToolError::new(op, e))
        });

        Ok(match result {
            Ok(text) => ToolResponse {
                text,
                is_error: false,
            },
            Err(err) => ToolResponse {
                text: err.to_string(),
                is_error: true,
            },
        })
    }

    async fn call(&self, op: Operation, arguments: serde_json::Value) -> ToolResult {
        let ctx = &self.ctx;
        match op {
            Operation::CreateTable => handlers::create_table(ctx, parse(op, arguments)?).await,
            Operation::InsertData => handlers::insert_data(ctx, parse(op, arguments)?).await,
            Operation::SelectData => handlers::select_data(ctx, parse(op, arguments)?).await,
            Operation::UpdateData => handlers::update_data(ctx, parse(op, arguments)?).await,
            Operation::DeleteData => handlers::delete_data(ctx, parse(op, arguments)?).await,
            Operation::ShowTables => {
                parse::<NoArgs>(op, arguments)?;
                handlers::show_tables(ctx).await
            }
            Operation::GetDatabaseInfo => {
                parse::<NoArgs>(op, arguments)?;
                handlers::get_database_info(ctx).await
            }
        }
    }
}
