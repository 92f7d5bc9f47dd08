//! sqlbridge tools - the database operations exposed to remote callers
//!
//! Every operation follows the same protocol: validate the arguments, build
//! one parameterized statement, acquire a pooled connection, run the
//! statement, release the connection, and turn the outcome into text.
//!
//! # Example
//!
//! ```ignore
//! use sqlbridge_tools::{ToolContext, ToolRegistry};
//!
//! let registry = ToolRegistry::new(ToolContext::new(pool, config));
//! let response = registry
//!     .dispatch("select_data", serde_json::json!({ "table_name": "users", "limit": 10 }))
//!     .await?;
//! println!("{}", response.text);
//! ```

mod args;
mod context;
mod error;
mod handlers;
mod output;
mod registry;
pub mod sql;

#[cfg(test)]
mod test_support;

pub use args::{
    ColumnDefinition, CreateTableArgs, DEFAULT_SELECT_LIMIT, DeleteDataArgs, InsertDataArgs,
    SelectDataArgs, UpdateDataArgs,
};
pub use context::ToolContext;
pub use error::{Operation, ToolError, ToolResult};
pub use handlers::{
    create_table, delete_data, get_database_info, insert_data, select_data, show_tables,
    update_data,
};
pub use output::{DatabaseInfo, ToolOutput};
pub use registry::{DispatchError, ToolDescriptor, ToolRegistry, ToolResponse};
