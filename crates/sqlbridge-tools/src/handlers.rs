//! Operation handlers
//!
//! Each handler builds exactly one statement and runs it through [`run`],
//! which owns the acquire/execute/release protocol. The connection goes back
//! to the pool on every path, including statement failures.

use sqlbridge_core::{DbError, QueryResult, Result, StatementResult, Value};

use crate::args::{
    CreateTableArgs, DeleteDataArgs, InsertDataArgs, SelectDataArgs, UpdateDataArgs,
};
use crate::context::ToolContext;
use crate::error::{Operation, ToolError, ToolResult};
use crate::output::{DatabaseInfo, ToolOutput};
use crate::sql::{self, Statement, StatementKind};

#[cfg(test)]
mod tests;

const CONNECTED: &str = "Connected";
const UNKNOWN_VERSION: &str = "Unknown";
const NO_DATABASE: &str = "None";

enum Outcome {
    Executed(StatementResult),
    Rows(QueryResult),
}

impl Outcome {
    fn into_statement(self) -> StatementResult {
        match self {
            Outcome::Executed(result) => result,
            Outcome::Rows(rows) => StatementResult {
                affected_rows: rows.row_count() as u64,
                last_insert_id: None,
            },
        }
    }

    fn into_rows(self) -> QueryResult {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Executed(_) => QueryResult::empty(),
        }
    }
}

/// Acquire a connection, run one statement, release the connection.
async fn run(ctx: &ToolContext, statement: &Statement) -> Result<Outcome> {
    let conn = ctx.pool().acquire().await?;

    let outcome = match statement.kind {
        StatementKind::Execute => conn
            .execute(&statement.sql, &statement.params)
            .await
            .map(Outcome::Executed),
        StatementKind::Query => conn
            .query(&statement.sql, &statement.params)
            .await
            .map(Outcome::Rows),
    };

    ctx.pool().release(conn).await;
    outcome
}

fn fail(operation: Operation) -> impl FnOnce(DbError) -> ToolError {
    move |err| {
        let err = ToolError::new(operation, err);
        tracing::error!(operation = %operation, kind = %err.kind(), "{}", err);
        err
    }
}

/// Create a table if it does not exist yet
#[tracing::instrument(skip(ctx, args), fields(table = %args.table_name))]
pub async fn create_table(ctx: &ToolContext, args: CreateTableArgs) -> ToolResult {
    let op = Operation::CreateTable;
    let statement = sql::create_table(&args).map_err(fail(op))?;
    run(ctx, &statement).await.map_err(fail(op))?;

    tracing::info!(table = %args.table_name, "table created");
    Ok(ToolOutput::TableCreated(args.table_name))
}

/// Insert one row
#[tracing::instrument(skip(ctx, args), fields(table = %args.table_name))]
pub async fn insert_data(ctx: &ToolContext, args: InsertDataArgs) -> ToolResult {
    let op = Operation::InsertData;
    let statement = sql::insert(&args).map_err(fail(op))?;
    let result = run(ctx, &statement).await.map_err(fail(op))?.into_statement();

    tracing::info!(
        affected_rows = result.affected_rows,
        last_insert_id = ?result.last_insert_id,
        "data inserted"
    );
    Ok(ToolOutput::Inserted(result.affected_rows))
}

/// Select rows as ordered column/value objects
#[tracing::instrument(skip(ctx, args), fields(table = %args.table_name, limit = args.limit))]
pub async fn select_data(ctx: &ToolContext, args: SelectDataArgs) -> ToolResult {
    let op = Operation::SelectData;
    let statement = sql::select(&args).map_err(fail(op))?;
    let rows = run(ctx, &statement).await.map_err(fail(op))?.into_rows();

    tracing::debug!(row_count = rows.row_count(), "data selected");
    Ok(ToolOutput::Rows(
        rows.rows.iter().map(|row| row.to_json_map()).collect(),
    ))
}

/// Update the rows matching a filter
#[tracing::instrument(skip(ctx, args), fields(table = %args.table_name))]
pub async fn update_data(ctx: &ToolContext, args: UpdateDataArgs) -> ToolResult {
    let op = Operation::UpdateData;
    let statement = sql::update(&args).map_err(fail(op))?;
    let result = run(ctx, &statement).await.map_err(fail(op))?.into_statement();

    tracing::info!(affected_rows = result.affected_rows, "data updated");
    Ok(ToolOutput::Updated(result.affected_rows))
}

/// Delete the rows matching a filter
#[tracing::instrument(skip(ctx, args), fields(table = %args.table_name))]
pub async fn delete_data(ctx: &ToolContext, args: DeleteDataArgs) -> ToolResult {
    let op = Operation::DeleteData;
    let statement = sql::delete(&args).map_err(fail(op))?;
    let result = run(ctx, &statement).await.map_err(fail(op))?.into_statement();

    tracing::info!(affected_rows = result.affected_rows, "data deleted");
    Ok(ToolOutput::Deleted(result.affected_rows))
}

/// List the tables of the current database
#[tracing::instrument(skip(ctx))]
pub async fn show_tables(ctx: &ToolContext) -> ToolResult {
    let op = Operation::ShowTables;
    let statement = Statement::fixed_query(sql::SHOW_TABLES);
    let rows = run(ctx, &statement).await.map_err(fail(op))?.into_rows();

    let tables = rows
        .rows
        .iter()
        .filter_map(|row| row.get(0))
        .map(|value| value.to_string())
        .collect();
    Ok(ToolOutput::Tables(tables))
}

/// Report the masked connection settings, server version and pool state
#[tracing::instrument(skip(ctx))]
pub async fn get_database_info(ctx: &ToolContext) -> ToolResult {
    let op = Operation::GetDatabaseInfo;
    let statement = Statement::fixed_query(sql::DATABASE_INFO);
    let rows = run(ctx, &statement).await.map_err(fail(op))?.into_rows();

    let first = rows.rows.first();
    let column = |idx: usize, fallback: &str| {
        first
            .and_then(|row| row.get(idx))
            .filter(|value| !value.is_null())
            .map(Value::to_string)
            .unwrap_or_else(|| fallback.to_string())
    };

    Ok(ToolOutput::DatabaseInfo(Box::new(DatabaseInfo {
        config: ctx.config().masked(),
        mysql_version: column(0, UNKNOWN_VERSION),
        current_database: column(1, NO_DATABASE),
        connection_status: CONNECTED.to_string(),
        pool: ctx.pool().stats(),
    })))
}
