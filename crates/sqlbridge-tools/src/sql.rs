//! Statement builders
//!
//! Identifiers are quoted; values are always bound as parameters. Column
//! types, constraints and WHERE conditions are inserted as given, so callers
//! of the tools must be trusted.

use indexmap::IndexMap;
use sqlbridge_core::{DbError, Result, Value};

use crate::args::{
    CreateTableArgs, DeleteDataArgs, InsertDataArgs, SelectDataArgs, UpdateDataArgs,
};

pub const SHOW_TABLES: &str = "SHOW TABLES";
pub const DATABASE_INFO: &str = "SELECT VERSION(), DATABASE()";

/// Whether a statement produces rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Execute,
    Query,
}

/// A single statement ready to run on a pooled connection
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
    pub kind: StatementKind,
}

impl Statement {
    fn execute(sql: String, params: Vec<Value>) -> Self {
        Self {
            sql,
            params,
            kind: StatementKind::Execute,
        }
    }

    fn query(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
            kind: StatementKind::Query,
        }
    }

    /// A fixed statement with no parameters that returns rows
    pub fn fixed_query(sql: &str) -> Self {
        Self::query(sql.to_string())
    }
}

/// Quote a table or column name with backticks, doubling embedded backticks
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(DbError::InvalidArgument(
            "identifier must not be empty".into(),
        ));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

fn require_filter(where_clause: &str) -> Result<&str> {
    let trimmed = where_clause.trim();
    if trimmed.is_empty() {
        return Err(DbError::InvalidArgument(
            "where_clause must not be blank".into(),
        ));
    }
    Ok(trimmed)
}

fn split_data(
    data: &IndexMap<String, serde_json::Value>,
) -> Result<(Vec<String>, Vec<Value>)> {
    if data.is_empty() {
        return Err(DbError::InvalidArgument(
            "data must contain at least one column".into(),
        ));
    }
    let mut columns = Vec::with_capacity(data.len());
    let mut params = Vec::with_capacity(data.len());
    for (column, value) in data {
        columns.push(quote_identifier(column)?);
        params.push(Value::from_json(value.clone()));
    }
    Ok((columns, params))
}

pub fn create_table(args: &CreateTableArgs) -> Result<Statement> {
    let table = quote_identifier(&args.table_name)?;
    if args.columns.is_empty() {
        return Err(DbError::InvalidArgument(
            "columns must contain at least one column definition".into(),
        ));
    }

    let mut definitions = Vec::with_capacity(args.columns.len());
    for column in &args.columns {
        if column.data_type.trim().is_empty() {
            return Err(DbError::InvalidArgument(format!(
                "column '{}' has no type",
                column.name
            )));
        }
        let mut definition = format!("{} {}", quote_identifier(&column.name)?, column.data_type);
        if let Some(constraints) = column.constraints.as_deref()
            && !constraints.trim().is_empty()
        {
            definition.push(' ');
            definition.push_str(constraints);
        }
        definitions.push(definition);
    }

    Ok(Statement::execute(
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table,
            definitions.join(", ")
        ),
        Vec::new(),
    ))
}

pub fn insert(args: &InsertDataArgs) -> Result<Statement> {
    let table = quote_identifier(&args.table_name)?;
    let (columns, params) = split_data(&args.data)?;
    let placeholders = vec!["?"; params.len()].join(", ");

    Ok(Statement::execute(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        ),
        params,
    ))
}

pub fn select(args: &SelectDataArgs) -> Result<Statement> {
    let table = quote_identifier(&args.table_name)?;

    let projection = match args.columns.as_deref() {
        None | Some([]) => "*".to_string(),
        Some([only]) if only == "*" => "*".to_string(),
        Some(columns) => columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Result<Vec<_>>>()?
            .join(", "),
    };

    let mut sql = format!("SELECT {} FROM {}", projection, table);
    if let Some(filter) = args.where_clause.as_deref()
        && !filter.trim().is_empty()
    {
        sql.push_str(" WHERE ");
        sql.push_str(filter.trim());
    }
    sql.push_str(&format!(" LIMIT {}", args.limit));

    Ok(Statement::query(sql))
}

pub fn update(args: &UpdateDataArgs) -> Result<Statement> {
    let table = quote_identifier(&args.table_name)?;
    let filter = require_filter(&args.where_clause)?;
    let (columns, params) = split_data(&args.data)?;
    let assignments = columns
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Statement::execute(
        format!("UPDATE {} SET {} WHERE {}", table, assignments, filter),
        params,
    ))
}

pub fn delete(args: &DeleteDataArgs) -> Result<Statement> {
    let table = quote_identifier(&args.table_name)?;
    let filter = require_filter(&args.where_clause)?;

    Ok(Statement::execute(
        format!("DELETE FROM {} WHERE {}", table, filter),
        Vec::new(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ColumnDefinition, DEFAULT_SELECT_LIMIT};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn data(value: serde_json::Value) -> IndexMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case::plain("users", "`users`")]
    #[case::spaces("order items", "`order items`")]
    #[case::backtick("we`ird", "`we``ird`")]
    #[case::unicode("用户", "`用户`")]
    fn test_quote_identifier(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(quote_identifier(name).unwrap(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    fn test_quote_identifier_rejects_blank(#[case] name: &str) {
        assert!(matches!(
            quote_identifier(name),
            Err(DbError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_create_table() {
        let args = CreateTableArgs {
            table_name: "users".into(),
            columns: vec![
                ColumnDefinition {
                    name: "id".into(),
                    data_type: "INT".into(),
                    constraints: Some("AUTO_INCREMENT PRIMARY KEY".into()),
                },
                ColumnDefinition {
                    name: "name".into(),
                    data_type: "VARCHAR(50)".into(),
                    constraints: None,
                },
            ],
        };
        let statement = create_table(&args).unwrap();
        assert_eq!(
            statement.sql,
            "CREATE TABLE IF NOT EXISTS `users` (`id` INT AUTO_INCREMENT PRIMARY KEY, `name` VARCHAR(50))"
        );
        assert_eq!(statement.kind, StatementKind::Execute);
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_create_table_requires_columns() {
        let args = CreateTableArgs {
            table_name: "empty".into(),
            columns: Vec::new(),
        };
        assert!(create_table(&args).is_err());
    }

    #[test]
    fn test_insert_binds_values_in_order() {
        let args = InsertDataArgs {
            table_name: "users".into(),
            data: data(json!({ "name": "Alice", "age": 30, "active": true })),
        };
        let statement = insert(&args).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO `users` (`name`, `age`, `active`) VALUES (?, ?, ?)"
        );
        assert_eq!(
            statement.params,
            vec![
                Value::String("Alice".into()),
                Value::Int64(30),
                Value::Bool(true)
            ]
        );
    }

    #[rstest]
    #[case::all_columns(None, None, DEFAULT_SELECT_LIMIT, "SELECT * FROM `t` LIMIT 100")]
    #[case::star(Some(vec!["*"]), None, 5, "SELECT * FROM `t` LIMIT 5")]
    #[case::projection(Some(vec!["a", "b"]), None, 10, "SELECT `a`, `b` FROM `t` LIMIT 10")]
    #[case::filter(None, Some("id > 3"), 100, "SELECT * FROM `t` WHERE id > 3 LIMIT 100")]
    #[case::blank_filter(None, Some("  "), 100, "SELECT * FROM `t` LIMIT 100")]
    fn test_select(
        #[case] columns: Option<Vec<&str>>,
        #[case] filter: Option<&str>,
        #[case] limit: u64,
        #[case] expected: &str,
    ) {
        let args = SelectDataArgs {
            table_name: "t".into(),
            columns: columns.map(|cols| cols.into_iter().map(String::from).collect()),
            where_clause: filter.map(String::from),
            limit,
        };
        let statement = select(&args).unwrap();
        assert_eq!(statement.sql, expected);
        assert_eq!(statement.kind, StatementKind::Query);
    }

    #[test]
    fn test_update() {
        let args = UpdateDataArgs {
            table_name: "users".into(),
            data: data(json!({ "age": 31, "nickname": null })),
            where_clause: "name = 'Alice'".into(),
        };
        let statement = update(&args).unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE `users` SET `age` = ?, `nickname` = ? WHERE name = 'Alice'"
        );
        assert_eq!(statement.params, vec![Value::Int64(31), Value::Null]);
    }

    #[rstest]
    #[case::empty("")]
    #[case::spaces("   ")]
    #[case::newline("\n\t")]
    fn test_blank_filters_are_rejected(#[case] filter: &str) {
        let update_args = UpdateDataArgs {
            table_name: "users".into(),
            data: data(json!({ "age": 1 })),
            where_clause: filter.into(),
        };
        let delete_args = DeleteDataArgs {
            table_name: "users".into(),
            where_clause: filter.into(),
        };
        assert!(matches!(update(&update_args), Err(DbError::InvalidArgument(_))));
        assert!(matches!(delete(&delete_args), Err(DbError::InvalidArgument(_))));
    }

    #[test]
    fn test_always_true_filter_is_honoured() {
        let args = DeleteDataArgs {
            table_name: "users".into(),
            where_clause: "1=1".into(),
        };
        assert_eq!(delete(&args).unwrap().sql, "DELETE FROM `users` WHERE 1=1");
    }

    #[test]
    fn test_update_requires_data() {
        let args = UpdateDataArgs {
            table_name: "users".into(),
            data: IndexMap::new(),
            where_clause: "id = 1".into(),
        };
        assert!(matches!(update(&args), Err(DbError::InvalidArgument(_))));
    }
}
