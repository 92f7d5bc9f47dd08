//! Handler round trips against an in-memory database

use std::sync::atomic::Ordering;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;
use sqlbridge_connection::PoolState;
use sqlbridge_core::ErrorKind;

use super::*;
use crate::args::ColumnDefinition;
use crate::output::NO_DATA_FOUND;
use crate::test_support::{TEST_PASSWORD, sqlite_context};

fn column(name: &str, data_type: &str, constraints: Option<&str>) -> ColumnDefinition {
    ColumnDefinition {
        name: name.into(),
        data_type: data_type.into(),
        constraints: constraints.map(String::from),
    }
}

fn data(value: serde_json::Value) -> IndexMap<String, serde_json::Value> {
    serde_json::from_value(value).unwrap()
}

async fn create_users(ctx: &ToolContext) {
    let args = CreateTableArgs {
        table_name: "users".into(),
        columns: vec![
            column("id", "INTEGER", Some("PRIMARY KEY")),
            column("name", "TEXT", Some("NOT NULL")),
            column("age", "INTEGER", None),
        ],
    };
    let output = create_table(ctx, args).await.unwrap();
    assert_eq!(output, ToolOutput::TableCreated("users".into()));
}

async fn seed_users(ctx: &ToolContext, count: i64) {
    for id in 1..=count {
        let args = InsertDataArgs {
            table_name: "users".into(),
            data: data(json!({ "id": id, "name": format!("user{}", id), "age": 20 + id })),
        };
        insert_data(ctx, args).await.unwrap();
    }
}

#[tokio::test]
async fn test_insert_then_select_round_trip() {
    let (ctx, _) = sqlite_context();
    create_users(&ctx).await;

    let inserted = insert_data(
        &ctx,
        InsertDataArgs {
            table_name: "users".into(),
            data: data(json!({ "id": 7, "name": "Alice", "age": 30 })),
        },
    )
    .await
    .unwrap();
    assert_eq!(inserted, ToolOutput::Inserted(1));

    let selected = select_data(
        &ctx,
        SelectDataArgs {
            table_name: "users".into(),
            columns: None,
            where_clause: Some("id = 7".into()),
            limit: 100,
        },
    )
    .await
    .unwrap();

    assert_eq!(
        selected,
        ToolOutput::Rows(vec![data(json!({ "id": 7, "name": "Alice", "age": 30 }))])
    );
}

#[tokio::test]
async fn test_select_without_matches_reports_marker() {
    let (ctx, _) = sqlite_context();
    create_users(&ctx).await;

    let output = select_data(
        &ctx,
        SelectDataArgs {
            table_name: "users".into(),
            columns: Some(vec!["name".into()]),
            where_clause: Some("age > 1000".into()),
            limit: 10,
        },
    )
    .await
    .unwrap();
    assert_eq!(output.render().unwrap(), NO_DATA_FOUND);
}

#[tokio::test]
async fn test_select_applies_limit_and_projection() {
    let (ctx, _) = sqlite_context();
    create_users(&ctx).await;
    seed_users(&ctx, 5).await;

    let output = select_data(
        &ctx,
        SelectDataArgs {
            table_name: "users".into(),
            columns: Some(vec!["name".into()]),
            where_clause: None,
            limit: 2,
        },
    )
    .await
    .unwrap();

    assert_eq!(
        output,
        ToolOutput::Rows(vec![
            data(json!({ "name": "user1" })),
            data(json!({ "name": "user2" })),
        ])
    );
}

#[tokio::test]
async fn test_update_and_delete_report_matching_rows() {
    let (ctx, _) = sqlite_context();
    create_users(&ctx).await;
    seed_users(&ctx, 10).await;

    let updated = update_data(
        &ctx,
        UpdateDataArgs {
            table_name: "users".into(),
            data: data(json!({ "age": 99 })),
            where_clause: "id <= 3".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated, ToolOutput::Updated(3));

    let deleted = delete_data(
        &ctx,
        DeleteDataArgs {
            table_name: "users".into(),
            where_clause: "age = 99".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(deleted, ToolOutput::Deleted(3));

    let everything = delete_data(
        &ctx,
        DeleteDataArgs {
            table_name: "users".into(),
            where_clause: "1=1".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(everything, ToolOutput::Deleted(7));
}

#[tokio::test]
async fn test_blank_filter_never_touches_the_pool() {
    let (ctx, factory) = sqlite_context();

    let err = delete_data(
        &ctx,
        DeleteDataArgs {
            table_name: "users".into(),
            where_clause: "   ".into(),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.operation, Operation::DeleteData);
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.pool().state(), PoolState::Uninitialized);
}

#[tokio::test]
async fn test_show_tables_lists_created_tables() {
    let (ctx, _) = sqlite_context();
    assert_eq!(show_tables(&ctx).await.unwrap(), ToolOutput::Tables(Vec::new()));

    create_users(&ctx).await;
    create_table(
        &ctx,
        CreateTableArgs {
            table_name: "orders".into(),
            columns: vec![column("id", "INTEGER", None)],
        },
    )
    .await
    .unwrap();

    let output = show_tables(&ctx).await.unwrap();
    assert_eq!(
        output.render().unwrap(),
        "Tables in database (2):\n- orders\n- users"
    );
}

#[tokio::test]
async fn test_create_table_is_idempotent() {
    let (ctx, _) = sqlite_context();
    create_users(&ctx).await;
    create_users(&ctx).await;
}

#[tokio::test]
async fn test_statement_failure_still_releases_connection() {
    let (ctx, _) = sqlite_context();

    let err = insert_data(
        &ctx,
        InsertDataArgs {
            table_name: "missing".into(),
            data: data(json!({ "id": 1 })),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Statement);
    assert!(err.to_string().starts_with("Failed to insert data: "));
    let stats = ctx.pool().stats();
    assert_eq!(stats.active(), 0);
    assert_eq!(stats.idle(), 1);
}

#[tokio::test]
async fn test_connection_failure_is_reported() {
    let (ctx, factory) = sqlite_context();
    factory.reject.store(true, Ordering::SeqCst);

    let err = show_tables(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().starts_with("Failed to show tables: Connection error:"));
}

#[tokio::test]
async fn test_database_info_masks_password() {
    let (ctx, _) = sqlite_context();

    let output = get_database_info(&ctx).await.unwrap();
    let text = output.render().unwrap();
    assert!(!text.contains(TEST_PASSWORD));

    let info: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(info["password"], json!("*".repeat(TEST_PASSWORD.len())));
    assert_eq!(info["current_database"], json!("main"));
    assert_eq!(info["connection_status"], json!("Connected"));
    assert_eq!(info["pool"]["state"], json!("ready"));
    assert!(info["mysql_version"].as_str().is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn test_concurrent_handlers_share_one_pool() {
    let (ctx, factory) = sqlite_context();
    create_users(&ctx).await;

    let inserts = (1..=8).map(|id| {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            insert_data(
                &ctx,
                InsertDataArgs {
                    table_name: "users".into(),
                    data: data(json!({ "id": id, "name": "n" })),
                },
            )
            .await
        })
    });
    for handle in inserts.collect::<Vec<_>>() {
        assert_eq!(handle.await.unwrap().unwrap(), ToolOutput::Inserted(1));
    }

    let stats = ctx.pool().stats();
    assert_eq!(stats.initializations(), 1);
    assert!(factory.connects.load(Ordering::SeqCst) <= 2);
    assert_eq!(stats.active(), 0);
}
