use std::sync::Arc;

use mssql_rdao::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder, ScriptedResponse};
use mssql_rdao::{
    DeliveryMode, ExecOutcome, ExecutorConfig, Query, RdaoError, SqlValue, StatementExecutor,
};
use pretty_assertions::assert_eq;

fn executor_over(driver: &Arc<InMemoryTestDriver>) -> StatementExecutor {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    StatementExecutor::with_driver(Box::new(Arc::clone(driver)), ExecutorConfig::default())
}

fn customers() -> ScriptedResponse {
    InMemoryTestResponseBuilder::new()
        .columns(&["Id", "Name", "Country"])
        .row([SqlValue::from(1), "Alice".into(), "NZ".into()])
        .row([SqlValue::from(2), "Bob".into(), SqlValue::Null])
        .build()
}

fn outcome_row(rows_affected: i32, identity: i64) -> ScriptedResponse {
    InMemoryTestResponseBuilder::new()
        .columns(&["", ""])
        .row([SqlValue::Int32(rows_affected), SqlValue::Int64(identity)])
        .build()
}

#[tokio::test]
async fn test_fetch_table() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(customers()));
    let mut executor = executor_over(&driver);

    let table = executor
        .fetch_table("SELECT Id, Name, Country FROM Customers")
        .await
        .unwrap();

    driver.assert_last_query("SELECT Id, Name, Country FROM Customers", &[]);
    assert_eq!(table.columns(), ["Id", "Name", "Country"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.value(0, "Name").unwrap(), &SqlValue::from("Alice"));
    assert_eq!(table.value(1, "Country").unwrap(), &SqlValue::Null);
}

#[tokio::test]
async fn test_streamed_and_bulk_delivery_build_the_same_table() {
    let mut tables = Vec::new();
    for delivery in [DeliveryMode::Streamed, DeliveryMode::Bulk] {
        let driver = Arc::new(
            InMemoryTestDriver::new()
                .with_delivery(delivery)
                .with_response(customers()),
        );
        let mut executor = executor_over(&driver);
        tables.push(executor.fetch_table("SELECT * FROM Customers").await.unwrap());
    }

    assert_eq!(tables[0], tables[1]);
    assert_eq!(tables[1].columns(), ["Id", "Name", "Country"]);
}

#[tokio::test]
async fn test_empty_leading_result_set_does_not_fix_columns() {
    let mut tables = Vec::new();
    for delivery in [DeliveryMode::Streamed, DeliveryMode::Bulk] {
        let driver = Arc::new(
            InMemoryTestDriver::new().with_delivery(delivery).with_response(
                InMemoryTestResponseBuilder::new()
                    .columns(&["a"])
                    .next_result()
                    .columns(&["b", "c"])
                    .row([1, 2])
                    .build(),
            ),
        );
        let mut executor = executor_over(&driver);
        tables.push(executor.fetch_table("EXEC dbo.Report").await.unwrap());
    }

    assert_eq!(tables[0], tables[1]);
    assert_eq!(tables[0].columns(), ["b", "c"]);
    assert_eq!(tables[0].value(0, "c").unwrap(), &SqlValue::Int32(2));
}

#[tokio::test]
async fn test_zero_rows() {
    let empty = || {
        InMemoryTestResponseBuilder::new()
            .columns(&["Id", "Name"])
            .build()
    };
    let driver = Arc::new(InMemoryTestDriver::new().with_responses([
        empty(),
        empty(),
        empty(),
        empty(),
    ]));
    let mut executor = executor_over(&driver);

    let table = executor.fetch_table("SELECT Id, Name FROM Empty").await.unwrap();
    assert!(table.is_empty());
    assert_eq!(table.columns(), ["Id", "Name"]);

    assert!(executor.fetch_list("SELECT Id FROM Empty").await.unwrap().is_empty());
    assert!(executor
        .fetch_key_value_list("SELECT Id, Name FROM Empty")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(executor.fetch_scalar("SELECT Id FROM Empty").await.unwrap(), None);
}

#[tokio::test]
async fn test_fetch_list_keeps_first_column_in_order() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(customers()));
    let mut executor = executor_over(&driver);

    let ids = executor.fetch_list("SELECT Id, Name FROM Customers").await.unwrap();

    assert_eq!(ids, vec![SqlValue::Int32(1), SqlValue::Int32(2)]);
}

#[tokio::test]
async fn test_fetch_key_value_list() {
    let driver = Arc::new(
        InMemoryTestDriver::new()
            .with_response(customers())
            .with_response(
                InMemoryTestResponseBuilder::new()
                    .columns(&["Code"])
                    .row(["NZ"])
                    .row(["AU"])
                    .build(),
            ),
    );
    let mut executor = executor_over(&driver);

    let pairs = executor
        .fetch_key_value_list("SELECT Id, Name, Country FROM Customers")
        .await
        .unwrap();
    assert_eq!(
        pairs,
        vec![
            (SqlValue::Int32(1), SqlValue::from("Alice")),
            (SqlValue::Int32(2), SqlValue::from("Bob")),
        ]
    );

    let codes = executor
        .fetch_key_value_list("SELECT Code FROM Countries")
        .await
        .unwrap();
    assert_eq!(
        codes,
        vec![
            (SqlValue::from("NZ"), SqlValue::from("NZ")),
            (SqlValue::from("AU"), SqlValue::from("AU")),
        ]
    );
}

#[tokio::test]
async fn test_fetch_scalar_takes_first_row() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_response(
            InMemoryTestResponseBuilder::new()
                .columns(&["n"])
                .row([1])
                .row([2])
                .row([3])
                .build(),
        ),
    );
    let mut executor = executor_over(&driver);

    let value = executor.fetch_scalar("SELECT n FROM Numbers").await.unwrap();

    assert_eq!(value, Some(SqlValue::Int32(1)));
}

#[tokio::test]
async fn test_driver_error_discards_partial_results() {
    let failing = || {
        InMemoryTestResponseBuilder::new()
            .columns(&["Id", "Name"])
            .row([SqlValue::from(1), "Alice".into()])
            .fail("Arithmetic overflow error converting expression to data type int.")
            .row([SqlValue::from(2), "Bob".into()])
            .build()
    };

    for delivery in [DeliveryMode::Streamed, DeliveryMode::Bulk] {
        let driver = Arc::new(
            InMemoryTestDriver::new()
                .with_delivery(delivery)
                .with_default_response(failing()),
        );
        let mut executor = executor_over(&driver);

        let table = executor.fetch_table("SELECT * FROM Customers").await;
        assert!(matches!(table, Err(RdaoError::QueryFailed(_))), "{delivery:?}");

        let list = executor.fetch_list("SELECT * FROM Customers").await;
        assert!(matches!(list, Err(RdaoError::QueryFailed(_))), "{delivery:?}");

        let pairs = executor.fetch_key_value_list("SELECT * FROM Customers").await;
        assert!(matches!(pairs, Err(RdaoError::QueryFailed(_))), "{delivery:?}");

        let scalar = executor.fetch_scalar("SELECT * FROM Customers").await;
        match scalar {
            Err(RdaoError::QueryFailed(message)) => {
                assert_eq!(
                    message,
                    "Arithmetic overflow error converting expression to data type int."
                );
            }
            other => panic!("Expected QueryFailed under {delivery:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_template_is_resolved_before_submission() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let mut executor = executor_over(&driver);

    executor
        .fetch_list(
            Query::new("SELECT Id FROM Customers WHERE Name = :name AND Id > ?")
                .bind("name", "O'Hara")
                .arg(10),
        )
        .await
        .unwrap();

    driver.assert_last_query(
        "SELECT Id FROM Customers WHERE Name = N'O''Hara' AND Id > 10",
        &[],
    );
}

#[tokio::test]
async fn test_unresolvable_template_is_not_submitted() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let mut executor = executor_over(&driver);

    let err = executor
        .fetch_table(Query::new("SELECT * FROM t WHERE a = ? AND b = ?").arg(1))
        .await
        .unwrap_err();

    assert!(matches!(err, RdaoError::Template(_)));
    driver.assert_query_count(0);
}

#[tokio::test]
async fn test_describe_table_binds_name_and_keeps_catalog_order() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_response(
            InMemoryTestResponseBuilder::new()
                .columns(&["name"])
                .row(["Id"])
                .row(["Name"])
                .row(["Country"])
                .build(),
        ),
    );
    let mut executor = executor_over(&driver);

    let columns = executor.describe_table("Customers").await.unwrap();

    assert_eq!(columns, ["Id", "Name", "Country"]);
    let query = driver.last_query().unwrap();
    assert!(query.sql.contains("WHERE tab.name = @P1"));
    assert!(!query.sql.contains("Customers"));
    assert_eq!(query.params, vec![SqlValue::from("Customers")]);
}

#[tokio::test]
async fn test_describe_table_fails_on_non_text_column_name() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_response(
            InMemoryTestResponseBuilder::new()
                .columns(&["name"])
                .row(["Id"])
                .row([SqlValue::Null])
                .build(),
        ),
    );
    let mut executor = executor_over(&driver);

    let err = executor.describe_table("Customers").await.unwrap_err();

    assert!(matches!(err, RdaoError::QueryFailed(_)));
}

#[tokio::test]
async fn test_describe_table_rejects_injection() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let mut executor = executor_over(&driver);

    let err = executor
        .describe_table("x'; DROP TABLE Customers; --")
        .await
        .unwrap_err();

    assert!(matches!(err, RdaoError::InvalidIdentifier(_)));
    driver.assert_query_count(0);
}

#[tokio::test]
async fn test_execute_single_reports_outcome() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(outcome_row(1, 42)));
    let mut executor = executor_over(&driver);

    let outcome = executor
        .execute_single("INSERT INTO Customers (Name) VALUES (N'Carol')")
        .await
        .unwrap();

    driver.assert_last_query(
        "INSERT INTO Customers (Name) VALUES (N'Carol'); SELECT @@ROWCOUNT, @@IDENTITY",
        &[],
    );
    assert_eq!(outcome.rows_affected, Some(1));
    assert_eq!(outcome.last_insert_id(), Some(42));
    assert_eq!(executor.last_outcome(), Some(&outcome));
}

#[tokio::test]
async fn test_failed_execution_keeps_previous_outcome() {
    let driver = Arc::new(
        InMemoryTestDriver::new()
            .with_response(outcome_row(1, 42))
            .with_response(ScriptedResponse::error(
                "Violation of PRIMARY KEY constraint 'PK_Customers'.",
            )),
    );
    let mut executor = executor_over(&driver);

    executor
        .execute_single("INSERT INTO Customers (Name) VALUES (N'Carol')")
        .await
        .unwrap();
    let err = executor
        .execute_single("INSERT INTO Customers (Id, Name) VALUES (1, N'Dup')")
        .await
        .unwrap_err();

    assert!(matches!(err, RdaoError::QueryFailed(_)));
    assert_eq!(
        executor.last_outcome(),
        Some(&ExecOutcome {
            rows_affected: Some(1),
            last_identity: SqlValue::Int64(42),
        })
    );
}

#[tokio::test]
async fn test_execute_single_ignores_rows_of_the_statement_itself() {
    for delivery in [DeliveryMode::Streamed, DeliveryMode::Bulk] {
        let driver = Arc::new(
            InMemoryTestDriver::new().with_delivery(delivery).with_response(
                InMemoryTestResponseBuilder::new()
                    .columns(&["Id"])
                    .row([SqlValue::Int32(7)])
                    .next_result()
                    .columns(&["", ""])
                    .row([SqlValue::Int32(1), SqlValue::Int64(7)])
                    .build(),
            ),
        );
        let mut executor = executor_over(&driver);

        let outcome = executor
            .execute_single("INSERT INTO Customers (Name) OUTPUT inserted.Id VALUES (N'Eve')")
            .await
            .unwrap();

        assert_eq!(outcome.rows_affected, Some(1), "{delivery:?}");
        assert_eq!(outcome.last_identity, SqlValue::Int64(7), "{delivery:?}");
    }
}

#[tokio::test]
async fn test_execute_stops_at_first_failure() {
    let driver = Arc::new(InMemoryTestDriver::new().with_responses([
        outcome_row(1, 10),
        ScriptedResponse::error("Invalid object name 'Missing'."),
        outcome_row(1, 11),
    ]));
    let mut executor = executor_over(&driver);

    let err = executor
        .execute([
            "INSERT INTO Customers (Name) VALUES (N'A')",
            "INSERT INTO Missing (Name) VALUES (N'B')",
            "INSERT INTO Customers (Name) VALUES (N'C')",
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, RdaoError::QueryFailed(_)));
    driver.assert_query_count(2);
    assert_eq!(executor.last_outcome().unwrap().last_insert_id(), Some(10));
}

#[tokio::test]
async fn test_batch_collects_outcomes() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_responses([outcome_row(1, 5), outcome_row(3, 5)]),
    );
    let mut executor = executor_over(&driver);

    let outcomes = executor
        .batch()
        .add("INSERT INTO Tags (Name) VALUES (N'new')")
        .add(Query::new("UPDATE Tags SET Used = ? WHERE Name <> :n").arg(true).bind("n", "new"))
        .execute()
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].rows_affected, Some(3));
    assert_eq!(
        driver.recorded_queries()[1].sql,
        "UPDATE Tags SET Used = 1 WHERE Name <> N'new'; SELECT @@ROWCOUNT, @@IDENTITY"
    );
}

#[tokio::test]
async fn test_continuation_forms_share_the_async_path() {
    let driver = Arc::new(
        InMemoryTestDriver::new()
            .with_response(customers())
            .with_response(ScriptedResponse::error("Incorrect syntax near 'FORM'.")),
    );
    let mut executor = executor_over(&driver);

    let rows = executor
        .fetch_table_then("SELECT * FROM Customers", |result| {
            result.map(|table| table.len())
        })
        .await
        .unwrap();
    assert_eq!(rows, 2);

    let failed = executor
        .fetch_scalar_then("SELECT * FORM Customers", |result| match result {
            Ok(_) => panic!("expected an error"),
            Err(e) => e.to_string(),
        })
        .await;
    assert_eq!(failed, "Query failed: Incorrect syntax near 'FORM'.");
}

#[tokio::test]
async fn test_close() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let executor = executor_over(&driver);

    executor.close().await.unwrap();

    assert!(driver.is_closed());
}

#[tokio::test]
async fn test_close_reports_disconnect_error() {
    let driver = Arc::new(InMemoryTestDriver::new().with_close_error("connection reset"));
    let executor = executor_over(&driver);

    let err = executor.close_then(|result| result.unwrap_err()).await;

    assert!(matches!(err, RdaoError::DisconnectFailed(_)));
}

#[tokio::test]
async fn test_independent_executors_share_nothing() {
    let first = Arc::new(InMemoryTestDriver::new().with_response(outcome_row(1, 1)));
    let second = Arc::new(InMemoryTestDriver::new().with_response(outcome_row(2, 2)));
    let mut a = executor_over(&first);
    let mut b = executor_over(&second);

    let (oa, ob) = tokio::join!(
        a.execute_single("INSERT INTO T DEFAULT VALUES"),
        b.execute_single("INSERT INTO T DEFAULT VALUES"),
    );

    assert_eq!(oa.unwrap().last_insert_id(), Some(1));
    assert_eq!(ob.unwrap().last_insert_id(), Some(2));
    first.assert_query_count(1);
    second.assert_query_count(1);
}

#[tokio::test]
async fn test_open_unreachable_server_fails() {
    let result = StatementExecutor::open(
        "server=tcp:127.0.0.1,1;user=sa;password=secret;TrustServerCertificate=true",
        ExecutorConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(RdaoError::ConnectionFailed(_))));
}

#[tokio::test]
async fn test_open_malformed_connection_string_fails() {
    let result =
        StatementExecutor::open("server=tcp:127.0.0.1,notaport", ExecutorConfig::default()).await;

    assert!(matches!(result, Err(RdaoError::ConnectionFailed(_))));
}
