//! Live database tests. They run only when `DATABASE_URL` is set.

use futures_util::TryStreamExt;
use pgnamed::{ClientConfig, FromRow, NamedArgs, NamedClient, NamedError, NamedResult, RowExt, named_args};
use tokio_postgres::Row;

async fn try_connect() -> Option<NamedClient<tokio_postgres::Client>> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    Some(
        pgnamed::connect(&database_url)
            .await
            .expect("Failed to connect to DATABASE_URL with NoTls"),
    )
}

#[derive(Debug, PartialEq)]
struct TestRow {
    id: i32,
    test_1: String,
    test_2: String,
}

impl FromRow for TestRow {
    fn from_row(row: &Row) -> NamedResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            test_1: row.try_get_column("test_1")?,
            test_2: row.try_get_column("test_2")?,
        })
    }
}

async fn create_table(pg: &NamedClient<tokio_postgres::Client>, name: &str) {
    pg.batch_execute(&format!(
        "DROP TABLE IF EXISTS {name}; \
         CREATE TEMP TABLE {name} (id int PRIMARY KEY, test_1 varchar(256), test_2 varchar(256))"
    ))
    .await
    .unwrap();
}

fn row_args(id: i32, a: &str, b: &str) -> NamedArgs {
    named_args! { "id" => id, "test_1" => a.to_string(), "test_2" => b.to_string() }
}

#[tokio::test]
async fn named_execute_and_fetch_round_trip() {
    let Some(pg) = try_connect().await else {
        return;
    };
    create_table(&pg, "named_basic").await;

    pg.named_execute(
        "INSERT INTO named_basic(id, test_1, test_2) VALUES (:id, :test_1, :test_2)",
        &row_args(1, "1", "2"),
    )
    .await
    .unwrap();

    let row: TestRow = pg
        .named_fetch_one_as(
            "SELECT id, test_1, test_2 FROM named_basic WHERE id = :id",
            &named_args! { "id" => 1_i32 },
        )
        .await
        .unwrap();
    assert_eq!(
        row,
        TestRow {
            id: 1,
            test_1: "1".into(),
            test_2: "2".into()
        }
    );

    let test_2: String = pg
        .named_fetch_scalar_at(
            "SELECT id, test_1, test_2 FROM named_basic WHERE id = :id",
            &named_args! { "id" => 1_i32 },
            2,
        )
        .await
        .unwrap();
    assert_eq!(test_2, "2");
}

#[tokio::test]
async fn named_execute_many_inserts_every_row() {
    let Some(pg) = try_connect().await else {
        return;
    };
    create_table(&pg, "named_many").await;

    let affected = pg
        .named_execute_many(
            "INSERT INTO named_many(id, test_1, test_2) VALUES (:id, :test_1, :test_2)",
            &[row_args(1, "1", "2"), row_args(2, "3", "4"), row_args(3, "5", "6")],
        )
        .await
        .unwrap();
    assert_eq!(affected, 3);

    let count: i64 = pg
        .named_fetch_scalar("SELECT count(*) FROM named_many", &NamedArgs::new())
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn prepared_statement_fetch_and_stream() {
    let Some(pg) = try_connect().await else {
        return;
    };
    create_table(&pg, "named_prepared").await;
    pg.named_execute_many(
        "INSERT INTO named_prepared(id, test_1, test_2) VALUES (:id, :test_1, :test_2)",
        &[row_args(1, "a", "b"), row_args(2, "c", "d")],
    )
    .await
    .unwrap();

    let stmt = pg
        .prepare("SELECT id, test_1, test_2 FROM named_prepared WHERE id >= :min ORDER BY id")
        .await
        .unwrap();
    assert!(stmt.is_prepared());

    let rows: Vec<TestRow> = stmt
        .fetch_all_as(&pg, &named_args! { "min" => 1_i32 })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let streamed: Vec<Row> = stmt
        .stream(&pg, &named_args! { "min" => 2_i32 })
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(streamed.len(), 1);

    stmt.release();
}

#[tokio::test]
async fn cursor_fetches_in_batches() {
    let Some(mut pg) = try_connect().await.map(NamedClient::into_inner) else {
        return;
    };
    let tx = pg.transaction().await.unwrap();

    let stmt = pgnamed::NamedStatement::prepare(&tx, "SELECT g FROM generate_series(1, :n) g")
        .await
        .unwrap();
    let mut cursor = stmt
        .cursor(&tx, &named_args! { "n" => 7_i32 }, Some(3))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Some(row) = cursor.next().await.unwrap() {
        seen.push(row.try_get_index::<i32>(0).unwrap());
    }
    assert_eq!(seen, (1..=7).collect::<Vec<_>>());
    assert!(cursor.is_exhausted());
    drop(cursor);

    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn named_cursor_uses_configured_prefetch() {
    let Some(mut pg) = try_connect().await.map(NamedClient::into_inner) else {
        return;
    };
    let tx = NamedClient::with_config(
        pg.transaction().await.unwrap(),
        ClientConfig::new().cursor_prefetch(2),
    );

    let mut cursor = tx
        .named_cursor("SELECT g FROM generate_series(1, :n) g", &named_args! { "n" => 5_i32 })
        .await
        .unwrap();
    assert_eq!(cursor.prefetch(), 2);

    let first = cursor.fetch(3).await.unwrap();
    assert_eq!(first.len(), 3);
    let rest: Vec<(i32,)> = {
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_as::<(i32,)>().await.unwrap() {
            rows.push(row);
        }
        rows
    };
    assert_eq!(rest, [(4,), (5,)]);
    drop(cursor);

    tx.into_inner().rollback().await.unwrap();
}

#[tokio::test]
async fn connect_errors_come_from_the_driver() {
    let err = pgnamed::connect("postgres://u@127.0.0.1:1/db")
        .await
        .err()
        .expect("nothing listens on port 1");
    assert!(matches!(err, NamedError::Query(_)));
}

#[tokio::test]
async fn driver_errors_pass_through() {
    let Some(pg) = try_connect().await else {
        return;
    };

    let err = pg
        .named_fetch("SELECT * FROM no_such_table WHERE id = :id", &named_args! { "id" => 1_i32 })
        .await
        .unwrap_err();
    assert!(matches!(err, NamedError::Query(_)));
    assert!(err.as_db_error().is_some());
}
