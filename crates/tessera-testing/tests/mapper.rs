//! EntityMapper scenarios against the fake driver.

use tessera_core::error::Error;
use tessera_mapper::{AuditRole, Entity, EntityMapper, TableInfoBuilder};
use tessera_testing::{FakeDb, FakeResponse, rows, single_cell};
use tessera_types::{DbValue, LogicalType};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    version: i64,
}

impl Entity for User {
    fn table() -> TableInfoBuilder {
        TableInfoBuilder::table("users")
            .column("id", LogicalType::Int64)
            .id()
            .done()
            .column("name", LogicalType::Text)
            .done()
            .column("version", LogicalType::Int32)
            .version()
            .done()
    }

    fn get(&self, column: &str) -> DbValue {
        match column {
            "id" => DbValue::Int64(self.id),
            "name" => DbValue::Text(self.name.clone()),
            "version" => DbValue::Int64(self.version),
            _ => DbValue::Null,
        }
    }

    fn set(&mut self, column: &str, value: DbValue) {
        match column {
            "id" => self.id = value.as_i64().unwrap_or_default(),
            "name" => {
                if let DbValue::Text(v) = value {
                    self.name = v;
                }
            }
            "version" => self.version = value.as_i64().unwrap_or_default(),
            _ => {}
        }
    }
}

#[derive(Debug, Default)]
struct Note {
    id: i64,
    data: Option<String>,
}

impl Entity for Note {
    fn table() -> TableInfoBuilder {
        TableInfoBuilder::table("notes")
            .column("id", LogicalType::Int64)
            .id()
            .done()
            .column("data", LogicalType::Text)
            .nullable()
            .done()
    }

    fn get(&self, column: &str) -> DbValue {
        match column {
            "id" => DbValue::Int64(self.id),
            "data" => self.data.clone().map(DbValue::Text).unwrap_or(DbValue::Null),
            _ => DbValue::Null,
        }
    }

    fn set(&mut self, column: &str, value: DbValue) {
        match (column, value) {
            ("id", v) => self.id = v.as_i64().unwrap_or_default(),
            ("data", DbValue::Text(v)) => self.data = Some(v),
            ("data", DbValue::Null) => self.data = None,
            _ => {}
        }
    }
}

#[allow(clippy::unwrap_used)]
fn mapper_for<E: Entity + Default>(provider: &str) -> (FakeDb, EntityMapper<E>) {
    let fake = FakeDb::new(provider);
    let context = fake.standard_context().unwrap();
    let mapper = EntityMapper::new(context).unwrap();
    (fake, mapper)
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_upsert_on_sqlite_without_merge() {
    let (fake, mapper) = mapper_for::<User>("sqlite");
    let mut user = User {
        id: 1,
        name: "a".into(),
        version: 1,
    };

    let container = mapper.build_upsert(&mut user).unwrap();
    assert!(!container.query().contains("MERGE"));
    assert!(container.parameter_count() >= 3);

    // First attempt violates the unique constraint; the fallback UPDATE
    // runs and reports one affected row.
    fake.when_once(
        "INSERT INTO \"users\"",
        FakeResponse::Error(tessera_core::DriverError::message(
            "UNIQUE constraint failed: users.id",
        )),
    );
    fake.when("UPDATE \"users\"", FakeResponse::Affected(1));
    let affected = mapper
        .upsert_async(&mut user, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(fake.executed_matching("UPDATE \"users\"").len(), 1);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_upsert_on_sqlserver_uses_merge() {
    let (_fake, mapper) = mapper_for::<User>("mssql");
    let mut user = User {
        id: 1,
        name: "a".into(),
        version: 3,
    };
    let container = mapper.build_upsert(&mut user).unwrap();
    let sql = container.query();
    assert!(sql.contains("MERGE INTO [users]"));
    assert!(sql.contains("[src]"));
    assert!(sql.contains("WHEN MATCHED THEN UPDATE"));
    assert!(sql.contains("WHEN NOT MATCHED THEN INSERT"));
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_upsert_incoming_column_is_quoted_alias() {
    let (_fake, mapper) = mapper_for::<User>("firebird");
    assert_eq!(mapper.upsert_incoming_column("name"), "\"src\".\"name\"");
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_update_with_null_renders_literal() {
    let (_fake, mapper) = mapper_for::<Note>("postgres");
    let note = Note { id: 1, data: None };
    let container = mapper
        .build_update_async(&note, false, &CancellationToken::new())
        .await
        .unwrap();
    assert!(container.query().contains("\"data\" = NULL"));
    // Only the key binds; the NULL bypasses the parameter table.
    assert_eq!(container.parameter_count(), 1);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_update_version_clause_and_concurrency_failure() {
    let (fake, mapper) = mapper_for::<User>("postgres");
    let mut user = User {
        id: 1,
        name: "renamed".into(),
        version: 7,
    };
    let container = mapper
        .build_update_async(&user, false, &CancellationToken::new())
        .await
        .unwrap();
    let sql = container.query();
    assert!(sql.contains("\"version\" = :new_version"));
    assert!(sql.contains("\"version\" = :old_version"));
    assert_eq!(
        container.get_parameter_value("old_version"),
        Some(&DbValue::Int64(7))
    );
    assert_eq!(
        container.get_parameter_value("new_version"),
        Some(&DbValue::Int64(8))
    );

    fake.when("UPDATE \"users\"", FakeResponse::Affected(0));
    let err = mapper
        .update_async(&mut user, false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OptimisticConcurrency(_)));
    assert_eq!(user.version, 7);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_update_bumps_version_on_success() {
    let (fake, mapper) = mapper_for::<User>("postgres");
    fake.when("UPDATE \"users\"", FakeResponse::Affected(1));
    let mut user = User {
        id: 1,
        name: "renamed".into(),
        version: 7,
    };
    let affected = mapper
        .update_async(&mut user, false, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(user.version, 8);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_update_with_load_original_emits_only_changes() {
    let (fake, mapper) = mapper_for::<User>("postgres");
    fake.when(
        "SELECT \"id\", \"name\", \"version\" FROM \"users\"",
        FakeResponse::Rows(rows(
            &["id", "name", "version"],
            vec![vec![
                DbValue::Int64(1),
                DbValue::from("same-name"),
                DbValue::Int32(2),
            ]],
        )),
    );
    let user = User {
        id: 1,
        name: "same-name".into(),
        version: 2,
    };
    // Nothing differs apart from the version machinery; the name column
    // is suppressed, so no updatable change remains.
    let err = mapper
        .build_update_async(&user, true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_update_with_missing_original_fails() {
    let (_fake, mapper) = mapper_for::<User>("postgres");
    let user = User {
        id: 99,
        name: "ghost".into(),
        version: 1,
    };
    let err = mapper
        .build_update_async(&user, true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_retrieve_validation() {
    let (_fake, mapper) = mapper_for::<User>("sqlite");
    assert!(matches!(
        mapper.build_retrieve(&[], None),
        Err(Error::InvalidArgument(_))
    ));

    // SQLite caps bound parameters at 999.
    let ids: Vec<DbValue> = (0..1000).map(DbValue::Int64).collect();
    let err = mapper.build_retrieve(&ids, None).unwrap_err();
    assert!(err.to_string().contains("too many parameters"));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_delete_parameter_cap() {
    let (_fake, mapper) = mapper_for::<User>("sqlite");
    let ids: Vec<DbValue> = (0..1000).map(DbValue::Int64).collect();
    let err = mapper.build_delete(&ids).unwrap_err();
    assert!(err.to_string().contains("too many parameters"));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_load_single_none_on_empty_and_first_on_many() {
    let (fake, mapper) = mapper_for::<User>("postgres");
    let cancel = CancellationToken::new();

    let container = mapper.build_retrieve(&[DbValue::Int64(1)], None).unwrap();
    assert!(mapper
        .load_single_async(&container, &cancel)
        .await
        .unwrap()
        .is_none());

    fake.when(
        "FROM \"users\"",
        FakeResponse::Rows(rows(
            &["id", "name", "version"],
            vec![
                vec![DbValue::Int64(1), DbValue::from("first"), DbValue::Int32(1)],
                vec![DbValue::Int64(2), DbValue::from("second"), DbValue::Int32(1)],
            ],
        )),
    );
    let found = mapper
        .load_single_async(&container, &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "first");

    let all = mapper.load_list_async(&container, &cancel).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_create_on_postgres_uses_returning() {
    let (fake, mapper) = mapper_for::<User>("postgres");
    fake.when(
        "INSERT INTO \"users\"",
        FakeResponse::Rows(single_cell("id", DbValue::Int64(41))),
    );
    let mut user = User {
        id: 0,
        name: "fresh".into(),
        version: 0,
    };
    mapper
        .create_async(&mut user, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(user.id, 41);
    assert_eq!(user.version, 1);
    let insert = &fake.executed_matching("INSERT INTO \"users\"")[0];
    assert!(insert.sql.contains("RETURNING \"id\""));
    assert!(!insert.sql.contains("\"id\","), "id must not be inserted");
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_create_on_sqlserver_uses_output_inserted() {
    let (fake, mapper) = mapper_for::<User>("mssql");
    fake.when(
        "INSERT INTO [users]",
        FakeResponse::Rows(single_cell("id", DbValue::Int64(7))),
    );
    let mut user = User::default();
    user.name = "n".into();
    mapper
        .create_async(&mut user, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(user.id, 7);
    let insert = &fake.executed_matching("INSERT INTO [users]")[0];
    assert!(insert.sql.contains("OUTPUT INSERTED.[id]"));
    // OUTPUT precedes VALUES in the rendered statement.
    let output_at = insert.sql.find("OUTPUT").unwrap();
    let values_at = insert.sql.find("VALUES").unwrap();
    assert!(output_at < values_at);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_create_on_mysql_runs_session_scoped_follow_up() {
    let (fake, mapper) = mapper_for::<User>("mysql");
    fake.when("INSERT INTO `users`", FakeResponse::Affected(1));
    fake.when(
        "LAST_INSERT_ID",
        FakeResponse::Rows(single_cell("id", DbValue::Int64(99))),
    );
    let mut user = User::default();
    user.name = "n".into();
    mapper
        .create_async(&mut user, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(user.id, 99);

    // The follow-up ran on the same connection as the insert.
    let insert = &fake.executed_matching("INSERT INTO `users`")[0];
    let follow_up = &fake.executed_matching("LAST_INSERT_ID")[0];
    assert_eq!(insert.connection_id, follow_up.connection_id);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_create_null_last_id_leaves_default() {
    let (fake, mapper) = mapper_for::<User>("mysql");
    fake.when("INSERT INTO `users`", FakeResponse::Affected(1));
    fake.when(
        "LAST_INSERT_ID",
        FakeResponse::Rows(single_cell("id", DbValue::Null)),
    );
    let mut user = User::default();
    mapper
        .create_async(&mut user, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(user.id, 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_create_zero_affected_skips_follow_up() {
    let (fake, mapper) = mapper_for::<User>("mysql");
    fake.when("INSERT INTO `users`", FakeResponse::Affected(0));
    let mut user = User::default();
    mapper
        .create_async(&mut user, &CancellationToken::new())
        .await
        .unwrap();
    assert!(fake.executed_matching("LAST_INSERT_ID").is_empty());
}

#[derive(Debug, Default)]
struct Audited {
    id: i64,
    title: String,
    created_by: String,
    created_on: Option<chrono::NaiveDateTime>,
    updated_by: String,
}

impl Entity for Audited {
    fn table() -> TableInfoBuilder {
        TableInfoBuilder::table("documents")
            .column("id", LogicalType::Int64)
            .id()
            .done()
            .column("title", LogicalType::Text)
            .done()
            .column("created_by", LogicalType::Text)
            .audit(AuditRole::CreatedBy)
            .done()
            .column("created_on", LogicalType::DateTime)
            .audit(AuditRole::CreatedOn)
            .done()
            .column("updated_by", LogicalType::Text)
            .audit(AuditRole::LastUpdatedBy)
            .done()
    }

    fn get(&self, column: &str) -> DbValue {
        match column {
            "id" => DbValue::Int64(self.id),
            "title" => DbValue::Text(self.title.clone()),
            "created_by" => DbValue::Text(self.created_by.clone()),
            "created_on" => self
                .created_on
                .map(DbValue::DateTime)
                .unwrap_or(DbValue::Null),
            "updated_by" => DbValue::Text(self.updated_by.clone()),
            _ => DbValue::Null,
        }
    }

    fn set(&mut self, column: &str, value: DbValue) {
        match (column, value) {
            ("id", v) => self.id = v.as_i64().unwrap_or_default(),
            ("title", DbValue::Text(v)) => self.title = v,
            ("created_by", DbValue::Text(v)) => self.created_by = v,
            ("created_on", DbValue::DateTime(v)) => self.created_on = Some(v),
            ("updated_by", DbValue::Text(v)) => self.updated_by = v,
            _ => {}
        }
    }
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_audit_columns_on_create_and_update() {
    let (_fake, mapper) = mapper_for::<Audited>("postgres");
    assert!(mapper.info().has_audit_columns);

    let mut doc = Audited {
        title: "spec".into(),
        ..Audited::default()
    };
    let create = mapper.build_create(&mut doc).unwrap();
    assert_eq!(doc.created_by, "system");
    assert_eq!(doc.updated_by, "system");
    assert!(doc.created_on.is_some());
    assert!(create.query().contains("\"created_by\""));

    // Updates refresh LastUpdated* but never touch Created*.
    let update = mapper
        .build_update_async(&doc, false, &CancellationToken::new())
        .await
        .unwrap();
    let sql = update.query();
    assert!(sql.contains("\"updated_by\""));
    assert!(!sql.contains("\"created_by\""));
    assert!(!sql.contains("\"created_on\""));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_read_only_context_rejects_create() {
    use tessera_core::mode::{DbMode, ReadWriteMode};
    let fake = FakeDb::new("postgres");
    let context = fake.context(DbMode::Standard, ReadWriteMode::ReadOnly).unwrap();
    let mapper: EntityMapper<User> = EntityMapper::new(context).unwrap();
    let mut user = User::default();
    assert!(matches!(
        mapper.build_create(&mut user),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_retrieve_with_alias() {
    let (_fake, mapper) = mapper_for::<User>("postgres");
    let container = mapper
        .build_retrieve(&[DbValue::Int64(1)], Some("u"))
        .unwrap();
    let sql = container.query();
    assert!(sql.contains("FROM \"users\" \"u\""));
    assert!(sql.contains("\"u\".\"id\" IN"));
}
