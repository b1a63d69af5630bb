//! Connection-mode semantics against the fake driver.

use tessera_core::error::Error;
use tessera_core::mode::{DbMode, ExecutionType, ReadWriteMode};
use tessera_testing::FakeDb;

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_standard_mode_opens_and_closes_per_operation() {
    let fake = FakeDb::new("postgres");
    let context = fake.context(DbMode::Standard, ReadWriteMode::ReadWrite).unwrap();

    for _ in 0..3 {
        let conn = context
            .strategy()
            .get_connection(ExecutionType::Read)
            .await
            .unwrap();
        assert!(!conn.is_persistent());
        context.strategy().release(Some(conn)).await;
    }
    assert_eq!(fake.connections_opened(), 3);
    assert_eq!(fake.connections_open_now(), 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_keep_alive_reuses_pinned_when_idle() {
    let fake = FakeDb::new("postgres");
    let context = fake.context(DbMode::KeepAlive, ReadWriteMode::ReadWrite).unwrap();

    let first = context
        .strategy()
        .get_connection(ExecutionType::Read)
        .await
        .unwrap();
    assert!(first.is_persistent());
    let pinned_id = first.id();

    // The pinned connection is busy; the second operation borrows fresh.
    let second = context
        .strategy()
        .get_connection(ExecutionType::Write)
        .await
        .unwrap();
    assert!(!second.is_persistent());
    assert_ne!(second.id(), pinned_id);

    context.strategy().release(Some(second)).await;
    context.strategy().release(Some(first)).await;

    // Idle again: the pinned connection serves the next operation.
    let third = context
        .strategy()
        .get_connection(ExecutionType::Read)
        .await
        .unwrap();
    assert_eq!(third.id(), pinned_id);
    context.strategy().release(Some(third)).await;

    context.dispose().await;
    assert_eq!(fake.connections_open_now(), 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_single_writer_routes_reads_to_fresh_connections() {
    let fake = FakeDb::new("postgres");
    let context = fake
        .context(DbMode::SingleWriter, ReadWriteMode::ReadWrite)
        .unwrap();

    let writer = context
        .strategy()
        .get_connection(ExecutionType::Write)
        .await
        .unwrap();
    assert!(writer.is_persistent());

    let reader = context
        .strategy()
        .get_connection(ExecutionType::Read)
        .await
        .unwrap();
    assert!(!reader.is_persistent());
    assert_ne!(reader.id(), writer.id());

    context.strategy().release(Some(reader)).await;
    context.strategy().release(Some(writer)).await;
    context.dispose().await;
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_single_connection_serves_all_traffic() {
    let fake = FakeDb::new("sqlite");
    let context = fake
        .context(DbMode::SingleConnection, ReadWriteMode::ReadWrite)
        .unwrap();

    let a = context
        .strategy()
        .get_connection(ExecutionType::Read)
        .await
        .unwrap();
    let id = a.id();
    context.strategy().release(Some(a)).await;
    let b = context
        .strategy()
        .get_connection(ExecutionType::Write)
        .await
        .unwrap();
    assert_eq!(b.id(), id);
    context.strategy().release(Some(b)).await;
    assert_eq!(fake.connections_opened(), 1);
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_single_connection_read_only_rejected_at_construction() {
    let fake = FakeDb::new("sqlite");
    let err = fake
        .context(DbMode::SingleConnection, ReadWriteMode::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_read_only_context_rejects_writes() {
    let fake = FakeDb::new("postgres");
    let context = fake.context(DbMode::Standard, ReadWriteMode::ReadOnly).unwrap();
    let err = context
        .strategy()
        .get_connection(ExecutionType::Write)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
    assert_eq!(fake.connections_opened(), 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_single_writer_read_only_applies_settings_to_pinned_writer() {
    // SingleWriter + read-only is allowed; the pinned writer carries the
    // read-only session settings.
    let fake = FakeDb::new("sqlite");
    let context = fake
        .context(DbMode::SingleWriter, ReadWriteMode::ReadOnly)
        .unwrap();
    let reader = context
        .strategy()
        .get_connection(ExecutionType::Read)
        .await
        .unwrap();
    assert!(reader.settings_applied());
    context.strategy().release(Some(reader)).await;

    let pragmas = fake.executed_matching("PRAGMA query_only");
    assert_eq!(pragmas.len(), 1);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_session_settings_applied_once_per_connection() {
    let fake = FakeDb::new("oracle");
    let context = fake.context(DbMode::KeepAlive, ReadWriteMode::ReadWrite).unwrap();

    for _ in 0..3 {
        let conn = context
            .strategy()
            .get_connection(ExecutionType::Read)
            .await
            .unwrap();
        assert!(conn.settings_applied());
        context.strategy().release(Some(conn)).await;
    }
    // One pinned connection, one settings application.
    assert_eq!(fake.executed_matching("NLS_DATE_FORMAT").len(), 1);
    context.dispose().await;
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_release_none_is_noop() {
    let fake = FakeDb::new("postgres");
    let context = fake.context(DbMode::Standard, ReadWriteMode::ReadWrite).unwrap();
    context.strategy().release(None).await;
    assert_eq!(fake.connections_opened(), 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_version_detection_initialises_dialect() {
    use tessera_testing::{FakeResponse, single_cell};
    use tessera_types::DbValue;

    let fake = FakeDb::new("postgres");
    fake.when(
        "SELECT version()",
        FakeResponse::Rows(single_cell(
            "version",
            DbValue::from("PostgreSQL 15.4 on x86_64-pc-linux-gnu"),
        )),
    );
    let context = fake.standard_context().unwrap();
    context
        .initialize(&tokio_util::sync::CancellationToken::new())
        .await
        .unwrap();
    assert!(context.dialect().is_initialized());
    assert_eq!(
        context.dialect().version().map(|v| (v.major, v.minor)),
        Some((15, 4))
    );
    // The bootstrap connection never applies session settings.
    assert!(fake.executed_matching("standard_conforming_strings").is_empty());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_version_detection_exhaustion_yields_empty_product() {
    use tessera_testing::FakeResponse;

    let fake = FakeDb::new("firebird");
    fake.when(
        "rdb$get_context",
        FakeResponse::Error(tessera_core::DriverError::message("not supported")),
    );
    fake.when(
        "mon$database",
        FakeResponse::Error(tessera_core::DriverError::message("no monitor table")),
    );
    let context = fake.standard_context().unwrap();
    context
        .initialize(&tokio_util::sync::CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(context.dialect().product_banner().as_deref(), Some(""));
    // Conservative capabilities persist after exhaustion.
    assert!(!context.dialect().supports_merge());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_disposed_context_rejects_operations() {
    let fake = FakeDb::new("postgres");
    let context = fake.standard_context().unwrap();
    context.dispose().await;
    assert!(matches!(
        context.ensure_live(),
        Err(Error::InvalidState(_))
    ));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_admission_governor_saturates() {
    use tessera_core::context::{DatabaseContextConfiguration, shared_type_registry};
    use tessera_core::DatabaseContext;
    use std::sync::Arc;

    let fake = FakeDb::new("postgres");
    let config = DatabaseContextConfiguration::new()
        .connection_string("Host=fake")
        .provider_name("postgres")
        .max_concurrent_operations(1)
        .admission_timeout(std::time::Duration::from_millis(30));
    let context = DatabaseContext::new(config, Arc::new(fake.clone()), shared_type_registry()).unwrap();

    let governor = context.admission().unwrap();
    let cancel = tokio_util::sync::CancellationToken::new();
    let held = governor.acquire(&cancel).await.unwrap();

    // A governed operation cannot be admitted while the permit is held.
    let mut container = tessera_core::SqlContainer::new(Arc::clone(&context));
    container.append_query("SELECT 1");
    let err = container.execute_scalar_async(&cancel).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PoolSaturated(tessera_core::PoolError::Saturated { .. })
    ));
    assert_eq!(governor.total_timeouts(), 1);
    drop(held);
}
