//! Relay cycle integration tests against a real PostgreSQL.

mod common;

use common::{record, setup_test_db, CountingReporter, FailingSink, RecordingSink, SleepySink};
use eventline_application::OutboxAppender;
use eventline_domain::outbox::{EventContext, EventRecordDraft, OutboxRepository};
use eventline_domain::reporting::NoopReporter;
use eventline_infrastructure::{
    BackoffConfig, OutboxRelay, PostgresOutboxRepository, RelayConfig, RelayError,
};
use std::sync::Arc;
use std::time::Duration;

fn relay_with_sink(
    pool: sqlx::PgPool,
    sink: Arc<dyn eventline_domain::sink::EventLogSink>,
) -> OutboxRelay {
    OutboxRelay::new(
        pool,
        sink,
        Arc::new(NoopReporter),
        RelayConfig::default(),
    )
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn empty_cycle_returns_zero_without_touching_the_sink() {
    let pool = setup_test_db().await;
    let sink = Arc::new(RecordingSink::new());
    let relay = relay_with_sink(pool, sink.clone());

    let relayed = relay.run_cycle(100).await.unwrap();

    assert_eq!(relayed, 0);
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn cycle_relays_at_most_batch_size_records() {
    let pool = setup_test_db().await;
    let repo = PostgresOutboxRepository::new(pool.clone());

    let records: Vec<_> = (0..8).map(|i| record(&format!("event_{i}"))).collect();
    repo.append_chunked(&records, 100).await.unwrap();

    let sink = Arc::new(RecordingSink::new());
    let relay = relay_with_sink(pool, sink.clone());

    let relayed = relay.run_cycle(5).await.unwrap();

    assert_eq!(relayed, 5);
    assert_eq!(sink.call_count(), 1);
    assert_eq!(repo.count_pending().await.unwrap(), 3);

    // Records appended after a cycle started belong to the next one.
    let relayed = relay.run_cycle(5).await.unwrap();
    assert_eq!(relayed, 3);
    assert_eq!(repo.count_pending().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn sink_failure_marks_nothing() {
    let pool = setup_test_db().await;
    let repo = PostgresOutboxRepository::new(pool.clone());

    let records: Vec<_> = (0..1000).map(|i| record(&format!("event_{i}"))).collect();
    repo.append_chunked(&records, 500).await.unwrap();

    let sink = Arc::new(FailingSink::new());
    let relay = relay_with_sink(pool, sink.clone());

    let err = relay.run_cycle(1000).await.unwrap_err();

    assert!(matches!(err, RelayError::Sink(_)));
    assert_eq!(sink.call_count(), 1);
    assert_eq!(repo.count_pending().await.unwrap(), 1000);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn appended_records_flow_end_to_end() {
    let pool = setup_test_db().await;
    let repo = Arc::new(PostgresOutboxRepository::new(pool.clone()));
    let appender = OutboxAppender::new(repo.clone(), "test");

    let mut tx = pool.begin().await.unwrap();
    for i in 0..5 {
        let draft = EventRecordDraft::new(
            "user_created",
            EventContext::new().with("sequence", i as i64),
        );
        appender.append(&mut tx, draft).await.unwrap();
    }
    tx.commit().await.unwrap();

    let sink = Arc::new(RecordingSink::new());
    let relay = relay_with_sink(pool, sink.clone());

    let relayed = relay.run_cycle(10).await.unwrap();

    assert_eq!(relayed, 5);
    let rows = sink.rows();
    assert_eq!(rows.len(), 5);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.event_type, "user_created");
        assert_eq!(row.environment, "test");
        assert_eq!(row.event_context, format!(r#"{{"sequence":{i}}}"#));
        assert_eq!(row.metadata_version, 1);
    }
    assert_eq!(repo.count_pending().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn append_many_chunks_large_backfills() {
    let pool = setup_test_db().await;
    let repo = Arc::new(PostgresOutboxRepository::new(pool.clone()));
    let appender = OutboxAppender::new(repo.clone(), "test");

    let drafts: Vec<_> = (0..5000)
        .map(|i| {
            EventRecordDraft::new(
                "log_line",
                EventContext::new().with("sequence", i as i64),
            )
        })
        .collect();

    let written = appender.append_many(drafts, 1000).await.unwrap();

    assert_eq!(written, 5000);
    assert_eq!(repo.count_pending().await.unwrap(), 5000);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn concurrent_cycles_never_relay_the_same_record_twice() {
    let pool = setup_test_db().await;
    let repo = PostgresOutboxRepository::new(pool.clone());

    let records: Vec<_> = (0..100).map(|i| record(&format!("event_{i}"))).collect();
    repo.append_chunked(&records, 100).await.unwrap();

    let sink = Arc::new(RecordingSink::new());
    let relay_a = relay_with_sink(pool.clone(), sink.clone());
    let relay_b = relay_with_sink(pool.clone(), sink.clone());

    let (a, b) = tokio::join!(relay_a.run_cycle(60), relay_b.run_cycle(60));
    let total = a.unwrap() + b.unwrap();

    assert_eq!(total, 100);
    assert_eq!(repo.count_pending().await.unwrap(), 0);

    let mut types: Vec<String> = sink.rows().iter().map(|r| r.event_type.clone()).collect();
    types.sort();
    types.dedup();
    assert_eq!(types.len(), 100);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn exhausted_retries_surface_the_failure_to_the_reporter() {
    let pool = setup_test_db().await;
    let repo = PostgresOutboxRepository::new(pool.clone());
    repo.append_chunked(&[record("evt")], 10).await.unwrap();

    let sink = Arc::new(FailingSink::new());
    let reporter = Arc::new(CountingReporter::new());
    let relay = OutboxRelay::new(
        pool,
        sink.clone(),
        reporter.clone(),
        RelayConfig {
            backoff: BackoffConfig::new(0, 0, 0.0, 2),
            ..RelayConfig::default()
        },
    );

    let err = relay.run_cycle_with_retry(10).await.unwrap_err();

    assert!(matches!(err, RelayError::Sink(_)));
    // Initial attempt plus max_retries.
    assert_eq!(sink.call_count(), 3);
    assert_eq!(reporter.capture_count(), 1);
    assert_eq!(repo.count_pending().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn failed_marking_is_reported_and_never_retried() {
    let pool = setup_test_db().await;
    let repo = PostgresOutboxRepository::new(pool.clone());
    repo.append_chunked(&[record("evt")], 10).await.unwrap();

    // Make the processed-flag update fail while claiming and the sink
    // insert still succeed.
    sqlx::query(
        r#"
        CREATE FUNCTION refuse_update() RETURNS trigger AS $$
        BEGIN RAISE EXCEPTION 'marking disabled'; END;
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER refuse_mark BEFORE UPDATE ON outbox
         FOR EACH ROW EXECUTE FUNCTION refuse_update()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let sink = Arc::new(RecordingSink::new());
    let reporter = Arc::new(CountingReporter::new());
    let relay = OutboxRelay::new(
        pool.clone(),
        sink.clone(),
        reporter.clone(),
        RelayConfig {
            backoff: BackoffConfig::new(0, 0, 0.0, 3),
            ..RelayConfig::default()
        },
    );

    let err = relay.run_cycle_with_retry(10).await.unwrap_err();

    assert!(matches!(err, RelayError::MarkingInconsistency { inserted: 1, .. }));
    // The sink already holds the batch; a retry would only duplicate it.
    assert_eq!(sink.call_count(), 1);
    assert_eq!(reporter.capture_count(), 1);

    sqlx::query("DROP TRIGGER refuse_mark ON outbox")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(repo.count_pending().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn slow_sink_times_out_with_nothing_marked() {
    let pool = setup_test_db().await;
    let repo = PostgresOutboxRepository::new(pool.clone());

    let records: Vec<_> = (0..3).map(|i| record(&format!("event_{i}"))).collect();
    repo.append_chunked(&records, 10).await.unwrap();

    let relay = OutboxRelay::new(
        pool,
        Arc::new(SleepySink {
            delay: Duration::from_secs(5),
        }),
        Arc::new(NoopReporter),
        RelayConfig {
            cycle_timeout: Duration::from_millis(50),
            backoff: BackoffConfig::new(0, 0, 0.0, 0),
            ..RelayConfig::default()
        },
    );

    let err = relay.run_cycle(10).await.unwrap_err();

    assert!(matches!(err, RelayError::SinkTimeout(_)));
    assert_eq!(repo.count_pending().await.unwrap(), 3);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn untransformable_record_stays_pending_while_others_relay() {
    let pool = setup_test_db().await;
    let repo = PostgresOutboxRepository::new(pool.clone());

    // A payload with a null value cannot be transformed into a sink row.
    sqlx::query(
        "INSERT INTO outbox (event_type, event_date_time, environment, event_context, metadata_version)
         VALUES ($1, NOW(), $2, $3, 1)",
    )
    .bind("broken_event")
    .bind("test")
    .bind(sqlx::types::Json(serde_json::json!({"email": null})))
    .execute(&pool)
    .await
    .unwrap();

    repo.append_chunked(&[record("good_event")], 10).await.unwrap();

    let sink = Arc::new(RecordingSink::new());
    let relay = relay_with_sink(pool, sink.clone());

    let relayed = relay.run_cycle(10).await.unwrap();

    assert_eq!(relayed, 1);
    assert_eq!(sink.rows().len(), 1);
    assert_eq!(sink.rows()[0].event_type, "good_event");
    assert_eq!(repo.count_pending().await.unwrap(), 1);
}
