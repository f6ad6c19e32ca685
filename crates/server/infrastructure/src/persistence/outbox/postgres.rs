//! PostgreSQL Event Record Store
//!
//! SQLx-based implementation of `OutboxRepository`. Claiming uses
//! `FOR UPDATE SKIP LOCKED` so overlapping relay cycles never select the
//! same rows; the locks live as long as the claiming transaction.

use eventline_domain::outbox::{
    EventRecordInsert, EventRecordView, OutboxError, OutboxRepository, OutboxStats,
};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, PgTransaction, QueryBuilder};

/// Row struct for outbox queries.
#[derive(FromRow)]
struct OutboxRow {
    id: i64,
    event_type: String,
    event_date_time: chrono::DateTime<chrono::Utc>,
    environment: String,
    event_context: sqlx::types::Json<serde_json::Value>,
    metadata_version: i64,
    processed: bool,
}

impl From<OutboxRow> for EventRecordView {
    fn from(row: OutboxRow) -> Self {
        EventRecordView {
            id: row.id,
            event_type: row.event_type,
            event_date_time: row.event_date_time,
            environment: row.environment,
            event_context: row.event_context.0,
            metadata_version: row.metadata_version,
            processed: row.processed,
        }
    }
}

/// PostgreSQL implementation of the event record store.
pub struct PostgresOutboxRepository {
    pool: PgPool,
}

impl PostgresOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations for the outbox table.
    pub async fn run_migrations(&self) -> Result<(), OutboxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS outbox (
                id BIGSERIAL PRIMARY KEY,
                event_type VARCHAR(255) NOT NULL,
                event_date_time TIMESTAMPTZ NOT NULL,
                environment VARCHAR(255) NOT NULL,
                event_context JSONB NOT NULL,
                metadata_version BIGINT NOT NULL DEFAULT 1,
                processed BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_outbox_pending
            ON outbox (id)
            WHERE processed = FALSE
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn push_insert<'a>(qb: &mut QueryBuilder<'a, sqlx::Postgres>, records: &'a [EventRecordInsert]) {
        qb.push_values(records, |mut b, record| {
            b.push_bind(&record.event_type);
            b.push_bind(record.event_date_time);
            b.push_bind(&record.environment);
            b.push_bind(sqlx::types::Json(&record.event_context));
            b.push_bind(record.metadata_version);
            b.push_bind(false);
        });
    }
}

#[async_trait::async_trait]
impl OutboxRepository for PostgresOutboxRepository {
    async fn append_with_tx(
        &self,
        tx: &mut PgTransaction<'_>,
        records: &[EventRecordInsert],
    ) -> Result<(), OutboxError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            "INSERT INTO outbox (event_type, event_date_time, environment, event_context, metadata_version, processed) ",
        );
        Self::push_insert(&mut qb, records);
        qb.build().execute(&mut **tx).await?;

        Ok(())
    }

    async fn append_chunked(
        &self,
        records: &[EventRecordInsert],
        chunk_size: usize,
    ) -> Result<u64, OutboxError> {
        let chunk_size = chunk_size.max(1);
        let mut inserted = 0u64;

        for chunk in records.chunks(chunk_size) {
            let mut tx = self.pool.begin().await?;
            self.append_with_tx(&mut tx, chunk).await?;
            tx.commit().await?;

            inserted += chunk.len() as u64;
            tracing::debug!(chunk_len = chunk.len(), "Inserted outbox chunk");
        }

        Ok(inserted)
    }

    async fn claim_pending(
        &self,
        tx: &mut PgTransaction<'_>,
        limit: usize,
    ) -> Result<Vec<EventRecordView>, OutboxError> {
        let rows: Vec<OutboxRow> = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, event_type, event_date_time, environment,
                   event_context, metadata_version, processed
            FROM outbox
            WHERE processed = FALSE
            ORDER BY id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows.into_iter().map(EventRecordView::from).collect())
    }

    async fn mark_processed(
        &self,
        tx: &mut PgTransaction<'_>,
        ids: &[i64],
    ) -> Result<u64, OutboxError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE outbox
            SET processed = TRUE
            WHERE id = ANY($1) AND processed = FALSE
            "#,
        )
        .bind(ids)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_pending(&self) -> Result<u64, OutboxError> {
        #[derive(FromRow)]
        struct CountRow {
            count: i64,
        }

        let result: CountRow = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT COUNT(*) as count
            FROM outbox
            WHERE processed = FALSE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(result.count as u64)
    }

    async fn stats(&self) -> Result<OutboxStats, OutboxError> {
        #[derive(FromRow)]
        struct StatsRow {
            pending_count: Option<i64>,
            processed_count: Option<i64>,
            oldest_pending_age_seconds: Option<i64>,
        }

        let result: StatsRow = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                COUNT(CASE WHEN processed = FALSE THEN 1 END) as pending_count,
                COUNT(CASE WHEN processed = TRUE THEN 1 END) as processed_count,
                CAST(MIN(CASE WHEN processed = FALSE
                    THEN EXTRACT(EPOCH FROM (NOW() - event_date_time)) END) AS BIGINT)
                    as oldest_pending_age_seconds
            FROM outbox
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OutboxStats {
            pending_count: result.pending_count.unwrap_or(0) as u64,
            processed_count: result.processed_count.unwrap_or(0) as u64,
            oldest_pending_age_seconds: result.oldest_pending_age_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{record, setup_test_db};
    use eventline_domain::outbox::OutboxRepository;

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn append_and_claim_in_id_order() {
        let pool = setup_test_db().await;
        let repo = PostgresOutboxRepository::new(pool.clone());

        let records: Vec<_> = (0..3).map(|i| record(&format!("evt_{i}"))).collect();
        repo.append_chunked(&records, 10).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let claimed = repo.claim_pending(&mut tx, 10).await.unwrap();
        assert_eq!(claimed.len(), 3);
        assert!(claimed.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(claimed[0].event_type, "evt_0");
        assert!(claimed.iter().all(|r| r.is_pending()));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn claim_respects_limit() {
        let pool = setup_test_db().await;
        let repo = PostgresOutboxRepository::new(pool.clone());

        let records: Vec<_> = (0..8).map(|i| record(&format!("evt_{i}"))).collect();
        repo.append_chunked(&records, 10).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let claimed = repo.claim_pending(&mut tx, 5).await.unwrap();
        assert_eq!(claimed.len(), 5);
        drop(tx);

        assert_eq!(repo.count_pending().await.unwrap(), 8);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn concurrent_claims_never_overlap() {
        let pool = setup_test_db().await;
        let repo = PostgresOutboxRepository::new(pool.clone());

        let records: Vec<_> = (0..10).map(|i| record(&format!("evt_{i}"))).collect();
        repo.append_chunked(&records, 10).await.unwrap();

        let mut tx_a = pool.begin().await.unwrap();
        let claimed_a = repo.claim_pending(&mut tx_a, 6).await.unwrap();

        // The second claim runs while the first transaction still holds its
        // row locks; SKIP LOCKED must hand back only the remainder.
        let mut tx_b = pool.begin().await.unwrap();
        let claimed_b = repo.claim_pending(&mut tx_b, 6).await.unwrap();

        assert_eq!(claimed_a.len(), 6);
        assert_eq!(claimed_b.len(), 4);
        let ids_a: std::collections::HashSet<i64> = claimed_a.iter().map(|r| r.id).collect();
        assert!(claimed_b.iter().all(|r| !ids_a.contains(&r.id)));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn mark_processed_flips_exactly_the_given_ids() {
        let pool = setup_test_db().await;
        let repo = PostgresOutboxRepository::new(pool.clone());

        let records: Vec<_> = (0..4).map(|i| record(&format!("evt_{i}"))).collect();
        repo.append_chunked(&records, 10).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let claimed = repo.claim_pending(&mut tx, 2).await.unwrap();
        let ids: Vec<i64> = claimed.iter().map(|r| r.id).collect();
        let marked = repo.mark_processed(&mut tx, &ids).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(marked, 2);
        assert_eq!(repo.count_pending().await.unwrap(), 2);

        // Marking is one-way: a second attempt on the same ids is a no-op.
        let mut tx = pool.begin().await.unwrap();
        let remarked = repo.mark_processed(&mut tx, &ids).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(remarked, 0);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn stats_counts_by_state() {
        let pool = setup_test_db().await;
        let repo = PostgresOutboxRepository::new(pool.clone());

        let records: Vec<_> = (0..5).map(|i| record(&format!("evt_{i}"))).collect();
        repo.append_chunked(&records, 10).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let claimed = repo.claim_pending(&mut tx, 2).await.unwrap();
        let ids: Vec<i64> = claimed.iter().map(|r| r.id).collect();
        repo.mark_processed(&mut tx, &ids).await.unwrap();
        tx.commit().await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.pending_count, 3);
        assert_eq!(stats.processed_count, 2);
        assert_eq!(stats.total(), 5);
        assert!(stats.oldest_pending_age_seconds.is_some());
    }
}
