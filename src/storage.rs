use crate::models::Record;
use futures_util::stream::Stream;
use sqlx::{Row, SqlitePool};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const PAGE_SIZE: i64 = 100;

type EnvelopeRow = (i64, String, i64, i64, i64, i64, Vec<u8>, i64);

pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record, sqlx::Error>> + Send>>;

/// Append-only envelope log.
///
/// Subscribers poll the log every `poll_interval` and are woken early
/// whenever an envelope is appended.
pub struct Storage {
    pool: SqlitePool,
    appended: Arc<Notify>,
    poll_interval: Duration,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_poll_interval(pool, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(pool: SqlitePool, poll_interval: Duration) -> Self {
        Self {
            pool,
            appended: Arc::new(Notify::new()),
            poll_interval,
        }
    }

    /// Appends an envelope and returns the ordinal the log assigned to it.
    pub async fn append(&self, record: &Record) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO envelopes (session, kind, source, dest, tag, payload, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING ordinal",
        )
        .bind(&record.session)
        .bind(record.kind)
        .bind(record.source as i64)
        .bind(record.dest)
        .bind(record.tag as i64)
        .bind(&record.payload)
        .bind(record.timestamp)
        .fetch_one(&self.pool)
        .await?;

        let ordinal: i64 = result.get("ordinal");
        self.appended.notify_waiters();
        Ok(ordinal as u64)
    }

    /// Number of envelopes logged for `session`.
    pub async fn session_len(&self, session: &str) -> Result<u64, sqlx::Error> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM envelopes WHERE session = ?")
            .bind(session)
            .fetch_one(&self.pool)
            .await?
            .get("n");
        Ok(count as u64)
    }

    /// Streams every envelope of `session` addressed to `rank` with an
    /// ordinal above `ordinal`, then keeps streaming new ones as they land.
    pub fn subscribe_from(&self, session: String, rank: u32, ordinal: u64) -> RecordStream {
        let pool = self.pool.clone();
        let appended = Arc::clone(&self.appended);
        let poll_interval = self.poll_interval;

        Box::pin(async_stream::stream! {
            let mut ordinal = ordinal as i64;

            loop {
                let notified = appended.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                let rows = sqlx::query_as::<_, EnvelopeRow>(
                    "SELECT ordinal, session, kind, source, dest, tag, payload, timestamp
                     FROM envelopes
                     WHERE session = ? AND ordinal > ?
                       AND (dest = ? OR (dest = -1 AND source != ?))
                     ORDER BY ordinal LIMIT ?",
                )
                .bind(&session)
                .bind(ordinal)
                .bind(rank as i64)
                .bind(rank as i64)
                .bind(PAGE_SIZE)
                .fetch_all(&pool)
                .await;

                let rows = match rows {
                    Ok(rows) => rows,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };

                if rows.is_empty() {
                    let _ = tokio::time::timeout(poll_interval, notified).await;
                    continue;
                }

                for (ord, row_session, kind, source, dest, tag, payload, timestamp) in rows {
                    ordinal = ord;
                    yield Ok(Record {
                        ordinal: ord as u64,
                        session: row_session,
                        kind: kind as i32,
                        source: source as u32,
                        dest: dest as i32,
                        tag: tag as u64,
                        payload,
                        timestamp,
                    });
                }
            }
        })
    }
}
