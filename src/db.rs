use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{Sqlite, SqlitePool, SqlitePoolOptions},
    Pool,
};

pub type DbPool = Pool<Sqlite>;

pub async fn ensure_database_file(url: &str) -> Result<(), sqlx::Error> {
    let exists = Sqlite::database_exists(url).await?;

    if !exists {
        Sqlite::create_database(url).await?;
    }

    Ok(())
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    // Every connection to an in-memory url opens its own database, so the
    // pool is pinned to one connection that never expires.
    let pool = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?
    } else {
        ensure_database_file(database_url).await?;
        SqlitePool::connect(database_url).await?
    };

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS envelopes (
            ordinal INTEGER PRIMARY KEY AUTOINCREMENT,
            session TEXT NOT NULL,
            kind INTEGER NOT NULL,
            source INTEGER NOT NULL,
            dest INTEGER NOT NULL,
            tag INTEGER NOT NULL,
            payload BLOB NOT NULL,
            timestamp INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS envelopes_session ON envelopes (session, ordinal)")
        .execute(&pool)
        .await?;

    Ok(pool)
}
