use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (donation_items)");
        conn.execute_batch(
            "
            CREATE TABLE donation_items (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id      INTEGER,
                session_token   TEXT,
                form_id         INTEGER NOT NULL,
                entry_id        INTEGER NOT NULL UNIQUE,
                amount_cents    INTEGER NOT NULL CHECK (amount_cents >= 0),
                label           TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                CHECK ((account_id IS NULL) <> (session_token IS NULL))
            );

            CREATE INDEX idx_donation_items_account
                ON donation_items(account_id, created_at);

            CREATE INDEX idx_donation_items_session
                ON donation_items(session_token, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
