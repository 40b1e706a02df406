use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Timestamps are stored as RFC3339 text and dates as YYYY-MM-DD text so that
// values round-trip exactly as the ingestion layer produced them.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_tickers_and_dividends",
        sql: r#"
CREATE TABLE IF NOT EXISTS tickers (
    symbol TEXT PRIMARY KEY,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TEXT NOT NULL,
    last_dividend_update TEXT,
    last_polygon_call TEXT
);

CREATE TABLE IF NOT EXISTS dividends (
    ticker TEXT NOT NULL,
    dividend_key TEXT NOT NULL,
    declaration_date TEXT,
    record_date TEXT,
    ex_dividend_date TEXT NOT NULL,
    pay_date TEXT,
    amount DOUBLE NOT NULL,
    currency TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    type TEXT NOT NULL,
    polygon_id TEXT,
    data_source TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY(ticker, dividend_key)
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_dividends_ex_date ON dividends(ex_dividend_date);
CREATE INDEX IF NOT EXISTS idx_tickers_active ON tickers(is_active);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
