use sqlx::{Connection, PgConnection};

/// Open a dedicated connection. Callers own it for one unit of work.
pub async fn connect(url: &str) -> Result<PgConnection, sqlx::Error> {
    PgConnection::connect(url).await
}

pub async fn health_check(conn: &mut PgConnection) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()")
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.0)
}

/// `json` rather than `jsonb`: the document keeps its field order.
pub async fn ensure_messages_table(conn: &mut PgConnection, table: &str) -> Result<(), sqlx::Error> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id          BIGSERIAL PRIMARY KEY,
            document    JSON NOT NULL,
            inserted_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#
    );
    sqlx::query(&ddl).execute(&mut *conn).await?;
    Ok(())
}

/// Plain SQL identifier: ASCII letter or underscore, then letters, digits or
/// underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
