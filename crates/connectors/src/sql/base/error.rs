use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Postgres driver error, with the server's SQLSTATE and message when
    /// the server sent one.
    #[error("Postgres error: {}", describe_pg(.0))]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// A column value could not be decoded into a `Value`.
    #[error("Decode error for column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Writing rows to the database failed at the application level.
    #[error("Write error: {0}")]
    Write(String),

    /// A result set could not be turned into a batch.
    #[error("Query error: {0}")]
    Query(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors happening during adapter or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Postgres connection failed: {}", describe_pg(.0))]
    Postgres(#[from] tokio_postgres::Error),

    #[error("MySQL connection failed: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
}

/// `tokio_postgres` displays server errors as a bare "db error"; pull out the
/// code, message and detail instead.
fn describe_pg(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => describe_server_error(
            db.severity(),
            db.code().code(),
            db.message(),
            db.detail(),
        ),
        None => err.to_string(),
    }
}

fn describe_server_error(
    severity: &str,
    code: &str,
    message: &str,
    detail: Option<&str>,
) -> String {
    match detail {
        Some(detail) => format!("{severity} {code}: {message} ({detail})"),
        None => format!("{severity} {code}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_show_code_and_message() {
        assert_eq!(
            describe_server_error(
                "ERROR",
                "42P01",
                r#"relation "crm.missing" does not exist"#,
                None
            ),
            r#"ERROR 42P01: relation "crm.missing" does not exist"#
        );
        assert_eq!(
            describe_server_error(
                "ERROR",
                "23505",
                "duplicate key value violates unique constraint \"pg_type_typname_nsp_index\"",
                Some("Key (typname, typnamespace)=(sales, 2200) already exists."),
            ),
            "ERROR 23505: duplicate key value violates unique constraint \"pg_type_typname_nsp_index\" \
             (Key (typname, typnamespace)=(sales, 2200) already exists.)"
        );
    }

    #[test]
    fn client_side_errors_keep_driver_text() {
        let err = "postgres://user@localhost:notaport/db"
            .parse::<tokio_postgres::Config>()
            .unwrap_err();
        let rendered = DbError::from(err).to_string();
        assert!(rendered.starts_with("Postgres error: "), "{rendered}");
        assert!(!rendered.ends_with("db error"), "{rendered}");
    }
}
