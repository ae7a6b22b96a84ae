use crate::error::CliError;
use engine_core::connectors::resolver::ConnectionResolver;
use model::core::value::Value;
use tracing::{error, info};

/// Opens `name` through the resolver and checks that `SELECT 1` answers 1.
pub async fn ping(resolver: &ConnectionResolver, name: &str) -> Result<(), CliError> {
    info!(connection = name, "Pinging connection");

    let adapter = resolver.connect(name).await?;
    let batch = adapter.query_batch("SELECT 1", Vec::new()).await.map_err(|e| {
        error!(connection = name, error = %e, "Ping query failed");
        CliError::Ping {
            name: name.to_string(),
            reason: e.to_string(),
        }
    })?;

    let answer = batch
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(Value::as_i64);
    if answer != Some(1) {
        let reason = format!("unexpected answer {answer:?}");
        error!(connection = name, %reason, "Ping returned the wrong result");
        return Err(CliError::Ping {
            name: name.to_string(),
            reason,
        });
    }

    info!(connection = name, kind = ?adapter.kind(), "Ping succeeded");
    Ok(())
}
