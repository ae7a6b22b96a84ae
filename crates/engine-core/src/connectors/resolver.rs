use crate::{
    error::{LoadError, ResolveError},
    logging::RunLogger,
};
use connectors::{
    adapter::{Connect, ConnectionDescriptor},
    sql::base::adapter::SqlAdapter,
};
use engine_config::connections::ConnectionRegistry;
use model::events::{LogCategory, LogStep};
use std::sync::Arc;
use tracing::{error, info};

/// Turns logical connection names into open adapters.
#[derive(Clone)]
pub struct ConnectionResolver {
    registry: Arc<ConnectionRegistry>,
    connector: Arc<dyn Connect>,
}

impl ConnectionResolver {
    pub fn new(registry: Arc<ConnectionRegistry>, connector: Arc<dyn Connect>) -> Self {
        Self {
            registry,
            connector,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn connector(&self) -> Arc<dyn Connect> {
        Arc::clone(&self.connector)
    }

    pub fn descriptor(&self, name: &str) -> Result<ConnectionDescriptor, ResolveError> {
        Ok(self.registry.descriptor(name)?)
    }

    pub async fn connect(&self, name: &str) -> Result<Arc<dyn SqlAdapter>, ResolveError> {
        let descriptor = self.descriptor(name)?;
        self.connect_descriptor(&descriptor).await
    }

    pub async fn connect_descriptor(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Arc<dyn SqlAdapter>, ResolveError> {
        self.connector
            .connect(descriptor)
            .await
            .map_err(|source| ResolveError::Connect {
                name: descriptor.name.clone(),
                source,
            })
    }

    /// Like [`connect`](Self::connect), but a failure is also recorded as a
    /// `CONNECT_ERROR` audit event before it is returned.
    pub async fn connect_or_report(
        &self,
        name: &str,
        logger: &RunLogger,
    ) -> Result<Arc<dyn SqlAdapter>, ResolveError> {
        match self.connect(name).await {
            Ok(adapter) => Ok(adapter),
            Err(err) => {
                error!(connection = name, error = %err, "Connection failed");
                if name == logger.connection_name() {
                    // The audit store itself is down; there is nowhere to write.
                    return Err(err);
                }
                logger
                    .log_guarded(LogCategory::ConnectError, LogStep::ConnectError, name, 0, 0.0)
                    .await;
                Err(err)
            }
        }
    }

    /// Runs a standalone SQL script against a named connection.
    pub async fn exec_sql(
        &self,
        name: &str,
        sql: &str,
        logger: &RunLogger,
    ) -> Result<(), LoadError> {
        let adapter = self.connect_or_report(name, logger).await?;
        adapter.exec(sql).await?;
        info!(connection = name, "Script executed");
        Ok(())
    }
}
