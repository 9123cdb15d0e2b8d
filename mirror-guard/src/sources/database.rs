//! Database connectivity for the mirror-guard reconciliation engine.
//!
//! This module provides native database connectors using datafusion-table-providers
//! for PostgreSQL, MySQL, and SQLite. Connection pooling and query pushdown come
//! from the provider layer; credentials are carried as [`SecureString`] and never
//! appear in locations, logs, or error messages.

use super::{PartitionSource, Side};
use crate::error::{MirrorError, Result};
#[cfg(any(feature = "postgres", feature = "mysql"))]
use crate::security::SecureString;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

#[cfg(feature = "postgres")]
use datafusion_table_providers::{
    postgres::PostgresTableFactory, sql::db_connection_pool::postgrespool::PostgresConnectionPool,
};

#[cfg(feature = "mysql")]
use datafusion_table_providers::{
    mysql::MySQLTableFactory, sql::db_connection_pool::mysqlpool::MySQLConnectionPool,
};

#[cfg(any(feature = "postgres", feature = "mysql"))]
use datafusion_table_providers::util::secrets::to_secret_map;

#[cfg(feature = "sqlite")]
use datafusion_table_providers::{
    sql::db_connection_pool::{sqlitepool::SqliteConnectionPoolFactory, Mode},
    sqlite::SqliteTableFactory,
};

/// Database connection configuration, one variant per enabled flavor.
///
/// Built from a `database` descriptor: the location supplies host, port, and
/// database name (`host:port/dbname`, with an optional scheme prefix); the
/// options map supplies `user`, `password`, and flavor-specific extras. An
/// empty password means the server must not require one.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    /// PostgreSQL database connection parameters
    #[cfg(feature = "postgres")]
    Postgres {
        host: String,
        port: u16,
        database: String,
        username: String,
        password: SecureString,
        sslmode: Option<String>,
    },
    /// MySQL database connection parameters
    #[cfg(feature = "mysql")]
    MySql {
        host: String,
        port: u16,
        database: String,
        username: String,
        password: SecureString,
        sslmode: String,
    },
    /// SQLite database file path
    #[cfg(feature = "sqlite")]
    Sqlite(String),
}

impl DatabaseConfig {
    /// Returns a human-readable description of the database type.
    pub fn database_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "postgres")]
            DatabaseConfig::Postgres { .. } => "PostgreSQL",
            #[cfg(feature = "mysql")]
            DatabaseConfig::MySql { .. } => "MySQL",
            #[cfg(feature = "sqlite")]
            DatabaseConfig::Sqlite(_) => "SQLite",
        }
    }

    /// Builds a configuration from descriptor fields.
    ///
    /// `location` must already have its date placeholders substituted.
    pub fn from_descriptor(
        format: &str,
        location: &str,
        options: &BTreeMap<String, String>,
    ) -> Result<Self> {
        match format.to_ascii_lowercase().as_str() {
            "postgres" => {
                #[cfg(feature = "postgres")]
                {
                    let (host, port, database) = split_location(location)?;
                    Ok(DatabaseConfig::Postgres {
                        host,
                        port,
                        database,
                        username: required_option(options, "user", "postgres")?,
                        password: password_option(options),
                        sslmode: options.get("sslmode").cloned(),
                    })
                }
                #[cfg(not(feature = "postgres"))]
                {
                    let _ = (location, options);
                    Err(not_enabled("postgres"))
                }
            }
            "mysql" => {
                #[cfg(feature = "mysql")]
                {
                    let (host, port, database) = split_location(location)?;
                    Ok(DatabaseConfig::MySql {
                        host,
                        port,
                        database,
                        username: required_option(options, "user", "mysql")?,
                        password: password_option(options),
                        sslmode: options
                            .get("sslmode")
                            .cloned()
                            .unwrap_or_else(|| "disabled".to_string()),
                    })
                }
                #[cfg(not(feature = "mysql"))]
                {
                    let _ = (location, options);
                    Err(not_enabled("mysql"))
                }
            }
            "sqlite" => {
                #[cfg(feature = "sqlite")]
                {
                    Ok(DatabaseConfig::Sqlite(location.to_string()))
                }
                #[cfg(not(feature = "sqlite"))]
                {
                    let _ = (location, options);
                    Err(not_enabled("sqlite"))
                }
            }
            other => Err(MirrorError::NotSupported(format!(
                "database format '{other}': expected postgres, mysql, or sqlite"
            ))),
        }
    }
}

/// Splits `host:port/dbname` (with an optional `scheme://` prefix) into parts.
#[cfg(any(feature = "postgres", feature = "mysql"))]
fn split_location(location: &str) -> Result<(String, u16, String)> {
    let trimmed = match location.split_once("://") {
        Some((_, rest)) => rest,
        None => location,
    };
    let malformed = || {
        MirrorError::configuration(format!(
            "database location must look like 'host:port/dbname', got '{location}'"
        ))
    };

    let (authority, database) = trimmed.split_once('/').ok_or_else(malformed)?;
    let (host, port) = authority.split_once(':').ok_or_else(malformed)?;
    if host.is_empty() || database.is_empty() {
        return Err(malformed());
    }
    let port: u16 = port.parse().map_err(|_| malformed())?;

    Ok((host.to_string(), port, database.to_string()))
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
fn required_option(
    options: &BTreeMap<String, String>,
    key: &str,
    flavor: &str,
) -> Result<String> {
    options.get(key).cloned().ok_or_else(|| {
        MirrorError::configuration(format!("{flavor} descriptor requires a '{key}' option"))
    })
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
fn password_option(options: &BTreeMap<String, String>) -> SecureString {
    SecureString::new(options.get("password").cloned().unwrap_or_default())
}

#[cfg(not(all(feature = "postgres", feature = "mysql", feature = "sqlite")))]
fn not_enabled(flavor: &str) -> MirrorError {
    MirrorError::NotSupported(format!(
        "database format '{flavor}': this build was compiled without the '{flavor}' feature"
    ))
}

/// A relational table registered through a pooled table provider.
#[derive(Debug, Clone)]
pub struct DatabaseSource {
    side: Side,
    config: DatabaseConfig,
    table: String,
    location: String,
    filter: Option<String>,
}

impl DatabaseSource {
    /// Creates a database source for one side.
    ///
    /// `location` is the rendered connection location, kept only for error
    /// messages and descriptions; credentials never pass through it.
    pub fn new(
        side: Side,
        config: DatabaseConfig,
        table: String,
        location: String,
        filter: Option<String>,
    ) -> Self {
        Self {
            side,
            config,
            table,
            location,
            filter,
        }
    }

    /// Creates a table provider for the configured database type.
    #[instrument(skip(self), fields(db_type = %self.config.database_type()))]
    async fn create_table_provider(&self) -> Result<Arc<dyn datafusion::catalog::TableProvider>> {
        // Dotted table names parse to schema-qualified references.
        let table_reference = TableReference::from(self.table.as_str());

        match &self.config {
            #[cfg(feature = "postgres")]
            DatabaseConfig::Postgres {
                host,
                port,
                database,
                username,
                password,
                sslmode,
            } => {
                let mut params = std::collections::HashMap::new();
                params.insert("host".to_string(), host.clone());
                params.insert("port".to_string(), port.to_string());
                params.insert("db".to_string(), database.clone());
                params.insert("user".to_string(), username.clone());
                params.insert("pass".to_string(), password.expose().to_string());
                if let Some(ssl) = sslmode {
                    params.insert("sslmode".to_string(), ssl.clone());
                }

                let postgres_params = to_secret_map(params);
                let postgres_pool = Arc::new(
                    PostgresConnectionPool::new(postgres_params)
                        .await
                        .map_err(|e| {
                            MirrorError::dataset_unavailable_with_source(
                                self.side.as_str(),
                                self.location.as_str(),
                                format!("failed to create PostgreSQL connection pool: {e}"),
                                Box::new(e),
                            )
                        })?,
                );

                let table_factory = PostgresTableFactory::new(postgres_pool);

                table_factory
                    .table_provider(table_reference)
                    .await
                    .map_err(|e| {
                        MirrorError::dataset_unavailable(
                            self.side.as_str(),
                            self.location.as_str(),
                            format!("no table provider for '{}': {e}", self.table),
                        )
                    })
            }
            #[cfg(feature = "mysql")]
            DatabaseConfig::MySql {
                host,
                port,
                database,
                username,
                password,
                sslmode,
            } => {
                let password_str = password.expose();
                let connection_string =
                    format!("mysql://{username}:{password_str}@{host}:{port}/{database}");
                let mut params = std::collections::HashMap::new();
                params.insert("connection_string".to_string(), connection_string);
                params.insert("sslmode".to_string(), sslmode.clone());

                let mysql_params = to_secret_map(params);
                let mysql_pool =
                    Arc::new(MySQLConnectionPool::new(mysql_params).await.map_err(|e| {
                        MirrorError::dataset_unavailable_with_source(
                            self.side.as_str(),
                            self.location.as_str(),
                            format!("failed to create MySQL connection pool: {e}"),
                            Box::new(e),
                        )
                    })?);

                let table_factory = MySQLTableFactory::new(mysql_pool);

                table_factory
                    .table_provider(table_reference)
                    .await
                    .map_err(|e| {
                        MirrorError::dataset_unavailable(
                            self.side.as_str(),
                            self.location.as_str(),
                            format!("no table provider for '{}': {e}", self.table),
                        )
                    })
            }
            #[cfg(feature = "sqlite")]
            DatabaseConfig::Sqlite(path) => {
                // Opening a missing file would create an empty database, so
                // probe first and fail as unavailable instead.
                if !std::path::Path::new(path).is_file() {
                    return Err(MirrorError::dataset_unavailable(
                        self.side.as_str(),
                        path.as_str(),
                        "database file does not exist",
                    ));
                }

                let sqlite_pool = Arc::new(
                    SqliteConnectionPoolFactory::new(
                        path,
                        Mode::File,
                        std::time::Duration::from_millis(5000),
                    )
                    .build()
                    .await
                    .map_err(|e| {
                        MirrorError::dataset_unavailable(
                            self.side.as_str(),
                            path.as_str(),
                            format!("failed to create SQLite connection pool: {e}"),
                        )
                    })?,
                );

                let table_factory = SqliteTableFactory::new(sqlite_pool);

                table_factory
                    .table_provider(table_reference)
                    .await
                    .map_err(|e| {
                        MirrorError::dataset_unavailable(
                            self.side.as_str(),
                            path.as_str(),
                            format!("no table provider for '{}': {e}", self.table),
                        )
                    })
            }
        }
    }
}

#[async_trait]
impl PartitionSource for DatabaseSource {
    #[instrument(skip(self, ctx), fields(side = %self.side, db_type = %self.config.database_type(), table = %self.table))]
    async fn register(&self, ctx: &SessionContext, alias: &str) -> Result<()> {
        let provider = self.create_table_provider().await?;

        ctx.register_table(alias, provider).map_err(|e| {
            MirrorError::dataset_unavailable_with_source(
                self.side.as_str(),
                self.location.as_str(),
                format!("failed to register table '{alias}': {e}"),
                Box::new(e),
            )
        })?;

        Ok(())
    }

    fn description(&self) -> String {
        let db_type = self.config.database_type();
        let table = &self.table;
        let location = &self.location;
        format!("{db_type} table '{table}' at {location}")
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}
