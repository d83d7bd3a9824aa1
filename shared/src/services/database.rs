use std::time::Instant;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::utilities::{config::Config, errors::AppError};

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let options = config
            .database_url
            .parse::<PgConnectOptions>()
            .map_err(|_| AppError::DatabaseUrlParsingError)?
            .ssl_mode(config.pg_ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to connect to the database: {e}");
                AppError::DatabaseConnectionError
            })?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        debug!("Closing DB pool...");
        self.pool.close().await;
    }
}

/// One positional statement argument. Statements use 1-indexed `$n`
/// placeholders and arguments bind in declaration order.
#[derive(Debug, Clone)]
pub enum QueryArg {
    Text(String),
    Int(i64),
}

impl From<&str> for QueryArg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for QueryArg {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<i64> for QueryArg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// A parameterized statement plus its positional argument list.
#[derive(Debug, Clone)]
pub struct QueryJob {
    pub query: String,
    pub args: Vec<QueryArg>,
}

/// Runs parameterized statements against the pooled store and materializes
/// rows into typed records. The only component that talks to the database.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: PgPool,
    trace: bool,
}

impl QueryExecutor {
    pub fn new(database: &Database, trace: bool) -> Self {
        Self {
            pool: database.pool.clone(),
            trace,
        }
    }

    /// Execute one statement with a pool-leased connection. The connection
    /// is returned to the pool on every exit path, including errors and
    /// cancellation.
    pub async fn select<T>(&self, query: &str, args: &[QueryArg]) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let started = Instant::now();
        let mut statement = sqlx::query_as::<Postgres, T>(query);
        for arg in args {
            statement = match arg {
                QueryArg::Text(value) => statement.bind(value.clone()),
                QueryArg::Int(value) => statement.bind(*value),
            };
        }
        let rows = statement.fetch_all(&self.pool).await;
        if self.trace {
            debug!("SQL: {query} {args:?} took {:?}", started.elapsed());
        }
        rows.map_err(|e| {
            error!("Failed to run query '{query}': {e}");
            AppError::from(e)
        })
    }

    /// Fan the jobs out, one task per job, and concatenate the results in
    /// input order regardless of completion order. Fail-fast: the first
    /// child failure aborts the siblings and fails the call.
    pub async fn run_queries<T>(&self, jobs: Vec<QueryJob>) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static,
    {
        self.run_query_jobs(jobs, false).await
    }

    /// Legacy merge mode: failed children are logged and contribute no rows.
    pub async fn run_queries_best_effort<T>(&self, jobs: Vec<QueryJob>) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static,
    {
        self.run_query_jobs(jobs, true).await
    }

    async fn run_query_jobs<T>(
        &self,
        jobs: Vec<QueryJob>,
        best_effort: bool,
    ) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static,
    {
        let mut collected: Vec<Option<Vec<T>>> = Vec::new();
        collected.resize_with(jobs.len(), || None);

        let mut set = JoinSet::new();
        for (position, job) in jobs.into_iter().enumerate() {
            let executor = self.clone();
            set.spawn(async move {
                let rows = executor.select::<T>(&job.query, &job.args).await;
                (position, job, rows)
            });
        }

        // Dropping the set (error return or caller cancellation) aborts
        // anything still in flight.
        while let Some(joined) = set.join_next().await {
            let (position, job, rows) = joined
                .map_err(|e| AppError::InternalError(format!("query task failed to join: {e}")))?;
            match rows {
                Ok(rows) => collected[position] = Some(rows),
                Err(e) if best_effort => {
                    warn!("Ignoring failed search query '{}': {e}", job.query);
                }
                Err(e) => {
                    set.abort_all();
                    return Err(e);
                }
            }
        }

        Ok(collected.into_iter().flatten().flatten().collect())
    }
}
