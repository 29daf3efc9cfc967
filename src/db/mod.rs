use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::Config;
use crate::error::AppResult;

pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(&config.database_url);
    options
        .max_connections(config.db_max_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Ok(db)
}
