use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_secs: u64,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("DB_MAX_CONNECTIONS must be a number"),
            db_connect_timeout_secs: env::var("DB_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("DB_CONNECT_TIMEOUT_SECS must be a number"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_addr_joins_host_and_port() {
        let config = Config {
            database_url: "postgres://localhost/cityhaul".to_string(),
            db_max_connections: 20,
            db_connect_timeout_secs: 10,
            jwt_secret: "secret".to_string(),
            jwt_expiration_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 4000,
        };

        assert_eq!(config.server_addr(), "127.0.0.1:4000");
    }
}
