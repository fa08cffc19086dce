//! Database flavor definitions
//!
//! A [`DatabaseType`] names the SQL engine behind an executor and selects the
//! dialect preset used to render statements for it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported SQL engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// SQLite
    #[default]
    Sqlite,
    /// PostgreSQL
    Postgres,
    /// MySQL/MariaDB
    Mysql,
}

impl DatabaseType {
    /// Convert database type to string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::Postgres => "postgres",
            DatabaseType::Mysql => "mysql",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseType::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(DatabaseType::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseType::Mysql),
            _ => Err(format!("Invalid database type: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_str() {
        assert_eq!("postgresql".parse::<DatabaseType>(), Ok(DatabaseType::Postgres));
        assert_eq!("SQLite3".parse::<DatabaseType>(), Ok(DatabaseType::Sqlite));
        assert_eq!("mariadb".parse::<DatabaseType>(), Ok(DatabaseType::Mysql));
        assert!("redis".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn test_database_type_default_and_display() {
        assert_eq!(DatabaseType::default(), DatabaseType::Sqlite);
        assert_eq!(DatabaseType::Postgres.to_string(), "postgres");
    }

    #[test]
    fn test_database_type_serde() {
        let json = serde_json::to_string(&DatabaseType::Postgres).unwrap();
        assert_eq!(json, "\"postgres\"");
        let back: DatabaseType = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(back, DatabaseType::Mysql);
    }
}
