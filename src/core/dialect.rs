//! SQL fragments
//!
//! A [`Dialect`] knows how one SQL engine quotes identifiers, spells bind
//! placeholders, and reports generated keys. Everything here is a pure string
//! transform over a resolved [`Schema`].

use super::database_types::DatabaseType;
use super::schema::Schema;
use serde::{Deserialize, Serialize};

/// Identifier quoting style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quote {
    /// `"name"` (SQLite, PostgreSQL)
    DoubleQuote,
    /// `` `name` `` (MySQL)
    Backtick,
    /// `[name]` (SQL Server)
    Bracket,
    /// Identifiers are emitted as-is
    None,
}

/// Bind placeholder style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// `?`
    Question,
    /// `?1`, `?2`, ...
    NumberedQuestion,
    /// `$1`, `$2`, ...
    Dollar,
    /// `@p1`, `@p2`, ...
    AtP,
}

/// Statement rendering rules for one SQL engine
///
/// ```
/// use rust_record_mapper::Dialect;
///
/// let pg = Dialect::postgres();
/// assert_eq!(pg.quoted_table("audit.events"), r#""audit"."events""#);
/// assert_eq!(pg.placeholders(3, 1), "$1,$2,$3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    /// How identifiers are quoted
    pub quote: Quote,
    /// How placeholders are written
    pub placeholder: Placeholder,
    /// Read generated keys with `INSERT ... RETURNING` instead of the
    /// executor's last-insert id
    #[serde(default)]
    pub use_returning: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::sqlite()
    }
}

impl Dialect {
    /// SQLite: double quotes, `?`, last-insert id
    pub const fn sqlite() -> Self {
        Self {
            quote: Quote::DoubleQuote,
            placeholder: Placeholder::Question,
            use_returning: false,
        }
    }

    /// PostgreSQL: double quotes, `$n`, `RETURNING`
    pub const fn postgres() -> Self {
        Self {
            quote: Quote::DoubleQuote,
            placeholder: Placeholder::Dollar,
            use_returning: true,
        }
    }

    /// MySQL: backticks, `?`, last-insert id
    pub const fn mysql() -> Self {
        Self {
            quote: Quote::Backtick,
            placeholder: Placeholder::Question,
            use_returning: false,
        }
    }

    /// Preset for a database type
    pub const fn for_database(db_type: DatabaseType) -> Self {
        match db_type {
            DatabaseType::Sqlite => Self::sqlite(),
            DatabaseType::Postgres => Self::postgres(),
            DatabaseType::Mysql => Self::mysql(),
        }
    }

    /// Same dialect with `RETURNING` switched on or off
    #[must_use]
    pub const fn with_returning(mut self, use_returning: bool) -> Self {
        self.use_returning = use_returning;
        self
    }

    /// Parse a dialect from JSON configuration, e.g.
    /// `{"quote": "backtick", "placeholder": "question"}`
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Quote one identifier, doubling any embedded closing quote
    pub fn quoted(&self, ident: &str) -> String {
        let (open, close) = match self.quote {
            Quote::DoubleQuote => ('"', '"'),
            Quote::Backtick => ('`', '`'),
            Quote::Bracket => ('[', ']'),
            Quote::None => return ident.to_string(),
        };

        let mut quoted = String::with_capacity(ident.len() + 2);
        quoted.push(open);
        for c in ident.chars() {
            if c == close {
                quoted.push(close);
            }
            quoted.push(c);
        }
        quoted.push(close);
        quoted
    }

    /// Quote a table name; `schema.table` is quoted segment by segment
    pub fn quoted_table(&self, table: &str) -> String {
        table
            .split('.')
            .map(|part| self.quoted(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder for the `n`th bound value (1-based)
    pub fn placeholder(&self, n: usize) -> String {
        match self.placeholder {
            Placeholder::Question => "?".to_string(),
            Placeholder::NumberedQuestion => format!("?{}", n),
            Placeholder::Dollar => format!("${}", n),
            Placeholder::AtP => format!("@p{}", n),
        }
    }

    /// `count` comma-joined placeholders numbered from `start`
    pub fn placeholders(&self, count: usize, start: usize) -> String {
        (start..start + count)
            .map(|n| self.placeholder(n))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Comma-joined quoted column names, leaving out the key unless `with_pk`
    pub fn quoted_columns(&self, schema: &Schema, with_pk: bool) -> String {
        schema
            .columns(with_pk)
            .map(|field| self.quoted(field.column))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `col=placeholder` pairs for every non-key column, numbered from 1
    pub fn assignments(&self, schema: &Schema) -> String {
        schema
            .columns(false)
            .enumerate()
            .map(|(i, field)| format!("{}={}", self.quoted(field.column), self.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(",")
    }
}
