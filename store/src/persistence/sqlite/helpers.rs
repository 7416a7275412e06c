//! Translate [`Filter`] clauses into SQL over the `documents.body` column.
//!
//! Each clause becomes a `json_extract(body, '$.field')` comparison. JSON
//! booleans come back from `json_extract` as integers, so they are bound as
//! `0`/`1`.

use serde_json::Value;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::persistence::{Collection, Filter};

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Text(String),
    Int(i64),
    Real(f64),
}

/// Render `filter` as ` AND …` fragments to append to a `WHERE` clause,
/// along with the arguments to bind in order.
pub fn where_clauses(filter: &Filter) -> (String, Vec<SqlArg>) {
    let mut sql = String::new();
    let mut args = Vec::new();

    for (field, value) in filter.clauses() {
        debug_assert!(
            field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "filter field {field:?} is not a plain key"
        );
        let path = format!("json_extract(body, '$.{field}')");
        match value {
            Value::Null => {
                sql.push_str(&format!(" AND {path} IS NULL"));
            }
            Value::Bool(b) => {
                sql.push_str(&format!(" AND {path} = ?"));
                args.push(SqlArg::Int(i64::from(*b)));
            }
            Value::Number(n) => {
                sql.push_str(&format!(" AND {path} = ?"));
                args.push(match n.as_i64() {
                    Some(i) => SqlArg::Int(i),
                    None => SqlArg::Real(n.as_f64().unwrap_or_default()),
                });
            }
            Value::String(s) => {
                sql.push_str(&format!(" AND {path} = ?"));
                args.push(SqlArg::Text(s.clone()));
            }
            Value::Array(_) | Value::Object(_) => {
                sql.push_str(&format!(" AND {path} = json(?)"));
                args.push(SqlArg::Text(value.to_string()));
            }
        }
    }

    (sql, args)
}

pub fn bind_query<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &[SqlArg],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlArg::Text(s) => query.bind(s.clone()),
            SqlArg::Int(i) => query.bind(*i),
            SqlArg::Real(f) => query.bind(*f),
        };
    }
    query
}

pub fn bind_query_as<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    args: &[SqlArg],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlArg::Text(s) => query.bind(s.clone()),
            SqlArg::Int(i) => query.bind(*i),
            SqlArg::Real(f) => query.bind(*f),
        };
    }
    query
}

/// Map a `collection` column value back to its [`Collection`].
pub fn decode_collection(name: &str) -> Option<Collection> {
    Collection::ALL.into_iter().find(|c| c.as_str() == name)
}
