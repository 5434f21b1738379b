//! Binding `QueryParam` lists onto sqlx queries.

use crate::models::QueryParam;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Database, Encode, MySql, Postgres, Sqlite, Type};

/// Build a query for `sql` with every parameter bound in order.
///
/// NULL binds as a nullable text value, which every supported dialect
/// coerces to the target column type.
pub(crate) fn bind_params<'q, DB>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    Option<&'q str>: Encode<'q, DB> + Type<DB>,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    &'q [u8]: Encode<'q, DB> + Type<DB>,
{
    params
        .iter()
        .fold(sqlx::query::<DB>(sql), |query, param| match param {
            QueryParam::Null => query.bind(None::<&'q str>),
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
            QueryParam::Bytes(v) => query.bind(v.as_slice()),
        })
}

pub(crate) fn mysql_query<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, MySql, MySqlArguments> {
    bind_params::<MySql>(sql, params)
}

pub(crate) fn postgres_query<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    bind_params::<Postgres>(sql, params)
}

pub(crate) fn sqlite_query<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    bind_params::<Sqlite>(sql, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_binds_in_order() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let params = vec![
            QueryParam::Int(7),
            QueryParam::String("seven".to_string()),
            QueryParam::Null,
        ];

        let row = sqlite_query("SELECT ? AS n, ? AS s, ? IS NULL AS z", &params)
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(row.get::<i64, _>("n"), 7);
        assert_eq!(row.get::<String, _>("s"), "seven");
        assert_eq!(row.get::<i64, _>("z"), 1);
    }
}
