//! Binding `QueryParam` values onto driver queries.

use crate::models::QueryParam;
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

type Args<'q, DB> = <DB as Database>::Arguments<'q>;

/// Bind one parameter onto `query`, for any backend that encodes the
/// primitive types a `QueryParam` can carry.
pub(crate) fn bind_param<'q, DB>(
    query: Query<'q, DB, Args<'q, DB>>,
    param: &'q QueryParam,
) -> Query<'q, DB, Args<'q, DB>>
where
    DB: Database,
    Option<String>: Encode<'q, DB> + Type<DB>,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    &'q [u8]: Encode<'q, DB> + Type<DB>,
{
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
    }
}
