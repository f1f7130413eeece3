//! Database dispatch macros.
//!
//! Pools, pooled connections and rows come in one concrete type per backend.
//! These macros spell out the per-backend match arms and impls so the call
//! sites stay linear.

/// Match every backend variant of `DbPool` or `DbConnection`.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbConnection, conn, {
///     MySql(c) => mysql::ping(c).await,
///     Postgres(c) => postgres::ping(c).await,
///     SQLite(c) => sqlite::ping(c).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $crate::db::$enum::$variant($p) => $body,
            )+
        }
    };
}

/// Implement [`RowToJson`](crate::db::decode::RowToJson) for a backend row type.
///
/// Integer and float candidates are listed per backend because each driver
/// only decodes the Rust types its wire format supports.
macro_rules! impl_row_to_json {
    ($row:ty, ints: [$($int:ty),+], floats: [$($float:ty),+]) => {
        impl $crate::db::decode::RowToJson for $row {
            fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
                use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};
                use $crate::db::decode::{TypeCategory, categorize_type, encode_binary};
                use serde_json::Value as JsonValue;

                self.columns()
                    .iter()
                    .map(|col| {
                        let idx = col.ordinal();
                        let is_null = self.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true);

                        let as_int = || {
                            None$(.or_else(|| {
                                self.try_get::<Option<$int>, _>(idx).ok().flatten().map(JsonValue::from)
                            }))+
                        };
                        let as_float = || {
                            None$(.or_else(|| {
                                self.try_get::<Option<$float>, _>(idx).ok().flatten().map(JsonValue::from)
                            }))+
                        };
                        let as_text = || {
                            self.try_get::<Option<String>, _>(idx).ok().flatten().map(JsonValue::String)
                        };
                        let as_bool = || {
                            self.try_get::<Option<bool>, _>(idx).ok().flatten().map(JsonValue::Bool)
                        };
                        let as_bytes = || {
                            self.try_get::<Option<Vec<u8>>, _>(idx)
                                .ok()
                                .flatten()
                                .map(|b| encode_binary(&b))
                        };
                        let as_json = || {
                            self.try_get::<Option<sqlx::types::Json<JsonValue>>, _>(idx)
                                .ok()
                                .flatten()
                                .map(|j| j.0)
                                .or_else(|| {
                                    as_text().and_then(|t| match t {
                                        JsonValue::String(s) => serde_json::from_str(&s).ok(),
                                        _ => None,
                                    })
                                })
                        };

                        let value = if is_null {
                            None
                        } else {
                            match categorize_type(col.type_info().name()) {
                                TypeCategory::Integer => as_int(),
                                TypeCategory::Float => as_float(),
                                TypeCategory::Boolean => as_bool().or_else(as_int),
                                TypeCategory::Binary => as_bytes(),
                                TypeCategory::Json => as_json(),
                                TypeCategory::Text => as_text(),
                                TypeCategory::Other => as_text()
                                    .or_else(as_int)
                                    .or_else(as_float)
                                    .or_else(as_bytes),
                            }
                        };

                        (col.name().to_string(), value.unwrap_or(JsonValue::Null))
                    })
                    .collect()
            }

            fn column_metadata(&self) -> Vec<$crate::models::ColumnMetadata> {
                use sqlx::{Column as _, Row as _, TypeInfo as _};

                self.columns()
                    .iter()
                    .map(|col| $crate::models::ColumnMetadata {
                        name: col.name().to_string(),
                        type_name: col.type_info().name().to_string(),
                    })
                    .collect()
            }
        }
    };
}

pub(crate) use impl_row_to_json;
