//! PostgreSQL target adapter
//!
//! Implements [`TargetFetch`] over the relational store: one
//! `SELECT ... WHERE id = ANY($1)` round trip per batch of identifiers, with
//! typed column decoding into [`RecordValue`]. SQL NULL decodes to
//! `RecordValue::Null`; the policy layer decides what NULL means per field.

use crate::check::TargetFetch;
use crate::types::{json_to_record_value, Record, RecordValue};
use crate::TargetOpts;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio_postgres::{Client, NoTls, Row};

/// Batched fetch-by-id against one PostgreSQL database.
pub struct PgTarget {
    client: Client,
    id_field: String,
}

impl PgTarget {
    /// Connect to PostgreSQL. The connection task is spawned onto the
    /// current runtime and logs on failure.
    pub async fn connect(opts: &TargetOpts, id_field: impl Into<String>) -> Result<Self> {
        tracing::debug!("Connecting to PostgreSQL at {}", opts.target_uri);
        let (client, connection) = tokio_postgres::connect(&opts.target_uri, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {e}");
            }
        });
        Ok(Self {
            client,
            id_field: id_field.into(),
        })
    }
}

fn fetch_query(table: &str, id_field: &str) -> String {
    format!("SELECT * FROM \"{table}\" WHERE \"{id_field}\" = ANY($1)")
}

#[async_trait::async_trait]
impl TargetFetch for PgTarget {
    async fn fetch_by_ids(&self, table: &str, ids: &[String]) -> Result<HashMap<String, Record>> {
        let id_vec: Vec<String> = ids.to_vec();
        let rows = self
            .client
            .query(&fetch_query(table, &self.id_field), &[&id_vec])
            .await?;
        tracing::debug!(
            "Fetched {} of {} requested rows from '{}'",
            rows.len(),
            ids.len(),
            table
        );

        let mut records = HashMap::with_capacity(rows.len());
        for row in &rows {
            let record = convert_row_to_record(row, &self.id_field)?;
            records.insert(record.id.clone(), record);
        }
        Ok(records)
    }
}

/// Convert a PostgreSQL row to a [`Record`], keyed by the identifier column.
fn convert_row_to_record(row: &Row, id_field: &str) -> Result<Record> {
    let id = if let Ok(id) = row.try_get::<_, String>(id_field) {
        id
    } else if let Ok(id) = row.try_get::<_, i64>(id_field) {
        id.to_string()
    } else if let Ok(id) = row.try_get::<_, i32>(id_field) {
        id.to_string()
    } else if let Ok(id) = row.try_get::<_, uuid::Uuid>(id_field) {
        id.to_string()
    } else {
        return Err(anyhow::anyhow!(
            "Failed to extract identifier from column '{id_field}' - unsupported data type"
        ));
    };

    let mut fields = HashMap::new();
    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name();
        if name == id_field {
            continue;
        }
        fields.insert(name.to_string(), convert_pg_value(row, i)?);
    }

    Ok(Record { id, fields })
}

/// Convert one PostgreSQL column value to a [`RecordValue`].
fn convert_pg_value(row: &Row, index: usize) -> Result<RecordValue> {
    use tokio_postgres::types::Type;

    let column = &row.columns()[index];
    let pg_type = column.type_();

    match *pg_type {
        Type::BOOL => Ok(match row.try_get::<_, Option<bool>>(index)? {
            Some(b) => RecordValue::Bool(b),
            None => RecordValue::Null,
        }),
        Type::INT2 => Ok(match row.try_get::<_, Option<i16>>(index)? {
            Some(i) => RecordValue::Int(i as i64),
            None => RecordValue::Null,
        }),
        Type::INT4 => Ok(match row.try_get::<_, Option<i32>>(index)? {
            Some(i) => RecordValue::Int(i as i64),
            None => RecordValue::Null,
        }),
        Type::INT8 => Ok(match row.try_get::<_, Option<i64>>(index)? {
            Some(i) => RecordValue::Int(i),
            None => RecordValue::Null,
        }),
        Type::FLOAT4 => Ok(match row.try_get::<_, Option<f32>>(index)? {
            Some(f) => RecordValue::Float(f as f64),
            None => RecordValue::Null,
        }),
        Type::FLOAT8 => Ok(match row.try_get::<_, Option<f64>>(index)? {
            Some(f) => RecordValue::Float(f),
            None => RecordValue::Null,
        }),
        Type::NUMERIC => Ok(match row.try_get::<_, Option<Decimal>>(index)? {
            Some(d) => RecordValue::Decimal(d),
            None => RecordValue::Null,
        }),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            Ok(match row.try_get::<_, Option<String>>(index)? {
                Some(s) => RecordValue::String(s),
                None => RecordValue::Null,
            })
        }
        Type::TIMESTAMP => Ok(match row.try_get::<_, Option<NaiveDateTime>>(index)? {
            Some(ts) => RecordValue::DateTime(DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)),
            None => RecordValue::Null,
        }),
        Type::TIMESTAMPTZ => Ok(match row.try_get::<_, Option<DateTime<Utc>>>(index)? {
            Some(dt) => RecordValue::DateTime(dt),
            None => RecordValue::Null,
        }),
        Type::DATE => Ok(match row.try_get::<_, Option<NaiveDate>>(index)? {
            Some(date) => {
                let dt = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;
                RecordValue::DateTime(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
            }
            None => RecordValue::Null,
        }),
        Type::JSON | Type::JSONB => {
            Ok(match row.try_get::<_, Option<serde_json::Value>>(index)? {
                Some(json) => json_to_record_value(json)?,
                None => RecordValue::Null,
            })
        }
        Type::UUID => Ok(match row.try_get::<_, Option<uuid::Uuid>>(index)? {
            Some(u) => RecordValue::String(u.to_string()),
            None => RecordValue::Null,
        }),
        Type::BYTEA => Ok(match row.try_get::<_, Option<Vec<u8>>>(index)? {
            Some(bytes) => RecordValue::Bytes(bytes),
            None => RecordValue::Null,
        }),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => {
            Ok(match row.try_get::<_, Option<Vec<String>>>(index)? {
                Some(arr) => {
                    RecordValue::Array(arr.into_iter().map(RecordValue::String).collect())
                }
                None => RecordValue::Null,
            })
        }
        Type::INT4_ARRAY => Ok(match row.try_get::<_, Option<Vec<i32>>>(index)? {
            Some(arr) => RecordValue::Array(
                arr.into_iter().map(|v| RecordValue::Int(v as i64)).collect(),
            ),
            None => RecordValue::Null,
        }),
        Type::INT8_ARRAY => Ok(match row.try_get::<_, Option<Vec<i64>>>(index)? {
            Some(arr) => RecordValue::Array(arr.into_iter().map(RecordValue::Int).collect()),
            None => RecordValue::Null,
        }),
        _ => Err(anyhow::anyhow!(
            "Unsupported PostgreSQL type '{pg_type}' in column '{}'",
            column.name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_query_quotes_identifiers() {
        assert_eq!(
            fetch_query("User", "id"),
            "SELECT * FROM \"User\" WHERE \"id\" = ANY($1)"
        );
    }
}
