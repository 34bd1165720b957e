//! MongoDB source adapter
//!
//! Implements [`SourceCursor`] over a MongoDB collection: an ordered `find`
//! sorted on the table's update-timestamp field, iterated batch by batch.
//! Documents arrive as Extended JSON (v2), in either relaxed or canonical
//! form depending on the wrapping type, so the field conversion below decodes
//! both before normalizing into [`RecordValue`].

use crate::check::SourceCursor;
use crate::presets::TableCheck;
use crate::types::{Record, RecordValue};
use crate::SourceOpts;
use base64::{self, Engine};
use bson::{doc, Document};
use mongodb::{options::ClientOptions, Client as MongoClient};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Ordered cursor over one MongoDB collection.
pub struct MongoSource {
    cursor: mongodb::Cursor<Document>,
    collection: String,
    done: bool,
}

impl MongoSource {
    /// Connect to MongoDB and open an ordered cursor for the given check.
    pub async fn connect(opts: &SourceOpts, check: &TableCheck) -> anyhow::Result<Self> {
        tracing::debug!("Parsing MongoDB connection options from {}", opts.source_uri);
        let mut mongo_options = ClientOptions::parse(&opts.source_uri).await?;
        // Bounded timeouts so a dead source fails the run instead of hanging it
        mongo_options.connect_timeout = Some(Duration::from_secs(10));
        mongo_options.server_selection_timeout = Some(Duration::from_secs(10));

        let client = MongoClient::with_options(mongo_options)?;
        let db_name = opts
            .source_database
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("MongoDB source database name is required"))?;
        let db = client.database(db_name);
        let collection = db.collection::<Document>(&check.table);

        tracing::info!(
            "Opening ordered cursor over '{}.{}' sorted by '{}'",
            db_name,
            check.table,
            check.order_by
        );
        let mut sort = Document::new();
        sort.insert(check.order_by.clone(), 1);
        let cursor = collection.find(doc! {}).sort(sort).await?;

        Ok(Self {
            cursor,
            collection: check.table.clone(),
            done: false,
        })
    }
}

#[async_trait::async_trait]
impl SourceCursor for MongoSource {
    async fn next_batch(&mut self, max: usize) -> anyhow::Result<Vec<Record>> {
        if self.done {
            return Ok(Vec::new());
        }
        let mut batch = Vec::with_capacity(max);
        while batch.len() < max {
            if !self.cursor.advance().await? {
                self.done = true;
                break;
            }
            let document: Document = self.cursor.current().try_into()?;
            let json: Value = bson::from_document(document)?;
            batch.push(document_to_record(&self.collection, json)?);
        }
        Ok(batch)
    }
}

/// Convert one Extended JSON document into a [`Record`].
///
/// `_id` becomes the record identifier and is not kept as a field.
pub fn document_to_record(collection: &str, json: Value) -> anyhow::Result<Record> {
    let Value::Object(mut object) = json else {
        return Err(anyhow::anyhow!(
            "Expected a JSON object from collection '{collection}'"
        ));
    };

    let id_value = object
        .remove("_id")
        .ok_or_else(|| anyhow::anyhow!("Document in '{collection}' has no _id"))?;
    let id = match &id_value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("$oid").and_then(|v| v.as_str()) {
            Some(oid) => oid.to_string(),
            None => id_value.to_string().trim_matches('"').to_string(),
        },
        other => other.to_string().trim_matches('"').to_string(),
    };

    let mut fields = HashMap::with_capacity(object.len());
    for (key, value) in object {
        fields.insert(key, convert_extended_json(value)?);
    }
    Ok(Record { id, fields })
}

/// Convert an Extended JSON (v2) value into a [`RecordValue`].
fn convert_extended_json(value: Value) -> anyhow::Result<RecordValue> {
    match value {
        Value::Object(obj) => {
            // Relaxed Date: {"$date": "2024-01-01T00:00:00Z"}
            if let Some(date_str) = obj.get("$date").and_then(|v| v.as_str()) {
                let dt = chrono::DateTime::parse_from_rfc3339(date_str)
                    .map_err(|e| anyhow::anyhow!("Failed to parse datetime: {e}"))?
                    .to_utc();
                return Ok(RecordValue::DateTime(dt));
            }
            // Canonical Date: {"$date": {"$numberLong": "millis"}}
            if let Some(Value::Object(date_obj)) = obj.get("$date") {
                if let Some(millis) = date_obj.get("$numberLong").and_then(|v| v.as_str()) {
                    let num = millis.parse::<i64>()?;
                    let dt = chrono::DateTime::from_timestamp_millis(num)
                        .ok_or_else(|| anyhow::anyhow!("Out-of-range datetime: {num}"))?;
                    return Ok(RecordValue::DateTime(dt));
                }
            }

            if let Some(oid) = obj.get("$oid").and_then(|v| v.as_str()) {
                return Ok(RecordValue::String(oid.to_string()));
            }

            // {"$timestamp": {"t": seconds, "i": increment}}
            if let Some(ts) = obj.get("$timestamp").and_then(|v| v.as_object()) {
                if let Some(t) = ts.get("t").and_then(|v| v.as_u64()) {
                    let dt = chrono::DateTime::from_timestamp(t as i64, 0)
                        .ok_or_else(|| anyhow::anyhow!("Out-of-range timestamp: {t}"))?;
                    return Ok(RecordValue::DateTime(dt));
                }
            }

            // {"$binary": {"base64": "...", "subType": "..."}}
            if let Some(binary) = obj.get("$binary").and_then(|v| v.as_object()) {
                if let Some(b64) = binary.get("base64").and_then(|v| v.as_str()) {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(b64)
                        .map_err(|e| anyhow::anyhow!("Failed to decode binary field: {e}"))?;
                    return Ok(RecordValue::Bytes(bytes));
                }
            }

            if let Some(n) = obj.get("$numberDouble").and_then(|v| v.as_str()) {
                return Ok(RecordValue::Float(n.parse::<f64>()?));
            }
            if let Some(n) = obj.get("$numberInt").and_then(|v| v.as_str()) {
                return Ok(RecordValue::Int(n.parse::<i64>()?));
            }
            if let Some(n) = obj.get("$numberLong").and_then(|v| v.as_str()) {
                return Ok(RecordValue::Int(n.parse::<i64>()?));
            }
            if let Some(n) = obj.get("$numberDecimal").and_then(|v| v.as_str()) {
                let decimal = Decimal::from_str(n)
                    .map_err(|e| anyhow::anyhow!("Failed to parse Decimal128 '{n}': {e}"))?;
                return Ok(RecordValue::Decimal(decimal));
            }

            // Plain embedded document
            let mut fields = HashMap::with_capacity(obj.len());
            for (key, val) in obj {
                fields.insert(key, convert_extended_json(val)?);
            }
            Ok(RecordValue::Object(fields))
        }
        Value::Array(arr) => {
            let mut values = Vec::with_capacity(arr.len());
            for item in arr {
                values.push(convert_extended_json(item)?);
            }
            Ok(RecordValue::Array(values))
        }
        Value::Bool(b) => Ok(RecordValue::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(RecordValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(RecordValue::Float(f))
            } else {
                Err(anyhow::anyhow!("Unsupported number: {n}"))
            }
        }
        Value::String(s) => Ok(RecordValue::String(s)),
        Value::Null => Ok(RecordValue::Null),
    }
}
