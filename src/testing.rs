//! In-memory store implementations for testing
//!
//! This module provides cursor and fetch implementations backed by plain
//! vectors so policy and checker behavior can be exercised without live
//! stores. It is public so downstream users can test their own policies the
//! same way.

use crate::check::{SourceCursor, TargetFetch};
use crate::types::Record;
use std::collections::HashMap;

/// An ordered in-memory source cursor.
///
/// Records are yielded in the order given, which stands in for the
/// update-timestamp ordering of a real source store.
pub struct MemorySource {
    records: Vec<Record>,
    position: usize,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            position: 0,
        }
    }
}

#[async_trait::async_trait]
impl SourceCursor for MemorySource {
    async fn next_batch(&mut self, max: usize) -> anyhow::Result<Vec<Record>> {
        let end = (self.position + max).min(self.records.len());
        let batch = self.records[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }
}

/// An in-memory fetch-by-id target.
pub struct MemoryTarget {
    records: HashMap<String, Record>,
}

impl MemoryTarget {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }
}

#[async_trait::async_trait]
impl TargetFetch for MemoryTarget {
    async fn fetch_by_ids(
        &self,
        _table: &str,
        ids: &[String],
    ) -> anyhow::Result<HashMap<String, Record>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| (id.clone(), r.clone())))
            .collect())
    }
}
