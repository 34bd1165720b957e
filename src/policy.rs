//! Per-field comparison policy
//!
//! A [`TablePolicy`] is the closed, explicitly declared classification of a
//! table's fields, built once per invocation. It replaces the original
//! system's module-level default-value table so the comparison rules are an
//! input, testable in isolation.
//!
//! Classification rules:
//! - *always-defined* fields must be present and equal in both records.
//! - *default-bearing* fields may be absent on either side; the declared
//!   default stands in for the absent value before comparison. This is how a
//!   field the document store leaves undefined materializes in the relational
//!   store.
//! - any other field carried by the source record is compared directly.
//!
//! Comparison is source-driven: fields that exist only on the target record
//! are not inspected, matching the original scan over source documents.

use crate::types::{Record, RecordValue};

/// How a single field is compared between the two stores.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPolicy {
    /// Field must be present in both records and equal.
    AlwaysDefined,
    /// Absence on either side is replaced by the declared default, then the
    /// effective values must be equal.
    DefaultOnAbsence(RecordValue),
}

/// A single field discrepancy found while comparing one record pair.
///
/// `None` means the field was absent on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiff {
    pub field: String,
    pub source: Option<RecordValue>,
    pub target: Option<RecordValue>,
}

/// Declared comparison policy for one table.
///
/// Field order is preserved from declaration so mismatch reports are
/// deterministic; unclassified source fields are compared after the declared
/// ones, in sorted order.
#[derive(Debug, Clone, Default)]
pub struct TablePolicy {
    always_defined: Vec<String>,
    defaults: Vec<(String, RecordValue)>,
}

impl TablePolicy {
    /// Create an empty policy with a builder pattern.
    pub fn builder() -> TablePolicyBuilder {
        TablePolicyBuilder {
            policy: TablePolicy::default(),
        }
    }

    /// Names of the always-defined fields, in declaration order.
    pub fn always_defined(&self) -> &[String] {
        &self.always_defined
    }

    /// Declared (field, default) pairs, in declaration order.
    pub fn defaults(&self) -> &[(String, RecordValue)] {
        &self.defaults
    }

    /// Look up the policy for a field. Unclassified fields fall back to
    /// direct comparison and return `None` here.
    pub fn policy_for(&self, field: &str) -> Option<FieldPolicy> {
        if self.always_defined.iter().any(|f| f == field) {
            return Some(FieldPolicy::AlwaysDefined);
        }
        self.defaults
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| FieldPolicy::DefaultOnAbsence(v.clone()))
    }

    /// Compare one source record against its target counterpart.
    ///
    /// A missing target record yields one diff per always-defined field, per
    /// the contract that a lost row shows up as field-level mismatches rather
    /// than a fatal error.
    pub fn compare_record(&self, source: &Record, target: Option<&Record>) -> Vec<FieldDiff> {
        let Some(target) = target else {
            return self
                .always_defined
                .iter()
                .map(|field| FieldDiff {
                    field: field.clone(),
                    source: source.get(field).cloned(),
                    target: None,
                })
                .collect();
        };

        let mut diffs = Vec::new();

        for field in &self.always_defined {
            let s = source.get(field);
            let t = target.get(field);
            let equal = match (s, t) {
                (Some(s), Some(t)) => s.eq_normalized(t),
                _ => false,
            };
            if !equal {
                diffs.push(FieldDiff {
                    field: field.clone(),
                    source: s.cloned(),
                    target: t.cloned(),
                });
            }
        }

        for (field, default) in &self.defaults {
            let s = source.get(field);
            let t = target.get(field);
            let effective_s = s.unwrap_or(default);
            let effective_t = t.unwrap_or(default);
            if !effective_s.eq_normalized(effective_t) {
                diffs.push(FieldDiff {
                    field: field.clone(),
                    source: s.cloned(),
                    target: t.cloned(),
                });
            }
        }

        // Unclassified source fields: direct comparison, sorted for
        // deterministic report order.
        let mut rest: Vec<&String> = source
            .fields
            .keys()
            .filter(|field| self.policy_for(field).is_none())
            .collect();
        rest.sort();

        for field in rest {
            let s = source.get(field);
            let t = target.get(field);
            let equal = match (s, t) {
                (Some(s), Some(t)) => s.eq_normalized(t),
                _ => false,
            };
            if !equal {
                diffs.push(FieldDiff {
                    field: field.clone(),
                    source: s.cloned(),
                    target: t.cloned(),
                });
            }
        }

        diffs
    }
}

/// Builder for [`TablePolicy`].
pub struct TablePolicyBuilder {
    policy: TablePolicy,
}

impl TablePolicyBuilder {
    /// Declare an always-defined field.
    pub fn always_defined(mut self, field: impl Into<String>) -> Self {
        self.policy.always_defined.push(field.into());
        self
    }

    /// Declare a default-bearing field with its stand-in value.
    pub fn default_on_absence(mut self, field: impl Into<String>, value: RecordValue) -> Self {
        self.policy.defaults.push((field.into(), value));
        self
    }

    /// Build the policy.
    pub fn build(self) -> TablePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_policy() -> TablePolicy {
        TablePolicy::builder()
            .always_defined("email")
            .default_on_absence("isRemoved", RecordValue::Bool(false))
            .default_on_absence("lastSeenAt", RecordValue::Null)
            .build()
    }

    #[test]
    fn test_policy_for_classification() {
        let policy = test_policy();
        assert_eq!(policy.policy_for("email"), Some(FieldPolicy::AlwaysDefined));
        assert_eq!(
            policy.policy_for("isRemoved"),
            Some(FieldPolicy::DefaultOnAbsence(RecordValue::Bool(false)))
        );
        assert_eq!(policy.policy_for("somethingElse"), None);
    }

    #[test]
    fn test_identical_records_produce_no_diffs() {
        let policy = test_policy();
        let source = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .field("isRemoved", RecordValue::Bool(false))
            .build();
        let target = source.clone();
        assert!(policy.compare_record(&source, Some(&target)).is_empty());
    }

    #[test]
    fn test_default_stands_in_for_absence() {
        let policy = test_policy();
        let source = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .build();
        // isRemoved absent on both sides: default false on each, equal.
        let target = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .build();
        assert!(policy.compare_record(&source, Some(&target)).is_empty());

        // Target carries a value unequal to the default.
        let target = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .field("isRemoved", RecordValue::Bool(true))
            .build();
        let diffs = policy.compare_record(&source, Some(&target));
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "isRemoved");
        assert_eq!(diffs[0].source, None);
        assert_eq!(diffs[0].target, Some(RecordValue::Bool(true)));
    }

    #[test]
    fn test_null_default_matches_relational_null() {
        let policy = test_policy();
        let source = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .build();
        // Relational stores surface the column as NULL rather than omitting it.
        let target = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .field("lastSeenAt", RecordValue::Null)
            .build();
        assert!(policy.compare_record(&source, Some(&target)).is_empty());
    }

    #[test]
    fn test_always_defined_absence_is_a_diff() {
        let policy = test_policy();
        let source = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .build();
        let target = Record::builder("u1").build();
        let diffs = policy.compare_record(&source, Some(&target));
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "email");
        assert_eq!(diffs[0].target, None);
    }

    #[test]
    fn test_missing_target_yields_one_diff_per_always_defined_field() {
        let policy = TablePolicy::builder()
            .always_defined("email")
            .always_defined("createdAt")
            .default_on_absence("isRemoved", RecordValue::Bool(false))
            .build();
        let source = Record::builder("u2")
            .field("email", RecordValue::String("b@x.com".to_string()))
            .build();
        let diffs = policy.compare_record(&source, None);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].field, "email");
        assert_eq!(diffs[1].field, "createdAt");
        assert!(diffs.iter().all(|d| d.target.is_none()));
    }

    #[test]
    fn test_unclassified_fields_compared_directly_in_sorted_order() {
        let policy = test_policy();
        let source = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .field("zeta", RecordValue::Int(1))
            .field("alpha", RecordValue::Int(2))
            .build();
        let target = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .field("zeta", RecordValue::Int(9))
            .build();
        let diffs = policy.compare_record(&source, Some(&target));
        assert_eq!(diffs.len(), 2);
        // alpha (absent in target) sorts before zeta (unequal).
        assert_eq!(diffs[0].field, "alpha");
        assert_eq!(diffs[1].field, "zeta");
    }
}
