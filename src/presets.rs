//! Built-in table checks
//!
//! One [`TableCheck`] per migrated table, declaring where the table lives in
//! each store and how its fields are compared. Only the `User` table has
//! shipped so far; new tables register here as their migrations land.

use crate::policy::TablePolicy;
use crate::types::RecordValue;

/// Everything needed to check one table: store coordinates plus the field
/// policy.
#[derive(Debug, Clone)]
pub struct TableCheck {
    /// Table (source collection and target table share the name).
    pub table: String,
    /// Identifier column in the target store.
    pub id_field: String,
    /// Source field the full-table scan is ordered by.
    pub order_by: String,
    /// Field comparison policy.
    pub policy: TablePolicy,
}

/// The `User` table check.
///
/// Always-defined fields must match exactly. The default-bearing fields are
/// the ones the document store was allowed to leave undefined, paired with
/// the value the relational schema materializes in that case.
pub fn user_check() -> TableCheck {
    let policy = TablePolicy::builder()
        .always_defined("email")
        .always_defined("preferredName")
        .always_defined("updatedAt")
        .always_defined("picture")
        .always_defined("identities")
        .always_defined("createdAt")
        .always_defined("tier")
        .always_defined("tms")
        .default_on_absence("newFeatureId", RecordValue::Null)
        .default_on_absence("overLimitCopy", RecordValue::Null)
        .default_on_absence("segmentId", RecordValue::Null)
        .default_on_absence("reasonRemoved", RecordValue::Null)
        .default_on_absence("isRemoved", RecordValue::Bool(false))
        .default_on_absence("payLaterClickCount", RecordValue::Int(0))
        .default_on_absence("featureFlags", RecordValue::Array(vec![]))
        .default_on_absence("lastSeenAt", RecordValue::Null)
        .default_on_absence("lastSeenAtURLs", RecordValue::Null)
        .default_on_absence("inactive", RecordValue::Bool(false))
        .build();

    TableCheck {
        table: "User".to_string(),
        id_field: "id".to_string(),
        order_by: "updatedAt".to_string(),
        policy,
    }
}

/// Look up a built-in check by table name.
pub fn builtin(table: &str) -> Option<TableCheck> {
    match table {
        "User" => Some(user_check()),
        _ => None,
    }
}

/// Names of all built-in checks.
pub fn builtin_names() -> Vec<&'static str> {
    vec!["User"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FieldPolicy;

    #[test]
    fn test_user_check_classification() {
        let check = user_check();
        assert_eq!(check.table, "User");
        assert_eq!(check.order_by, "updatedAt");
        assert_eq!(check.policy.always_defined().len(), 8);
        assert_eq!(check.policy.defaults().len(), 10);
        assert_eq!(
            check.policy.policy_for("email"),
            Some(FieldPolicy::AlwaysDefined)
        );
        assert_eq!(
            check.policy.policy_for("isRemoved"),
            Some(FieldPolicy::DefaultOnAbsence(RecordValue::Bool(false)))
        );
        assert_eq!(
            check.policy.policy_for("payLaterClickCount"),
            Some(FieldPolicy::DefaultOnAbsence(RecordValue::Int(0)))
        );
        assert_eq!(check.policy.policy_for("somethingWeAddedLater"), None);
    }

    #[test]
    fn test_builtin_lookup() {
        assert!(builtin("User").is_some());
        assert!(builtin("Team").is_none());
        assert_eq!(builtin_names(), vec!["User"]);
    }
}
