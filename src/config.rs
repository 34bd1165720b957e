//! Check definitions loaded from YAML files
//!
//! A check file declares the same information as a built-in preset, so new
//! tables can be verified without a code change:
//!
//! ```yaml
//! table: User
//! id_field: id
//! order_by: updatedAt
//! always_defined:
//!   - email
//!   - createdAt
//! defaults:
//!   isRemoved: false
//!   payLaterClickCount: 0
//!   featureFlags: []
//!   lastSeenAt: null
//! ```
//!
//! Default values are plain JSON-typed values converted through the value
//! model; declaration order of `defaults` is preserved for deterministic
//! reports.

use crate::policy::TablePolicy;
use crate::presets::TableCheck;
use crate::types::json_to_record_value;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CheckFile {
    table: String,
    #[serde(default = "default_id_field")]
    id_field: String,
    #[serde(default = "default_order_by")]
    order_by: String,
    #[serde(default)]
    always_defined: Vec<String>,
    // serde_yaml mappings preserve document order.
    #[serde(default)]
    defaults: serde_yaml::Mapping,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_order_by() -> String {
    "updatedAt".to_string()
}

/// Load a [`TableCheck`] from a YAML check file.
pub fn load_check_file(path: &Path) -> anyhow::Result<TableCheck> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read check file {path:?}"))?;
    let file: CheckFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse check file {path:?}"))?;

    let mut builder = TablePolicy::builder();
    for field in &file.always_defined {
        builder = builder.always_defined(field);
    }
    for (key, value) in file.defaults {
        let field = key
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Non-string field name in defaults: {key:?}"))?
            .to_string();
        let json: serde_json::Value = serde_yaml::from_value(value)
            .with_context(|| format!("Invalid default value for field '{field}'"))?;
        builder = builder.default_on_absence(field, json_to_record_value(json)?);
    }

    Ok(TableCheck {
        table: file.table,
        id_field: file.id_field,
        order_by: file.order_by,
        policy: builder.build(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FieldPolicy;
    use crate::types::RecordValue;
    use std::io::Write;

    #[test]
    fn test_load_check_file() {
        let yaml = r#"
table: User
order_by: updatedAt
always_defined:
  - email
  - createdAt
defaults:
  isRemoved: false
  payLaterClickCount: 0
  featureFlags: []
  lastSeenAt: null
"#;
        let dir = std::env::temp_dir();
        let path = dir.join(format!("store-check-{}.yaml", uuid::Uuid::new_v4()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(yaml.as_bytes()).unwrap();

        let check = load_check_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(check.table, "User");
        assert_eq!(check.id_field, "id");
        assert_eq!(check.order_by, "updatedAt");
        assert_eq!(check.policy.always_defined(), &["email", "createdAt"]);
        assert_eq!(
            check.policy.policy_for("isRemoved"),
            Some(FieldPolicy::DefaultOnAbsence(RecordValue::Bool(false)))
        );
        assert_eq!(
            check.policy.policy_for("featureFlags"),
            Some(FieldPolicy::DefaultOnAbsence(RecordValue::Array(vec![])))
        );
        assert_eq!(
            check.policy.policy_for("lastSeenAt"),
            Some(FieldPolicy::DefaultOnAbsence(RecordValue::Null))
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_check_file(Path::new("/nonexistent/check.yaml"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to read check file"));
    }
}
