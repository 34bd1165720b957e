//! End-to-end checker behavior over in-memory stores.

use chrono::{TimeZone, Utc};
use store_check::presets::user_check;
use store_check::testing::{MemorySource, MemoryTarget};
use store_check::{CheckReport, Record, RecordValue, TableChecker, TablePolicy};

fn email_policy() -> TablePolicy {
    TablePolicy::builder()
        .always_defined("email")
        .default_on_absence("isRemoved", RecordValue::Bool(false))
        .build()
}

fn user(id: &str, email: &str) -> Record {
    Record::builder(id)
        .field("email", RecordValue::String(email.to_string()))
        .build()
}

async fn run_check(
    policy: TablePolicy,
    source: Vec<Record>,
    target: Vec<Record>,
    max_errors: usize,
) -> CheckReport {
    let mut cursor = MemorySource::new(source);
    let fetch = MemoryTarget::new(target);
    TableChecker::new("User", policy)
        .with_batch_size(2)
        .with_max_errors(max_errors)
        .unwrap()
        .run(&mut cursor, &fetch)
        .await
        .unwrap()
}

#[tokio::test]
async fn identical_record_sets_yield_an_empty_report() {
    let users = vec![
        user("u1", "a@x.com"),
        user("u2", "b@x.com"),
        user("u3", "c@x.com"),
    ];
    let report = run_check(email_policy(), users.clone(), users, 10).await;

    assert!(report.is_success());
    assert_eq!(report.scanned, 3);
    assert_eq!(report.matched, 3);
    assert_eq!(report.missing, 0);
    assert!(report.mismatches.is_empty());
}

#[tokio::test]
async fn absent_target_field_equal_to_default_is_not_a_mismatch() {
    // Source leaves isRemoved undefined; target omits it; default is false.
    let source = vec![user("u1", "a@x.com")];
    let target = vec![user("u1", "a@x.com")];
    let report = run_check(email_policy(), source, target, 10).await;
    assert!(report.is_success());
}

#[tokio::test]
async fn absent_target_field_unequal_to_source_value_is_one_mismatch() {
    let source = vec![Record::builder("u1")
        .field("email", RecordValue::String("a@x.com".to_string()))
        .field("isRemoved", RecordValue::Bool(true))
        .build()];
    let target = vec![user("u1", "a@x.com")];
    let report = run_check(email_policy(), source, target, 10).await;

    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].field, "isRemoved");
    assert_eq!(report.mismatches[0].id, "u1");
}

#[tokio::test]
async fn differing_always_defined_field_is_one_mismatch_per_record() {
    let source = vec![user("u1", "a@x.com"), user("u2", "ok@x.com")];
    let target = vec![user("u1", "b@x.com"), user("u2", "ok@x.com")];
    let report = run_check(email_policy(), source, target, 10).await;

    assert_eq!(report.mismatched, 1);
    assert_eq!(report.matched, 1);
    assert_eq!(report.mismatches.len(), 1);
    let m = &report.mismatches[0];
    assert_eq!((m.id.as_str(), m.field.as_str()), ("u1", "email"));
    assert_eq!(m.source, "\"a@x.com\"");
    assert_eq!(m.target, "\"b@x.com\"");
}

#[tokio::test]
async fn missing_target_record_mismatches_every_always_defined_field() {
    let check = user_check();
    let source = vec![Record::builder("u2")
        .field("email", RecordValue::String("b@x.com".to_string()))
        .field(
            "createdAt",
            RecordValue::DateTime(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()),
        )
        .build()];
    let report = run_check(check.policy, source, vec![], 20).await;

    assert_eq!(report.missing, 1);
    assert_eq!(report.mismatched, 1);
    // One entry per always-defined field of the User policy.
    assert_eq!(report.mismatches.len(), 8);
    assert!(report.mismatches.iter().all(|m| m.id == "u2"));
    assert!(report.mismatches.iter().all(|m| m.target == "<missing row>"));
}

#[tokio::test]
async fn report_never_exceeds_the_configured_maximum() {
    let source: Vec<Record> = (0..30).map(|i| user(&format!("u{i}"), "a@x.com")).collect();
    let target: Vec<Record> = (0..30).map(|i| user(&format!("u{i}"), "b@x.com")).collect();
    let report = run_check(email_policy(), source, target, 7).await;

    assert_eq!(report.mismatches.len(), 7);
    assert!(report.truncated);
    assert!(!report.is_success());
}

#[tokio::test]
async fn exactly_at_cap_completes_the_scan_untruncated() {
    // Three mismatching records against a cap of three, followed by clean
    // records: the report fills exactly and the scan still runs to the end.
    let mut source: Vec<Record> = (0..3).map(|i| user(&format!("u{i}"), "a@x.com")).collect();
    let mut target: Vec<Record> = (0..3).map(|i| user(&format!("u{i}"), "b@x.com")).collect();
    source.extend((3..5).map(|i| user(&format!("u{i}"), "ok@x.com")));
    target.extend((3..5).map(|i| user(&format!("u{i}"), "ok@x.com")));

    let report = run_check(email_policy(), source, target, 3).await;

    assert_eq!(report.mismatches.len(), 3);
    assert!(!report.truncated);
    assert_eq!(report.scanned, 5);
    assert_eq!(report.matched, 2);
    assert!(!report.is_success());
}

#[tokio::test]
async fn mismatches_are_reported_in_source_order() {
    let source = vec![
        user("u3", "x@x.com"),
        user("u1", "y@x.com"),
        user("u2", "z@x.com"),
    ];
    let target = vec![
        user("u3", "other@x.com"),
        user("u1", "other@x.com"),
        user("u2", "other@x.com"),
    ];
    let report = run_check(email_policy(), source, target, 10).await;

    let ids: Vec<&str> = report.mismatches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["u3", "u1", "u2"]);
}

#[tokio::test]
async fn user_preset_matches_the_expected_full_record() {
    let check = user_check();
    let created = Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap();
    let updated = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let full = |with_defaults: bool| {
        let mut b = Record::builder("u1")
            .field("email", RecordValue::String("a@x.com".to_string()))
            .field("preferredName", RecordValue::String("Ada".to_string()))
            .field("updatedAt", RecordValue::DateTime(updated))
            .field("picture", RecordValue::String("https://p/x.png".to_string()))
            .field(
                "identities",
                RecordValue::Array(vec![RecordValue::String("local:u1".to_string())]),
            )
            .field("createdAt", RecordValue::DateTime(created))
            .field("tier", RecordValue::String("personal".to_string()))
            .field(
                "tms",
                RecordValue::Array(vec![RecordValue::String("team1".to_string())]),
            );
        if with_defaults {
            // The relational side materializes the defaults as real columns.
            b = b
                .field("isRemoved", RecordValue::Bool(false))
                .field("payLaterClickCount", RecordValue::Int(0))
                .field("featureFlags", RecordValue::Array(vec![]))
                .field("newFeatureId", RecordValue::Null)
                .field("overLimitCopy", RecordValue::Null)
                .field("segmentId", RecordValue::Null)
                .field("reasonRemoved", RecordValue::Null)
                .field("lastSeenAt", RecordValue::Null)
                .field("lastSeenAtURLs", RecordValue::Null)
                .field("inactive", RecordValue::Bool(false));
        }
        b.build()
    };

    let report = run_check(check.policy, vec![full(false)], vec![full(true)], 10).await;
    assert!(report.is_success(), "unexpected: {:?}", report.mismatches);
}
