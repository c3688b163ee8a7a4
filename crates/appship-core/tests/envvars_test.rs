use appship_core::EnvVarBlock;
use appship_core::envvars::{merge, parse_pairs};
use proptest::prelude::*;

fn block(pairs: &[(&str, &str)]) -> EnvVarBlock {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

// ── merge ──

#[test]
fn merge_empty_with_empty() {
    assert_eq!(merge(Some(&block(&[])), &block(&[])), block(&[]));
}

#[test]
fn merge_into_empty() {
    let overrides = block(&[("FOO", "bar"), ("ZIP", "zap")]);
    assert_eq!(merge(Some(&block(&[])), &overrides), overrides);
}

#[test]
fn merge_into_absent_block() {
    let overrides = block(&[("FOO", "bar")]);
    assert_eq!(merge(None, &overrides), overrides);
}

#[test]
fn merge_preserves_existing_keys() {
    let merged = merge(Some(&block(&[("EXISTING", "one")])), &block(&[("FOO", "bar")]));
    assert_eq!(merged, block(&[("EXISTING", "one"), ("FOO", "bar")]));
}

#[test]
fn merge_override_wins() {
    let merged = merge(Some(&block(&[("FOO", "bar")])), &block(&[("FOO", "zip")]));
    assert_eq!(merged, block(&[("FOO", "zip")]));
}

#[test]
fn merge_keeps_existing_order_and_appends_new_keys() {
    let existing = block(&[("B", "1"), ("A", "2")]);
    let merged = merge(Some(&existing), &block(&[("C", "3"), ("A", "9")]));

    let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["B", "A", "C"]);
    assert_eq!(merged["A"], "9");
}

proptest! {
    #[test]
    fn merged_block_honors_overrides_and_keeps_the_rest(
        existing in prop::collection::hash_map("[A-Z]{1,4}", "[a-z]{0,4}", 0..6),
        overrides in prop::collection::hash_map("[A-Z]{1,4}", "[a-z]{0,4}", 0..6),
    ) {
        let existing: EnvVarBlock = existing.into_iter().collect();
        let overrides: EnvVarBlock = overrides.into_iter().collect();
        let merged = merge(Some(&existing), &overrides);

        for (key, value) in &overrides {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in &existing {
            if !overrides.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
        for key in merged.keys() {
            prop_assert!(existing.contains_key(key) || overrides.contains_key(key));
        }
    }
}

// ── parse_pairs ──

#[test]
fn parse_pairs_splits_on_commas_and_newlines() {
    let parsed = parse_pairs("FOO=bar, ZIP=zap\nNODE_ENV=production").unwrap();
    assert_eq!(
        parsed,
        block(&[("FOO", "bar"), ("ZIP", "zap"), ("NODE_ENV", "production")])
    );
}

#[test]
fn parse_pairs_keeps_equals_in_value() {
    let parsed = parse_pairs("QUERY=a=b").unwrap();
    assert_eq!(parsed["QUERY"], "a=b");
}

#[test]
fn parse_pairs_allows_empty_value() {
    let parsed = parse_pairs("EMPTY=").unwrap();
    assert_eq!(parsed["EMPTY"], "");
}

#[test]
fn parse_pairs_skips_blank_entries() {
    assert!(parse_pairs("").unwrap().is_empty());
    assert_eq!(parse_pairs(",FOO=bar,,\n").unwrap().len(), 1);
}

#[test]
fn parse_pairs_rejects_missing_separator() {
    let err = parse_pairs("FOO").unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("KEY=VALUE"));
}

#[test]
fn parse_pairs_rejects_empty_key() {
    let err = parse_pairs("=bar").unwrap_err();
    assert!(err.is_validation());
}
