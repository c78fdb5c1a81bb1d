//! Integration tests for changelog version discovery

#[path = "common/mod.rs"]
mod common;

use common::*;
use dmc_mirror::updates::{parse_versions, tail};

#[test]
fn test_beta_entries_take_token_after_marker() {
    let changelog = build_changelog(&[("1.2.3-4", true)]);
    assert_eq!(parse_versions(&changelog), vec!["1.2.3-4".to_string()]);
}

#[test]
fn test_release_entries_take_third_token() {
    let changelog = build_changelog(&[("2.0.0-1", false)]);
    assert_eq!(parse_versions(&changelog), vec!["2.0.0-1".to_string()]);
}

#[test]
fn test_mixed_entries_keep_document_order() {
    let changelog = build_changelog(&[
        ("2.0.0-1", false),
        ("2.1.0-1", true),
        ("2.1.0-2", false),
    ]);
    assert_eq!(
        parse_versions(&changelog),
        vec![
            "2.0.0-1".to_string(),
            "2.1.0-1".to_string(),
            "2.1.0-2".to_string()
        ]
    );
}

#[test]
fn test_crlf_changelog_yields_clean_tokens() {
    let versions = parse_versions(SAMPLE_CRLF_CHANGELOG);
    assert_eq!(versions, vec!["2.0.0-1".to_string(), "2.1.0-3".to_string()]);
    for version in &versions {
        assert!(!version.contains('\r'));
    }
}

#[test]
fn test_thirty_versions_tail_to_last_twenty_three() {
    let entries: Vec<(String, bool)> = (1..=30).map(|i| (format!("3.0.{i}-1"), false)).collect();
    let entry_refs: Vec<(&str, bool)> = entries.iter().map(|(v, b)| (v.as_str(), *b)).collect();
    let changelog = build_changelog(&entry_refs);

    let all = parse_versions(&changelog);
    assert_eq!(all.len(), 30);

    let selected = tail(&all, 23);
    assert_eq!(selected.len(), 23);
    assert_eq!(selected.first().unwrap(), "3.0.8-1");
    assert_eq!(selected.last().unwrap(), "3.0.30-1");
    // Original order preserved
    for (i, version) in selected.iter().enumerate() {
        assert_eq!(version, &format!("3.0.{}-1", i + 8));
    }
}

#[test]
fn test_empty_changelog_yields_no_versions() {
    assert!(parse_versions("").is_empty());
    assert!(parse_versions("no matching lines here\n").is_empty());
}
