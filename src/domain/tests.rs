use super::*;

#[test]
fn test_bare_host_passes_through() {
    assert_eq!(normalize_hostname("example.com").unwrap(), "example.com");
}

#[test]
fn test_trims_and_lowercases() {
    assert_eq!(
        normalize_hostname("  ExAmple.COM \n").unwrap(),
        "example.com"
    );
}

#[test]
fn test_strips_scheme_path_and_port() {
    assert_eq!(
        normalize_hostname("https://example.com/some/path?q=1").unwrap(),
        "example.com"
    );
    assert_eq!(
        normalize_hostname("http://example.com:8080").unwrap(),
        "example.com"
    );
    assert_eq!(
        normalize_hostname("example.com/landing").unwrap(),
        "example.com"
    );
}

#[test]
fn test_idna_encodes_unicode() {
    assert_eq!(
        normalize_hostname("münchen.de").unwrap(),
        "xn--mnchen-3ya.de"
    );
    // Already-encoded input is untouched.
    assert_eq!(
        normalize_hostname("xn--mnchen-3ya.de").unwrap(),
        "xn--mnchen-3ya.de"
    );
}

#[test]
fn test_rejects_empty_and_whitespace() {
    assert!(normalize_hostname("").is_err());
    assert!(normalize_hostname("   ").is_err());
}

#[test]
fn test_rejects_overlong_hostname() {
    let label = "a".repeat(60);
    let long = format!("{label}.{label}.{label}.{label}.{label}.com");
    assert!(long.len() > 253);
    assert!(normalize_hostname(&long).is_err());
}

#[test]
fn test_rejects_unencodable_input() {
    assert!(normalize_hostname("exa mple.com").is_err());
    assert!(normalize_hostname("https://").is_err());
}

#[test]
fn test_subdomains_kept() {
    assert_eq!(
        normalize_hostname("deep.sub.example.co.uk").unwrap(),
        "deep.sub.example.co.uk"
    );
}

// Property-based tests using proptest
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_normalization_idempotent(raw in "[a-z0-9]{1,20}\\.[a-z]{2,6}") {
        if let Ok(once) = normalize_hostname(&raw) {
            let twice = normalize_hostname(&once).unwrap();
            prop_assert_eq!(once, twice, "canonical hostnames must round-trip unchanged");
        }
    }

    #[test]
    fn test_output_is_ascii_and_bounded(raw in "\\PC{1,80}") {
        if let Ok(host) = normalize_hostname(&raw) {
            prop_assert!(host.is_ascii());
            prop_assert!(!host.is_empty());
            prop_assert!(host.len() <= 253);
            prop_assert_eq!(host.clone(), host.to_lowercase());
        }
    }

    #[test]
    fn test_scheme_wrapped_equals_bare(raw in "[a-z0-9]{1,20}\\.[a-z]{2,6}") {
        let bare = normalize_hostname(&raw);
        let wrapped = normalize_hostname(&format!("https://{raw}/index.html"));
        prop_assert_eq!(bare.ok(), wrapped.ok());
    }
}
