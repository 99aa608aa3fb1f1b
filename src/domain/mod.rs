//! Hostname normalisation.
//!
//! Turns arbitrary user input ("ExAmple.com", "https://münchen.de/path",
//! " sub.host.io ") into a canonical ASCII hostname: trimmed, lowercased,
//! scheme and path stripped, IDNA (punycode) encoded, at most 253 octets.
//! A canonical hostname round-trips through [`normalize_hostname`]
//! unchanged.

use url::Url;

/// Maximum hostname length in octets per RFC 1035.
const MAX_HOSTNAME_OCTETS: usize = 253;

/// Rejection raised for input that cannot become a canonical hostname.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid domain: {0:?}")]
pub struct BadDomain(pub String);

/// Normalises raw user input into a canonical ASCII hostname.
///
/// Accepts bare hosts, hosts with stray whitespace or uppercase, and full
/// `http(s)://` URLs (the host is extracted, everything else discarded).
///
/// # Errors
///
/// Returns [`BadDomain`] when the result would be empty, exceeds 253
/// octets, or cannot be IDNA-encoded.
pub fn normalize_hostname(raw: &str) -> Result<String, BadDomain> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(BadDomain(raw.to_string()));
    }

    let host = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Url::parse(&trimmed)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| BadDomain(raw.to_string()))?
    } else {
        // Prepending a scheme lets the URL parser strip ports, paths and
        // userinfo; raw input that still fails to parse is used as-is so
        // the IDNA step gets the final say.
        match Url::parse(&format!("https://{trimmed}")) {
            Ok(u) => u
                .host_str()
                .map(str::to_string)
                .unwrap_or_else(|| trimmed.clone()),
            Err(_) => trimmed.clone(),
        }
    };

    let encoded = idna::domain_to_ascii(&host).map_err(|_| BadDomain(raw.to_string()))?;

    // IDNA is lenient about characters STD3 would reject; a canonical
    // hostname is strictly LDH labels separated by dots.
    let ldh = !encoded.is_empty()
        && encoded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.');
    if !ldh || encoded.len() > MAX_HOSTNAME_OCTETS {
        return Err(BadDomain(raw.to_string()));
    }

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
