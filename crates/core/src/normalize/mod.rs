//! Total normalization helpers for CRM data coming from heterogeneous sources.
//!
//! Nothing in this module fails: missing or malformed input degrades to an
//! empty string, or to the original value for dates.

pub mod dates;
pub mod fields;

pub use dates::parse_flexible_date;
pub use fields::{canonicalize_account, canonicalize_contact, FieldChain};

const LEGAL_SUFFIXES: [&str; 5] = ["llc", "inc", "co", "corp", "ltd"];

/// Keeps the last ten digits so country codes and punctuation never break equality.
pub fn normalize_phone(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
    let start = digits.len().saturating_sub(10);
    digits[start..].iter().collect()
}

pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `normalize_name` without legal-entity suffix tokens, so "Acme Inc." equals "Acme".
pub fn normalize_company_key(raw: &str) -> String {
    normalize_name(raw)
        .split(' ')
        .filter(|token| !token.is_empty() && !LEGAL_SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_domain(email: &str) -> String {
    let Some((local, host)) = email.trim().rsplit_once('@') else {
        return String::new();
    };
    let host = host.trim().to_ascii_lowercase();
    if local.is_empty() || host.is_empty() || host.contains(char::is_whitespace) {
        return String::new();
    }
    host
}

/// Host part of a website or domain field: no scheme, `www.`, port or path.
pub fn normalize_host(website: &str) -> String {
    let lowered = website.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .or_else(|| lowered.strip_prefix("//"))
        .unwrap_or(&lowered);
    let host = without_scheme.split(['/', '?', '#', ':']).next().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_owned()
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_company_key, normalize_domain, normalize_host, normalize_name, normalize_phone,
    };

    #[test]
    fn phone_formats_compare_equal_after_normalization() {
        assert_eq!(normalize_phone("+1 (972) 555-1234"), normalize_phone("9725551234"));
        assert_eq!(normalize_phone("972.555.1234"), "9725551234");
        assert_eq!(normalize_phone(""), "");
        assert_eq!(normalize_phone("ext"), "");
        assert_eq!(normalize_phone("555-1234"), "5551234");
    }

    #[test]
    fn names_ignore_case_punctuation_and_spacing() {
        assert_eq!(normalize_name("  Jane   O'Doe-Smith "), "jane odoesmith");
        assert_eq!(normalize_name("JANE DOE"), normalize_name("jane doe"));
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn company_keys_drop_legal_suffixes() {
        assert_eq!(
            normalize_company_key("Acme Industries, LLC"),
            normalize_company_key("Acme Industries")
        );
        assert_eq!(normalize_company_key("Acme Inc."), "acme");
        assert_eq!(normalize_company_key("Globex Corp"), "globex");
        assert_eq!(normalize_company_key("Initech Co."), "initech");
        assert_eq!(normalize_company_key("Umbrella Ltd"), "umbrella");
        assert_eq!(normalize_company_key("LLC"), "");
    }

    #[test]
    fn domain_is_lowercased_host_or_empty() {
        assert_eq!(normalize_domain("Jane@Acme.COM"), "acme.com");
        assert_eq!(normalize_domain("no-at-sign"), "");
        assert_eq!(normalize_domain("jane@"), "");
        assert_eq!(normalize_domain("@acme.com"), "");
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn host_strips_scheme_www_and_path() {
        assert_eq!(normalize_host("https://www.Acme.com/about?x=1"), "acme.com");
        assert_eq!(normalize_host("acme.com"), "acme.com");
        assert_eq!(normalize_host("http://shop.acme.com:8080"), "shop.acme.com");
        assert_eq!(normalize_host(""), "");
    }
}
