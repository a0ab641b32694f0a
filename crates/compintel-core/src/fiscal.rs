//! Identity helpers: fiscal-id validation and company-name normalisation.

use std::sync::LazyLock;

use regex::Regex;

/// Length of an Italian VAT number (partita IVA).
pub const FISCAL_ID_LEN: usize = 11;

static LEGAL_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(s\.r\.l\.?|srl|s\.p\.a\.?|spa|s\.n\.c\.?|snc|s\.a\.s\.?|sas|ltd|inc|corp|llc)(\W|$)")
        .expect("legal-form pattern is a valid regex")
});

/// Strips everything but ASCII digits.
#[must_use]
pub fn normalize_fiscal_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Returns `true` if `raw` (after stripping non-digits) is an 11-digit VAT
/// number with a correct control digit.
#[must_use]
pub fn validate_fiscal_id(raw: &str) -> bool {
    let digits = normalize_fiscal_id(raw);
    if digits.len() != FISCAL_ID_LEN {
        return false;
    }
    let bytes = digits.as_bytes();
    control_digit(&bytes[..FISCAL_ID_LEN - 1]) == Some(bytes[FISCAL_ID_LEN - 1] - b'0')
}

/// Appends the control digit to a 10-digit prefix.
///
/// Returns `None` if `prefix` is not exactly ten ASCII digits.
#[must_use]
pub fn with_control_digit(prefix: &str) -> Option<String> {
    let digit = control_digit(prefix.as_bytes())?;
    Some(format!("{prefix}{digit}"))
}

/// Luhn-style control digit over the first ten digits: odd positions are
/// summed as-is, even positions are doubled and reduced by 9 when above 9.
fn control_digit(prefix: &[u8]) -> Option<u8> {
    if prefix.len() != FISCAL_ID_LEN - 1 || !prefix.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 0 {
                d
            } else if d * 2 > 9 {
                d * 2 - 9
            } else {
                d * 2
            }
        })
        .sum();
    #[allow(clippy::cast_possible_truncation)]
    let digit = ((10 - sum % 10) % 10) as u8;
    Some(digit)
}

/// Normalise a company name for matching and cache keys.
///
/// Lowercases, drops legal-form suffixes (`S.r.l.`, `SpA`, `Ltd`, ...),
/// replaces punctuation with spaces and collapses whitespace.
#[must_use]
pub fn normalize_company_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = LEGAL_FORM.replace_all(&lowered, " ");
    stripped
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Probable web domain for a company that has not published one.
#[must_use]
pub fn company_domain(name: &str) -> String {
    let compact: String = normalize_company_name(name)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("www.{compact}.it")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_fiscal_ids() {
        assert!(validate_fiscal_id("00743110157"));
        assert!(validate_fiscal_id("12345678903"));
        assert!(validate_fiscal_id("IT 0764 3520 567"));
    }

    #[test]
    fn rejects_bad_control_digit() {
        assert!(!validate_fiscal_id("01234567890"));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(!validate_fiscal_id("1234567890"));
        assert!(!validate_fiscal_id(""));
        assert!(!validate_fiscal_id("123456789012"));
    }

    #[test]
    fn with_control_digit_produces_valid_id() {
        let id = with_control_digit("0123456789").unwrap();
        assert_eq!(id, "01234567897");
        assert!(validate_fiscal_id(&id));
    }

    #[test]
    fn with_control_digit_rejects_non_digits() {
        assert!(with_control_digit("01234x6789").is_none());
        assert!(with_control_digit("123").is_none());
    }

    #[test]
    fn normalize_strips_legal_forms() {
        assert_eq!(normalize_company_name("ACME S.r.l."), "acme");
        assert_eq!(normalize_company_name("Rossi & Figli S.p.A."), "rossi figli");
        assert_eq!(normalize_company_name("  Beta   Consulting  srl "), "beta consulting");
        assert_eq!(normalize_company_name("Gamma Ltd"), "gamma");
    }

    #[test]
    fn normalize_keeps_plain_names() {
        assert_eq!(normalize_company_name("Delta Tech"), "delta tech");
    }

    #[test]
    fn company_domain_uses_normalized_name() {
        assert_eq!(company_domain("ACME S.r.l."), "www.acme.it");
        assert_eq!(company_domain("Rossi & Figli"), "www.rossifigli.it");
    }
}
