//! # Invoice / Job Numbering Rules
//!
//! Pure formatting rules for the shared `{PREFIX}-{YYYYMMDD}-{NNNN}`
//! number space used by sales and repair jobs. Allocation (the counter
//! itself) lives in `velo-db`.
//!
//! ```text
//!   "Velo Works" + shop id "…c29a"
//!        │                 │
//!        ▼                 ▼
//!      "VEL"      +      "9A"       = "VEL9A"
//!                                       │
//!   2026-10-14 ──► "20261014"           │
//!                                       ▼
//!                         "VEL9A-20261014-0007"
//! ```

use chrono::{DateTime, NaiveDate, Utc};

/// Prefix used when the shop name contains no ASCII letters.
pub const DEFAULT_PREFIX: &str = "INV";

/// Suffix appended to the parent invoice number on service records.
pub const SERVICE_SUFFIX: &str = "-SRV";

/// First three ASCII letters of the shop name, uppercased.
///
/// ## Example
/// ```rust
/// use velo_core::numbering::shop_name_prefix;
///
/// assert_eq!(shop_name_prefix("Velo Works"), "VEL");
/// assert_eq!(shop_name_prefix("4 U Bikes"), "UBI");
/// assert_eq!(shop_name_prefix("123"), "INV");
/// ```
pub fn shop_name_prefix(shop_name: &str) -> String {
    let letters: String = shop_name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();

    if letters.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        letters
    }
}

/// Last two characters of the shop id, uppercased.
pub fn shop_id_suffix(shop_id: &str) -> String {
    let chars: Vec<char> = shop_id.chars().collect();
    let start = chars.len().saturating_sub(2);
    chars[start..].iter().collect::<String>().to_uppercase()
}

/// Full number prefix: name letters plus the shop-id suffix.
pub fn number_prefix(shop_name: &str, shop_id: &str) -> String {
    format!("{}{}", shop_name_prefix(shop_name), shop_id_suffix(shop_id))
}

/// `YYYYMMDD` key for a calendar day.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// The part of a number shared by every number of one shop/day:
/// `{prefix}-{YYYYMMDD}-`.
pub fn number_stem(prefix: &str, date_key: &str) -> String {
    format!("{prefix}-{date_key}-")
}

/// Formats a number with a zero-padded (at least 4 digit) sequence.
///
/// ## Example
/// ```rust
/// use velo_core::numbering::format_number;
///
/// assert_eq!(format_number("VEL9A", "20261014", 7), "VEL9A-20261014-0007");
/// assert_eq!(format_number("VEL9A", "20261014", 12345), "VEL9A-20261014-12345");
/// ```
pub fn format_number(prefix: &str, date_key: &str, sequence: i64) -> String {
    format!("{prefix}-{date_key}-{sequence:04}")
}

/// Extracts the sequence from a number carrying the given stem.
pub fn parse_sequence(number: &str, stem: &str) -> Option<i64> {
    number.strip_prefix(stem)?.parse().ok()
}

/// Escape-hatch number used when the counter cannot be read.
///
/// `INV-{unix millis}-{000-999}`; never produced on the normal path.
pub fn fallback_number(now: DateTime<Utc>, entropy: u16) -> String {
    format!(
        "{DEFAULT_PREFIX}-{}-{:03}",
        now.timestamp_millis(),
        entropy % 1000
    )
}

/// Invoice number of a service record billed with the given sale.
pub fn service_invoice_number(sale_invoice_number: &str) -> String {
    format!("{sale_invoice_number}{SERVICE_SUFFIX}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_shop_name_prefix_strips_non_letters() {
        assert_eq!(shop_name_prefix("Bike Shop"), "BIK");
        assert_eq!(shop_name_prefix("b-i-k-e"), "BIK");
        assert_eq!(shop_name_prefix("Çafé Vélo"), "AFV");
        assert_eq!(shop_name_prefix("AB"), "AB");
        assert_eq!(shop_name_prefix(""), "INV");
        assert_eq!(shop_name_prefix("42 !!"), "INV");
    }

    #[test]
    fn test_shop_id_suffix() {
        assert_eq!(shop_id_suffix("5f1c9a3e-0000-4000-8000-00000000c29a"), "9A");
        assert_eq!(shop_id_suffix("x"), "X");
        assert_eq!(shop_id_suffix(""), "");
    }

    #[test]
    fn test_identical_names_get_distinct_prefixes() {
        let a = number_prefix("Velo Works", "aaaa-01");
        let b = number_prefix("Velo Works", "bbbb-02");
        assert_eq!(a, "VEL01");
        assert_eq!(b, "VEL02");
    }

    #[test]
    fn test_date_key_and_stem() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(date_key(date), "20260105");
        assert_eq!(number_stem("VEL01", "20260105"), "VEL01-20260105-");
    }

    #[test]
    fn test_parse_sequence() {
        let stem = "VEL01-20260105-";
        assert_eq!(parse_sequence("VEL01-20260105-0042", stem), Some(42));
        assert_eq!(parse_sequence("VEL01-20260106-0042", stem), None);
        assert_eq!(parse_sequence("VEL01-20260105-0042-SRV", stem), None);
    }

    #[test]
    fn test_fallback_number_shape() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        let number = fallback_number(now, 1234);
        assert_eq!(number, format!("INV-{}-234", now.timestamp_millis()));
    }

    #[test]
    fn test_service_invoice_number() {
        assert_eq!(
            service_invoice_number("VEL01-20260105-0001"),
            "VEL01-20260105-0001-SRV"
        );
    }
}
