//! Compound label parsing and region name normalization.
//!
//! A compound label packs a product and an inspection status into one
//! string: `"Apple Watch (Pass)"`.

use crate::models::Status;

/// Separator between category and status in a compound label.
const CATEGORY_SEPARATOR: &str = " (";

/// Marker that classifies a label as passing.
const PASS_MARKER: &str = "(Pass)";

/// Split a compound label into `(category, status)`.
///
/// The category is everything before the first `" ("`; a label without that
/// separator is returned whole. The status is `Pass` only when the literal
/// `"(Pass)"` occurs somewhere in the label; everything else, malformed
/// labels included, is `Fail`.
///
/// ```
/// use passboard::transform::classify_compound_label;
/// use passboard::Status;
///
/// assert_eq!(classify_compound_label("iPhone (Pass)"), ("iPhone".to_string(), Status::Pass));
/// assert_eq!(classify_compound_label("NoParens"), ("NoParens".to_string(), Status::Fail));
/// ```
pub fn classify_compound_label(label: &str) -> (String, Status) {
    let category = match label.find(CATEGORY_SEPARATOR) {
        Some(idx) => &label[..idx],
        None => label,
    };

    let status = if label.contains(PASS_MARKER) {
        Status::Pass
    } else {
        Status::Fail
    };

    (category.to_string(), status)
}

/// Regions reported by the inspection programme, in display order.
pub const KNOWN_REGIONS: [&str; 6] = [
    "Central",
    "Northern",
    "Southern",
    "East Coast",
    "Sabah",
    "Sarawak",
];

/// Spellings seen in source files that map to a known region.
const REGION_ALIASES: [(&str, &str); 2] = [("nothern", "Northern"), ("eastcoast", "East Coast")];

/// Trim a label and collapse internal runs of whitespace.
pub fn normalize_label(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical spelling of a region name.
///
/// Matching is case-insensitive after whitespace normalization. Names outside
/// the known vocabulary come back normalized but otherwise untouched.
pub fn canonical_region(name: &str) -> String {
    let normalized = normalize_label(name);
    let key = normalized.to_lowercase();

    if let Some(known) = KNOWN_REGIONS.iter().find(|r| r.to_lowercase() == key) {
        return known.to_string();
    }
    if let Some((_, canonical)) = REGION_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return canonical.to_string();
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_and_fail_labels() {
        assert_eq!(
            classify_compound_label("iPhone (Pass)"),
            ("iPhone".to_string(), Status::Pass)
        );
        assert_eq!(
            classify_compound_label("iPhone (Fail)"),
            ("iPhone".to_string(), Status::Fail)
        );
    }

    #[test]
    fn test_label_without_separator_is_kept_whole_and_fails() {
        assert_eq!(
            classify_compound_label("NoParens"),
            ("NoParens".to_string(), Status::Fail)
        );
    }

    #[test]
    fn test_special_characters_survive() {
        assert_eq!(
            classify_compound_label("Apple Watch & iPhone (Pass)"),
            ("Apple Watch & iPhone".to_string(), Status::Pass)
        );
    }

    #[test]
    fn test_split_on_first_separator_only() {
        let (category, status) = classify_compound_label("Mac (M3) (Pass)");
        assert_eq!(category, "Mac");
        assert_eq!(status, Status::Pass);
    }

    #[test]
    fn test_unknown_status_is_fail() {
        assert_eq!(classify_compound_label("iPad (pass)").1, Status::Fail);
        assert_eq!(classify_compound_label("iPad (Pending)").1, Status::Fail);
        assert_eq!(classify_compound_label("").1, Status::Fail);
    }

    #[test]
    fn test_pass_marker_without_separator() {
        // "(Pass)" is searched anywhere, the category split needs " (".
        assert_eq!(
            classify_compound_label("iPad(Pass)"),
            ("iPad(Pass)".to_string(), Status::Pass)
        );
    }

    #[test]
    fn test_canonical_region() {
        assert_eq!(canonical_region("Sarawak "), "Sarawak");
        assert_eq!(canonical_region("  east   COAST"), "East Coast");
        assert_eq!(canonical_region("Nothern"), "Northern");
        assert_eq!(canonical_region("Johor"), "Johor");
    }
}
