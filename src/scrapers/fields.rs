//! Typed parsing of the text fragments found in one listing entry.
//!
//! Result pages render numbers in German notation: `.` groups thousands,
//! `,` is the decimal separator and values carry a unit suffix
//! (`"1.234,50 €"`, `"65,5 m²"`, `"2,5"`).

use crate::error::FieldError;

/// Marker the result list prefixes to freshly published listings.
pub const TITLE_NOISE_TOKEN: &str = "NEU";

/// Placeholder the site renders for unspecified secondary criteria.
pub const CRITERIA_PLACEHOLDER: &str = "...";

pub const CRITERIA_SEPARATOR: &str = ", ";

/// One parsed entry of a listing's primary criteria block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryCriterion {
    ColdRent(f64),
    LivingSpace(f64),
    Rooms(f64),
}

/// Classify a `dt`/`dd` pair by its label and parse the value.
///
/// Returns `Ok(None)` for labels that carry no field we track.
pub fn parse_criterion(
    listing_id: &str,
    label: &str,
    value: &str,
) -> Result<Option<PrimaryCriterion>, FieldError> {
    let parsed = if label.contains("Kaltmiete") {
        parse_price(value).map(PrimaryCriterion::ColdRent)
    } else if label.contains("Wohnfläche") {
        parse_living_space(value).map(PrimaryCriterion::LivingSpace)
    } else if label.contains("Zi.") {
        parse_rooms(value).map(PrimaryCriterion::Rooms)
    } else {
        return Ok(None);
    };

    parsed.map(Some).ok_or_else(|| FieldError {
        listing_id: listing_id.to_string(),
        label: label.trim().to_string(),
        value: value.to_string(),
    })
}

/// `"1.234,50 €"` -> `1234.5`
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = compact(raw).replace('€', "").replace('.', "").replace(',', ".");
    decimal(&cleaned)
}

/// `"65,5 m²"` -> `65.5`
pub fn parse_living_space(raw: &str) -> Option<f64> {
    let cleaned = compact(raw).replace("m²", "").replace(',', ".");
    decimal(&cleaned)
}

/// `"2,5"` -> `2.5`
pub fn parse_rooms(raw: &str) -> Option<f64> {
    decimal(&compact(raw).replace(',', "."))
}

/// Drop the noise token and collapse whitespace.
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|token| *token != TITLE_NOISE_TOKEN)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_address(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join secondary criteria tags, skipping placeholders and repeats.
pub fn join_criteria<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for item in items {
        let tag = item.as_ref().trim();
        if tag.is_empty() || tag == CRITERIA_PLACEHOLDER {
            continue;
        }
        if !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }
    tags.join(CRITERIA_SEPARATOR)
}

// Plain digits with at most one decimal point. `f64::from_str` alone would
// also take "NaN", "inf" and exponent forms.
fn decimal(cleaned: &str) -> Option<f64> {
    let well_formed = cleaned.chars().any(|c| c.is_ascii_digit())
        && cleaned.chars().all(|c| c.is_ascii_digit() || c == '.')
        && cleaned.matches('.').count() <= 1;
    if !well_formed {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Removes every whitespace char, including the NBSP the site puts before units.
fn compact(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}
