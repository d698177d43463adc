//! Wattage extraction and variant pricing for lighting products.
//!
//! Product descriptions are free text written by merchandisers, e.g.
//! `"Ecoplus SMD Downlight - Power: 7 Watt / 12 Watt, Size: ..."`. The
//! functions here pull the selectable power ratings out of that text and
//! price each rating relative to the lowest one. Both are total: a
//! description with nothing recognisable simply yields no options.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A power rating in watts.
pub type Wattage = u32;

/// Price added for every watt above the reference (lowest) wattage.
pub const PRICE_PER_WATT_UNIT: i64 = 20;

/// Accepted values inside an explicit `Power:` window.
pub const LABELED_RANGE: RangeInclusive<Wattage> = 1..=100;

/// Accepted values when scanning the whole description. Tighter, so that
/// marketing comparisons such as "equivalent to 42W" are not offered.
pub const FALLBACK_RANGE: RangeInclusive<Wattage> = 1..=30;

static POWER_WINDOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)power:\s*([^,.(]+)").expect("valid power window regex"));

static WATTAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)\s*w(?:att)?").expect("valid wattage regex"));

/// Extracts the distinct wattage options offered in a product description.
///
/// The labeled `Power:` window is searched first with a `[1, 100]` range;
/// if there is no label, or the window holds no in-range value, the whole
/// description is scanned with the tighter `[1, 30]` range.
///
/// The result is strictly ascending. Returns an empty vector when nothing
/// matches.
#[must_use]
pub fn extract_wattage_options(description: &str) -> Vec<Wattage> {
    if let Some(window) = power_window(description) {
        let labeled = wattages_in(window, &LABELED_RANGE);
        if !labeled.is_empty() {
            return labeled;
        }
    }

    wattages_in(description, &FALLBACK_RANGE)
}

/// Computes the displayed price for `selected` given every option of the
/// product.
///
/// The minimum of `all` is the reference wattage. A selection below the
/// reference is allowed and produces a lower price.
#[must_use]
pub fn compute_price(base_price: i64, selected: Option<Wattage>, all: &[Wattage]) -> i64 {
    let (Some(selected), Some(reference)) = (selected, all.iter().min().copied()) else {
        return base_price;
    };

    let delta = i64::from(selected) - i64::from(reference);
    base_price.saturating_add(delta.saturating_mul(PRICE_PER_WATT_UNIT))
}

/// The selection shown when a product is first loaded: its lowest wattage.
#[must_use]
pub fn default_selection(all: &[Wattage]) -> Option<Wattage> {
    all.iter().min().copied()
}

/// A computed price for one wattage variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub base_price: i64,
    pub selected_wattage: Option<Wattage>,
    pub reference_wattage: Option<Wattage>,
    pub price: i64,
}

impl PriceQuote {
    /// Prices `selected` against the options found in `description`.
    ///
    /// `None` selects the default (lowest) option.
    #[must_use]
    pub fn for_description(base_price: i64, description: &str, selected: Option<Wattage>) -> Self {
        let options = extract_wattage_options(description);
        Self::for_options(base_price, &options, selected)
    }

    /// Same as [`PriceQuote::for_description`] with options already extracted.
    #[must_use]
    pub fn for_options(base_price: i64, options: &[Wattage], selected: Option<Wattage>) -> Self {
        let selected_wattage = selected.or_else(|| default_selection(options));
        Self {
            base_price,
            selected_wattage,
            reference_wattage: default_selection(options),
            price: compute_price(base_price, selected_wattage, options),
        }
    }
}

fn power_window(description: &str) -> Option<&str> {
    POWER_WINDOW_RE
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn wattages_in(text: &str, range: &RangeInclusive<Wattage>) -> Vec<Wattage> {
    let mut values: Vec<Wattage> = WATTAGE_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<Wattage>().ok())
        .filter(|w| range.contains(w))
        .collect();
    values.sort_unstable();
    values.dedup();
    values
}

#[cfg(test)]
#[path = "wattage_test.rs"]
mod tests;
