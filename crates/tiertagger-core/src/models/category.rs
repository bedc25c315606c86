//! Category (game mode) names and rank-label ordinals.
//!
//! The ranking service is inconsistent about how it spells categories
//! ("cpvp" vs "crystal", "nethpot" vs "netherite"), so every category name
//! goes through [`normalize_category`] before it is stored or compared.

/// Label used for a category the player holds no standing in.
pub const UNRANKED: &str = "Unranked";

/// Ordinal for `Unranked` and any label that does not parse as a tier.
/// Larger than every real ordinal, so it always loses a "best tier" comparison.
pub const UNRANKED_ORDINAL: u32 = u32::MAX;

/// Map a raw category name from the API to its canonical display form.
///
/// Matching is case-insensitive. Names we don't recognize are returned
/// unchanged so new categories still show up.
pub fn normalize_category(raw: &str) -> String {
    let canonical = match raw.to_lowercase().as_str() {
        "sword" | "swd" => "Sword",
        "crystal" | "cpvp" => "Crystal",
        "netherite" | "nethpot" => "Netherite",
        "pot" | "potion" => "Potion",
        "mace" | "macepvp" => "Mace",
        "uhc" => "UHC",
        "axe" | "axepvp" => "Axe",
        "smp" | "smpkit" => "SMP",
        "diasmp" => "DiaSMP",
        _ => return raw.to_string(),
    };
    canonical.to_string()
}

/// Convert a rank label to a comparable ordinal (lower is better).
///
/// `HT{n}` maps to `2n - 1` and `LT{n}` to `2n`, so HT1 < LT1 < HT2 < LT2.
/// Anything else, including `Unranked`, maps to [`UNRANKED_ORDINAL`].
pub fn tier_ordinal(label: &str) -> u32 {
    let (number, high) = if let Some(n) = label.strip_prefix("HT") {
        (n, true)
    } else if let Some(n) = label.strip_prefix("LT") {
        (n, false)
    } else {
        return UNRANKED_ORDINAL;
    };

    let Some(n) = number.parse::<u32>().ok().filter(|n| *n > 0) else {
        return UNRANKED_ORDINAL;
    };

    let doubled = match n.checked_mul(2) {
        Some(d) => d,
        None => return UNRANKED_ORDINAL,
    };

    if high {
        doubled - 1
    } else {
        doubled
    }
}
