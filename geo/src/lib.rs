//! ISO-3166 alpha-2 country code enrichment.
//!
//! Pure, total lookups over a static embedded table: no network calls, no
//! filesystem access. Continent classification already folds in the
//! North/South America split a two-step "continent, then UN sub-region"
//! lookup would otherwise require.

mod table;

use table::COUNTRIES;

/// Continent name for an ISO-3166 alpha-2 country code, or `"Unknown"` if the
/// code isn't in the table.
#[must_use]
pub fn continent(alpha2: &str) -> &'static str {
    lookup(alpha2).map_or("Unknown", |(continent, _)| continent)
}

/// Short English country name for an ISO-3166 alpha-2 code. Returns the input
/// unchanged if it isn't in the table (matching the original
/// `country_converter` fallback of echoing the input verbatim).
#[must_use]
pub fn country_name(alpha2: &str) -> String {
    lookup(alpha2).map_or_else(|| alpha2.to_string(), |(_, name)| name.to_string())
}

fn lookup(alpha2: &str) -> Option<(&'static str, &'static str)> {
    let needle = alpha2.to_ascii_uppercase();
    COUNTRIES
        .iter()
        .find(|(cc, _, _)| *cc == needle)
        .map(|(_, continent, name)| (*continent, *name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_european_code() {
        assert_eq!(continent("DE"), "Europe");
        assert_eq!(country_name("DE"), "Germany");
    }

    #[test]
    fn lowercase_input_is_normalized() {
        assert_eq!(continent("de"), "Europe");
        assert_eq!(country_name("nl"), "Netherlands");
    }

    #[test]
    fn north_vs_south_america_split() {
        assert_eq!(continent("US"), "North America");
        assert_eq!(continent("BR"), "South America");
        assert_eq!(continent("MX"), "North America");
        assert_eq!(continent("AR"), "South America");
    }

    #[test]
    fn unknown_code_falls_back() {
        assert_eq!(continent("ZZ"), "Unknown");
        assert_eq!(country_name("zz"), "zz");
    }
}
