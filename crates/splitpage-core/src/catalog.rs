//! Variant catalog: the closed set of landing-page variants and their
//! traffic weights.
//!
//! The catalog is built once at startup and shared immutably. Declaration
//! order is significant: it is the order the assignment engine walks when
//! accumulating weights, so draws are reproducible for a given random value.

use std::fmt;

use serde::Serialize;

use crate::error::CatalogError;

/// Weight string for the default four-way even split.
pub const DEFAULT_WEIGHTS: &str = "A=25,B=25,C=25,D=25";

/// An opaque variant identifier drawn from a [`VariantCatalog`].
///
/// Only the catalog constructs variants, so holding one means the identifier
/// was valid for the catalog that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Variant(String);

impl Variant {
    /// The identifier as it appears in cookies and page paths.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Variant {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Variant {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone)]
struct Entry {
    variant: Variant,
    weight: u32,
}

/// Ordered variants with their weight table.
#[derive(Debug, Clone)]
pub struct VariantCatalog {
    entries: Vec<Entry>,
    total_weight: u64,
}

impl VariantCatalog {
    /// Build a catalog from `(identifier, weight)` pairs in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the list is empty, an identifier is
    /// malformed or repeated, or the weights sum to zero. Identifiers that
    /// differ only in case count as repeated, since host aliases are
    /// lower-cased and would collide.
    pub fn new<I, S>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut built: Vec<Entry> = Vec::new();
        for (id, weight) in entries {
            let id = id.into();
            if !is_well_formed(&id) {
                return Err(CatalogError::InvalidId { id });
            }
            if built.iter().any(|e| e.variant.0.eq_ignore_ascii_case(&id)) {
                return Err(CatalogError::Duplicate { id });
            }
            built.push(Entry {
                variant: Variant(id),
                weight,
            });
        }

        if built.is_empty() {
            return Err(CatalogError::Empty);
        }

        let total_weight: u64 = built.iter().map(|e| u64::from(e.weight)).sum();
        if total_weight == 0 {
            return Err(CatalogError::ZeroTotalWeight);
        }

        Ok(Self {
            entries: built,
            total_weight,
        })
    }

    /// Parse a weight string such as `A=25,B=25,C=50`.
    ///
    /// Whitespace around entries, identifiers, and weights is ignored. Empty
    /// entries (e.g. a trailing comma) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MalformedEntry`] for an entry without `=` or
    /// with a non-integer weight, and any error [`VariantCatalog::new`]
    /// returns.
    pub fn parse_weights(weights: &str) -> Result<Self, CatalogError> {
        let mut entries = Vec::new();
        for raw in weights.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let Some((id, weight)) = raw.split_once('=') else {
                return Err(CatalogError::MalformedEntry {
                    entry: raw.to_owned(),
                    reason: "expected ID=WEIGHT".to_owned(),
                });
            };
            let weight: u32 =
                weight
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| CatalogError::MalformedEntry {
                        entry: raw.to_owned(),
                        reason: e.to_string(),
                    })?;
            entries.push((id.trim().to_owned(), weight));
        }
        Self::new(entries)
    }

    /// Exact, case-sensitive membership test.
    #[must_use]
    pub fn is_valid(&self, candidate: &str) -> bool {
        self.get(candidate).is_some()
    }

    /// Look up the catalog's variant for an identifier.
    #[must_use]
    pub fn get(&self, candidate: &str) -> Option<&Variant> {
        self.entries
            .iter()
            .find(|e| e.variant.0 == candidate)
            .map(|e| &e.variant)
    }

    /// Variants in declaration order.
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.entries.iter().map(|e| &e.variant)
    }

    /// Variants paired with their weights, in declaration order.
    pub fn weighted(&self) -> impl Iterator<Item = (&Variant, u32)> {
        self.entries.iter().map(|e| (&e.variant, e.weight))
    }

    /// Weight of a variant (0 for a variant from another catalog).
    #[must_use]
    pub fn weight(&self, variant: &Variant) -> u32 {
        self.entries
            .iter()
            .find(|e| &e.variant == variant)
            .map_or(0, |e| e.weight)
    }

    /// Sum of all weights; always positive.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// The first declared variant, used as the assignment fallback.
    #[must_use]
    pub fn first(&self) -> &Variant {
        // `new` rejects empty catalogs, so index 0 always exists.
        &self.entries[0].variant
    }

    /// Number of variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VariantCatalog {
    /// Four variants `A`–`D`, 25 each.
    fn default() -> Self {
        let entries = ["A", "B", "C", "D"]
            .into_iter()
            .map(|id| Entry {
                variant: Variant(id.to_owned()),
                weight: 25,
            })
            .collect();
        Self {
            entries,
            total_weight: 100,
        }
    }
}

fn is_well_formed(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_even_four_way_split() {
        let catalog = VariantCatalog::default();
        let ids: Vec<&str> = catalog.variants().map(Variant::as_str).collect();
        assert_eq!(ids, ["A", "B", "C", "D"]);
        assert_eq!(catalog.total_weight(), 100);
        assert!(catalog.variants().all(|v| catalog.weight(v) == 25));
    }

    #[test]
    fn default_matches_default_weight_string() {
        let parsed = VariantCatalog::parse_weights(DEFAULT_WEIGHTS).unwrap();
        let default = VariantCatalog::default();
        assert_eq!(
            parsed.weighted().collect::<Vec<_>>(),
            default.weighted().collect::<Vec<_>>()
        );
    }

    #[test]
    fn membership_is_exact_and_case_sensitive() {
        let catalog = VariantCatalog::default();
        assert!(catalog.is_valid("A"));
        assert!(catalog.is_valid("D"));
        assert!(!catalog.is_valid("a"));
        assert!(!catalog.is_valid("E"));
        assert!(!catalog.is_valid(""));
        assert!(!catalog.is_valid(" A"));
    }

    #[test]
    fn empty_catalog_rejected() {
        let err = VariantCatalog::new(Vec::<(String, u32)>::new()).unwrap_err();
        assert!(matches!(err, CatalogError::Empty));
    }

    #[test]
    fn all_zero_weights_rejected() {
        let err = VariantCatalog::new([("A", 0), ("B", 0)]).unwrap_err();
        assert!(matches!(err, CatalogError::ZeroTotalWeight));
    }

    #[test]
    fn single_zero_weight_is_allowed() {
        let catalog = VariantCatalog::new([("A", 0), ("B", 10)]).unwrap();
        assert_eq!(catalog.total_weight(), 10);
        assert!(catalog.is_valid("A"));
    }

    #[test]
    fn duplicate_id_rejected() {
        let err = VariantCatalog::new([("A", 1), ("A", 2)]).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { ref id } if id == "A"));
    }

    #[test]
    fn ids_differing_only_in_case_rejected() {
        let err = VariantCatalog::new([("A", 1), ("B", 1), ("a", 1)]).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { ref id } if id == "a"));
        assert!(VariantCatalog::parse_weights("promo=1,Promo=1").is_err());
    }

    #[test]
    fn malformed_ids_rejected() {
        for bad in ["", "a b", "A;", "x=y", "ü"] {
            let err = VariantCatalog::new([(bad, 1)]).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidId { .. }), "{bad:?}");
        }
    }

    #[test]
    fn parse_weights_tolerates_whitespace_and_trailing_comma() {
        let catalog = VariantCatalog::parse_weights(" control = 70 , treatment=30, ").unwrap();
        let pairs: Vec<(&str, u32)> = catalog.weighted().map(|(v, w)| (v.as_str(), w)).collect();
        assert_eq!(pairs, [("control", 70), ("treatment", 30)]);
    }

    #[test]
    fn parse_weights_rejects_missing_equals() {
        let err = VariantCatalog::parse_weights("A=50,B").unwrap_err();
        assert!(matches!(err, CatalogError::MalformedEntry { ref entry, .. } if entry == "B"));
    }

    #[test]
    fn parse_weights_rejects_negative_weight() {
        let err = VariantCatalog::parse_weights("A=-5,B=10").unwrap_err();
        assert!(matches!(err, CatalogError::MalformedEntry { .. }));
    }

    #[test]
    fn parse_weights_rejects_empty_string() {
        let err = VariantCatalog::parse_weights("").unwrap_err();
        assert!(matches!(err, CatalogError::Empty));
    }

    #[test]
    fn first_is_declaration_order() {
        let catalog = VariantCatalog::new([("Z", 1), ("Y", 1)]).unwrap();
        assert_eq!(catalog.first(), &"Z");
    }
}
