//! Sticky, weighted variant assignment.
//!
//! A visitor who already holds a valid variant keeps it. Everyone else gets a
//! fresh draw, weighted by the catalog's weight table. Resolution never fails:
//! assignment is a convenience layered on top of serving the page, so a bad
//! prior value or a floating-point edge case falls back instead of erroring.

use std::sync::Arc;

use rand::Rng;

use crate::catalog::{Variant, VariantCatalog};

/// Outcome of resolving a visitor's variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentDecision {
    /// The variant the visitor sees.
    pub variant: Variant,
    /// `true` when the variant was freshly drawn rather than carried over.
    pub is_new: bool,
}

/// Resolves visitors to variants against a shared catalog.
///
/// Holds no mutable state, so one engine can be shared across every request
/// handler without synchronization.
#[derive(Debug, Clone)]
pub struct AssignmentEngine {
    catalog: Arc<VariantCatalog>,
}

impl AssignmentEngine {
    #[must_use]
    pub fn new(catalog: Arc<VariantCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog this engine draws from.
    #[must_use]
    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    /// Resolve using the thread-local RNG.
    #[must_use]
    pub fn resolve(&self, prior: Option<&str>) -> AssignmentDecision {
        self.resolve_with(prior, &mut rand::rng())
    }

    /// Resolve with an explicit random source.
    ///
    /// A prior value that names a catalog variant is returned unchanged.
    /// Anything else (absent, empty, unknown, wrong case) is discarded and a
    /// new variant is drawn.
    pub fn resolve_with<R: Rng + ?Sized>(
        &self,
        prior: Option<&str>,
        rng: &mut R,
    ) -> AssignmentDecision {
        if let Some(variant) = prior.and_then(|p| self.catalog.get(p)) {
            return AssignmentDecision {
                variant: variant.clone(),
                is_new: false,
            };
        }

        AssignmentDecision {
            variant: self.draw(rng).clone(),
            is_new: true,
        }
    }

    /// Draw a variant with probability proportional to its weight.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &Variant {
        #[allow(clippy::cast_precision_loss)]
        let total = self.catalog.total_weight() as f64;
        self.pick(rng.random_range(0.0..total))
    }

    /// Map a point `r` in `[0, total_weight)` onto the weight table.
    ///
    /// Walks variants in declaration order and returns the first whose
    /// cumulative weight reaches `r`. Zero-weight variants are skipped. If
    /// accumulation never reaches `r` the first variant is returned.
    #[must_use]
    pub fn pick(&self, r: f64) -> &Variant {
        let mut cumulative = 0.0_f64;
        for (variant, weight) in self.catalog.weighted() {
            if weight == 0 {
                continue;
            }
            cumulative += f64::from(weight);
            if cumulative >= r {
                return variant;
            }
        }
        self.catalog.first()
    }
}
