//! Random selection of the session roster and of the variant played each round.

use rand::{
    Rng,
    seq::{IndexedRandom, SliceRandom},
};
use thiserror::Error;

use crate::catalog::{Catalog, Entity, Variant};

/// Upper bound of entities owning only shared variants in a single roster.
pub const MAX_SHARED_ONLY_PER_ROSTER: usize = 1;

/// Failures raised while drawing a roster or a variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The catalog cannot provide enough distinct entities for a full session.
    #[error("catalog provides {available} selectable entities, {required} rounds requested")]
    InsufficientCatalog {
        /// Entities that could be drawn under the roster constraints.
        available: usize,
        /// Rounds the session needs.
        required: usize,
    },
    /// The roster references an entity that is not in the catalog.
    #[error("entity `{0}` is not in the catalog")]
    UnknownEntity(String),
    /// The entity owns no playable variant.
    #[error("entity `{0}` has no playable variant")]
    NoVariant(String),
}

/// Variant drawn for a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantChoice {
    /// Identifier of the variant to play.
    pub variant_id: String,
    /// Whether the variant is shared between several entities.
    pub shared: bool,
}

/// Draw an ordered roster of `rounds` distinct entity identifiers.
///
/// At most [`MAX_SHARED_ONLY_PER_ROSTER`] entity owning only shared variants is drawn; the
/// remaining slots come from entities owning at least one unique variant. The final order
/// is shuffled so the shared-only entity can land on any round.
pub fn build_roster<R>(
    catalog: &Catalog,
    rounds: usize,
    rng: &mut R,
) -> Result<Vec<String>, SelectionError>
where
    R: Rng + ?Sized,
{
    let (unique_capable, shared_only): (Vec<&Entity>, Vec<&Entity>) = catalog
        .entities()
        .filter(|entity| catalog.is_eligible(entity))
        .partition(|entity| catalog.has_unique_variant(entity));

    let shared_slots = shared_only.len().min(MAX_SHARED_ONLY_PER_ROSTER);
    let available = unique_capable.len() + shared_slots;
    if available < rounds {
        return Err(SelectionError::InsufficientCatalog {
            available,
            required: rounds,
        });
    }

    // Shared-only entities always take their slot, the rest is drawn from the
    // unique-capable partition.
    let shared_drawn = shared_slots.min(rounds);
    let mut roster: Vec<String> = shared_only
        .choose_multiple(rng, shared_drawn)
        .map(|entity| entity.id.clone())
        .collect();
    roster.extend(
        unique_capable
            .choose_multiple(rng, rounds - roster.len())
            .map(|entity| entity.id.clone()),
    );
    roster.shuffle(rng);

    Ok(roster)
}

/// Pick the variant played for `entity`.
///
/// Once a shared variant has been used in the session, entities that own a unique
/// variant are restricted to their unique ones. Otherwise the draw is uniform over all
/// of the entity's variants, which is the only way a shared variant can come up.
pub fn choose_variant<R>(
    catalog: &Catalog,
    entity: &Entity,
    shared_already_used: bool,
    rng: &mut R,
) -> Result<VariantChoice, SelectionError>
where
    R: Rng + ?Sized,
{
    let all: Vec<&Variant> = catalog.variants_of(entity).collect();
    let unique: Vec<&Variant> = all.iter().copied().filter(|v| !v.shared).collect();

    let pool = if shared_already_used && !unique.is_empty() {
        &unique
    } else {
        &all
    };

    let variant = pool
        .choose(rng)
        .ok_or_else(|| SelectionError::NoVariant(entity.id.clone()))?;

    Ok(VariantChoice {
        variant_id: variant.id.clone(),
        shared: variant.shared,
    })
}
