//! Evaluation of free-text guesses and autocomplete suggestions.
//!
//! Two answer shapes are accepted: a plain name or alias of the target, and the generic
//! category form `Generic (<Name>)`. The latter only makes sense when the active audio is
//! shared by several entities, in which case any entity using shared audio is accepted.

use std::collections::HashSet;

use crate::catalog::{Catalog, Entity, Variant, normalize_name};

/// Default cap on the number of suggestions returned for a query.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

const GENERIC_PREFIX: &str = "generic (";
const GENERIC_SUFFIX: &str = ")";

/// Verdict on a single guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    /// Whether the guess is accepted as correct.
    pub matched: bool,
    /// Whether acceptance came from the shared-audio category rule rather than identity.
    pub via_generic: bool,
}

/// Shape of a submitted guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessForm<'a> {
    /// A name or alias.
    Plain(&'a str),
    /// `Generic (<Name>)`, carrying the inner name.
    Generic(&'a str),
}

/// Split a guess into its shape and the name it refers to.
pub fn parse_guess(input: &str) -> GuessForm<'_> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // ASCII prefix and suffix, so byte offsets in `lower` line up with `trimmed`
    // whenever the lowercase form keeps the same length.
    if lower.len() == trimmed.len()
        && lower.starts_with(GENERIC_PREFIX)
        && lower.ends_with(GENERIC_SUFFIX)
        && trimmed.len() > GENERIC_PREFIX.len() + GENERIC_SUFFIX.len()
    {
        let inner = &trimmed[GENERIC_PREFIX.len()..trimmed.len() - GENERIC_SUFFIX.len()];
        if !inner.trim().is_empty() {
            return GuessForm::Generic(inner.trim());
        }
    }

    GuessForm::Plain(trimmed)
}

/// Evaluate `guess` against the round target and the variant being played.
pub fn evaluate(
    catalog: &Catalog,
    guess: &str,
    target: &Entity,
    active_variant: &Variant,
) -> MatchOutcome {
    match parse_guess(guess) {
        GuessForm::Plain(name) => MatchOutcome {
            matched: catalog
                .find_by_name(name)
                .is_some_and(|entity| entity.id == target.id),
            via_generic: false,
        },
        GuessForm::Generic(name) => {
            if !active_variant.shared {
                return MatchOutcome::default();
            }
            match catalog.find_by_name(name) {
                Some(entity) if catalog.has_shared_variant(entity) => MatchOutcome {
                    matched: true,
                    via_generic: entity.id != target.id,
                },
                _ => MatchOutcome::default(),
            }
        }
    }
}

/// Autocomplete entry offered to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Text to submit when the suggestion is picked.
    pub display: String,
    /// Entity the suggestion refers to.
    pub entity_id: String,
    /// Canonical name of that entity.
    pub entity_name: String,
    /// Whether `display` uses the generic category form.
    pub generic: bool,
}

/// Suggest answers whose name or alias contains `query`, one entry per entity.
///
/// When `generic_round` is set, entities owning a shared variant are offered in the
/// `Generic (<Name>)` form.
pub fn suggest(
    catalog: &Catalog,
    query: &str,
    generic_round: bool,
    limit: usize,
) -> Vec<Suggestion> {
    let needle = normalize_name(query);
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut suggestions = Vec::new();

    for entity in catalog.entities() {
        let hit = std::iter::once(&entity.name)
            .chain(entity.aliases.iter())
            .any(|name| name.to_lowercase().contains(&needle));
        if !hit || !seen.insert(entity.id.as_str()) {
            continue;
        }

        let generic = generic_round && catalog.has_shared_variant(entity);
        suggestions.push(Suggestion {
            display: if generic {
                format!("Generic ({})", entity.name)
            } else {
                entity.name.clone()
            },
            entity_id: entity.id.clone(),
            entity_name: entity.name.clone(),
            generic,
        });

        if suggestions.len() >= limit {
            break;
        }
    }

    suggestions
}
