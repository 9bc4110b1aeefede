//! On-disk JSON layout of the catalog and its validation into runtime types.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use indexmap::{IndexMap, map::Entry as IndexEntry};
use serde::Deserialize;

use super::{
    AudioProfile, BonusClip, Catalog, CatalogError, Entity, HINT_LEVEL_COUNT, HintLevel, Segment,
    Variant, normalize_name,
};

#[derive(Debug, Deserialize)]
/// Top-level document: variant table plus entity table.
pub(super) struct RawCatalog {
    #[serde(default)]
    variants: Vec<RawVariant>,
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    id: String,
    #[serde(default)]
    name: Option<String>,
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: Option<f64>,
    level: HintLevel,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    id: String,
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    audio: RawAudio,
}

#[derive(Debug, Default, Deserialize)]
struct RawAudio {
    #[serde(default)]
    variants: Vec<String>,
    #[serde(default)]
    bonus_clips: Vec<RawBonusClip>,
}

#[derive(Debug, Deserialize)]
struct RawBonusClip {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<RawBonusClip> for BonusClip {
    fn from(value: RawBonusClip) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
        }
    }
}

impl TryFrom<RawCatalog> for Catalog {
    type Error = CatalogError;

    fn try_from(value: RawCatalog) -> Result<Self, Self::Error> {
        let mut variants = IndexMap::with_capacity(value.variants.len());
        for raw in value.variants {
            let segments = build_segments(&raw.id, &raw.segments)?;
            let variant = Variant {
                name: raw.name.unwrap_or_else(|| raw.id.clone()),
                id: raw.id,
                segments,
                shared: false,
            };
            match variants.entry(variant.id.clone()) {
                IndexEntry::Occupied(_) => return Err(CatalogError::DuplicateVariant(variant.id)),
                IndexEntry::Vacant(slot) => {
                    slot.insert(variant);
                }
            }
        }

        let mut entities = IndexMap::with_capacity(value.entities.len());
        let mut names: HashMap<String, String> = HashMap::new();
        let mut usage: HashMap<String, usize> = HashMap::new();

        for raw in value.entities {
            let mut owned: HashSet<&str> = HashSet::with_capacity(raw.audio.variants.len());
            for variant in &raw.audio.variants {
                if !variants.contains_key(variant) {
                    return Err(CatalogError::UnknownVariant {
                        entity: raw.id.clone(),
                        variant: variant.clone(),
                    });
                }
                if !owned.insert(variant.as_str()) {
                    return Err(CatalogError::RepeatedVariant {
                        entity: raw.id.clone(),
                        variant: variant.clone(),
                    });
                }
                *usage.entry(variant.clone()).or_default() += 1;
            }

            for candidate in std::iter::once(&raw.name).chain(raw.aliases.iter()) {
                let key = normalize_name(candidate);
                if key.is_empty() {
                    return Err(CatalogError::EmptyAlias(raw.id.clone()));
                }
                match names.entry(key) {
                    Entry::Occupied(existing) if existing.get() != &raw.id => {
                        return Err(CatalogError::DuplicateName {
                            name: existing.key().clone(),
                            first: existing.get().clone(),
                            second: raw.id.clone(),
                        });
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(slot) => {
                        slot.insert(raw.id.clone());
                    }
                }
            }

            let entity = Entity {
                id: raw.id,
                name: raw.name,
                aliases: raw.aliases,
                audio: AudioProfile {
                    variants: raw.audio.variants,
                    bonus_clips: raw.audio.bonus_clips.into_iter().map(Into::into).collect(),
                },
            };
            match entities.entry(entity.id.clone()) {
                IndexEntry::Occupied(_) => return Err(CatalogError::DuplicateEntity(entity.id)),
                IndexEntry::Vacant(slot) => {
                    slot.insert(entity);
                }
            }
        }

        for (id, variant) in variants.iter_mut() {
            variant.shared = usage.get(id).copied().unwrap_or_default() >= 2;
        }

        Ok(Catalog {
            entities,
            variants,
            names,
        })
    }
}

/// Check that a variant declares exactly one well-formed window per hint level, in order.
fn build_segments(
    variant: &str,
    raw: &[RawSegment],
) -> Result<[Segment; HINT_LEVEL_COUNT], CatalogError> {
    if raw.len() != HINT_LEVEL_COUNT {
        return Err(CatalogError::SegmentCount {
            variant: variant.to_string(),
            count: raw.len(),
        });
    }

    let invalid = |position: usize, reason: &'static str| CatalogError::InvalidSegment {
        variant: variant.to_string(),
        position,
        reason,
    };

    for (position, (segment, expected)) in raw.iter().zip(HintLevel::ALL).enumerate() {
        if segment.level != expected {
            return Err(invalid(position, "hint levels are out of order"));
        }
        if segment.start.is_nan() || segment.start < 0.0 {
            return Err(invalid(position, "start offset must be a non-negative number"));
        }
        match (segment.end, expected.is_last()) {
            (None, false) => {
                return Err(invalid(position, "only the final segment may be open-ended"));
            }
            (Some(_), true) => {
                return Err(invalid(position, "the final segment must be open-ended"));
            }
            (Some(end), false) if end.is_nan() || end <= segment.start => {
                return Err(invalid(position, "segment ends before it starts"));
            }
            _ => {}
        }
    }

    Ok(std::array::from_fn(|index| Segment {
        level: HintLevel::ALL[index],
        start: raw[index].start,
        end: raw[index].end,
    }))
}
