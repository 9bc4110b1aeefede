use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::catalog::{BonusClip, Catalog, CatalogStats, Entity, EntityFilter, HintLevel, Segment, Variant};

/// Filters accepted by the catalog listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Case-insensitive substring matched against names and aliases.
    pub search: Option<String>,
    /// Restrict the listing to a family of entities.
    pub filter: Option<EntityFilter>,
}

/// Entry of the catalog listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntitySummary {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub variant_count: usize,
    /// Every variant of the entity is shared with another one.
    pub shared_only: bool,
    pub bonus_clip_count: usize,
}

impl EntitySummary {
    pub fn from_entity(catalog: &Catalog, entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            aliases: entity.aliases.clone(),
            variant_count: entity.audio.variants.len(),
            shared_only: catalog.is_shared_only(entity),
            bonus_clip_count: entity.audio.bonus_clips.len(),
        }
    }
}

/// Response of the catalog listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntityListResponse {
    pub entities: Vec<EntitySummary>,
}

/// Playback window of one hint level.
#[derive(Debug, Serialize, ToSchema)]
pub struct SegmentDto {
    pub level: HintLevel,
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds; absent when the window runs to the end of the audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    /// Window formatted as `M:SS-M:SS`.
    pub window: String,
}

impl From<&Segment> for SegmentDto {
    fn from(segment: &Segment) -> Self {
        Self {
            level: segment.level,
            start: segment.start,
            end: segment.end,
            window: segment.window_label(),
        }
    }
}

/// Audio variant with its hint windows.
#[derive(Debug, Serialize, ToSchema)]
pub struct VariantDto {
    pub id: String,
    pub name: String,
    pub shared: bool,
    pub segments: Vec<SegmentDto>,
}

impl From<&Variant> for VariantDto {
    fn from(variant: &Variant) -> Self {
        Self {
            id: variant.id.clone(),
            name: variant.name.clone(),
            shared: variant.shared,
            segments: variant.segments.iter().map(SegmentDto::from).collect(),
        }
    }
}

/// Clip listed on an entity page, never used in rounds.
#[derive(Debug, Serialize, ToSchema)]
pub struct BonusClipDto {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&BonusClip> for BonusClipDto {
    fn from(clip: &BonusClip) -> Self {
        Self {
            id: clip.id.clone(),
            name: clip.name.clone(),
            description: clip.description.clone(),
        }
    }
}

/// Full entity page.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntityDetailResponse {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub shared_only: bool,
    pub variants: Vec<VariantDto>,
    pub bonus_clips: Vec<BonusClipDto>,
}

impl EntityDetailResponse {
    pub fn from_entity(catalog: &Catalog, entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            aliases: entity.aliases.clone(),
            shared_only: catalog.is_shared_only(entity),
            variants: catalog.variants_of(entity).map(VariantDto::from).collect(),
            bonus_clips: entity
                .audio
                .bonus_clips
                .iter()
                .map(BonusClipDto::from)
                .collect(),
        }
    }
}

/// Catalog counters.
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogStatsResponse {
    pub entities: usize,
    /// Entities that can be drawn for a round.
    pub eligible: usize,
    pub shared_only: usize,
    pub with_bonus_clips: usize,
    pub variants: usize,
    pub shared_variants: usize,
}

impl From<CatalogStats> for CatalogStatsResponse {
    fn from(stats: CatalogStats) -> Self {
        Self {
            entities: stats.entities,
            eligible: stats.eligible,
            shared_only: stats.shared_only,
            with_bonus_clips: stats.with_bonus_clips,
            variants: stats.variants,
            shared_variants: stats.shared_variants,
        }
    }
}
