//! Static reference data: the entities a player has to identify, the names they answer
//! to and the audio variants they can be recognised by.
//!
//! The catalog is loaded once at startup and never mutated afterwards. Whether a variant
//! is shared is derived while loading: a variant referenced by two or more entities
//! cannot identify a single entity on its own.

mod raw;

use std::{collections::HashMap, fmt, fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Catalog bundled with the binary, used when no override path is configured.
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

/// Number of hint levels, and therefore segments, every variant declares.
pub const HINT_LEVEL_COUNT: usize = 4;

/// Progressive hint levels, from the hardest (`Far`) to the easiest (`Chase`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum HintLevel {
    /// First segment, unlocked when the round starts.
    Far,
    /// Second segment.
    Mid,
    /// Third segment.
    Close,
    /// Final, open-ended segment.
    Chase,
}

impl HintLevel {
    /// Every level in unlock order.
    pub const ALL: [HintLevel; HINT_LEVEL_COUNT] = [
        HintLevel::Far,
        HintLevel::Mid,
        HintLevel::Close,
        HintLevel::Chase,
    ];

    /// Zero-based position of the level in the unlock order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Level at the given zero-based position, if any.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Level unlocked after this one, or `None` for the last level.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Whether no further level can be unlocked after this one.
    pub fn is_last(self) -> bool {
        self.next().is_none()
    }

    /// Points awarded for a correct guess made while this level is the latest unlocked.
    pub fn points(self) -> u32 {
        (HINT_LEVEL_COUNT - self.index()) as u32
    }

    /// Lowercase label used in payloads and logs.
    pub fn label(self) -> &'static str {
        match self {
            HintLevel::Far => "far",
            HintLevel::Mid => "mid",
            HintLevel::Close => "close",
            HintLevel::Chase => "chase",
        }
    }
}

impl fmt::Display for HintLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Time window of a variant played for one hint level. Offsets are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Hint level this window belongs to.
    pub level: HintLevel,
    /// Offset where playback starts.
    pub start: f64,
    /// Offset where playback stops; `None` plays to the natural end of the audio.
    pub end: Option<f64>,
}

impl Segment {
    /// Whether a playback position has reached the closed end of this window.
    pub fn is_past_end(&self, position: f64) -> bool {
        self.end.is_some_and(|end| position >= end)
    }

    /// Length of the window, when it is closed.
    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }

    /// Human readable window such as `0:22-0:45` or `1:07-end`.
    pub fn window_label(&self) -> String {
        format!(
            "{}-{}",
            format_offset(Some(self.start)),
            format_offset(self.end)
        )
    }
}

/// Format an offset as `M:SS`, using `end` for open offsets.
pub fn format_offset(seconds: Option<f64>) -> String {
    match seconds {
        None => "end".into(),
        Some(value) => {
            let total = value.max(0.0).floor() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
    }
}

/// Audio asset the player hears during a round.
#[derive(Debug, Clone)]
pub struct Variant {
    /// Stable identifier, also used to resolve the audio source.
    pub id: String,
    /// Display name of the asset.
    pub name: String,
    /// One window per hint level, in unlock order.
    pub segments: [Segment; HINT_LEVEL_COUNT],
    /// True when the asset is reused verbatim by several entities.
    pub shared: bool,
}

impl Variant {
    /// Window played for the given hint level.
    pub fn segment(&self, level: HintLevel) -> &Segment {
        &self.segments[level.index()]
    }
}

/// Extra clip attached to an entity, never used for scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusClip {
    /// Identifier of the clip asset.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional flavour text.
    pub description: Option<String>,
}

/// Audio attached to an entity.
#[derive(Debug, Clone, Default)]
pub struct AudioProfile {
    /// Identifiers of the variants the entity can be recognised by. Empty means the
    /// entity cannot be selected for a round.
    pub variants: Vec<String>,
    /// Clips unrelated to scoring.
    pub bonus_clips: Vec<BonusClip>,
}

/// Hidden subject the player has to name.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique key.
    pub id: String,
    /// Canonical display name.
    pub name: String,
    /// Additional accepted answers, matched case-insensitively.
    pub aliases: Vec<String>,
    /// Audio the entity can be identified by.
    pub audio: AudioProfile,
}

/// Browsing filter used by the catalog listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityFilter {
    /// Every entity.
    #[default]
    All,
    /// Entities carrying at least one bonus clip.
    Bonus,
    /// Entities with exactly one variant.
    Single,
    /// Entities with more than one variant.
    Multi,
}

/// Aggregate counters describing the loaded catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// Number of entities.
    pub entities: usize,
    /// Entities with at least one variant.
    pub eligible: usize,
    /// Eligible entities owning no unique variant.
    pub shared_only: usize,
    /// Entities carrying bonus clips.
    pub with_bonus_clips: usize,
    /// Number of distinct variants.
    pub variants: usize,
    /// Variants reused by several entities.
    pub shared_variants: usize,
}

/// Errors raised while loading or validating catalog data.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog `{path}`")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The catalog is not valid JSON or does not match the expected layout.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two entities share an identifier.
    #[error("duplicate entity id `{0}`")]
    DuplicateEntity(String),
    /// Two variants share an identifier.
    #[error("duplicate variant id `{0}`")]
    DuplicateVariant(String),
    /// An entity references a variant that does not exist.
    #[error("entity `{entity}` references unknown variant `{variant}`")]
    UnknownVariant {
        /// Referencing entity.
        entity: String,
        /// Missing variant.
        variant: String,
    },
    /// An entity lists the same variant more than once.
    #[error("entity `{entity}` lists variant `{variant}` more than once")]
    RepeatedVariant {
        /// Referencing entity.
        entity: String,
        /// Repeated variant.
        variant: String,
    },
    /// A variant does not declare one segment per hint level.
    #[error("variant `{variant}` declares {count} segments, expected {expected}", expected = HINT_LEVEL_COUNT)]
    SegmentCount {
        /// Offending variant.
        variant: String,
        /// Number of segments found.
        count: usize,
    },
    /// A segment is malformed.
    #[error("variant `{variant}` has an invalid segment at position {position}: {reason}")]
    InvalidSegment {
        /// Offending variant.
        variant: String,
        /// Zero-based position of the segment.
        position: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// An entity declares a blank name or alias.
    #[error("entity `{0}` declares an empty name or alias")]
    EmptyAlias(String),
    /// The same name or alias resolves to two entities.
    #[error("name `{name}` is claimed by both `{first}` and `{second}`")]
    DuplicateName {
        /// Case-folded name.
        name: String,
        /// Entity that claimed it first.
        first: String,
        /// Entity that claimed it again.
        second: String,
    },
}

/// Immutable lookup tables over entities and variants.
#[derive(Debug, Clone)]
pub struct Catalog {
    entities: IndexMap<String, Entity>,
    variants: IndexMap<String, Variant>,
    names: HashMap<String, String>,
}

impl Catalog {
    /// Load the catalog embedded in the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Load and validate a catalog file from disk.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a catalog from its JSON representation.
    pub fn from_json_str(contents: &str) -> Result<Self, CatalogError> {
        let raw: raw::RawCatalog = serde_json::from_str(contents)?;
        raw.try_into()
    }

    /// Entity with the given identifier.
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Variant with the given identifier.
    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.get(id)
    }

    /// Every entity in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Every variant in declaration order.
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.values()
    }

    /// Resolve a free-text name or alias, ignoring case and surrounding whitespace.
    pub fn find_by_name(&self, input: &str) -> Option<&Entity> {
        self.names
            .get(&normalize_name(input))
            .and_then(|id| self.entities.get(id))
    }

    /// Variants owned by an entity.
    pub fn variants_of<'a>(&'a self, entity: &'a Entity) -> impl Iterator<Item = &'a Variant> {
        entity
            .audio
            .variants
            .iter()
            .filter_map(|id| self.variants.get(id))
    }

    /// Whether the entity can be selected for a round at all.
    pub fn is_eligible(&self, entity: &Entity) -> bool {
        !entity.audio.variants.is_empty()
    }

    /// Whether the entity owns at least one variant identifying it alone.
    pub fn has_unique_variant(&self, entity: &Entity) -> bool {
        self.variants_of(entity).any(|variant| !variant.shared)
    }

    /// Whether the entity owns at least one shared variant.
    pub fn has_shared_variant(&self, entity: &Entity) -> bool {
        self.variants_of(entity).any(|variant| variant.shared)
    }

    /// Whether the entity is eligible but can only be played through shared variants.
    pub fn is_shared_only(&self, entity: &Entity) -> bool {
        self.is_eligible(entity) && !self.has_unique_variant(entity)
    }

    /// List entities matching a search term (name or alias substring) and a filter.
    pub fn browse(&self, search: Option<&str>, filter: EntityFilter) -> Vec<&Entity> {
        let term = search.map(normalize_name).filter(|term| !term.is_empty());

        self.entities()
            .filter(|entity| match &term {
                Some(term) => {
                    entity.name.to_lowercase().contains(term.as_str())
                        || entity
                            .aliases
                            .iter()
                            .any(|alias| alias.to_lowercase().contains(term.as_str()))
                }
                None => true,
            })
            .filter(|entity| match filter {
                EntityFilter::All => true,
                EntityFilter::Bonus => !entity.audio.bonus_clips.is_empty(),
                EntityFilter::Single => entity.audio.variants.len() == 1,
                EntityFilter::Multi => entity.audio.variants.len() > 1,
            })
            .collect()
    }

    /// Compute aggregate counters.
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            entities: self.entities.len(),
            eligible: self.entities().filter(|e| self.is_eligible(e)).count(),
            shared_only: self.entities().filter(|e| self.is_shared_only(e)).count(),
            with_bonus_clips: self
                .entities()
                .filter(|e| !e.audio.bonus_clips.is_empty())
                .count(),
            variants: self.variants.len(),
            shared_variants: self.variants().filter(|v| v.shared).count(),
        }
    }
}

/// Case-fold and trim a name so it can be compared against the lookup table.
pub fn normalize_name(input: &str) -> String {
    input.trim().to_lowercase()
}
