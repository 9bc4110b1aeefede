use crate::{
    dto::catalog::{
        CatalogQuery, CatalogStatsResponse, EntityDetailResponse, EntityListResponse,
        EntitySummary,
    },
    error::ServiceError,
    state::SharedState,
};

/// List catalog entities matching the query.
pub fn list_entities(state: &SharedState, query: &CatalogQuery) -> EntityListResponse {
    let catalog = state.catalog();
    let entities = catalog
        .browse(query.search.as_deref(), query.filter.unwrap_or_default())
        .into_iter()
        .map(|entity| EntitySummary::from_entity(catalog, entity))
        .collect();
    EntityListResponse { entities }
}

/// Details of one entity, with its variants and hint windows.
pub fn entity_detail(
    state: &SharedState,
    entity_id: &str,
) -> Result<EntityDetailResponse, ServiceError> {
    let catalog = state.catalog();
    catalog
        .entity(entity_id)
        .map(|entity| EntityDetailResponse::from_entity(catalog, entity))
        .ok_or_else(|| ServiceError::NotFound(format!("entity `{entity_id}` not found")))
}

/// Counters describing the loaded catalog.
pub fn stats(state: &SharedState) -> CatalogStatsResponse {
    state.catalog().stats().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Catalog, EntityFilter},
        config::AppConfig,
        state::AppState,
    };

    fn state() -> SharedState {
        AppState::new(AppConfig::default(), Catalog::builtin().unwrap())
    }

    #[test]
    fn listing_applies_search_and_filter() {
        let state = state();

        let all = list_entities(&state, &CatalogQuery::default());
        assert_eq!(all.entities.len(), 40);

        let found = list_entities(
            &state,
            &CatalogQuery {
                search: Some("Freddy".into()),
                filter: None,
            },
        );
        assert_eq!(found.entities.len(), 1);
        assert_eq!(found.entities[0].name, "The Nightmare");

        let bonus = list_entities(
            &state,
            &CatalogQuery {
                search: None,
                filter: Some(EntityFilter::Bonus),
            },
        );
        assert!(bonus.entities.iter().all(|e| e.bonus_clip_count > 0));
    }

    #[test]
    fn detail_exposes_hint_windows() {
        let state = state();

        let trapper = entity_detail(&state, "trapper").unwrap();
        assert!(trapper.shared_only);
        let theme = &trapper.variants[0];
        assert!(theme.shared);
        assert_eq!(theme.segments.len(), 4);
        assert_eq!(theme.segments[1].window, "0:22-0:45");

        assert!(matches!(
            entity_detail(&state, "butcher"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
