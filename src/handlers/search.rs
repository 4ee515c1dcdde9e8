use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::db::{PlaceHit, SearchHit};
use crate::{LotError, router::LotState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct ClientHitView {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaceHitView {
    #[serde(flatten)]
    pub hit: PlaceHit,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaceSearchResponse {
    pub place: String,
    pub results: Vec<PlaceHitView>,
}

/// GET /api/search?term= -> registrations whose client name or car number contains `term`.
pub async fn search_client_or_car(
    State(state): State<LotState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<ClientHitView>>, LotError> {
    let hits = state.registry.search_by_client_or_car(&q.term).await?;
    let mut out = Vec::with_capacity(hits.len());
    for hit in hits {
        let image_url = image_url(hit.image_path.as_deref()).await;
        out.push(ClientHitView { hit, image_url });
    }
    Ok(Json(out))
}

/// GET /api/search/place?term= -> registrations stored at matching places.
pub async fn search_place(
    State(state): State<LotState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<PlaceSearchResponse>, LotError> {
    let hits = state.registry.search_by_place(&q.term).await?;
    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let image_url = image_url(hit.image_path.as_deref()).await;
        results.push(PlaceHitView { hit, image_url });
    }
    Ok(Json(PlaceSearchResponse {
        place: q.term,
        results,
    }))
}

/// Public URL under `/images/` for a stored photo that is still on disk.
/// The file name is percent-encoded as a single path segment.
async fn image_url(image_path: Option<&str>) -> Option<String> {
    let path = Path::new(image_path?);
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return None;
    }
    let file_name = path.file_name()?.to_str()?;
    let mut url = Url::parse("http://localhost/images/").ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(file_name);
    Some(url.path().to_string())
}
