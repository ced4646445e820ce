use axum::extract::{rejection::QueryRejection, Query, State};
use serde::{Deserialize, Serialize};

use super::utils::enrich_posts;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::types::{Community, Event, PostView};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keywords: Option<String>,
}

/// Search hits; posts carry the same author fields as the feed
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub communities: Vec<Community>,
    pub posts: Vec<PostView>,
    pub events: Vec<Event>,
}

/// Whitespace-separated terms, lowercased and deduplicated
pub fn split_keywords(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in raw.split_whitespace() {
        let word = word.to_lowercase();
        if !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

/// GET /api/search?keywords= - every keyword must match
pub async fn search(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<SearchResponse> {
    let Query(query) = query?;
    let keywords = split_keywords(query.keywords.as_deref().unwrap_or_default());
    if keywords.is_empty() {
        return Err(ApiError::bad_request("keywords is required"));
    }

    let results = state
        .store
        .search(&keywords, state.config.feed.search_result_limit)
        .await?;
    let viewer = viewer.as_ref().map(|v| v.user_id.as_str());
    let posts = enrich_posts(&state, results.posts, viewer).await?;

    Ok(ApiResponse::success(SearchResponse {
        communities: results.communities,
        posts,
        events: results.events,
    }))
}
