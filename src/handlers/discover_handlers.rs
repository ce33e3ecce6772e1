use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::auth::session::CookieSession;
use crate::error::{AppError, Result};
use crate::services::discover_service::etag_matches;
use crate::AppState;

pub const PAGE_ETAG_HEADER: &str = "x-page-etag";
const DISCOVER_CACHE_CONTROL: &str = "max-age=5, stale-while-revalidate=10";

pub async fn discover(State(state): State<AppState>) -> Result<Json<Value>> {
    let recipes = state.discover_service.latest().await?;
    Ok(Json(json!({ "recipes": recipes })))
}

pub async fn discover_recipe(
    State(state): State<AppState>,
    session: CookieSession,
    Path(recipe_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response> {
    let page = state
        .discover_service
        .recipe_page(recipe_id, session.data.user_id)
        .await?;

    let etag = HeaderValue::from_str(&format!("\"{}\"", page.etag))
        .map_err(|_| AppError::InternalError)?;
    let page_etag =
        HeaderValue::from_str(&page.page_etag).map_err(|_| AppError::InternalError)?;

    let not_modified = headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| etag_matches(value, &page.etag));

    let mut response = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        let mut response = Response::new(Body::from(page.body));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    };

    let response_headers = response.headers_mut();
    response_headers.insert(ETAG, etag);
    response_headers.insert(PAGE_ETAG_HEADER, page_etag);
    response_headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static(DISCOVER_CACHE_CONTROL),
    );
    Ok(response)
}
