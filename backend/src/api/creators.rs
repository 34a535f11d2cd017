//! Creator API handlers.
//!
//! A thin translation layer: deserialize the request, call the façade, map
//! the domain result onto an HTTP response. No domain logic lives here.

use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;

use super::error::ApiResult;
use crate::domain::CreatorService;

/// Request body for creating a creator.
#[derive(Debug, Deserialize)]
pub struct NewCreatorRequest {
    /// Display name; not required to be unique.
    pub username: String,
    /// Natural key; must not already be registered.
    pub email: String,
}

/// Request body for appending an asset.
#[derive(Debug, Deserialize)]
pub struct NewAssetRequest {
    /// Asset kind, the de facto key within one creator's list.
    #[serde(rename = "type")]
    pub kind: String,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

/// Query parameters for creator search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text query matched over all indexed fields.
    pub q: String,
    /// 1-based result page.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Hits per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Create a creator.
#[post("/creators")]
pub async fn add_creator(
    service: web::Data<CreatorService>,
    body: web::Json<NewCreatorRequest>,
) -> ApiResult<HttpResponse> {
    let creator = service.add_creator(&body.username, &body.email).await?;
    Ok(HttpResponse::Created().json(creator))
}

/// Search creators by free text, hydrated from the record store.
#[get("/creators/search")]
pub async fn search_creators(
    service: web::Data<CreatorService>,
    params: web::Query<SearchParams>,
) -> ApiResult<HttpResponse> {
    let creators = service
        .search_creators(&params.q, params.page, params.per_page)
        .await?;
    Ok(HttpResponse::Ok().json(creators))
}

/// Fetch a creator by email.
#[get("/creators/{email}")]
pub async fn get_creator(
    service: web::Data<CreatorService>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let creator = service.get_creator(&path).await?;
    Ok(HttpResponse::Ok().json(creator))
}

/// Delete a creator, returning the removed record.
#[delete("/creators/{email}")]
pub async fn delete_creator(
    service: web::Data<CreatorService>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let creator = service.delete_creator(&path).await?;
    Ok(HttpResponse::Ok().json(creator))
}

/// Append an asset to a creator.
#[post("/creators/{email}/assets")]
pub async fn add_asset(
    service: web::Data<CreatorService>,
    path: web::Path<String>,
    body: web::Json<NewAssetRequest>,
) -> ApiResult<HttpResponse> {
    let asset = service.add_asset(&path, &body.kind).await?;
    Ok(HttpResponse::Created().json(asset))
}

/// Remove the first asset of the given kind from a creator.
#[delete("/creators/{email}/assets/{kind}")]
pub async fn remove_asset(
    service: web::Data<CreatorService>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (email, kind) = path.into_inner();
    let asset = service.remove_asset(&email, &kind).await?;
    Ok(HttpResponse::Ok().json(asset))
}
