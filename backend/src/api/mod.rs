//! Inbound HTTP adapter: REST translation onto the creator façade.

pub mod creators;
pub mod error;
pub mod health;

use actix_web::web;

pub use error::{ApiError, ApiResult};
pub use health::HealthState;

/// Register every route on the application.
///
/// `search` is registered before the `{email}` matcher so the literal
/// segment wins.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(creators::add_creator)
            .service(creators::search_creators)
            .service(creators::get_creator)
            .service(creators::delete_creator)
            .service(creators::add_asset)
            .service(creators::remove_asset),
    )
    .service(health::ready)
    .service(health::live);
}
