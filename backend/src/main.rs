//! Backend entry point: wires adapters, workers, and the HTTP server.
//!
//! Every shared handle — the connection pool, the search client, the job
//! queue — is created eagerly here and passed down by `Arc`, so there is no
//! lazily-initialized process state to guard.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use mockable::DefaultClock;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use backend::api::{self, HealthState};
use backend::domain::CreatorService;
use backend::outbound::persistence::{
    run_pending_migrations, DbPool, DieselCreatorRepository, PoolConfig,
};
use backend::outbound::queue::{ChannelIndexQueue, IndexWorkerPool};
use backend::outbound::search::HttpSearchIndex;
use backend::server::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    run_pending_migrations(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;

    let pool = DbPool::new(PoolConfig::new(&config.database_url))
        .await
        .map_err(std::io::Error::other)?;
    let repository = Arc::new(DieselCreatorRepository::new(pool));

    let search_index = Arc::new(
        HttpSearchIndex::new(config.search_url.clone(), config.search_timeout)
            .map_err(std::io::Error::other)?,
    );

    let (queue, receiver) = ChannelIndexQueue::new();
    let queue_depth = queue.depth();
    let worker_pool = IndexWorkerPool::spawn(receiver, search_index.clone(), config.index_workers);

    let service = CreatorService::new(
        repository,
        search_index,
        Arc::new(queue),
        Arc::new(DefaultClock),
    );
    let service_data = web::Data::new(service);
    let health_state = web::Data::new(HealthState::new());

    let server = HttpServer::new({
        let service_data = service_data.clone();
        let health_state = health_state.clone();
        move || {
            App::new()
                .app_data(service_data.clone())
                .app_data(health_state.clone())
                .configure(api::configure)
        }
    })
    .bind(config.bind_addr)?;

    health_state.mark_ready();
    info!(addr = %config.bind_addr, workers = config.index_workers, "serving");
    server.run().await?;

    // Drop the last queue sender so the workers can drain the backlog and
    // exit; only then is it safe to stop the process.
    health_state.mark_unhealthy();
    let backlog = queue_depth.current();
    if backlog > 0 {
        info!(backlog, "draining index job backlog before exit");
    }
    drop(service_data);
    worker_pool.join().await;

    Ok(())
}
