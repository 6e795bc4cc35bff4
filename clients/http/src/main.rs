use std::{sync::Arc, time::Duration};

use actix_web::{
    middleware::{Condition, Logger, NormalizePath},
    web, App, HttpServer,
};
use clap::{ArgAction, Parser};
use database::{
    database::{options::DatabaseOptions, request_manager::RequestManager},
    persistence::storage::{
        memory::MemoryStorage, postgres::PgStorage, PersonStorage, StorageEngine,
    },
};

use crate::errors::{ErrorTranslator, RunMode};

mod errors;
mod response;
mod routes;

/// Person service, stores and looks up people over a small JSON API
#[derive(Parser, Debug)]
struct Cli {
    /// Port the http server will run on
    #[clap(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Address the http server will run on
    #[clap(short, long, env = "ADDRESS", default_value = "0.0.0.0")]
    address: String,

    #[clap(long, env = "HTTP_WORKERS", default_value_t = 2)]
    http_workers: usize,

    /// Log every request as it completes
    #[clap(long, env = "LOG_HTTP", action = ArgAction::Set, default_value_t = true)]
    log_http: bool,

    /// Development exposes unclassified error details to clients
    #[clap(long, env = "RUN_MODE", value_enum, default_value_t = RunMode::Production)]
    run_mode: RunMode,

    /// Where persons are kept, `postgres` or `memory`
    #[clap(long, env = "STORAGE", default_value = "postgres")]
    storage: StorageEngine,

    #[clap(long, env = "DB_HOST", default_value = "localhost")]
    db_host: String,

    #[clap(long, env = "DB_PORT", default_value_t = 5432)]
    db_port: u16,

    #[clap(long, env = "DB_NAME", default_value = "persons")]
    db_name: String,

    #[clap(long, env = "DB_USER", default_value = "postgres")]
    db_user: String,

    #[clap(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    db_password: String,

    /// Maximum number of pooled connections
    #[clap(long, env = "DB_POOL_SIZE", default_value_t = 16)]
    db_pool_size: usize,

    /// Seconds to wait for a pooled connection
    #[clap(long, env = "DB_TIMEOUT", default_value_t = 5)]
    db_timeout: u64,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Cli::parse();

    let database_options = DatabaseOptions::default()
        .set_storage_engine(args.storage)
        .set_host(args.db_host)
        .set_port(args.db_port)
        .set_name(args.db_name)
        .set_credentials(args.db_user, args.db_password)
        .set_pool_size(args.db_pool_size)
        .set_timeout(Duration::from_secs(args.db_timeout));

    let storage: Arc<dyn PersonStorage> = match database_options.storage_engine {
        StorageEngine::Postgres => {
            let storage = PgStorage::new(database_options.create_pool()?);

            // An unreachable database is not fatal, requests answer 503 until it returns
            match storage.ping().await {
                Ok(()) => log::info!("Connected to PostgreSQL database"),
                Err(e) => log::warn!("PostgreSQL is not reachable yet: {}", e),
            }

            Arc::new(storage)
        }
        StorageEngine::Memory => Arc::new(MemoryStorage::new()),
    };

    let request_manager = RequestManager::new(storage);
    let translator = ErrorTranslator::new(args.run_mode);

    log::info!(
        "starting HTTP server on {}:{} [run mode: {:?}, storage: {}]",
        args.address,
        args.port,
        args.run_mode,
        database_options.storage_engine
    );

    let log_http = args.log_http;

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(request_manager.clone()))
            .app_data(web::Data::new(translator.clone()))
            .configure(routes::configure)
            .default_service(web::to(routes::not_found))
            .wrap(NormalizePath::trim())
            .wrap(Condition::new(
                log_http,
                Logger::new("%r %s %a \"%{User-Agent}i\" %Dms"),
            ))
    })
    .workers(args.http_workers)
    .bind((args.address, args.port))?
    .run()
    .await?;

    Ok(())
}
