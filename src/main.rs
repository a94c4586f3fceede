use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use prpc_proxy::cli::Cli;
use prpc_proxy::config::ProxyConfig;
use prpc_proxy::gateway::{self, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let arg = Cli::parse();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = ProxyConfig::resolve(&arg).context("failed to resolve proxy configuration")?;
    match config.single_proxy_url() {
        Some(proxy_url) => tracing::info!("forwarding through single proxy {}", proxy_url),
        None => tracing::info!("failover across {} pRPC hosts", config.hosts().len()),
    }

    let app_state = web::Data::new(AppState::new(config));

    tracing::info!("Server listening on {}:{}", arg.bind, arg.port);

    {
        let app_state = app_state.clone();
        HttpServer::new(move || {
            App::new()
                .configure(gateway::configure)
                .app_data(app_state.clone())
        })
        .bind((arg.bind, arg.port))?
        .run()
        .await?;
    }

    tracing::info!("Server stopped");

    Ok(())
}
