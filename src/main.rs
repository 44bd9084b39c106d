use actix_web::{App, HttpServer};
use clap::Parser;
use office::app::AppState;
use office::cli::{
    commands::{Cli, Commands},
    run_cli,
};
use office::config::AppConfig;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        run_cli(cli.command, cli.config).await;
        return Ok(());
    }

    info!("Starting The Office server...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let state = match AppState::build(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Server listening on {}:{}", host, port);

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .configure(move |cfg| state.register(cfg))
            .configure(office::api::routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
