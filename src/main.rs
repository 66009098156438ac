use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use grade_tracker::database::Database;
use grade_tracker::{api, Config, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "grade-tracker")]
#[command(author, version, about = "Student grade tracker with next-grade prediction", long_about = None)]
struct Args {
    #[arg(short, long, help = "Path to a TOML config file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Port to listen on (overrides config)")]
    port: Option<u16>,

    #[arg(long, help = "Database URL (overrides config)", value_name = "URL")]
    database_url: Option<String>,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

async fn start_api(config: Config, db: Database) -> std::io::Result<()> {
    let db_data = web::Data::new(db);
    let grading_data = web::Data::new(config.grading);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db_data.clone())
            .app_data(grading_data.clone())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    log::info!("Starting Grade Tracker v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading config from: {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    config.validate()?;

    log::info!(
        "Grades {}-{}, target average {}",
        config.grading.min_grade,
        config.grading.max_grade,
        config.grading.target_average
    );

    let db = Database::connect(&config.database).await?;
    log::info!("Connected to {}", config.database.url);

    log::info!("Listening on http://{}:{}", config.server.host, config.server.port);
    start_api(config, db).await?;

    Ok(())
}
