use std::process::ExitCode;

use dotenvy::dotenv;
use storefront::{build_server, create_pool, run_migrations, AppConfig, AppState};

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url)?;
    run_migrations(&pool)?;

    // The Stripe client is blocking and has to be built outside the runtime.
    let state = AppState::build(pool, &config)?;

    log::info!("Starting server at http://{}:{}", config.host, config.port);
    actix_web::rt::System::new().block_on(async move {
        build_server(state, &config.host, config.port)?.await
    })?;
    Ok(())
}
