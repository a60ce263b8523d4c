use tracing::{error, Level};

use gorkhon_api::{
    configuration::{
        get_configuration, set_configuration, AppState, Config, State,
    },
    error::Error,
    provider::{DatabasePool, HTTP},
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::DEBUG
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let (config, database) = match init().await {
        Ok((config, database)) => (config, database),
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let http = HTTP::new(config.clone())?;
    let state = State::new(config, database, http).await?;
    let app_state = AppState::new(state);

    server::server_task(&app_state).await?;

    Ok(())
}

async fn init() -> Result<(Config, DatabasePool), Error> {
    set_configuration()?;
    let config = get_configuration()?;
    let database = DatabasePool::new(&config).await?;
    Ok((config, database))
}
