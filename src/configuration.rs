use std::{env, fs, ops::Deref, path::Path, sync::Arc};

use tokio::sync::Semaphore;

use crate::{
    auth::{Authorizer, SharedSecretAuthorizer},
    dao::migrations,
    error::Error,
    provider::{DatabasePool, HTTP},
    push::{PushSender, WebPushSender},
    search::SearchChain,
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub database: DatabasePool,
    pub push_sender: Arc<dyn PushSender>,
    pub search: SearchChain,
    pub authorizer: Arc<dyn Authorizer>,
    pub push_permits: Arc<Semaphore>,
}

impl State {
    pub async fn new(
        config: Config,
        database: DatabasePool,
        http: HTTP,
    ) -> Result<State, Error> {
        migrations::run(database.get_pool()).await?;

        let push_sender: Arc<dyn PushSender> =
            Arc::new(WebPushSender::new(config.clone(), http));
        let search = SearchChain::duckduckgo()?;
        let authorizer: Arc<dyn Authorizer> =
            Arc::new(SharedSecretAuthorizer::new(&config.admin_token));
        let push_permits = Arc::new(Semaphore::new(config.max_push_tasks));

        Ok(Self {
            config,
            database,
            push_sender,
            search,
            authorizer,
            push_permits,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub database_url: String,
    pub timeout: u64,
    pub max_push_tasks: usize,
    pub gone_status_codes: Vec<u16>,
    pub admin_token: String,
    pub contact_email: String,
    pub vapid_private_key: Vec<u8>,
    pub vapid_public_key: Vec<u8>,
}

fn parse_config_vapid_keys() -> Result<(Vec<u8>, Vec<u8>), Error> {
    let private_key_path = env::var("VAPID_PRIVATE_KEY_FILE")?;
    let public_key_path = env::var("VAPID_PUBLIC_KEY_FILE")?;

    let private_key = fs::read(private_key_path)?;
    let public_key = fs::read(public_key_path)?;

    Ok((private_key, public_key))
}

pub fn get_configuration() -> Result<Config, Error> {
    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let allowed_origins = parse_list(&env::var("ALLOWED_ORIGINS")?);
    let database_url = env::var("DATABASE_URL")?;
    let timeout = env::var("TIMEOUT")?.parse()?;
    let max_push_tasks = env::var("MAX_PUSH_TASKS")?.parse()?;

    let gone_status_codes = match env::var("GONE_STATUS_CODES") {
        Ok(value) => parse_status_codes(&value)?,
        Err(_) => vec![404, 410],
    };

    let admin_token = env::var("ADMIN_TOKEN")?;
    let contact_email = env::var("CONTACT_EMAIL")?;
    let (vapid_private_key, vapid_public_key) = parse_config_vapid_keys()?;

    let config = Config {
        server_host,
        port,
        allowed_origins,
        database_url,
        timeout,
        max_push_tasks,
        gone_status_codes,
        admin_token,
        contact_email,
        vapid_private_key,
        vapid_public_key,
    };

    Ok(config)
}

/// Loads `.env` next to the manifest into the process environment. A
/// missing file is fine; deployments set real variables instead.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);

    if !Path::new(&path).exists() {
        return Ok(());
    }

    let config_string = fs::read_to_string(path)?;
    parse_config_string(config_string);

    Ok(())
}

fn parse_config_string(config: String) {
    let params: Vec<Option<(&str, &str)>> = config
        .split('\n')
        .map(|s| {
            let element = s.find('=');
            if let Some(e) = element {
                return Some(s.split_at(e));
            }
            None
        })
        .map(|value| {
            if let Some((k, v)) = value {
                return Some((k, &v[1..]));
            }
            None
        })
        .collect();

    for (key, value) in params.into_iter().flatten() {
        env::set_var(key, value);
    }
}

pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn parse_status_codes(value: &str) -> Result<Vec<u16>, Error> {
    let mut status_codes = vec![];

    for code in parse_list(value) {
        status_codes.push(code.parse::<u16>()?);
    }

    Ok(status_codes)
}

#[cfg(test)]
pub fn test_state(admin_token: &str) -> AppState<State> {
    use crate::{dao::PoolOption, model::Table};

    let config = Config {
        server_host: String::from("localhost"),
        port: 0,
        allowed_origins: vec![String::from("*")],
        database_url: String::from("postgres://gorkhon@localhost/gorkhon"),
        timeout: 5,
        max_push_tasks: 4,
        gone_status_codes: vec![404, 410],
        admin_token: String::from(admin_token),
        contact_email: String::from("admin@gorkhon.online"),
        vapid_private_key: Vec::new(),
        vapid_public_key: Vec::new(),
    };

    let pool = PoolOption::new()
        .connect_lazy(config.database_url.as_str())
        .expect("lazy pool");
    let database = DatabasePool {
        subscription: Table::new(pool.clone()),
        system_message: Table::new(pool.clone()),
        pool,
    };

    let http = HTTP::new(config.clone()).expect("http client");
    let push_sender: Arc<dyn PushSender> =
        Arc::new(WebPushSender::new(config.clone(), http));
    let search = SearchChain::duckduckgo().expect("search chain");
    let authorizer: Arc<dyn Authorizer> =
        Arc::new(SharedSecretAuthorizer::new(&config.admin_token));
    let push_permits = Arc::new(Semaphore::new(config.max_push_tasks));

    AppState::new(State {
        config,
        database,
        push_sender,
        search,
        authorizer,
        push_permits,
    })
}
