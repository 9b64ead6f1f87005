use validator::Validate;

#[derive(Deserialize, Debug, Validate)]
pub struct Config {
    /// records are kept in memory when this isn't set
    database_url: Option<String>,
    api_host: Option<String>,
    api_port: Option<usize>,
    #[validate(length(min = 32))]
    session_private_key: String,
    /// pending conversation input is kept in memory when this isn't set
    redis_url: Option<String>,
    /// seconds before an abandoned conversation forgets its pending input
    #[serde(default = "default_session_ttl")]
    session_ttl: u64,
    /// comma separated list of the slots members can pick, e.g. `10:00-23:00,17:00-23:00`
    slot_catalog: Option<Vec<String>>,
    /// defaults to localhost, which shouldn't cause issues if you're using udp
    opentelemetry_endpoint: Option<String>,
}

fn default_session_ttl() -> u64 {
    60 * 30
}

const DEFAULT_SLOT_CATALOG: &[&str] = &[
    "09:30-23:00",
    "10:00-23:00",
    "11:00-23:00",
    "12:00-23:00",
    "13:00-23:00",
    "17:00-23:00",
];

lazy_static! {
    static ref CONFIG: Config = match envy::from_env::<Config>() {
        Ok(config) => {
            match config.validate() {
                Ok(()) => config,
                Err(e) => panic!("invalid environment variable: {}", e),
            }
        }
        Err(error) => panic!("Missing or incorrect environment variable: {}", error),
    };
}

impl Config {
    pub fn database_url() -> Option<&'static str> {
        CONFIG.database_url.as_ref().map(|url| url.as_ref())
    }

    pub fn api_host() -> &'static str {
        match &CONFIG.api_host {
            Some(host) => host.as_ref(),
            None => "localhost",
        }
    }

    pub fn api_port() -> usize {
        CONFIG.api_port.unwrap_or(8080)
    }

    pub fn session_private_key() -> &'static str {
        CONFIG.session_private_key.as_ref()
    }

    pub fn redis_url() -> Option<&'static str> {
        CONFIG.redis_url.as_ref().map(|url| url.as_ref())
    }

    pub fn session_ttl() -> u64 {
        CONFIG.session_ttl
    }

    pub fn slot_catalog() -> Vec<&'static str> {
        match &CONFIG.slot_catalog {
            Some(slots) => slots.iter().map(|slot| slot.as_str()).collect(),
            None => DEFAULT_SLOT_CATALOG.to_vec(),
        }
    }

    pub fn opentelemetry_endpoint() -> &'static str {
        match &CONFIG.opentelemetry_endpoint {
            Some(endpoint) => endpoint.as_ref(),
            None => "127.0.0.1:6831",
        }
    }
}
