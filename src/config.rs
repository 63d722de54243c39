#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: Option<String>,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub token_key_prefix: String,
}
