use anyhow::{anyhow, Context, Result};
use common_auth::{config::is_rsa_family, Algorithm, AuthConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub auth: AuthConfig,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid HOST '{host}'"))?;
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    Ok(ServiceConfig {
        addr: SocketAddr::from((ip, port)),
        auth: load_auth_config()?,
    })
}

pub fn load_auth_config() -> Result<AuthConfig> {
    let domain = env::var("AUTH0_DOMAIN")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .context("AUTH0_DOMAIN must be set")?;
    let audience = env::var("API_AUDIENCE")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .context("API_AUDIENCE must be set")?;

    let mut config = AuthConfig::new(domain, audience);

    if let Ok(value) = env::var("AUTH_ALGORITHMS") {
        let algorithms =
            parse_algorithms(&value).context("Failed to parse AUTH_ALGORITHMS")?;
        config = config.with_algorithms(algorithms);
    }

    if let Some(seconds) = u64_from_env("AUTH_LEEWAY_SECONDS")? {
        config = config.with_leeway(seconds);
    }

    if let Some(url) = env::var("JWKS_URL")
        .ok()
        .and_then(|value| normalize_optional(&value))
    {
        config = config.with_jwks_url(url);
    }

    if let Some(millis) = u64_from_env("JWKS_TIMEOUT_MS")? {
        config = config.with_jwks_timeout(Duration::from_millis(millis));
    }

    // 0 turns the cache off; every request then refetches the key set.
    if let Some(seconds) = u64_from_env("JWKS_CACHE_TTL_SECS")? {
        let ttl = (seconds > 0).then(|| Duration::from_secs(seconds));
        config = config.with_jwks_cache_ttl(ttl);
    }

    if let Some(seconds) = u64_from_env("JWKS_MIN_REFRESH_SECS")? {
        config = config.with_jwks_min_refresh_interval(Duration::from_secs(seconds));
    }

    Ok(config)
}

fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>> {
    let mut algorithms = Vec::new();
    for item in value.split(|c| c == ',' || c == ';' || c == ' ') {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let algorithm: Algorithm = trimmed
            .to_ascii_uppercase()
            .parse()
            .map_err(|_| anyhow!("Unknown signing algorithm '{trimmed}'"))?;
        if !is_rsa_family(&algorithm) {
            return Err(anyhow!(
                "Signing algorithm '{trimmed}' is not allowed. Use RS256, RS384, RS512, PS256, PS384 or PS512."
            ));
        }
        algorithms.push(algorithm);
    }
    if algorithms.is_empty() {
        return Err(anyhow!("At least one signing algorithm is required"));
    }
    Ok(algorithms)
}

fn u64_from_env(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Failed to parse {key}")),
        Err(_) => Ok(None),
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
