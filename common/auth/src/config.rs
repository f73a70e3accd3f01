use std::time::Duration;

use jsonwebtoken::Algorithm;

/// Well-known path the identity provider publishes its signing keys under.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Runtime configuration for bearer-token authorization.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Identity provider domain, e.g. `tenant.us.auth0.com`.
    pub domain: String,
    /// Expected audience claim (aud).
    pub audience: String,
    /// Signing algorithms a token may declare. Only the RSA family is honoured.
    pub algorithms: Vec<Algorithm>,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u64,
    /// Overrides the JWKS location derived from `domain`.
    pub jwks_url: Option<String>,
    /// Upper bound on a single JWKS fetch.
    pub jwks_timeout: Duration,
    /// How long a fetched key set is served before refetching. `None` disables caching.
    pub jwks_cache_ttl: Option<Duration>,
    /// Minimum age of the cached set before an unknown `kid` may trigger an early refetch.
    pub jwks_min_refresh_interval: Duration,
}

impl AuthConfig {
    /// Construct config with RS256 only, zero leeway and a ten minute key cache.
    pub fn new(domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            audience: audience.into(),
            algorithms: vec![Algorithm::RS256],
            leeway_seconds: 0,
            jwks_url: None,
            jwks_timeout: Duration::from_secs(5),
            jwks_cache_ttl: Some(Duration::from_secs(600)),
            jwks_min_refresh_interval: Duration::from_secs(30),
        }
    }

    /// Replace the algorithm allow-list. Non-RSA algorithms are dropped.
    pub fn with_algorithms<I>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = Algorithm>,
    {
        self.algorithms = algorithms.into_iter().filter(is_rsa_family).collect();
        self
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = Some(url.into());
        self
    }

    pub fn with_jwks_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_timeout = timeout;
        self
    }

    pub fn with_jwks_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    pub fn with_jwks_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.jwks_min_refresh_interval = interval;
        self
    }

    /// Issuer every accepted token must carry: `https://<domain>/`.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn jwks_url(&self) -> String {
        match &self.jwks_url {
            Some(url) => url.clone(),
            None => format!("https://{}{}", self.domain, JWKS_PATH),
        }
    }

    pub fn allows(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }
}

pub fn is_rsa_family(algorithm: &Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}
