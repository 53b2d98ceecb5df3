use anyhow::Context;
use serde::Deserialize;

/// Lifetimes of the bearer and email-verification tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub ttl_minutes: i64,
    pub verification_ttl_minutes: i64,
    pub verify_base_url: String,
}

/// Which route groups require a verified account.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    pub profile: bool,
    pub picture: bool,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub token: TokenConfig,
    pub gate: GateConfig,
    pub hash: HashConfig,
    pub s3: S3Config,
    pub sns_topic_arn: Option<String>,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let defaults = HashConfig::default();

        Ok(Self {
            database_url,
            db_max_connections: parsed("DB_MAX_CONNECTIONS").unwrap_or(10),
            token: TokenConfig {
                ttl_minutes: parsed("TOKEN_TTL_MINUTES").unwrap_or(60),
                verification_ttl_minutes: parsed("VERIFICATION_TTL_MINUTES").unwrap_or(2),
                verify_base_url: std::env::var("VERIFY_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".into()),
            },
            gate: GateConfig {
                profile: parsed("VERIFY_GATE_PROFILE").unwrap_or(false),
                picture: parsed("VERIFY_GATE_PICTURE").unwrap_or(true),
            },
            hash: HashConfig {
                memory_kib: parsed("HASH_MEMORY_KIB").unwrap_or(defaults.memory_kib),
                iterations: parsed("HASH_ITERATIONS").unwrap_or(defaults.iterations),
                parallelism: parsed("HASH_PARALLELISM").unwrap_or(defaults.parallelism),
            },
            s3: S3Config {
                bucket: std::env::var("S3_BUCKET_NAME").context("S3_BUCKET_NAME is not set")?,
                endpoint: non_empty("S3_ENDPOINT"),
                region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".into()),
                access_key: non_empty("S3_ACCESS_KEY"),
                secret_key: non_empty("S3_SECRET_KEY"),
            },
            sns_topic_arn: non_empty("SNS_TOPIC_ARN"),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES").unwrap_or(5 * 1024 * 1024),
        })
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_defaults_match_argon2() {
        let cfg = HashConfig::default();
        assert_eq!(cfg.memory_kib, 19 * 1024);
        assert_eq!(cfg.iterations, 2);
        assert_eq!(cfg.parallelism, 1);
    }

    #[test]
    fn parsed_ignores_garbage() {
        std::env::set_var("USERHUB_TEST_PARSED", "not-a-number");
        assert_eq!(parsed::<i64>("USERHUB_TEST_PARSED"), None);
        std::env::set_var("USERHUB_TEST_PARSED", " 42 ");
        assert_eq!(parsed::<i64>("USERHUB_TEST_PARSED"), Some(42));
        std::env::remove_var("USERHUB_TEST_PARSED");
    }
}
