use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Neo4j Bolt endpoint
    #[serde(default = "default_neo4j_uri")]
    pub neo4j_uri: String,

    #[serde(default = "default_neo4j_user")]
    pub neo4j_user: String,

    #[serde(default)]
    pub neo4j_password: String,

    /// Neo4j database name
    #[serde(default)]
    pub neo4j_database: Option<String>,

    /// Older name for `NEO4J_DATABASE`, still honored
    #[serde(default)]
    pub neo4j_db: Option<String>,

    /// Path to the classifier saved in XGBoost JSON format
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Redis connection URL; popularity caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TTL in seconds for cached popularity rankings
    #[serde(default = "default_popular_cache_ttl")]
    pub popular_cache_ttl: u64,

    /// Length of the popularity ranking shared by cold-start requests
    #[serde(default = "default_popular_pool_size")]
    pub popular_pool_size: usize,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Largest `k` a caller may ask for
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Cap on user top tags used for tag overlap
    #[serde(default = "default_user_tag_limit")]
    pub user_tag_limit: usize,

    /// Cap on tag-similarity and embedding-similarity neighbors
    #[serde(default = "default_neighbor_limit")]
    pub neighbor_limit: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_neo4j_uri() -> String {
    "neo4j://127.0.0.1:7687".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

fn default_model_path() -> String {
    "models/xgboost_model.json".to_string()
}

fn default_popular_cache_ttl() -> u64 {
    300
}

fn default_popular_pool_size() -> usize {
    crate::services::cold_start::DEFAULT_POPULAR_POOL
}

fn default_top_k() -> usize {
    10
}

fn default_max_top_k() -> usize {
    100
}

fn default_user_tag_limit() -> usize {
    20
}

fn default_neighbor_limit() -> usize {
    5
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

const DEFAULT_DATABASE: &str = "fp-rsbp";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Effective database name: `NEO4J_DATABASE`, then `NEO4J_DB`, then the default
    pub fn database(&self) -> &str {
        self.neo4j_database
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.neo4j_db.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_DATABASE)
    }

    /// Listener address as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.neo4j_uri, "neo4j://127.0.0.1:7687");
        assert_eq!(config.neo4j_user, "neo4j");
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.max_top_k, 100);
        assert_eq!(config.neighbor_limit, 5);
        assert_eq!(config.popular_pool_size, 200);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.database(), "fp-rsbp");
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_database_prefers_new_name() {
        let config = from_pairs(&[("NEO4J_DATABASE", "music"), ("NEO4J_DB", "legacy")]);
        assert_eq!(config.database(), "music");
    }

    #[test]
    fn test_database_falls_back_to_legacy_name() {
        let config = from_pairs(&[("NEO4J_DATABASE", ""), ("NEO4J_DB", "legacy")]);
        assert_eq!(config.database(), "legacy");
    }

    #[test]
    fn test_numeric_overrides() {
        let config = from_pairs(&[("DEFAULT_TOP_K", "25"), ("PORT", "9000")]);
        assert_eq!(config.default_top_k, 25);
        assert_eq!(config.port, 9000);
    }
}
