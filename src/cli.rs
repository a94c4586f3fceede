use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Failover proxy for pRPC node queries")]
pub struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Highest-priority upstream, tried before the fallback list
    #[arg(long, env = "PRPC_PRIMARY")]
    pub primary: Option<String>,

    /// Fallback pRPC hosts, in priority order; replaces the built-in public list
    #[arg(long = "fallback", env = "PRPC_HOSTS", value_delimiter = ',')]
    pub fallbacks: Vec<String>,

    /// Forward everything through one upstream proxy instead of walking hosts
    #[arg(long, env = "PRPC_PROXY_URL")]
    pub proxy_url: Option<String>,

    #[arg(long, env = "PROXY_API_KEY")]
    pub api_key: Option<String>,

    /// Per-host call timeout; defaults to 5s (failover) or 10s (single proxy)
    #[arg(long, env = "PRPC_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 60)]
    pub cache_ttl_secs: u64,

    #[arg(long, default_value_t = 1024)]
    pub cache_capacity: usize,
}
