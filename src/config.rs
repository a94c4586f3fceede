use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;

use crate::cli::Cli;

pub const PUBLIC_PRPC_HOSTS: [&str; 9] = [
    "http://173.212.203.145:8899",
    "http://173.212.220.65:8899",
    "http://161.97.97.41:8899",
    "http://192.190.136.36:8899",
    "http://192.190.136.37:8899",
    "http://192.190.136.38:8899",
    "http://192.190.136.28:8899",
    "http://192.190.136.29:8899",
    "http://207.244.255.1:8899",
];

const MULTI_HOST_TIMEOUT: Duration = Duration::from_secs(5);
const SINGLE_PROXY_TIMEOUT: Duration = Duration::from_secs(10);
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamMode {
    SingleProxy,
    MultiHost,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub mode: UpstreamMode,
    hosts: Vec<String>,
    pub call_timeout: Duration,
    api_key: Option<String>,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

impl ProxyConfig {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let (mode, hosts, default_timeout) = match &cli.proxy_url {
            Some(proxy_url) => (
                UpstreamMode::SingleProxy,
                vec![proxy_url.clone()],
                SINGLE_PROXY_TIMEOUT,
            ),
            None => {
                let mut hosts = Vec::new();
                if let Some(primary) = &cli.primary {
                    hosts.push(primary.clone());
                }
                if cli.fallbacks.is_empty() {
                    hosts.extend(PUBLIC_PRPC_HOSTS.iter().map(|host| host.to_string()));
                } else {
                    hosts.extend(
                        cli.fallbacks
                            .iter()
                            .filter(|host| !host.trim().is_empty())
                            .cloned(),
                    );
                }
                (UpstreamMode::MultiHost, hosts, MULTI_HOST_TIMEOUT)
            }
        };

        if hosts.is_empty() {
            bail!("no upstream pRPC host configured");
        }

        for host in &hosts {
            Url::parse(host).with_context(|| format!("invalid upstream url {host}"))?;
        }

        let call_timeout = match cli.timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None => default_timeout,
        };

        Ok(Self {
            mode,
            hosts,
            call_timeout,
            api_key: cli.api_key.clone(),
            cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
            cache_capacity: cli.cache_capacity,
        })
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn single_proxy_url(&self) -> Option<&str> {
        match self.mode {
            UpstreamMode::SingleProxy => self.hosts.first().map(String::as_str),
            UpstreamMode::MultiHost => None,
        }
    }

    pub fn outbound_key(&self) -> Option<String> {
        match self.mode {
            UpstreamMode::SingleProxy => self.api_key.clone(),
            UpstreamMode::MultiHost => None,
        }
    }

    pub fn inbound_key_ok(&self, provided: Option<&str>) -> bool {
        if self.mode == UpstreamMode::SingleProxy {
            return true;
        }

        match &self.api_key {
            Some(expected) => provided.is_some_and(|key| constant_time_eq(expected, key)),
            None => true,
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }

    diff == 0
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("prpc-proxy").chain(args.iter().copied()))
    }

    #[test]
    fn primary_is_consulted_first() {
        let config = ProxyConfig::resolve(&cli(&["--primary", "http://10.0.0.1:8899"])).unwrap();

        assert_eq!(config.mode, UpstreamMode::MultiHost);
        assert_eq!(config.hosts()[0], "http://10.0.0.1:8899");
        assert_eq!(config.hosts().len(), 1 + PUBLIC_PRPC_HOSTS.len());
    }

    #[test]
    fn declared_fallbacks_replace_the_public_list() {
        let config =
            ProxyConfig::resolve(&cli(&["--fallback", "http://a:8899,http://b:8899"])).unwrap();

        assert_eq!(config.hosts(), ["http://a:8899", "http://b:8899"]);
    }

    #[test]
    fn blank_fallbacks_without_primary_fail_fast() {
        let err = ProxyConfig::resolve(&cli(&["--fallback", ""])).unwrap_err();
        assert!(err.to_string().contains("no upstream"));
    }

    #[test]
    fn proxy_url_switches_to_single_proxy_mode() {
        let config =
            ProxyConfig::resolve(&cli(&["--proxy-url", "http://proxy.internal:8080"])).unwrap();

        assert_eq!(config.mode, UpstreamMode::SingleProxy);
        assert_eq!(config.hosts(), ["http://proxy.internal:8080"]);
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.single_proxy_url(), Some("http://proxy.internal:8080"));
    }

    #[test]
    fn multi_host_timeout_defaults_to_five_seconds() {
        let config = ProxyConfig::resolve(&cli(&[])).unwrap();

        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.hosts().len(), PUBLIC_PRPC_HOSTS.len());
        assert_eq!(config.single_proxy_url(), None);
    }

    #[test]
    fn timeout_flag_overrides_the_mode_default() {
        let config = ProxyConfig::resolve(&cli(&["--timeout-secs", "2"])).unwrap();
        assert_eq!(config.call_timeout, Duration::from_secs(2));

        let config =
            ProxyConfig::resolve(&cli(&["--proxy-url", "http://p:8080", "--timeout-secs", "2"]))
                .unwrap();
        assert_eq!(config.call_timeout, Duration::from_secs(2));
    }

    #[test]
    fn invalid_upstream_url_is_a_startup_error() {
        let err = ProxyConfig::resolve(&cli(&["--fallback", "not a url"])).unwrap_err();
        assert!(err.to_string().contains("invalid upstream url"));
    }

    #[test]
    fn inbound_key_enforced_only_in_multi_host_mode() {
        let multi = ProxyConfig::resolve(&cli(&["--api-key", "s3cret"])).unwrap();
        assert!(!multi.inbound_key_ok(None));
        assert!(!multi.inbound_key_ok(Some("wrong")));
        assert!(multi.inbound_key_ok(Some("s3cret")));
        assert_eq!(multi.outbound_key(), None);

        let single = ProxyConfig::resolve(&cli(&[
            "--proxy-url",
            "http://p:8080",
            "--api-key",
            "s3cret",
        ]))
        .unwrap();
        assert!(single.inbound_key_ok(None));
        assert!(single.inbound_key_ok(Some("anything")));
        assert_eq!(single.outbound_key(), Some("s3cret".to_string()));
    }

    #[test]
    fn no_configured_key_accepts_every_caller() {
        let config = ProxyConfig::resolve(&cli(&[])).unwrap();
        assert!(config.inbound_key_ok(None));
        assert!(config.inbound_key_ok(Some("whatever")));
    }

    #[test]
    fn constant_time_eq_matches_exact_strings_only() {
        assert!(constant_time_eq("s3cret", "s3cret"));
        assert!(!constant_time_eq("s3cret", "s3creT"));
        assert!(!constant_time_eq("s3cret", "s3cre"));
        assert!(!constant_time_eq("", "x"));
        assert!(constant_time_eq("", ""));
    }
}
