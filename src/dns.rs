use anyhow::{anyhow, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};
use trust_dns_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use trust_dns_resolver::system_conf::read_system_conf;
use trust_dns_resolver::TokioAsyncResolver as AsyncResolver;

/// Hostname to address lookup used by the endpoint validator.
///
/// Implementations must return every address the name currently resolves to.
/// The validator rejects the host if any one of them is unsafe, so returning
/// only the first answer would defeat the check.
pub trait Resolve: Send + Sync {
    fn resolve<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>>>;
}

/// Resolver backed by the system DNS configuration
pub struct DnsResolver {
    resolver: AsyncResolver,
}

impl DnsResolver {
    /// Creates a resolver from `/etc/resolv.conf` (or the platform
    /// equivalent), falling back to the library default upstreams when the
    /// system configuration cannot be read.
    ///
    /// Each query is sent once. A lookup that does not answer within
    /// `timeout` fails.
    pub fn new(timeout: Duration) -> Result<Self> {
        let (config, mut opts) = match read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!("Could not read system DNS configuration ({}), using defaults", e);
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };

        opts.timeout = timeout;
        opts.attempts = 1;
        opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        opts.positive_min_ttl = None;
        opts.negative_min_ttl = None;

        let resolver = AsyncResolver::tokio(config, opts);
        Ok(Self { resolver })
    }

    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        debug!("Resolving DNS for host: {}", host);

        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .context(format!("DNS resolution failed for {}", host))?;

        let ips: Vec<IpAddr> = lookup.iter().collect();
        if ips.is_empty() {
            return Err(anyhow!("No IP addresses found for host: {}", host));
        }

        debug!("Resolved {} IP addresses for {}", ips.len(), host);
        Ok(ips)
    }
}

impl Resolve for DnsResolver {
    fn resolve<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>>> {
        self.lookup(host).boxed()
    }
}

/// Fixed host table, for tests and for deployments that pin webhook hosts
///
/// Names are matched case-insensitively. Unknown names fail to resolve.
///
/// # Examples
/// ```
/// # use hookgate::dns::{Resolve, StaticResolver};
/// # async {
/// let resolver = StaticResolver::new()
///     .with_host("hooks.example.com", ["203.0.113.5".parse().unwrap()]);
/// let ips = resolver.resolve("HOOKS.example.com").await?;
/// assert_eq!(ips.len(), 1);
/// assert!(resolver.resolve("unknown.example.com").await.is_err());
/// # Ok::<(), anyhow::Error>(())
/// # };
/// ```
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host<I>(mut self, host: &str, addrs: I) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        self.hosts
            .entry(host.to_ascii_lowercase())
            .or_default()
            .extend(addrs);
        self
    }
}

impl Resolve for StaticResolver {
    fn resolve<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>>> {
        let answer = match self.hosts.get(&host.to_ascii_lowercase()) {
            Some(ips) if !ips.is_empty() => Ok(ips.clone()),
            Some(_) => Err(anyhow!("No IP addresses found for host: {}", host)),
            None => Err(anyhow!("NXDOMAIN: {}", host)),
        };
        futures::future::ready(answer).boxed()
    }
}
