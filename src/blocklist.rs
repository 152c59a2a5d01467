//! Configurable host and network blocklist
//!
//! Operators list the destinations webhooks must never reach. Each pattern is
//! one of:
//!
//! - an IP address or CIDR range (`10.0.0.0/8`, `fd00::/8`, `192.0.2.7`)
//! - a hostname (`intranet.example.com`), matched exactly and case-insensitively
//! - a wildcard hostname (`*.example.org`), matching the domain itself and
//!   every name below it
//!
//! Anything that does not parse as an address or network is treated as a
//! hostname. Patterns are compiled once into a [`Blocklist`]; the
//! [`BlocklistCache`] holds the compiled value and swaps it atomically when
//! the configuration is reloaded.

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use ipnet::IpNet;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::{debug, info};
use url::Host;

/// A compiled blocklist. Immutable once built.
#[derive(Debug, Default, Clone)]
pub struct Blocklist {
    ip_networks: Vec<IpNet>,
    exact_hosts: HashSet<String>,
    wildcard_suffixes: HashSet<String>,
}

impl Blocklist {
    /// Compiles configuration patterns into a blocklist
    ///
    /// Compilation never fails: a pattern that is not an address or network
    /// becomes a hostname pattern. Blank patterns and the bare wildcard `*.`
    /// name no host and are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookgate::blocklist::Blocklist;
    ///
    /// let blocklist = Blocklist::compile(["*.example.org", "10.0.0.0/8", "intranet"]);
    /// assert!(blocklist.blocks_host("api.example.org"));
    /// assert!(blocklist.blocks_host("INTRANET"));
    /// assert!(blocklist.network_containing("10.1.2.3".parse().unwrap()).is_some());
    /// ```
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blocklist = Blocklist::default();
        for pattern in patterns {
            blocklist.add(pattern.as_ref());
        }

        debug!(
            "Compiled blocklist: {} networks, {} hosts, {} wildcard domains",
            blocklist.ip_networks.len(),
            blocklist.exact_hosts.len(),
            blocklist.wildcard_suffixes.len()
        );
        blocklist
    }

    fn add(&mut self, pattern: &str) {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return;
        }

        if let Some(net) = parse_network(pattern) {
            if !self.ip_networks.contains(&net) {
                self.ip_networks.push(net);
            }
            return;
        }

        match pattern.strip_prefix("*.") {
            Some(suffix) => {
                let suffix = canonical_host(suffix);
                if !suffix.is_empty() {
                    self.wildcard_suffixes.insert(suffix);
                }
            }
            None => {
                let host = canonical_host(pattern);
                if !host.is_empty() {
                    self.exact_hosts.insert(host);
                }
            }
        }
    }

    /// Returns true if `host` is listed exactly or falls under a wildcard domain.
    ///
    /// `example.org` and `a.b.example.org` both match `*.example.org`;
    /// `example.org.evil.com` does not.
    pub fn blocks_host(&self, host: &str) -> bool {
        if self.exact_hosts.is_empty() && self.wildcard_suffixes.is_empty() {
            return false;
        }

        let host = normalize_host(host);
        if host.is_empty() {
            return false;
        }
        if self.exact_hosts.contains(&host) {
            return true;
        }

        let mut rest = host.as_str();
        loop {
            if self.wildcard_suffixes.contains(rest) {
                return true;
            }
            match rest.find('.') {
                Some(dot) => rest = &rest[dot + 1..],
                None => return false,
            }
        }
    }

    /// The first configured network that contains `ip`, if any.
    pub fn network_containing(&self, ip: IpAddr) -> Option<IpNet> {
        self.ip_networks.iter().find(|net| net.contains(&ip)).copied()
    }

    pub fn networks(&self) -> &[IpNet] {
        &self.ip_networks
    }

    pub fn is_empty(&self) -> bool {
        self.ip_networks.is_empty() && self.exact_hosts.is_empty() && self.wildcard_suffixes.is_empty()
    }
}

/// Parses a CIDR range or a bare address (as a single-host network).
fn parse_network(pattern: &str) -> Option<IpNet> {
    if let Ok(net) = pattern.parse::<IpNet>() {
        return Some(net.trunc());
    }
    let addr = pattern.parse::<IpAddr>().ok()?;
    let prefix = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, prefix).ok()
}

/// Brings a hostname into the form the URL parser gives it: percent-decoded,
/// IDNA-mapped to lowercase punycode, without the trailing root dot.
///
/// Names the URL parser would reject are lowercased as they are, so they
/// still match literally.
fn canonical_host(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    match Host::parse(trimmed) {
        Ok(Host::Domain(domain)) => domain,
        Ok(Host::Ipv4(addr)) => addr.to_string(),
        Ok(Host::Ipv6(addr)) => addr.to_string(),
        Err(_) => trimmed.to_lowercase(),
    }
}

/// Lowercases a hostname and drops the trailing root dot.
///
/// Plain ASCII names skip the full IDNA pass; hosts coming out of
/// `Url::parse` are always in that form already.
pub(crate) fn normalize_host(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    if trimmed.is_ascii() && !trimmed.contains('%') {
        trimmed.to_ascii_lowercase()
    } else {
        canonical_host(trimmed)
    }
}

/// Shared holder for the compiled blocklist
///
/// Readers get an `Arc` snapshot without taking a lock. Rebuilds are
/// serialized, so two concurrent reloads cannot interleave and the last one
/// to finish is the one that stays installed.
#[derive(Debug)]
pub struct BlocklistCache {
    current: ArcSwap<Blocklist>,
    rebuild: Mutex<()>,
}

impl BlocklistCache {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            current: ArcSwap::from_pointee(Blocklist::compile(patterns)),
            rebuild: Mutex::new(()),
        }
    }

    /// Snapshot of the currently installed blocklist.
    pub fn load(&self) -> Arc<Blocklist> {
        self.current.load_full()
    }

    /// Recompiles the blocklist from new patterns and installs it
    ///
    /// Validations already in flight keep the snapshot they started with.
    pub fn reload<I, S>(&self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _guard = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let compiled = Blocklist::compile(patterns);
        info!(
            "Installing reloaded blocklist with {} networks",
            compiled.networks().len()
        );
        self.current.store(Arc::new(compiled));
    }
}

impl Default for BlocklistCache {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

/// Reads blocklist patterns from a text file
///
/// One pattern per line. Empty lines and lines starting with `#` are skipped.
pub async fn read_patterns(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .await
        .context(format!("Failed to open blocklist file: {:?}", path))?;

    let reader = BufReader::new(file);
    let mut lines = reader.lines();
    let mut patterns = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            patterns.push(trimmed.to_string());
        }
    }

    debug!("Read {} blocklist patterns from {}", patterns.len(), path.display());
    Ok(patterns)
}
