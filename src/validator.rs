//! Endpoint safety validation for outbound webhooks
//!
//! This module is the gate between "a user saved a webhook URL" and "the
//! system connects to it". A candidate URL passes only if:
//! - it parses as an absolute URL with an `http` or `https` scheme
//! - its effective port is not on the bad port list
//! - its host is not blocked by configuration
//! - every address the host resolves to is an acceptable destination
//!
//! Any failure, including a DNS error or timeout, rejects the URL. Resolution
//! results are not cached: addresses can change between saving a webhook and
//! delivering to it, so dispatchers call [`EndpointValidator::guard`] again
//! right before connecting.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    net::IpAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, info, warn};
use url::{Host, Url};

use crate::{
    blocklist::{normalize_host, BlocklistCache},
    classify::classify_address,
    dns::{DnsResolver, Resolve},
    error::EndpointError,
    ports::{effective_port, is_allowed_scheme, is_bad_port},
    sanitize::{redact_url, sanitize_report},
};

/// Default time allowed for resolving a webhook host.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Tunables for [`EndpointValidator`]
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Upper bound on a single DNS lookup. A lookup that takes longer
    /// rejects the endpoint.
    pub resolve_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

/// Outcome of checking one endpoint, as emitted by the command line tool
///
/// # Examples
///
/// ```
/// use hookgate::validator::EndpointReport;
///
/// let report = EndpointReport {
///     url: "http://example.com:22".to_string(),
///     safe: false,
///     reason: Some("port 22 is not allowed".to_string()),
///     processing_time_ms: 0,
/// };
/// assert!(!report.safe);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointReport {
    /// The checked URL, with any credentials removed
    pub url: String,
    /// Whether the endpoint may be used
    pub safe: bool,
    /// Why the endpoint was rejected
    pub reason: Option<String>,
    /// Time taken to check this endpoint in milliseconds
    pub processing_time_ms: u64,
}

/// Decides whether webhook endpoints are safe to deliver to
///
/// Cloning is cheap; clones share the blocklist cache and resolver, so a
/// [`reload_blocklist`](Self::reload_blocklist) on one is seen by all.
///
/// # Examples
///
/// ```
/// use hookgate::dns::StaticResolver;
/// use hookgate::validator::{EndpointValidator, ValidatorConfig};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let resolver = StaticResolver::new()
///     .with_host("hooks.example.com", ["203.0.113.5".parse().unwrap()])
///     .with_host("build.internal", ["10.0.0.5".parse().unwrap()]);
/// let validator = EndpointValidator::with_resolver(
///     ["10.0.0.0/8"],
///     Arc::new(resolver),
///     ValidatorConfig::default(),
/// );
///
/// assert!(validator.is_endpoint_safe("https://hooks.example.com/notify").await);
/// assert!(!validator.is_endpoint_safe("https://build.internal/notify").await);
/// # }
/// ```
#[derive(Clone)]
pub struct EndpointValidator {
    blocklist: Arc<BlocklistCache>,
    resolver: Arc<dyn Resolve>,
    config: ValidatorConfig,
}

impl EndpointValidator {
    /// Creates a validator that resolves hosts with the system DNS configuration
    pub fn new<I, S>(patterns: I, config: ValidatorConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resolver = DnsResolver::new(config.resolve_timeout)
            .context("Failed to create DNS resolver")?;
        Ok(Self::with_resolver(patterns, Arc::new(resolver), config))
    }

    pub fn with_resolver<I, S>(patterns: I, resolver: Arc<dyn Resolve>, config: ValidatorConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocklist: Arc::new(BlocklistCache::new(patterns)),
            resolver,
            config,
        }
    }

    /// Replaces the blocklist with one compiled from `patterns`.
    pub fn reload_blocklist<I, S>(&self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blocklist.reload(patterns);
    }

    /// Returns true if `candidate` may be stored as a webhook endpoint
    ///
    /// A blank candidate is accepted: having no endpoint configured is not
    /// unsafe. Every rejection is logged with its reason.
    pub async fn is_endpoint_safe(&self, candidate: &str) -> bool {
        match self.check(candidate).await {
            Ok(()) => true,
            Err(e) => {
                log_rejection(candidate, &e);
                false
            }
        }
    }

    /// Checks `candidate`, returning the reason it is unsafe.
    ///
    /// Blank input is `Ok`.
    pub async fn check(&self, candidate: &str) -> Result<(), EndpointError> {
        if candidate.trim().is_empty() {
            return Ok(());
        }
        self.guard(candidate).await.map(|_| ())
    }

    /// Validates an endpoint right before delivery and returns the parsed URL
    ///
    /// Unlike [`check`](Self::check), blank input is an error: there is
    /// nothing to deliver to.
    pub async fn guard(&self, candidate: &str) -> Result<Url, EndpointError> {
        if candidate.trim().is_empty() {
            return Err(EndpointError::Blank);
        }

        let url = Url::parse(candidate)?;

        if !is_allowed_scheme(url.scheme()) {
            return Err(EndpointError::Scheme(url.scheme().to_string()));
        }
        if !has_authority(candidate, url.scheme()) {
            return Err(EndpointError::MissingAuthority);
        }

        let port = effective_port(&url).ok_or(EndpointError::MissingPort)?;
        if is_bad_port(port) {
            return Err(EndpointError::Port(port));
        }

        self.check_host(url.host()).await?;
        Ok(url)
    }

    async fn check_host(&self, host: Option<Host<&str>>) -> Result<(), EndpointError> {
        let blocklist = self.blocklist.load();

        let (name, addrs) = match host {
            None => return Err(EndpointError::BlankHost),
            Some(Host::Domain(domain)) => {
                let domain = normalize_host(domain);
                if domain.is_empty() {
                    return Err(EndpointError::BlankHost);
                }
                if blocklist.blocks_host(&domain) {
                    return Err(EndpointError::BlockedHost(domain));
                }
                let addrs = self.resolve(&domain).await?;
                (domain, addrs)
            }
            Some(Host::Ipv4(v4)) => {
                let name = v4.to_string();
                if blocklist.blocks_host(&name) {
                    return Err(EndpointError::BlockedHost(name));
                }
                (name, vec![IpAddr::V4(v4)])
            }
            Some(Host::Ipv6(v6)) => {
                let name = v6.to_string();
                if blocklist.blocks_host(&name) {
                    return Err(EndpointError::BlockedHost(name));
                }
                (name, vec![IpAddr::V6(v6)])
            }
        };

        for addr in addrs {
            if let Some(class) = classify_address(addr, &blocklist) {
                return Err(EndpointError::BlockedAddress {
                    host: name,
                    addr,
                    class,
                });
            }
        }

        debug!("Host {} passed address checks", name);
        Ok(())
    }

    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, EndpointError> {
        let lookup = tokio::time::timeout(self.config.resolve_timeout, self.resolver.resolve(host));

        match lookup.await {
            Ok(Ok(addrs)) if !addrs.is_empty() => Ok(addrs),
            Ok(Ok(_)) => Err(EndpointError::Resolution {
                host: host.to_string(),
                reason: "no addresses".to_string(),
            }),
            Ok(Err(e)) => Err(EndpointError::Resolution {
                host: host.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(_) => Err(EndpointError::Resolution {
                host: host.to_string(),
                reason: format!("timed out after {:?}", self.config.resolve_timeout),
            }),
        }
    }

    /// Checks one endpoint and describes the outcome
    pub async fn report(&self, candidate: &str) -> EndpointReport {
        let start = Instant::now();
        let outcome = self.check(candidate).await;

        if let Err(ref e) = outcome {
            log_rejection(candidate, e);
        }

        EndpointReport {
            url: candidate.to_string(),
            safe: outcome.is_ok(),
            reason: outcome.err().map(|e| e.to_string()),
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Checks endpoints listed in a file
    ///
    /// The input holds one URL per line; empty lines and lines starting with
    /// `#` are skipped. URLs are checked `concurrent_checks` at a time in
    /// chunks of `chunk_size`, and each chunk's reports are written before
    /// the next chunk is read: JSON lines to `output_file`, or pretty JSON
    /// to stdout.
    ///
    /// Returns the number of unsafe endpoints found.
    pub async fn process_batch(
        &self,
        input_file: &Path,
        output_file: Option<&PathBuf>,
        chunk_size: usize,
        concurrent_checks: usize,
    ) -> Result<usize> {
        let mut output_writer = if let Some(path) = output_file {
            Some(
                OpenOptions::new()
                    .create(true)
                    .truncate(true)
                    .write(true)
                    .open(path)
                    .await
                    .context("Failed to create output file")?,
            )
        } else {
            None
        };

        let file = File::open(input_file)
            .await
            .context(format!("Failed to open endpoint file: {:?}", input_file))?;

        let chunk_size = chunk_size.max(1);
        let mut reader = BufReader::with_capacity(64 * 1024, file);
        let mut current_chunk = Vec::with_capacity(chunk_size);
        let mut line = String::new();
        let mut processed = 0;
        let mut rejected = 0;

        info!("Checking endpoints from {}", input_file.display());

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;
            let at_eof = bytes_read == 0;

            let candidate = line.trim();
            if !candidate.is_empty() && !candidate.starts_with('#') {
                current_chunk.push(candidate.to_string());
            }

            if current_chunk.len() >= chunk_size || (at_eof && !current_chunk.is_empty()) {
                processed += current_chunk.len();
                debug!("Checking chunk of {} endpoints ({} total so far)", current_chunk.len(), processed);

                let reports = self.process_chunk(&current_chunk, concurrent_checks).await;
                for report in reports {
                    if !report.safe {
                        rejected += 1;
                    }
                    let sanitized = sanitize_report(&report);

                    if let Some(ref mut writer) = output_writer {
                        let json_line = format!("{}\n", serde_json::to_string(&sanitized)?);
                        writer.write_all(json_line.as_bytes()).await?;
                    } else {
                        println!("{}", serde_json::to_string_pretty(&sanitized)?);
                    }
                }

                if let Some(ref mut writer) = output_writer {
                    writer.flush().await?;
                }
                current_chunk.clear();
            }

            if at_eof {
                break;
            }
        }

        info!("Checked {} endpoints, {} rejected", processed, rejected);
        Ok(rejected)
    }

    /// Checks a chunk of endpoints concurrently. Reports come back in input order.
    async fn process_chunk(&self, candidates: &[String], concurrent_checks: usize) -> Vec<EndpointReport> {
        use futures::{stream, StreamExt};

        stream::iter(candidates)
            .map(|candidate| self.report(candidate))
            .buffered(concurrent_checks.max(1))
            .collect()
            .await
    }
}

fn log_rejection(candidate: &str, err: &EndpointError) {
    warn!(kind = err.kind(), url = %redact_url(candidate), reason = %err, "Webhook endpoint rejected");
}

/// True if the scheme is followed by a literal `//`.
///
/// The URL parser repairs `http:example.com` and `http:\\example.com` into
/// `http://example.com/`; such input names no host as written and is refused.
fn has_authority(candidate: &str, scheme: &str) -> bool {
    candidate
        .trim_start_matches(|c: char| c <= ' ')
        .get(scheme.len() + 1..)
        .map_or(false, |rest| rest.starts_with("//"))
}
