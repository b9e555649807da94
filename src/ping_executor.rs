use std::io;
use std::net::IpAddr;
use std::time::Duration;

use log::{debug, warn};
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, Pinger, SurgeError};

use crate::dns_cache::DnsCache;
use crate::error::ConfigError;
use crate::ping::{ProbeOutcome, rtt_millis};

const PING_PAYLOAD: [u8; 56] = [0; 56];

/// Sends one echo request per call and reports what came back.
#[allow(async_fn_in_trait)]
pub trait Prober {
    /// Blocks for at most the prober's timeout.
    async fn probe(&mut self) -> ProbeOutcome;
}

/// Strips a `:port` suffix and anything that cannot appear in a DNS name.
fn clean_hostname(input: &str) -> Option<String> {
    let name = input.split_once(':').map_or(input, |(name, _port)| name);
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-'))
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Literal addresses are used as-is; names go through the system resolver.
async fn resolve_target(target: &str) -> Result<IpAddr, String> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }

    let name = clean_hostname(target).ok_or_else(|| "not a valid host name".to_string())?;

    let mut addrs = tokio::net::lookup_host(format!("{name}:0"))
        .await
        .map_err(|e| e.to_string())?;
    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| "no addresses found".to_string())
}

fn new_client(ip: IpAddr) -> io::Result<Client> {
    match ip {
        IpAddr::V4(_) => Client::new(&Config::default()),
        IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build()),
    }
}

/// ICMP echo prober for a single host.
///
/// Host names are resolved once at startup and re-resolved whenever the
/// cached address expires.
pub struct IcmpProber {
    host: String,
    literal_ip: bool,
    timeout: Duration,
    identifier: PingIdentifier,
    sequence: u16,
    dns_cache: DnsCache,
    target_ip: IpAddr,
    client: Client,
    pinger: Pinger,
}

impl IcmpProber {
    /// Resolves `host` and opens the ICMP socket. Both failures are
    /// configuration errors since nothing can be probed without them.
    pub async fn connect(host: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let target_ip = resolve_target(host)
            .await
            .map_err(|reason| ConfigError::InvalidHost {
                host: host.to_string(),
                reason,
            })?;
        let client = new_client(target_ip).map_err(ConfigError::Socket)?;

        let identifier = PingIdentifier(std::process::id() as u16);
        let mut pinger = client.pinger(target_ip, identifier).await;
        pinger.timeout(timeout);

        let mut dns_cache = DnsCache::default();
        dns_cache.insert(target_ip);
        debug!("{host} resolved to {target_ip}");

        Ok(Self {
            host: host.to_string(),
            literal_ip: host.parse::<IpAddr>().is_ok(),
            timeout,
            identifier,
            sequence: 0,
            dns_cache,
            target_ip,
            client,
            pinger,
        })
    }

    pub fn target_ip(&self) -> IpAddr {
        self.target_ip
    }

    async fn current_target(&mut self) -> Result<IpAddr, String> {
        if self.literal_ip {
            return Ok(self.target_ip);
        }
        if let Some(ip) = self.dns_cache.get_valid_ip() {
            return Ok(ip);
        }

        self.dns_cache.clear();
        let ip = resolve_target(&self.host).await?;
        self.dns_cache.insert(ip);
        Ok(ip)
    }

    async fn retarget(&mut self, ip: IpAddr) -> io::Result<()> {
        if ip.is_ipv4() != self.target_ip.is_ipv4() {
            self.client = new_client(ip)?;
        }
        self.pinger = self.client.pinger(ip, self.identifier).await;
        self.pinger.timeout(self.timeout);
        debug!("{} now resolves to {ip} (was {})", self.host, self.target_ip);
        self.target_ip = ip;
        Ok(())
    }
}

impl Prober for IcmpProber {
    async fn probe(&mut self) -> ProbeOutcome {
        let ip = match self.current_target().await {
            Ok(ip) => ip,
            Err(reason) => {
                warn!("{} name resolution failed: {reason}", self.host);
                return ProbeOutcome::send_error(format!("name resolution failed: {reason}"));
            }
        };
        if ip != self.target_ip {
            if let Err(e) = self.retarget(ip).await {
                warn!("{} cannot open ICMP socket for {ip}: {e}", self.host);
                return ProbeOutcome::send_error(e.to_string());
            }
        }

        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        let result =
            tokio::time::timeout(self.timeout, self.pinger.ping(PingSequence(seq), &PING_PAYLOAD)).await;
        let outcome = match result {
            Ok(Ok((_, rtt))) => ProbeOutcome::success(rtt),
            Ok(Err(SurgeError::Timeout { .. })) | Err(_) => ProbeOutcome::Timeout,
            Ok(Err(e)) => ProbeOutcome::send_error(e.to_string()),
        };

        if let Some(rtt) = outcome.rtt() {
            debug!("echo reply from {ip} seq={seq} after {:.3} ms", rtt_millis(rtt));
        }
        outcome
    }
}
