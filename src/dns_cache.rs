use std::net::IpAddr;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Last resolved address of the monitored host.
#[derive(Debug, Clone)]
pub struct DnsCacheEntry {
    ip_address: IpAddr,
    cached_at: Instant,
    ttl: Duration,
}

impl DnsCacheEntry {
    pub fn new(ip_address: IpAddr, ttl: Duration) -> Self {
        Self::cached_at(ip_address, ttl, Instant::now())
    }

    fn cached_at(ip_address: IpAddr, ttl: Duration, cached_at: Instant) -> Self {
        Self {
            ip_address,
            cached_at,
            ttl,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) > self.ttl
    }

    pub fn ip_address(&self) -> IpAddr {
        self.ip_address
    }
}

/// Resolution cache for the monitored host.
#[derive(Debug)]
pub struct DnsCache {
    ttl: Duration,
    entry: Option<DnsCacheEntry>,
}

impl DnsCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn insert(&mut self, ip_address: IpAddr) {
        self.entry = Some(DnsCacheEntry::new(ip_address, self.ttl));
    }

    pub fn get_valid_ip(&self) -> Option<IpAddr> {
        self.get_valid_ip_at(Instant::now())
    }

    fn get_valid_ip_at(&self, now: Instant) -> Option<IpAddr> {
        self.entry
            .as_ref()
            .filter(|entry| !entry.is_expired_at(now))
            .map(DnsCacheEntry::ip_address)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
