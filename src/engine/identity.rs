//! Rotating client identities (user agent and optional proxy)

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{IdentityConfig, RotationStrategy};
use crate::ScrapeError;

/// The client identity presented for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,

    /// Outbound proxy URL, when proxy support is enabled
    pub proxy: Option<String>,
}

/// Hands out identities by round-robin or uniform random choice
///
/// The only mutable state is a pair of atomic rotation indices, so one pool
/// can be shared by concurrent sessions without a lock.
#[derive(Debug)]
pub struct IdentityPool {
    rotate: bool,
    strategy: RotationStrategy,
    default_user_agent: String,
    user_agents: Vec<String>,
    proxies: Vec<String>,
    agent_index: AtomicUsize,
    proxy_index: AtomicUsize,
}

impl IdentityPool {
    pub fn from_config(config: &IdentityConfig) -> Self {
        let proxies = if config.proxies_enabled {
            config.proxies.clone()
        } else {
            Vec::new()
        };
        Self {
            rotate: config.rotate,
            strategy: config.strategy,
            default_user_agent: config.default_user_agent.clone(),
            user_agents: config.user_agents.clone(),
            proxies,
            agent_index: AtomicUsize::new(0),
            proxy_index: AtomicUsize::new(0),
        }
    }

    /// A pool that always presents the same user agent, without proxies
    pub fn fixed(user_agent: &str) -> Self {
        Self {
            rotate: false,
            strategy: RotationStrategy::RoundRobin,
            default_user_agent: user_agent.to_string(),
            user_agents: Vec::new(),
            proxies: Vec::new(),
            agent_index: AtomicUsize::new(0),
            proxy_index: AtomicUsize::new(0),
        }
    }

    /// Proxy URLs this pool may hand out
    pub fn proxies(&self) -> &[String] {
        &self.proxies
    }

    /// Picks the identity for the next request
    ///
    /// # Returns
    ///
    /// * `Ok(Identity)` - The next user agent (and proxy, if enabled)
    /// * `Err(ScrapeError::NoIdentitiesConfigured)` - Rotation is enabled but
    ///   the user-agent list is empty
    pub fn next_identity(&self) -> Result<Identity, ScrapeError> {
        let user_agent = if self.rotate {
            if self.user_agents.is_empty() {
                return Err(ScrapeError::NoIdentitiesConfigured);
            }
            let index = self.pick(&self.agent_index, self.user_agents.len());
            self.user_agents[index].clone()
        } else {
            self.default_user_agent.clone()
        };

        let proxy = if self.proxies.is_empty() {
            None
        } else {
            let index = self.pick(&self.proxy_index, self.proxies.len());
            Some(self.proxies[index].clone())
        };

        Ok(Identity { user_agent, proxy })
    }

    fn pick(&self, counter: &AtomicUsize, len: usize) -> usize {
        match self.strategy {
            RotationStrategy::RoundRobin => counter.fetch_add(1, Ordering::Relaxed) % len,
            RotationStrategy::Random => {
                let index = (rand::random::<f64>() * len as f64) as usize;
                index.min(len - 1)
            }
        }
    }
}
