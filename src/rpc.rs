//! RPC endpoint management with health tracking and automatic failover.
//!
//! Every chain carries an ordered list of free public endpoints. Calls go
//! to the healthy endpoint with the lowest latency EMA; failures rotate to
//! the next-best endpoint up to the endpoint count. A chain whose
//! endpoints are all quarantined gets its quarantine cleared and runs
//! degraded on the first endpoint rather than failing the scan.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionRequest;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::chains::{ChainConfig, ChainId, CHAINS};

/// Per-call umbrella timeout.
const CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// An endpoint is quarantined after this many failures...
const QUARANTINE_FAILURES: u32 = 3;
/// ...if the last failure is within this window.
const QUARANTINE_WINDOW: Duration = Duration::from_secs(60);

/// EMA weight on the newest latency sample.
const LATENCY_EMA_ALPHA: f64 = 0.2;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("all {attempts} RPC endpoints failed for {chain}: {last_error}")]
    AllEndpointsFailed {
        chain: &'static str,
        attempts: usize,
        last_error: String,
    },
    #[error("no RPC endpoints configured for {chain}")]
    NoEndpoints { chain: &'static str },
}

/// Health record for one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointHealth {
    pub failures: u32,
    pub last_failure: Option<Instant>,
    pub last_success: Option<Instant>,
    pub latency_ema_ms: f64,
}

impl EndpointHealth {
    fn new() -> Self {
        Self {
            failures: 0,
            last_failure: None,
            last_success: None,
            latency_ema_ms: 0.0,
        }
    }

    pub fn record_success(&mut self, latency_ms: f64) {
        self.last_success = Some(Instant::now());
        self.failures = 0;
        if self.latency_ema_ms == 0.0 {
            self.latency_ema_ms = latency_ms;
        } else {
            self.latency_ema_ms =
                (1.0 - LATENCY_EMA_ALPHA) * self.latency_ema_ms + LATENCY_EMA_ALPHA * latency_ms;
        }
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
        self.last_failure = Some(Instant::now());
    }

    pub fn is_healthy(&self) -> bool {
        if self.failures >= QUARANTINE_FAILURES {
            if let Some(at) = self.last_failure {
                if at.elapsed() < QUARANTINE_WINDOW {
                    return false;
                }
            }
        }
        true
    }
}

struct EndpointSlot {
    url: &'static str,
    provider: RootProvider,
    health: Mutex<EndpointHealth>,
}

/// Process-wide RPC connection manager.
pub struct RpcManager {
    slots: HashMap<ChainId, Vec<EndpointSlot>>,
}

impl RpcManager {
    /// Build providers for every configured endpoint. Endpoints whose URL
    /// fails to parse are skipped with a warning.
    pub fn new() -> Self {
        let mut slots: HashMap<ChainId, Vec<EndpointSlot>> = HashMap::new();

        for chain in CHAINS {
            let mut chain_slots = Vec::with_capacity(chain.rpc_endpoints.len());
            for url in chain.rpc_endpoints {
                match url.parse() {
                    Ok(parsed) => chain_slots.push(EndpointSlot {
                        url,
                        provider: RootProvider::new_http(parsed),
                        health: Mutex::new(EndpointHealth::new()),
                    }),
                    Err(e) => {
                        warn!("Skipping malformed RPC url {url} for {}: {e}", chain.name);
                    }
                }
            }
            slots.insert(chain.chain_id, chain_slots);
        }

        Self { slots }
    }

    fn chain_config(chain_id: ChainId) -> &'static ChainConfig {
        crate::config::chains::chain(chain_id)
    }

    /// Index of the healthy endpoint with the lowest latency EMA. When no
    /// endpoint is healthy, clears the quarantine for the whole chain and
    /// returns the first endpoint (degraded mode).
    fn best_index(&self, chain_id: ChainId) -> Option<usize> {
        let slots = self.slots.get(&chain_id)?;
        if slots.is_empty() {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, slot) in slots.iter().enumerate() {
            let health = slot.health.lock().expect("health lock poisoned");
            if !health.is_healthy() {
                continue;
            }
            // Unmeasured endpoints sort last so proven-fast ones win
            let latency = if health.latency_ema_ms > 0.0 {
                health.latency_ema_ms
            } else {
                f64::INFINITY
            };
            if best.map(|(_, b)| latency < b).unwrap_or(true) {
                best = Some((i, latency));
            }
        }

        match best {
            Some((i, _)) => Some(i),
            None => {
                // Degraded mode: everything is quarantined. Reset and retry
                // from the top instead of failing the scan.
                warn!(
                    "All RPC endpoints unhealthy for {}; clearing quarantine",
                    Self::chain_config(chain_id).name
                );
                for slot in slots {
                    slot.health.lock().expect("health lock poisoned").failures = 0;
                }
                Some(0)
            }
        }
    }

    /// Provider bound to the currently-best endpoint. Callers that want
    /// failover should prefer [`call_raw`]/[`gas_price`].
    pub fn provider(&self, chain_id: ChainId) -> Result<&RootProvider, RpcError> {
        let index = self.best_index(chain_id).ok_or(RpcError::NoEndpoints {
            chain: Self::chain_config(chain_id).name,
        })?;
        Ok(&self.slots[&chain_id][index].provider)
    }

    /// `eth_call` with failover. Tries up to the number of configured
    /// endpoints, recording latency and failures against each.
    pub async fn call_raw(
        &self,
        chain_id: ChainId,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, RpcError> {
        let chain_name = Self::chain_config(chain_id).name;
        let slots = self.slots.get(&chain_id).filter(|s| !s.is_empty()).ok_or(
            RpcError::NoEndpoints { chain: chain_name },
        )?;

        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);

        let mut last_error = String::new();
        for _ in 0..slots.len() {
            let Some(index) = self.best_index(chain_id) else {
                break;
            };
            let slot = &slots[index];

            let started = Instant::now();
            let result =
                tokio::time::timeout(CALL_TIMEOUT, slot.provider.call(tx.clone())).await;

            match result {
                Ok(Ok(bytes)) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    slot.health
                        .lock()
                        .expect("health lock poisoned")
                        .record_success(latency_ms);
                    return Ok(bytes);
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    debug!("eth_call failed on {} ({}): {}", chain_name, slot.url, last_error);
                    slot.health
                        .lock()
                        .expect("health lock poisoned")
                        .record_failure();
                }
                Err(_) => {
                    last_error = format!("timeout after {:?}", CALL_TIMEOUT);
                    debug!("eth_call timed out on {} ({})", chain_name, slot.url);
                    slot.health
                        .lock()
                        .expect("health lock poisoned")
                        .record_failure();
                }
            }
        }

        Err(RpcError::AllEndpointsFailed {
            chain: chain_name,
            attempts: slots.len(),
            last_error,
        })
    }

    /// Current gas price in wei, with the same failover loop.
    pub async fn gas_price(&self, chain_id: ChainId) -> Result<u128, RpcError> {
        let chain_name = Self::chain_config(chain_id).name;
        let slots = self.slots.get(&chain_id).filter(|s| !s.is_empty()).ok_or(
            RpcError::NoEndpoints { chain: chain_name },
        )?;

        let mut last_error = String::new();
        for _ in 0..slots.len() {
            let Some(index) = self.best_index(chain_id) else {
                break;
            };
            let slot = &slots[index];

            let started = Instant::now();
            match tokio::time::timeout(CALL_TIMEOUT, slot.provider.get_gas_price()).await {
                Ok(Ok(price)) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    slot.health
                        .lock()
                        .expect("health lock poisoned")
                        .record_success(latency_ms);
                    return Ok(price);
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    slot.health
                        .lock()
                        .expect("health lock poisoned")
                        .record_failure();
                }
                Err(_) => {
                    last_error = format!("timeout after {:?}", CALL_TIMEOUT);
                    slot.health
                        .lock()
                        .expect("health lock poisoned")
                        .record_failure();
                }
            }
        }

        Err(RpcError::AllEndpointsFailed {
            chain: chain_name,
            attempts: slots.len(),
            last_error,
        })
    }

    #[cfg(test)]
    fn health_of(&self, chain_id: ChainId, index: usize) -> EndpointHealth {
        self.slots[&chain_id][index]
            .health
            .lock()
            .expect("health lock poisoned")
            .clone()
    }

    #[cfg(test)]
    fn fail_endpoint(&self, chain_id: ChainId, index: usize, times: u32) {
        let mut health = self.slots[&chain_id][index]
            .health
            .lock()
            .expect("health lock poisoned");
        for _ in 0..times {
            health.record_failure();
        }
    }
}

impl Default for RpcManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_until_quarantine_threshold() {
        let mut health = EndpointHealth::new();
        assert!(health.is_healthy());
        health.record_failure();
        health.record_failure();
        assert!(health.is_healthy());
        health.record_failure();
        assert!(!health.is_healthy());
    }

    #[test]
    fn success_resets_failures_and_tracks_ema() {
        let mut health = EndpointHealth::new();
        health.record_failure();
        health.record_failure();
        health.record_failure();
        assert!(!health.is_healthy());

        health.record_success(100.0);
        assert!(health.is_healthy());
        assert_eq!(health.failures, 0);
        assert_eq!(health.latency_ema_ms, 100.0);

        health.record_success(200.0);
        // 0.8 * 100 + 0.2 * 200
        assert!((health.latency_ema_ms - 120.0).abs() < 1e-9);
    }

    #[test]
    fn failover_prefers_next_endpoint_after_quarantine() {
        let manager = RpcManager::new();
        let chain = ChainId::Ethereum;

        // Endpoint 0 quarantined -> selection moves off it
        manager.fail_endpoint(chain, 0, 3);
        let best = manager.best_index(chain).unwrap();
        assert_ne!(best, 0);
        assert!(manager.health_of(chain, 0).failures >= 3);
    }

    #[test]
    fn all_unhealthy_resets_to_first() {
        let manager = RpcManager::new();
        let chain = ChainId::Kava; // two endpoints

        manager.fail_endpoint(chain, 0, 3);
        manager.fail_endpoint(chain, 1, 3);

        // Degraded mode: quarantine cleared, first endpoint returned
        assert_eq!(manager.best_index(chain), Some(0));
        assert_eq!(manager.health_of(chain, 0).failures, 0);
        assert_eq!(manager.health_of(chain, 1).failures, 0);
    }

    #[test]
    fn lowest_latency_wins() {
        let manager = RpcManager::new();
        let chain = ChainId::Ethereum;

        manager.slots[&chain][2]
            .health
            .lock()
            .unwrap()
            .record_success(50.0);
        manager.slots[&chain][1]
            .health
            .lock()
            .unwrap()
            .record_success(10.0);

        assert_eq!(manager.best_index(chain), Some(1));
    }
}
