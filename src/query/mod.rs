// src/query/mod.rs
//! Balance query operations executed through the failover layer.
//!
//! The poll loop is parameterized over one of these instead of carrying
//! separate demo and live implementations: the simulated query slots in
//! wherever a run must not touch live providers.

use crate::rpc::pool::EndpointHandle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tokio::time::sleep;

/// One logical query against an endpoint. The executor never interprets the
/// returned value, only the failure's message/status shape.
#[async_trait]
pub trait BalanceProbe: Send + Sync {
    async fn query(&self, handle: EndpointHandle) -> Result<u64>;
}

/// Live lamport balance lookup for a single address.
pub struct LiveBalanceQuery {
    address: Pubkey,
}

impl LiveBalanceQuery {
    pub fn new(address: Pubkey) -> Self {
        Self { address }
    }

    pub fn parse(address: &str) -> Result<Self> {
        let address = address
            .parse()
            .with_context(|| format!("'{}' is not a valid base58 address", address))?;
        Ok(Self::new(address))
    }
}

#[async_trait]
impl BalanceProbe for LiveBalanceQuery {
    async fn query(&self, handle: EndpointHandle) -> Result<u64> {
        let balance = handle
            .client
            .get_balance(&self.address)
            .await
            .with_context(|| format!("balance query failed on {}", handle.url))?;
        debug!("💰 {} holds {} lamports (via {})", self.address, balance, handle.url);
        Ok(balance)
    }
}

/// Simulated query for demo/paper runs: fixed latency, empty balance, never
/// leaves the process.
pub struct SimulatedBalanceQuery {
    latency: Duration,
}

impl SimulatedBalanceQuery {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl BalanceProbe for SimulatedBalanceQuery {
    async fn query(&self, handle: EndpointHandle) -> Result<u64> {
        sleep(self.latency).await;
        debug!("💰 simulated balance query (via {})", handle.url);
        Ok(0)
    }
}
