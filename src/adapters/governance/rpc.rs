//! Governor Reader - Raw eth_call Queries
//!
//! Implements the `GovernorOracle` port against a deployed governor:
//! `state(uint256)` for the native state index and a dialect-specific
//! getter for the voting end (a word of `proposals(uint256)` for Bravo
//! and Nouns-style governors, `proposalDeadline(uint256)` for OZ).
//! Calls are bounded by a semaphore and retried with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256, keccak256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::RpcError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};

use crate::config::ChainConfig;
use crate::domain::dialect::GovernanceDialect;
use crate::domain::types::{AccountId, NativeProposalId};
use crate::ports::governor::GovernorOracle;

use super::provider::ChainProvider;

/// Base delay between retries (exponential backoff).
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Which getter yields the voting end, and at which return word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineCall {
    pub signature: &'static str,
    pub word: usize,
}

impl DeadlineCall {
    /// The getter a dialect's governor exposes.
    pub fn for_dialect(dialect: GovernanceDialect) -> Self {
        let (signature, word) = dialect.default_deadline_call();
        Self { signature, word }
    }
}

/// JSON-RPC error code for an execution revert (EIP-1474).
const EXECUTION_REVERTED: i64 = 3;

/// Whether an error response is the contract reverting rather than the
/// node failing. Rate limits, missing headers and other server errors are
/// transient and retried.
fn is_execution_revert(code: i64, message: &str) -> bool {
    code == EXECUTION_REVERTED || message.to_ascii_lowercase().contains("revert")
}

/// Outcome of one eth_call.
enum CallOutcome {
    Data(Bytes),
    /// The governor reverted (e.g. `state()` on an unknown id).
    Reverted,
}

/// Reads one governor contract over JSON-RPC.
pub struct RpcGovernor {
    provider: Arc<ChainProvider>,
    governor: Address,
    deadline_call: DeadlineCall,
    semaphore: Arc<Semaphore>,
    call_timeout: Duration,
    max_retries: u32,
}

impl RpcGovernor {
    pub fn new(
        provider: Arc<ChainProvider>,
        governor: Address,
        deadline_call: DeadlineCall,
        semaphore: Arc<Semaphore>,
        config: &ChainConfig,
    ) -> Self {
        Self {
            provider,
            governor,
            deadline_call,
            semaphore,
            call_timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
        }
    }

    /// Execute `signature(native_id)` with retries on transport errors.
    async fn call_with_id(&self, signature: &str, native_id: NativeProposalId) -> Result<CallOutcome> {
        let mut calldata = Vec::with_capacity(36);
        calldata.extend_from_slice(&keccak256(signature.as_bytes())[..4]);
        calldata.extend_from_slice(&native_id.to_be_bytes::<32>());
        let tx = TransactionRequest::default()
            .to(self.governor)
            .input(Bytes::from(calldata).into());

        let _permit = self
            .semaphore
            .acquire()
            .await
            .context("Semaphore closed")?;

        let inner = self.provider.inner();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis(), "Retrying governor call");
                sleep(delay).await;
            }

            match timeout(self.call_timeout, inner.call(&tx).into_future()).await {
                Ok(Ok(data)) => return Ok(CallOutcome::Data(data)),
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    if is_execution_revert(payload.code, &payload.message) {
                        debug!(signature, code = payload.code, message = %payload.message, "Governor reverted");
                        return Ok(CallOutcome::Reverted);
                    }
                    warn!(signature, code = payload.code, message = %payload.message, attempt, "Governor call rejected by node");
                    last_error = Some(anyhow::anyhow!(
                        "{signature} failed with RPC error {}: {}",
                        payload.code,
                        payload.message
                    ));
                }
                Ok(Err(e)) => {
                    warn!(signature, error = %e, attempt, "Governor call failed");
                    last_error = Some(anyhow::Error::from(e));
                }
                Err(_) => {
                    warn!(signature, attempt, "Governor call timed out");
                    last_error = Some(anyhow::anyhow!("{signature} timed out"));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
    }

    fn word(data: &[u8], index: usize) -> Result<U256> {
        let start = index * 32;
        let slice = data
            .get(start..start + 32)
            .with_context(|| format!("Return data too short for word {index} ({} bytes)", data.len()))?;
        Ok(U256::from_be_slice(slice))
    }
}

#[async_trait]
impl GovernorOracle for RpcGovernor {
    #[instrument(skip(self), fields(governor = %self.governor))]
    async fn state_index(&self, native_id: NativeProposalId) -> Result<Option<u8>> {
        match self.call_with_id("state(uint256)", native_id).await? {
            CallOutcome::Reverted => Ok(None),
            CallOutcome::Data(data) => {
                let raw = Self::word(&data, 0)?;
                let index = u8::try_from(raw).context("State index out of range")?;
                Ok(Some(index))
            }
        }
    }

    #[instrument(skip(self), fields(governor = %self.governor))]
    async fn voting_end(&self, native_id: NativeProposalId) -> Result<u64> {
        let call = self.deadline_call;
        match self.call_with_id(call.signature, native_id).await? {
            CallOutcome::Reverted => anyhow::bail!("{} reverted for {native_id}", call.signature),
            CallOutcome::Data(data) => {
                let raw = Self::word(&data, call.word)?;
                u64::try_from(raw).context("Voting end out of range")
            }
        }
    }

    async fn block_number(&self) -> Result<u64> {
        let inner = self.provider.inner();
        timeout(self.call_timeout, inner.get_block_number())
            .await
            .context("Block number query timed out")?
            .context("Block number query failed")
    }

    fn governor_address(&self) -> AccountId {
        self.governor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_extraction() {
        let mut data = vec![0u8; 64];
        data[63] = 7;
        assert_eq!(RpcGovernor::word(&data, 1).unwrap(), U256::from(7));
        assert!(RpcGovernor::word(&data, 2).is_err());
    }

    #[test]
    fn test_only_execution_reverts_count_as_revert() {
        assert!(is_execution_revert(3, "execution reverted: Governor: unknown proposal id"));
        assert!(is_execution_revert(-32000, "execution reverted"));
        assert!(is_execution_revert(-32015, "VM Exception while processing transaction: revert"));

        assert!(!is_execution_revert(-32005, "rate limited"));
        assert!(!is_execution_revert(-32000, "header not found"));
        assert!(!is_execution_revert(-32603, "internal error"));
        assert!(!is_execution_revert(429, "Too Many Requests"));
    }
}
