//! Multicall3 batching.
//!
//! Collates multiple view calls into a single `eth_call` round-trip via
//! the canonical aggregator deployed at the same address on every EVM
//! chain. Sub-calls run with `allowFailure: true`, so one dead pool never
//! poisons the rest of a batch; a failed sub-call simply yields `None`.

use alloy::primitives::{address, Address, Bytes};
use alloy::sol_types::SolCall;

use crate::config::chains::ChainId;
use crate::contracts::{Call3, IMulticall3};
use crate::rpc::{RpcError, RpcManager};

/// Canonical Multicall3 deployment, identical on all supported chains.
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// One encoded sub-call.
#[derive(Debug, Clone)]
pub struct Call {
    pub target: Address,
    pub allow_failure: bool,
    pub call_data: Bytes,
}

/// Execute a batch of view calls in one round-trip.
///
/// Returns one entry per input call, in order: `Some(return_data)` for
/// sub-calls that succeeded with non-empty output, `None` otherwise.
pub async fn aggregate3(
    rpc: &RpcManager,
    chain_id: ChainId,
    calls: &[Call],
) -> Result<Vec<Option<Bytes>>, RpcError> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let call3s: Vec<Call3> = calls
        .iter()
        .map(|c| Call3 {
            target: c.target,
            allowFailure: c.allow_failure,
            callData: c.call_data.clone(),
        })
        .collect();

    let calldata = IMulticall3::aggregate3Call { calls: call3s }.abi_encode();
    let raw = rpc
        .call_raw(chain_id, MULTICALL3_ADDRESS, calldata.into())
        .await?;

    let results = match IMulticall3::aggregate3Call::abi_decode_returns(&raw) {
        Ok(decoded) => decoded,
        Err(_) => {
            // A garbled aggregate response fails every sub-call, not the scan
            return Ok(vec![None; calls.len()]);
        }
    };

    let mut out = Vec::with_capacity(calls.len());
    for result in results {
        if result.success && !result.returnData.is_empty() {
            out.push(Some(result.returnData));
        } else {
            out.push(None);
        }
    }
    // Ragged responses pad with failures so callers can zip by index
    while out.len() < calls.len() {
        out.push(None);
    }

    Ok(out)
}
