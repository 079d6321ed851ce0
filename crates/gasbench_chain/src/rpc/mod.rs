//! # JSON-RPC Chain Client
//!
//! [`ChainQuery`] over HTTP JSON-RPC 2.0 (`eth_call`, `eth_blockNumber`,
//! `eth_getLogs`).
//!
//! ## Failure Classification
//!
//! | Condition                                   | Error                         |
//! |---------------------------------------------|-------------------------------|
//! | connect failure, timeout, HTTP 429 / 5xx    | `Transient`                   |
//! | rpc code -32005 / -32603, "rate limit"      | `Transient`                   |
//! | `eth_getLogs` result cap on a single block  | `Fatal`                       |
//! | execution reverted on `ownerOf`             | `TokenNotFound`               |
//! | execution reverted anywhere else            | `Fatal`                       |
//! | other HTTP 4xx, unknown method              | `Fatal`                       |
//! | undecodable payload                         | `Malformed`                   |
//!
//! ## Log Pagination
//!
//! `eth_getLogs` walks `[from, to]` in windows of `log_page_size` blocks.
//! When a provider refuses a window for returning too many results, the
//! window is halved and the same range re-fetched; the smaller window is
//! kept for the rest of the walk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{ChainQuery, TokenId};
use crate::contracts::{self, Transfer};
use crate::error::{ChainError, ChainResult};
use crate::events::{EventParser, TransferEvent};

/// JSON-RPC connection configuration.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// HTTP(S) endpoint, including any API key path segment.
    pub rpc_url: String,
    /// Collection contract to query.
    pub contract_address: Address,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Block window per `eth_getLogs` page.
    pub log_page_size: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: Address::ZERO,
            request_timeout: Duration::from_secs(30),
            log_page_size: 50_000,
        }
    }
}

impl RpcConfig {
    /// Creates config for a local Anvil / Hardhat node.
    #[must_use]
    pub fn local(contract_address: Address) -> Self {
        Self {
            contract_address,
            ..Default::default()
        }
    }

    /// Sets a custom endpoint URL.
    #[must_use]
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// Sets the collection contract.
    #[must_use]
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = address;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the `eth_getLogs` block window. Zero is clamped to one.
    #[must_use]
    pub fn with_log_page_size(mut self, blocks: u64) -> Self {
        self.log_page_size = blocks.max(1);
        self
    }
}

/// JSON-RPC request envelope.
#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response envelope.
#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// One entry of an `eth_getLogs` result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    topics: Vec<B256>,
    block_number: Option<String>,
    log_index: Option<String>,
    #[serde(default)]
    removed: bool,
}

/// How an RPC-level error should be surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Failure {
    Reverted,
    Transient,
    /// The provider caps results per query; a smaller range may succeed.
    TooManyResults,
    Fatal,
    Malformed,
}

/// Phrases providers use when an `eth_getLogs` range yields too many logs.
const RESULT_CAP_PHRASES: [&str; 4] = [
    "query returned more than",
    "response size exceeded",
    "block range",
    "too many results",
];

/// Phrases of throttling and overload errors.
const TRANSIENT_PHRASES: [&str; 5] = [
    "rate limit",
    "limit exceeded",
    "too many requests",
    "timeout",
    "timed out",
];

/// Buckets a JSON-RPC error object by code and message.
fn classify(code: i64, message: &str) -> Failure {
    let lower = message.to_ascii_lowercase();
    if code == 3 || lower.contains("revert") {
        Failure::Reverted
    } else if RESULT_CAP_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        Failure::TooManyResults
    } else if code == -32005 || code == -32603 || TRANSIENT_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        Failure::Transient
    } else {
        Failure::Fatal
    }
}

/// Parses a `0x`-prefixed hex quantity.
fn parse_quantity(field: &str, raw: &str) -> ChainResult<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).map_err(|e| ChainError::Malformed(format!("{field} {raw:?}: {e}")))
}

/// HTTP JSON-RPC client for one collection contract.
///
/// ## Usage
///
/// ```rust,ignore
/// let config = RpcConfig::default()
///     .with_rpc_url("https://mainnet.example/v3/KEY")
///     .with_contract_address(collection);
///
/// let client = RpcClient::new(config)?;
/// let supply = client.total_supply().await?;
/// ```
#[derive(Debug)]
pub struct RpcClient {
    /// Configuration.
    config: RpcConfig,
    /// Pooled HTTP client carrying the request timeout.
    http: reqwest::Client,
    /// JSON-RPC request id counter.
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a new client. Does not touch the network.
    ///
    /// # Errors
    ///
    /// `Fatal` if the HTTP client cannot be constructed.
    pub fn new(config: RpcConfig) -> ChainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Fatal(format!("http client: {e}")))?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Sends one JSON-RPC request and returns its `result`.
    ///
    /// Reverts are reported as `Fatal` here; `owner_of` re-maps them.
    async fn request(&self, method: &str, params: Value) -> Result<Value, (Failure, String)> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    (Failure::Fatal, format!("{method}: {e}"))
                } else {
                    (Failure::Transient, format!("{method}: {e}"))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err((Failure::Transient, format!("{method}: http {status}")));
        }
        if !status.is_success() {
            return Err((Failure::Fatal, format!("{method}: http {status}")));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                (Failure::Transient, format!("{method}: {e}"))
            } else {
                (Failure::Fatal, format!("{method}: undecodable response: {e}"))
            }
        })?;

        if let Some(error) = body.error {
            let failure = classify(error.code, &error.message);
            return Err((failure, format!("{method}: {} (code {})", error.message, error.code)));
        }

        body.result
            .ok_or_else(|| (Failure::Fatal, format!("{method}: response without result")))
    }

    /// `eth_call` against the collection at `at_block`, or the latest block.
    async fn call(&self, calldata: Vec<u8>, at_block: Option<u64>) -> Result<Bytes, (Failure, String)> {
        let block = at_block.map_or_else(|| "latest".to_string(), |block| format!("{block:#x}"));
        let params = json!([
            { "to": self.config.contract_address, "data": Bytes::from(calldata) },
            block
        ]);
        let result = self.request("eth_call", params).await?;
        serde_json::from_value(result).map_err(|e| (Failure::Fatal, format!("eth_call result: {e}")))
    }

    /// Fetches one raw `eth_getLogs` page of Transfer logs.
    async fn transfer_page(&self, from_block: u64, to_block: u64) -> Result<Vec<RpcLog>, (Failure, String)> {
        let params = json!([{
            "address": self.config.contract_address,
            "fromBlock": format!("{from_block:#x}"),
            "toBlock": format!("{to_block:#x}"),
            "topics": [Transfer::SIGNATURE_HASH],
        }]);
        let result = self
            .request("eth_getLogs", params)
            .await
            .map_err(|(failure, message)| (failure, format!("{message} [blocks {from_block}..={to_block}]")))?;
        serde_json::from_value(result)
            .map_err(|e| (Failure::Malformed, format!("eth_getLogs [blocks {from_block}..={to_block}]: {e}")))
    }
}

/// Maps a classified failure to the public error type.
fn into_chain_error((failure, message): (Failure, String)) -> ChainError {
    match failure {
        Failure::Transient => ChainError::Transient(message),
        Failure::Reverted | Failure::TooManyResults | Failure::Fatal => ChainError::Fatal(message),
        Failure::Malformed => ChainError::Malformed(message),
    }
}

/// Turns raw logs into Transfer events, skipping reorged and foreign logs.
fn decode_logs(logs: Vec<RpcLog>) -> ChainResult<Vec<TransferEvent>> {
    let mut events = Vec::with_capacity(logs.len());
    for log in logs {
        if log.removed {
            continue;
        }
        let (Some(block), Some(index)) = (log.block_number.as_deref(), log.log_index.as_deref()) else {
            // Pending logs carry no position.
            continue;
        };
        let block_number = parse_quantity("blockNumber", block)?;
        let log_index = parse_quantity("logIndex", index)?;
        if let Some(event) = EventParser::parse_transfer(&log.topics, block_number, log_index) {
            events.push(event);
        }
    }
    events.sort_by_key(TransferEvent::position);
    Ok(events)
}

impl ChainQuery for RpcClient {
    async fn block_number(&self) -> ChainResult<u64> {
        let result = self
            .request("eth_blockNumber", json!([]))
            .await
            .map_err(into_chain_error)?;
        let raw = result
            .as_str()
            .ok_or_else(|| ChainError::Malformed(format!("eth_blockNumber: {result}")))?;
        parse_quantity("eth_blockNumber", raw)
    }

    async fn total_supply_at(&self, at_block: Option<u64>) -> ChainResult<u64> {
        let data = self
            .call(contracts::encode_total_supply(), at_block)
            .await
            .map_err(into_chain_error)?;
        contracts::decode_total_supply(&data)
    }

    async fn owner_of_at(&self, token_id: TokenId, at_block: Option<u64>) -> ChainResult<Address> {
        let data = match self.call(contracts::encode_owner_of(token_id), at_block).await {
            Ok(data) => data,
            Err((Failure::Reverted, _)) => return Err(ChainError::TokenNotFound(token_id)),
            Err(other) => return Err(into_chain_error(other)),
        };
        // Empty return data is how some nodes report a revert without reason.
        if data.is_empty() {
            return Err(ChainError::TokenNotFound(token_id));
        }
        let owner = contracts::decode_owner_of(&data)?;
        if owner == Address::ZERO {
            return Err(ChainError::TokenNotFound(token_id));
        }
        Ok(owner)
    }

    async fn transfer_events(&self, from_block: u64, to_block: Option<u64>) -> ChainResult<Vec<TransferEvent>> {
        let to_block = match to_block {
            Some(block) => block,
            None => self.block_number().await?,
        };

        let mut events = Vec::new();
        let mut window = self.config.log_page_size.max(1);
        let mut page_start = from_block;
        while page_start <= to_block {
            let page_end = page_start.saturating_add(window - 1).min(to_block);
            match self.transfer_page(page_start, page_end).await {
                Ok(logs) => {
                    let page = decode_logs(logs)?;
                    debug!(from = page_start, to = page_end, logs = page.len(), "fetched transfer page");
                    events.extend(page);
                    if page_end == to_block {
                        break;
                    }
                    page_start = page_end + 1;
                }
                Err((Failure::TooManyResults, message)) if page_end > page_start => {
                    window = (page_end - page_start + 1) / 2;
                    debug!(from = page_start, to = page_end, window, %message, "result cap hit, halving window");
                }
                Err(failure) => return Err(into_chain_error(failure)),
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let collection = Address::repeat_byte(0x03);
        let config = RpcConfig::local(collection)
            .with_rpc_url("https://mainnet.example/v3/key")
            .with_log_page_size(0);

        assert_eq!(config.contract_address, collection);
        assert!(config.rpc_url.starts_with("https://"));
        assert_eq!(config.log_page_size, 1);
    }

    #[test]
    fn test_classify_rpc_errors() {
        assert_eq!(classify(3, "execution reverted: ERC721: invalid token ID"), Failure::Reverted);
        assert_eq!(classify(-32000, "execution reverted"), Failure::Reverted);
        assert_eq!(classify(-32005, "query returned more than 10000 results"), Failure::TooManyResults);
        assert_eq!(classify(-32602, "Log response size exceeded."), Failure::TooManyResults);
        assert_eq!(classify(-32005, "project ID request rate exceeded"), Failure::Transient);
        assert_eq!(classify(-32000, "daily request count exceeded, request rate limited"), Failure::Transient);
        assert_eq!(classify(-32601, "the method eth_foo does not exist"), Failure::Fatal);
    }

    #[test]
    fn test_deterministic_limits_are_fatal() {
        assert_eq!(classify(-32000, "exceeds block gas limit"), Failure::Fatal);
        assert_eq!(classify(-32000, "gas required exceeds allowance"), Failure::Fatal);
        assert_eq!(classify(-32000, "max fee per gas less than block base fee"), Failure::Fatal);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("n", "0x1b4").unwrap(), 436);
        assert_eq!(parse_quantity("n", "0x0").unwrap(), 0);
        assert!(matches!(parse_quantity("n", "0xzz"), Err(ChainError::Malformed(_))));
    }

    #[test]
    fn test_decode_logs_orders_and_filters() {
        let transfer = |block: u64, index: u64, token_id: u64| TransferEvent {
            block_number: block,
            log_index: index,
            token_id,
            from: Address::ZERO,
            to: Address::repeat_byte(7),
        };
        let as_json = |event: &TransferEvent, removed: bool| {
            json!({
                "address": Address::repeat_byte(0x03),
                "topics": EventParser::encode_topics(event),
                "data": "0x",
                "blockNumber": format!("{:#x}", event.block_number),
                "logIndex": format!("{:#x}", event.log_index),
                "removed": removed,
            })
        };

        let late = transfer(20, 1, 2);
        let early = transfer(10, 0, 1);
        let reorged = transfer(15, 0, 3);
        let raw = json!([as_json(&late, false), as_json(&reorged, true), as_json(&early, false)]);

        let logs: Vec<RpcLog> = serde_json::from_value(raw).unwrap();
        let events = decode_logs(logs).unwrap();

        assert_eq!(events, vec![early, late]);
    }

    #[test]
    fn test_pending_logs_are_skipped() {
        let raw = json!([{ "topics": [], "data": "0x", "blockNumber": null, "logIndex": null }]);
        let logs: Vec<RpcLog> = serde_json::from_value(raw).unwrap();
        assert!(decode_logs(logs).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        let config = RpcConfig::default()
            .with_rpc_url("http://127.0.0.1:9")
            .with_request_timeout(Duration::from_millis(200));
        let client = RpcClient::new(config).unwrap();

        let err = client.total_supply().await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
