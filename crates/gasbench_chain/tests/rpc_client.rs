//! `RpcClient` against a minimal in-process JSON-RPC node.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::hex;
use gasbench_chain::{
    Address, ChainError, ChainQuery, EventParser, RetryPolicy, Retrying, RpcClient, RpcConfig, TransferEvent,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const ALICE: Address = Address::new([0xa1; 20]);
const BOB: Address = Address::new([0xb0; 20]);
const COLLECTION: Address = Address::new([0xc0; 20]);

type Handler = fn(&Value) -> (u16, Value);

/// Serves `handler` on a random local port; counts requests.
async fn serve(handler: Handler) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(respond(stream, handler));
        }
    });
    (addr, hits)
}

async fn respond(mut stream: TcpStream, handler: Handler) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let body_start = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..body_start]).to_ascii_lowercase();
    let length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map_or(0, |value| value.trim().parse().unwrap());
    while buf.len() < body_start + length {
        let n = stream.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
    }

    let request: Value = serde_json::from_slice(&buf[body_start..body_start + length]).unwrap();
    let (status, payload) = handler(&request);
    let mut envelope = json!({ "jsonrpc": "2.0", "id": request["id"].clone() });
    if let (Value::Object(envelope), Value::Object(fields)) = (&mut envelope, payload) {
        envelope.extend(fields);
    }
    let body = envelope.to_string();
    let response = format!(
        "HTTP/1.1 {status} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.shutdown().await.ok();
}

fn history() -> Vec<TransferEvent> {
    let event = |block_number, log_index, token_id, from, to| TransferEvent {
        block_number,
        log_index,
        token_id,
        from,
        to,
    };
    vec![
        event(1, 0, 1, Address::ZERO, ALICE),
        event(1, 1, 2, Address::ZERO, ALICE),
        event(1, 2, 3, Address::ZERO, ALICE),
        event(4, 0, 2, ALICE, BOB),
    ]
}

fn quantity(value: &Value) -> u64 {
    u64::from_str_radix(value.as_str().unwrap().trim_start_matches("0x"), 16).unwrap()
}

/// Owners after replaying `history()` up to the `eth_call` block tag.
fn owners_at(tag: &Value) -> BTreeMap<u64, Address> {
    let block = if tag == "latest" { u64::MAX } else { quantity(tag) };
    history()
        .into_iter()
        .filter(|e| e.block_number <= block)
        .map(|e| (e.token_id, e.to))
        .collect()
}

fn transfer_logs(from: u64, to: u64) -> Vec<Value> {
    history()
        .iter()
        .filter(|e| (from..=to).contains(&e.block_number))
        .map(|e| {
            json!({
                "address": COLLECTION,
                "topics": EventParser::encode_topics(e),
                "data": "0x",
                "blockNumber": format!("{:#x}", e.block_number),
                "logIndex": format!("{:#x}", e.log_index),
                "removed": false,
            })
        })
        .collect()
}

fn node(request: &Value) -> (u16, Value) {
    let params = &request["params"];
    match request["method"].as_str().unwrap() {
        "eth_blockNumber" => (200, json!({ "result": "0x5" })),
        "eth_call" => {
            let data = hex::decode(params[0]["data"].as_str().unwrap()).unwrap();
            let owners = owners_at(&params[1]);
            match &data[..4] {
                [0x18, 0x16, 0x0d, 0xdd] => (200, json!({ "result": format!("0x{:064x}", owners.len()) })),
                [0x63, 0x52, 0x21, 0x1e] => {
                    let token_id = u64::from_be_bytes(data[28..36].try_into().unwrap());
                    let Some(owner) = owners.get(&token_id) else {
                        return (
                            200,
                            json!({ "error": { "code": 3, "message": "execution reverted: ERC721: invalid token ID" } }),
                        );
                    };
                    (200, json!({ "result": format!("0x{:0>64}", hex::encode(owner.as_slice())) }))
                }
                _ => (200, json!({ "error": { "code": -32601, "message": "unknown selector" } })),
            }
        }
        "eth_getLogs" => {
            let from = quantity(&params[0]["fromBlock"]);
            let to = quantity(&params[0]["toBlock"]);
            (200, json!({ "result": transfer_logs(from, to) }))
        }
        other => (200, json!({ "error": { "code": -32601, "message": format!("{other} not found") } })),
    }
}

fn rate_limited(_: &Value) -> (u16, Value) {
    (429, json!({}))
}

/// Like `node`, but refuses `eth_getLogs` windows wider than two blocks.
fn capped(request: &Value) -> (u16, Value) {
    let filter = &request["params"][0];
    if request["method"] == "eth_getLogs" && quantity(&filter["toBlock"]) - quantity(&filter["fromBlock"]) >= 2 {
        return (
            200,
            json!({ "error": { "code": -32005, "message": "query returned more than 10000 results" } }),
        );
    }
    node(request)
}

/// Refuses every `eth_getLogs` call, even for a single block.
fn always_capped(request: &Value) -> (u16, Value) {
    if request["method"] == "eth_getLogs" {
        return (
            200,
            json!({ "error": { "code": -32005, "message": "query returned more than 10000 results" } }),
        );
    }
    node(request)
}

fn client(addr: SocketAddr, page: u64) -> RpcClient {
    let config = RpcConfig::local(COLLECTION)
        .with_rpc_url(format!("http://{addr}"))
        .with_request_timeout(Duration::from_secs(5))
        .with_log_page_size(page);
    RpcClient::new(config).unwrap()
}

#[tokio::test]
async fn test_reads_supply_and_owners() {
    let (addr, _) = serve(node).await;
    let client = client(addr, 1000);

    assert_eq!(client.total_supply().await.unwrap(), 3);
    assert_eq!(client.owner_of(2).await.unwrap(), BOB);
    assert_eq!(client.owner_of(0).await, Err(ChainError::TokenNotFound(0)));
}

#[tokio::test]
async fn test_paginates_transfer_history() {
    let (addr, hits) = serve(node).await;
    let client = client(addr, 2);

    let events = client.transfer_events(0, None).await.unwrap();

    assert_eq!(events, history());
    // eth_blockNumber plus pages [0,1] [2,3] [4,5].
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_pinned_range() {
    let (addr, _) = serve(node).await;
    let client = client(addr, 1000);

    let events = client.transfer_events(2, Some(4)).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].to, BOB);
}

#[tokio::test]
async fn test_point_reads_honour_block_tag() {
    let (addr, _) = serve(node).await;
    let client = client(addr, 1000);

    assert_eq!(client.owner_of_at(2, Some(3)).await.unwrap(), ALICE);
    assert_eq!(client.owner_of_at(2, None).await.unwrap(), BOB);
    assert_eq!(client.total_supply_at(Some(0)).await.unwrap(), 0);
    assert_eq!(client.block_number().await.unwrap(), 5);
}

#[tokio::test]
async fn test_result_cap_halves_window() {
    let (addr, hits) = serve(capped).await;
    let client = client(addr, 4);

    let events = client.transfer_events(0, None).await.unwrap();

    assert_eq!(events, history());
    // eth_blockNumber, refused [0,3], then [0,1] [2,3] [4,5].
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_result_cap_on_single_block_is_fatal() {
    let (addr, _) = serve(always_capped).await;
    let policy = RetryPolicy::default().with_initial_backoff(Duration::from_millis(1));
    let client = Retrying::new(client(addr, 4), policy);

    let err = client.transfer_events(3, Some(6)).await.unwrap_err();

    assert!(matches!(err, ChainError::Fatal(ref message) if message.contains("[blocks 3..=3]")));
}

#[tokio::test]
async fn test_zero_page_size_still_pages() {
    let (addr, _) = serve(node).await;
    let mut config = RpcConfig::local(COLLECTION).with_rpc_url(format!("http://{addr}"));
    config.log_page_size = 0;
    let client = RpcClient::new(config).unwrap();

    assert_eq!(client.transfer_events(0, Some(5)).await.unwrap(), history());
}

#[tokio::test]
async fn test_rate_limit_is_transient_and_retried() {
    let (addr, hits) = serve(rate_limited).await;
    let policy = RetryPolicy::none()
        .with_max_attempts(3)
        .with_initial_backoff(Duration::from_millis(1));
    let client = Retrying::new(client(addr, 1000), policy);

    let err = client.total_supply().await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
