//! # End-to-End Scoring Tests
//!
//! A fake scoring service on a loopback listener speaks the real framed wire
//! protocol. Each test scripts how the service answers and checks what the
//! client returns and records.

use codec::schema::v1;
use codec::WireMessage;
use config::ScoringClientConfig;
use network::{Connector, TcpConnector};
use scoring::{BookRoute, ResilientScoringClient, RoutingThresholds, TradeFeatures};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const FALLBACK: f32 = 0.25;

/// How the fake service answers one request
enum Reply {
    /// Framed response body
    Frame(Vec<u8>),
    /// Raw bytes, then close the connection
    RawThenClose(Vec<u8>),
    /// Raw bytes, then hold the connection open without sending more
    RawThenStall(Vec<u8>, Duration),
}

struct FakeScoringService {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
}

impl FakeScoringService {
    fn spawn<F>(responder: F) -> Self
    where
        F: Fn(usize, &WireMessage) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(AtomicUsize::new(0));
        let responder = Arc::new(responder);

        let accepted_count = Arc::clone(&accepted);
        let request_count = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                accepted_count.fetch_add(1, Ordering::SeqCst);
                let responder = Arc::clone(&responder);
                let request_count = Arc::clone(&request_count);
                thread::spawn(move || serve(stream, responder.as_ref(), &request_count));
            }
        });

        Self {
            addr,
            accepted,
            requests,
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

fn serve<F>(mut stream: TcpStream, responder: &F, requests: &AtomicUsize)
where
    F: Fn(usize, &WireMessage) -> Reply,
{
    loop {
        let mut header = [0u8; 4];
        if stream.read_exact(&mut header).is_err() {
            return;
        }
        let mut body = vec![0u8; u32::from_be_bytes(header) as usize];
        if stream.read_exact(&mut body).is_err() {
            return;
        }
        let request = WireMessage::decode(&body).unwrap();
        let index = requests.fetch_add(1, Ordering::SeqCst);

        match responder(index, &request) {
            Reply::Frame(reply) => {
                let len = (reply.len() as u32).to_be_bytes();
                if stream.write_all(&len).and_then(|_| stream.write_all(&reply)).is_err() {
                    return;
                }
            }
            Reply::RawThenClose(bytes) => {
                let _ = stream.write_all(&bytes);
                return;
            }
            Reply::RawThenStall(bytes, hold) => {
                let _ = stream.write_all(&bytes);
                thread::sleep(hold);
                return;
            }
        }
    }
}

/// Connector that counts every connect it performs
struct CountingConnector {
    inner: TcpConnector,
    connects: Arc<AtomicUsize>,
}

impl Connector for CountingConnector {
    type Stream = TcpStream;

    fn connect(&self) -> io::Result<TcpStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect()
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn score_body(score: f32) -> Vec<u8> {
    let mut body = vec![0x0D];
    body.extend_from_slice(&score.to_le_bytes());
    body
}

fn config_for(addr: SocketAddr) -> ScoringClientConfig {
    ScoringClientConfig {
        connect_timeout_ms: 500,
        send_timeout_ms: 500,
        recv_timeout_ms: 500,
        fallback_score: FALLBACK,
        pool_size: 2,
        ..ScoringClientConfig::default().with_endpoint(addr.to_string())
    }
}

fn counting_client(
    addr: SocketAddr,
) -> (ResilientScoringClient<CountingConnector>, Arc<AtomicUsize>) {
    let connects = Arc::new(AtomicUsize::new(0));
    let config = config_for(addr);
    let connector = CountingConnector {
        inner: TcpConnector::new(addr.to_string(), config.connect_timeout()).unwrap(),
        connects: Arc::clone(&connects),
    };
    let client = ResilientScoringClient::with_connector(config, connector).unwrap();
    (client, connects)
}

fn trade(user_id: &str) -> TradeFeatures {
    TradeFeatures {
        user_id: user_id.to_string(),
        symbol: "EURUSD".to_string(),
        platform: "MT5".to_string(),
        open_price: 1.08517,
        volume_lots: 0.5,
        account_balance: 10_000.0,
        ..Default::default()
    }
}

fn request_user(request: &WireMessage) -> String {
    request
        .get(v1::USER_ID.number)
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string()
}

#[test]
fn test_score_one_from_fixed32_field() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, _| Reply::Frame(vec![0x0D, 0x00, 0x00, 0x80, 0x3F]));
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();

    assert_eq!(client.get_score(&trade("100234")), 1.0);

    let stats = client.stats();
    assert_eq!(stats.remote_successes, 1);
    assert_eq!(stats.fallbacks, 0);
    assert!(client.health().available);
}

#[test]
fn test_request_carries_schema_fields() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, request| {
        let symbol = request.get(v1::SYMBOL.number).and_then(|v| v.as_str());
        let price = request.get(v1::OPEN_PRICE.number).and_then(|v| v.as_f32());
        let country = request.get(v1::COUNTRY.number).and_then(|v| v.as_str());
        let ok = request_user(request) == "100234"
            && symbol == Some("EURUSD")
            && price == Some(1.08517)
            && country == Some("unknown");
        Reply::Frame(score_body(if ok { 0.9 } else { 0.1 }))
    });
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();

    assert_eq!(client.get_score(&trade("100234")), 0.9);
}

#[test]
fn test_truncated_response_falls_back() {
    init_tracing();
    // Length prefix promises 10 bytes, 6 arrive, then the peer closes
    let service = FakeScoringService::spawn(|_, _| {
        Reply::RawThenClose(vec![0, 0, 0, 10, 0x0D, 0x00, 0x00, 0x80, 0x3F, 0x12])
    });
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();

    assert_eq!(client.get_score(&trade("100234")), FALLBACK);

    let stats = client.stats();
    assert_eq!(stats.recv_short, 1);
    assert_eq!(stats.fallbacks, 1);
    assert_eq!(client.health().consecutive_failures, 1);
    // The connection was discarded, not returned
    assert_eq!(client.pool_stats().idle, 0);
}

#[test]
fn test_partial_response_before_timeout_is_short() {
    init_tracing();
    // Length prefix promises 10 bytes, 6 arrive, then the peer goes quiet
    let service = FakeScoringService::spawn(|_, _| {
        Reply::RawThenStall(vec![0, 0, 0, 10, 1, 2, 3, 4, 5, 6], Duration::from_secs(3))
    });
    let mut config = config_for(service.addr);
    config.recv_timeout_ms = 200;
    let client = ResilientScoringClient::new(config).unwrap();

    let started = Instant::now();
    assert_eq!(client.get_score(&trade("100234")), FALLBACK);
    assert!(started.elapsed() < Duration::from_secs(2));

    let stats = client.stats();
    assert_eq!(stats.recv_short, 1);
    assert_eq!(stats.recv_timeouts, 0);
    assert_eq!(client.pool_stats().idle, 0);
}

#[test]
fn test_silent_service_times_out_within_bound() {
    init_tracing();
    let service =
        FakeScoringService::spawn(|_, _| Reply::RawThenStall(Vec::new(), Duration::from_secs(3)));
    let mut config = config_for(service.addr);
    config.recv_timeout_ms = 200;
    let client = ResilientScoringClient::new(config).unwrap();

    let started = Instant::now();
    assert_eq!(client.get_score(&trade("100234")), FALLBACK);
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(client.stats().recv_timeouts, 1);
    assert_eq!(client.pool_stats().idle, 0);
}

#[test]
fn test_routing_boundary_against_threshold() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, request| {
        let score = if request_user(request) == "retained" { 0.09 } else { 0.07 };
        Reply::Frame(score_body(score))
    });
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();
    let thresholds = RoutingThresholds::new(0.08).unwrap();

    let retained = client.route_trade(&trade("retained"), "Forex", &thresholds);
    assert_eq!(retained.decision, BookRoute::BBook);
    assert_eq!(retained.score, 0.09);
    assert_eq!(retained.threshold, 0.08);
    assert_eq!(retained.group, "Other");

    let hedged = client.route_trade(&trade("hedged"), "Forex", &thresholds);
    assert_eq!(hedged.decision, BookRoute::ABook);
    assert_eq!(hedged.score, 0.07);
}

#[test]
fn test_identical_trade_within_ttl_uses_cache() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, _| Reply::Frame(score_body(0.42)));
    let (client, connects) = counting_client(service.addr);

    assert_eq!(client.get_score(&trade("100234")), 0.42);
    let requests_after_first = service.requests();
    let connects_after_first = connects.load(Ordering::SeqCst);
    let stats_after_first = client.stats();

    assert_eq!(client.get_score(&trade("100234")), 0.42);

    // Second call touched neither the pool nor the network
    assert_eq!(service.requests(), requests_after_first);
    assert_eq!(connects.load(Ordering::SeqCst), connects_after_first);
    let stats = client.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.remote_attempts(), stats_after_first.remote_attempts());
}

#[test]
fn test_cached_score_expires_after_ttl() {
    init_tracing();
    let service = FakeScoringService::spawn(|index, _| {
        Reply::Frame(score_body(if index == 0 { 0.3 } else { 0.6 }))
    });
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();
    let ttl = client.config().cache_ttl();
    let t0 = Instant::now();

    assert_eq!(client.get_score_at(&trade("100234"), t0), 0.3);
    assert_eq!(client.get_score_at(&trade("100234"), t0 + ttl - Duration::from_secs(1)), 0.3);
    assert_eq!(client.get_score_at(&trade("100234"), t0 + ttl), 0.6);
    assert_eq!(service.requests(), 2);
}

#[test]
fn test_pooled_connection_reused_across_calls() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, _| Reply::Frame(score_body(0.5)));
    let (client, connects) = counting_client(service.addr);

    for user in ["a", "b", "c", "d"] {
        assert_eq!(client.get_score(&trade(user)), 0.5);
    }

    assert_eq!(service.requests(), 4);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert_eq!(service.accepted(), 1);
    assert_eq!(client.pool_stats().idle, 1);
}

#[test]
fn test_unreachable_service_opens_backoff_window() {
    init_tracing();
    // Bind then drop to find a port with nothing listening
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let (client, connects) = counting_client(addr);
    let t0 = Instant::now();

    // Each failure waits out the 30s window before the next attempt
    let third_failure = t0 + Duration::from_secs(60);
    for at in [t0, t0 + Duration::from_secs(30), third_failure] {
        assert_eq!(client.get_score_at(&trade("100234"), at), FALLBACK);
    }
    assert_eq!(connects.load(Ordering::SeqCst), 3);
    assert_eq!(client.health().consecutive_failures, 3);
    assert_eq!(client.stats().connect_failures, 3);

    // Three failures hold the window shut for 120s
    let held = third_failure + Duration::from_secs(119);
    assert_eq!(client.get_score_at(&trade("100234"), held), FALLBACK);
    assert_eq!(connects.load(Ordering::SeqCst), 3);
    assert_eq!(client.stats().breaker_skips, 1);

    let reopened = third_failure + Duration::from_secs(120);
    assert_eq!(client.get_score_at(&trade("100234"), reopened), FALLBACK);
    assert_eq!(connects.load(Ordering::SeqCst), 4);
    assert_eq!(client.health().consecutive_failures, 4);
}

#[test]
fn test_success_after_failure_restores_health() {
    init_tracing();
    // First request: close without answering. Later requests succeed.
    let service = FakeScoringService::spawn(|index, _| {
        if index == 0 {
            Reply::RawThenClose(Vec::new())
        } else {
            Reply::Frame(score_body(0.8))
        }
    });
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();
    let t0 = Instant::now();

    assert_eq!(client.get_score_at(&trade("100234"), t0), FALLBACK);
    let degraded = client.health();
    assert!(!degraded.available);
    assert_eq!(degraded.consecutive_failures, 1);

    // Inside the 30s window nothing is attempted
    assert_eq!(client.get_score_at(&trade("100234"), t0 + Duration::from_secs(10)), FALLBACK);
    assert_eq!(service.requests(), 1);

    assert_eq!(client.get_score_at(&trade("100234"), t0 + Duration::from_secs(30)), 0.8);
    let recovered = client.health();
    assert!(recovered.available);
    assert_eq!(recovered.consecutive_failures, 0);
    assert_eq!(service.accepted(), 2);
}

#[test]
fn test_out_of_range_score_falls_back_and_keeps_connection() {
    init_tracing();
    let service = FakeScoringService::spawn(|index, _| match index {
        0 => Reply::Frame(score_body(1.5)),
        1 => Reply::Frame(score_body(f32::NAN)),
        _ => Reply::Frame(score_body(0.2)),
    });
    let (client, connects) = counting_client(service.addr);
    let t0 = Instant::now();

    assert_eq!(client.get_score_at(&trade("100234"), t0), FALLBACK);
    assert_eq!(client.pool_stats().idle, 1);
    assert_eq!(
        client.get_score_at(&trade("100234"), t0 + Duration::from_secs(30)),
        FALLBACK
    );
    assert_eq!(client.stats().invalid_scores, 2);

    // Out-of-range scores are never cached
    assert_eq!(
        client.get_score_at(&trade("100234"), t0 + Duration::from_secs(60)),
        0.2
    );
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[test]
fn test_malformed_and_scoreless_responses_fall_back() {
    init_tracing();
    let service = FakeScoringService::spawn(|index, _| match index {
        // Fixed32 score cut short
        0 => Reply::Frame(vec![0x0D, 0x00, 0x00]),
        // Warnings only
        _ => {
            let mut body = vec![0x12, 0x07];
            body.extend_from_slice(b"no data");
            Reply::Frame(body)
        }
    });
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();
    let t0 = Instant::now();

    assert_eq!(client.get_score_at(&trade("100234"), t0), FALLBACK);
    assert_eq!(client.stats().decode_failures, 1);

    assert_eq!(
        client.get_score_at(&trade("100234"), t0 + Duration::from_secs(30)),
        FALLBACK
    );
    assert_eq!(client.stats().invalid_scores, 1);
    assert_eq!(service.accepted(), 1);
}

#[test]
fn test_unknown_response_fields_are_skipped() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, _| {
        // field 9 varint 300, field 4 string "v2", field 1 score, field 7 fixed32
        let mut body = vec![0x48, 0xAC, 0x02, 0x22, 0x02, b'v', b'2'];
        body.extend_from_slice(&score_body(0.66));
        body.extend_from_slice(&[0x3D, 1, 2, 3, 4]);
        Reply::Frame(body)
    });
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();

    assert_eq!(client.get_score(&trade("100234")), 0.66);
}

#[test]
fn test_score_field_follows_configuration() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, _| {
        // field 1 = 0.9, field 2 = 0.35
        let mut body = score_body(0.9);
        body.push(0x15);
        body.extend_from_slice(&0.35f32.to_le_bytes());
        Reply::Frame(body)
    });
    let mut config = config_for(service.addr);
    config.response.score_field = 2;
    config.response.warnings_field = 3;
    let client = ResilientScoringClient::new(config).unwrap();

    assert_eq!(client.get_score(&trade("100234")), 0.35);
}

#[test]
fn test_concurrent_callers_share_the_pool() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, _| Reply::Frame(score_body(0.5)));
    let mut config = config_for(service.addr);
    config.pool_size = 4;
    let client = Arc::new(ResilientScoringClient::new(config).unwrap());
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                client.get_score(&trade(&format!("user-{i}")))
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 0.5);
    }
    assert_eq!(client.stats().remote_successes, 4);
    assert!(client.pool_stats().idle <= 4);
}

#[test]
fn test_shutdown_closes_idle_connections() {
    init_tracing();
    let service = FakeScoringService::spawn(|_, _| Reply::Frame(score_body(0.5)));
    let client = ResilientScoringClient::new(config_for(service.addr)).unwrap();

    client.get_score(&trade("100234"));
    assert_eq!(client.pool_stats().idle, 1);

    client.shutdown();
    assert_eq!(client.pool_stats().idle, 0);

    // Uncached trades fall back without touching the network
    assert_eq!(client.get_score(&trade("after-shutdown")), FALLBACK);
    assert_eq!(service.accepted(), 1);
    assert_eq!(service.requests(), 1);
}
