//! Scheduler integration tests
//!
//! These run real monitors with short periods against a mock server and
//! check tick timing, overlap and shutdown behavior.

use super::{get, test_client};
use http_monitor::{Monitor, MonitorDefinition, MonitorSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Responds after `delay` and records when each request arrived.
#[derive(Clone)]
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    delay: Duration,
}

impl ArrivalRecorder {
    fn new(delay: Duration) -> Self {
        Self {
            arrivals: Arc::new(Mutex::new(Vec::new())),
            delay,
        }
    }

    fn offsets_from(&self, start: Instant) -> Vec<Duration> {
        self.arrivals
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(start))
            .collect()
    }
}

impl Respond for ArrivalRecorder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200).set_delay(self.delay)
    }
}

async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

fn ping_monitor(server: &MockServer, name: &str, period: Duration) -> MonitorDefinition {
    MonitorDefinition::new(name, period)
        .with_request(get("ping", &format!("{}/ping/{}", server.uri(), name)))
}

#[tokio::test]
async fn test_first_tick_waits_one_period() {
    let server = MockServer::start().await;
    Mock::given(path("/ping/slow-start"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut monitor = Monitor::new(
        ping_monitor(&server, "slow-start", Duration::from_millis(400)),
        test_client(),
    )
    .unwrap();
    monitor.start();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hits(&server, "/ping/slow-start").await, 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(hits(&server, "/ping/slow-start").await >= 1);

    monitor.stop().await;
}

#[tokio::test]
async fn test_ticks_repeat_until_stopped() {
    let server = MockServer::start().await;
    Mock::given(path("/ping/repeat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut monitor = Monitor::new(
        ping_monitor(&server, "repeat", Duration::from_millis(50)),
        test_client(),
    )
    .unwrap();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(400)).await;
    monitor.stop().await;

    let after_stop = hits(&server, "/ping/repeat").await;
    assert!(after_stop >= 2, "expected several ticks, got {}", after_stop);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(hits(&server, "/ping/repeat").await, after_stop);
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_tick() {
    let server = MockServer::start().await;

    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;

    Mock::given(path("/after"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(path("/cleanup"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let definition = MonitorDefinition::new("in-flight", Duration::from_millis(50))
        .with_request(get("slow", &format!("{}/slow", server.uri())))
        .with_request(get("after", &format!("{}/after", server.uri())))
        .with_cleanup(get("cleanup", &format!("{}/cleanup", server.uri())));

    let mut monitor = Monitor::new(definition, test_client()).unwrap();
    monitor.start();

    // First tick fires at 50ms and is stuck on /slow until ~450ms.
    tokio::time::sleep(Duration::from_millis(150)).await;
    monitor.stop().await;

    // The whole tick finished, cleanup included, and no second tick started.
    assert_eq!(hits(&server, "/slow").await, 1);
    assert_eq!(hits(&server, "/after").await, 1);
    assert_eq!(hits(&server, "/cleanup").await, 1);
}

#[tokio::test]
async fn test_ticks_never_overlap() {
    let server = MockServer::start().await;

    Mock::given(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(150)))
        .mount(&server)
        .await;

    let definition = MonitorDefinition::new("busy", Duration::from_millis(20))
        .with_request(get("busy", &format!("{}/busy", server.uri())));

    let mut monitor = Monitor::new(definition, test_client()).unwrap();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(500)).await;
    monitor.stop().await;

    // Overlapping ticks would have sent about 25 requests in this window.
    let sent = hits(&server, "/busy").await;
    assert!((1..=4).contains(&sent), "unexpected request count {}", sent);
}

#[tokio::test]
async fn test_fires_during_slow_tick_are_dropped() {
    let server = MockServer::start().await;
    let recorder = ArrivalRecorder::new(Duration::from_millis(700));

    Mock::given(path("/slow"))
        .respond_with(recorder.clone())
        .mount(&server)
        .await;

    let definition = MonitorDefinition::new("slow", Duration::from_millis(300))
        .with_request(get("slow", &format!("{}/slow", server.uri())));

    let start = Instant::now();
    let mut monitor = Monitor::new(definition, test_client()).unwrap();
    monitor.start();

    // Tick one runs from ~300ms to ~1000ms. The fires at 600ms and 900ms
    // fall inside it and are dropped; tick two belongs to the 1200ms slot.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    monitor.stop().await;

    let arrivals = recorder.offsets_from(start);
    assert_eq!(arrivals.len(), 2, "arrivals: {:?}", arrivals);
    assert!(
        arrivals[1] >= Duration::from_millis(1150),
        "second tick started right after the slow one: {:?}",
        arrivals
    );
    assert!(
        arrivals[1] - arrivals[0] >= Duration::from_millis(800),
        "arrivals: {:?}",
        arrivals
    );
}

#[tokio::test]
async fn test_dropping_monitor_stops_ticks() {
    let server = MockServer::start().await;
    Mock::given(path("/ping/dropped"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut monitor = Monitor::new(
        ping_monitor(&server, "dropped", Duration::from_millis(50)),
        test_client(),
    )
    .unwrap();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(180)).await;
    drop(monitor);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = hits(&server, "/ping/dropped").await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(hits(&server, "/ping/dropped").await, settled);
}

#[tokio::test]
async fn test_monitor_set_runs_independent_monitors() {
    let server = MockServer::start().await;
    Mock::given(path("/ping/a"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(path("/ping/b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut set = MonitorSet::new(
        vec![
            ping_monitor(&server, "a", Duration::from_millis(50)),
            ping_monitor(&server, "b", Duration::from_millis(50)),
        ],
        &test_client(),
    )
    .unwrap();
    set.start_all();
    tokio::time::sleep(Duration::from_millis(300)).await;
    set.stop_all().await;

    // A failing monitor does not affect its neighbour.
    assert!(hits(&server, "/ping/a").await >= 2);
    assert!(hits(&server, "/ping/b").await >= 2);
    assert_eq!(set.running_count(), 0);
}

#[tokio::test]
async fn test_run_once_reports_health() {
    let server = MockServer::start().await;
    Mock::given(path("/ping/once"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let monitor = Monitor::new(
        ping_monitor(&server, "once", Duration::from_secs(3600)),
        test_client(),
    )
    .unwrap();
    let report = monitor.run_once().await;

    assert!(report.is_healthy());
    assert!(!monitor.is_running());
}
