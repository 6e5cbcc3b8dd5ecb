//! Task bridge behavior against a scripted catalog with per-request latency.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{DownloadStream, HttpClient, HttpRequest, HttpResponse};
use bridge_traits::time::Sleeper;
use bytes::Bytes;
use core_catalog::{CatalogError, CatalogOutcome, DownloadError};
use core_runtime::config::{CatalogApiConfig, CoreConfig};
use core_service::{CoreError, CoreService, LiveRequest, Operation, RequestId, TaskBridge, TaskResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

const AUDIO: &[u8] = b"ID3 fake audio bytes for bridge tests";

/// Search keywords pick the behavior: `slow` answers after 300 ms, `hang`
/// never answers in practice, `panic` panics inside the adapter.
struct ScriptedCatalog;

fn query_value<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(key)?.strip_prefix('='))
}

fn ok_json(body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    }
}

#[async_trait]
impl HttpClient for ScriptedCatalog {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if let Some(word) = query_value(&request.url, "word") {
            match word {
                "slow" => tokio::time::sleep(Duration::from_millis(300)).await,
                "hang" => tokio::time::sleep(Duration::from_secs(9)).await,
                "panic" => panic!("catalog adapter exploded"),
                _ => {}
            }
            return Ok(ok_json(serde_json::json!({
                "code": 200,
                "data": [{"id": 1, "song": word, "singer": "Tester"}]
            })));
        }

        if let Some(id) = query_value(&request.url, "id") {
            return Ok(ok_json(serde_json::json!({
                "code": 200,
                "data": {
                    "id": id,
                    "song": "Server Title",
                    "singer": "Server Artist",
                    "url": format!("https://cdn.test/{id}.mp3")
                }
            })));
        }

        Err(BridgeError::OperationFailed(format!("unexpected url {}", request.url)))
    }

    async fn download_stream(&self, request: HttpRequest) -> BridgeResult<DownloadStream> {
        if request.url.contains("slow") {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        Ok(DownloadStream {
            status: 200,
            content_length: Some(AUDIO.len() as u64),
            reader: Box::new(AUDIO),
        })
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

fn service(download_dir: &Path) -> CoreService {
    let config = CoreConfig::builder()
        .http_client(Arc::new(ScriptedCatalog))
        .file_system(Arc::new(TokioFileSystem::with_download_directory(
            download_dir.to_path_buf(),
        )))
        .sleeper(Arc::new(NoSleep))
        .catalog(CatalogApiConfig::default().with_base_url("http://catalog.test/netease"))
        .download_dir(download_dir)
        .build()
        .unwrap();
    CoreService::new(config).unwrap()
}

/// Pumps the bridge until `expected` submissions were delivered.
fn pump(bridge: &mut TaskBridge, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut delivered = 0;
    while delivered < expected {
        assert!(Instant::now() < deadline, "only {delivered} of {expected} delivered");
        delivered += bridge.wait_and_dispatch(Duration::from_millis(50));
    }
}

fn first_title(outcome: CatalogOutcome<Vec<core_catalog::TrackSummary>>) -> String {
    outcome.success().unwrap()[0].title.clone()
}

#[test]
fn test_later_search_overtakes_slower_one_and_stale_result_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let live = Rc::new(RefCell::new(LiveRequest::new()));
    let arrivals: Rc<RefCell<Vec<(RequestId, String)>>> = Rc::default();
    let shown: Rc<RefCell<Vec<String>>> = Rc::default();

    {
        let live = live.clone();
        let arrivals = arrivals.clone();
        let shown = shown.clone();
        bridge.on_search_done(move |request_id, outcome| {
            let title = first_title(outcome);
            arrivals.borrow_mut().push((request_id, title.clone()));
            if live.borrow().is_live(request_id) {
                shown.borrow_mut().push(title);
            }
        });
    }

    let a = bridge.submit(Operation::search("slow")).unwrap();
    live.borrow_mut().track(a.request_id());
    let b = bridge.submit(Operation::search("fast")).unwrap();
    live.borrow_mut().track(b.request_id());
    assert!(a.request_id() < b.request_id());

    pump(&mut bridge, 2);

    let arrivals = arrivals.borrow();
    assert_eq!(arrivals[0], (b.request_id(), "fast".to_string()));
    assert_eq!(arrivals[1], (a.request_id(), "slow".to_string()));
    assert_eq!(*shown.borrow(), vec!["fast".to_string()]);
}

#[test]
fn test_panicking_operation_is_delivered_once_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let outcomes: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    {
        let outcomes = outcomes.clone();
        bridge.on_search_done(move |_, outcome| {
            if let CatalogOutcome::Failure(CatalogError::Internal(message)) = &outcome {
                assert!(message.contains("catalog adapter exploded"));
            }
            outcomes.borrow_mut().push(outcome.kind());
        });
    }

    bridge.submit(Operation::search("panic")).unwrap();
    pump(&mut bridge, 1);

    // The worker survives and keeps serving.
    bridge.submit(Operation::search("after")).unwrap();
    pump(&mut bridge, 1);

    assert_eq!(*outcomes.borrow(), vec!["failure", "success"]);
    assert_eq!(bridge.dispatch_pending(), 0);
}

#[test]
fn test_callback_receives_names_captured_at_submission() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let detail_handler_calls = Rc::new(RefCell::new(0));
    {
        let calls = detail_handler_calls.clone();
        bridge.on_detail_done(move |_, _| *calls.borrow_mut() += 1);
    }

    let received: Rc<RefCell<Option<(String, String)>>> = Rc::default();
    {
        let received = received.clone();
        bridge
            .submit_with(
                Operation::fetch_for_download("186016", "Shown Title", "Shown Artist"),
                move |_, result| match result {
                    TaskResult::DownloadInfo(info) => {
                        let suggested = info.suggested_file_name();
                        let detail = info.outcome.success().unwrap();
                        assert_eq!(detail.title, "Server Title");
                        *received.borrow_mut() = Some((suggested, detail.download_url.unwrap()));
                    }
                    other => panic!("unexpected result: {other:?}"),
                },
            )
            .unwrap();
    }
    assert_eq!(bridge.pending_callbacks(), 1);

    pump(&mut bridge, 1);

    assert_eq!(
        received.borrow().clone(),
        Some((
            "Shown Title - Shown Artist.mp3".to_string(),
            "https://cdn.test/186016.mp3".to_string()
        ))
    );
    assert_eq!(*detail_handler_calls.borrow(), 0);
    assert_eq!(bridge.pending_callbacks(), 0);
}

#[test]
fn test_only_one_download_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let progress: Rc<RefCell<Vec<u64>>> = Rc::default();
    let finished: Rc<RefCell<Vec<PathBuf>>> = Rc::default();
    {
        let progress = progress.clone();
        bridge.on_download_progress(move |_, p| progress.borrow_mut().push(p.received));
        let finished = finished.clone();
        bridge.on_download_finished(move |_, result| {
            finished.borrow_mut().push(result.unwrap().path);
        });
    }

    bridge
        .submit(Operation::Download {
            url: "https://cdn.test/slow.mp3".to_string(),
            destination: PathBuf::from("First - Artist.mp3"),
        })
        .unwrap();
    assert!(bridge.is_download_active());

    let second = bridge.submit(Operation::Download {
        url: "https://cdn.test/other.mp3".to_string(),
        destination: PathBuf::from("Second - Artist.mp3"),
    });
    assert!(matches!(second, Err(CoreError::DownloadInProgress)));

    // Other work is still accepted while downloading.
    bridge.submit(Operation::fetch_by_id("7")).unwrap();

    pump(&mut bridge, 2);
    assert!(!bridge.is_download_active());

    let expected = dir.path().join("First - Artist.mp3");
    assert_eq!(*finished.borrow(), vec![expected.clone()]);
    assert_eq!(std::fs::read(&expected).unwrap(), AUDIO);
    assert_eq!(progress.borrow().last().copied(), Some(AUDIO.len() as u64));

    bridge
        .submit(Operation::Download {
            url: "https://cdn.test/other.mp3".to_string(),
            destination: PathBuf::from("Second - Artist.mp3"),
        })
        .unwrap();
    pump(&mut bridge, 1);
    assert_eq!(finished.borrow().len(), 2);
}

#[test]
fn test_failed_download_releases_the_slot() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let errors: Rc<RefCell<Vec<String>>> = Rc::default();
    {
        let errors = errors.clone();
        bridge.on_download_finished(move |_, result| {
            if let Err(DownloadError::MissingUrl) = result {
                errors.borrow_mut().push("missing url".to_string());
            }
        });
    }

    bridge
        .submit(Operation::Download {
            url: String::new(),
            destination: PathBuf::from("x.mp3"),
        })
        .unwrap();
    pump(&mut bridge, 1);

    assert_eq!(*errors.borrow(), vec!["missing url".to_string()]);
    assert!(!bridge.is_download_active());
}

#[test]
fn test_unhandled_results_are_counted_and_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let detail_calls = Rc::new(RefCell::new(0));
    {
        let calls = detail_calls.clone();
        bridge.on_detail_done(move |_, _| *calls.borrow_mut() += 1);
    }

    bridge.submit(Operation::search("nobody listens")).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut delivered = 0;
    while delivered == 0 {
        assert!(Instant::now() < deadline, "search result never arrived");
        delivered = bridge.wait_and_dispatch(Duration::from_millis(50));
    }

    assert_eq!(delivered, 1);
    assert_eq!(bridge.dispatch_pending(), 0);
    assert_eq!(*detail_calls.borrow(), 0);
    assert_eq!(bridge.pending_callbacks(), 0);
}

#[test]
fn test_results_queued_before_shutdown_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let named: Rc<RefCell<Vec<RequestId>>> = Rc::default();
    {
        let named = named.clone();
        bridge.on_search_done(move |request_id, _| named.borrow_mut().push(request_id));
    }
    let callback_hits = Rc::new(RefCell::new(0));
    {
        let hits = callback_hits.clone();
        bridge
            .submit_with(Operation::search("fast"), move |_, _| *hits.borrow_mut() += 1)
            .unwrap();
    }
    bridge.submit(Operation::search("also fast")).unwrap();

    // Both results reach the channel but are never pumped.
    std::thread::sleep(Duration::from_millis(300));
    assert!(bridge.shutdown());

    assert_eq!(bridge.dispatch_pending(), 0);
    assert_eq!(bridge.wait_and_dispatch(Duration::from_millis(50)), 0);
    assert!(named.borrow().is_empty());
    assert_eq!(*callback_hits.borrow(), 0);
    assert_eq!(bridge.pending_callbacks(), 0);
}

#[test]
fn test_shutdown_abandons_in_flight_work_within_grace() {
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = service(dir.path()).start_bridge().unwrap();

    let delivered = Rc::new(RefCell::new(false));
    {
        let delivered = delivered.clone();
        bridge.on_search_done(move |_, _| *delivered.borrow_mut() = true);
    }
    bridge.submit(Operation::search("hang")).unwrap();

    let started = Instant::now();
    assert!(bridge.shutdown());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!bridge.is_running());

    assert!(matches!(
        bridge.submit(Operation::search("late")),
        Err(CoreError::ShutDown)
    ));
    assert_eq!(bridge.dispatch_pending(), 0);
    assert!(!*delivered.borrow());
}

#[tokio::test]
async fn test_service_calls_work_without_the_bridge() {
    let dir = tempfile::tempdir().unwrap();
    let core = service(dir.path());

    let tracks = core.search("direct").await.success().unwrap();
    assert_eq!(tracks[0].title, "direct");

    let resolved = core.resolve_destination(Path::new("a.mp3")).await.unwrap();
    assert_eq!(resolved, dir.path().join("a.mp3"));

    let absolute = dir.path().join("abs.mp3");
    assert_eq!(core.resolve_destination(&absolute).await.unwrap(), absolute);
}

#[tokio::test]
async fn test_events_report_task_lifecycle() {
    use core_runtime::events::{CoreEvent, TaskEvent};

    let dir = tempfile::tempdir().unwrap();
    let core = service(dir.path());
    let mut events = core
        .subscribe_events()
        .filter(|event| matches!(event, CoreEvent::Task(_)));

    let mut bridge = core.start_bridge().unwrap();
    bridge.on_search_done(|_, _| {});
    let handle = bridge.submit(Operation::search("evented")).unwrap();
    pump(&mut bridge, 1);

    match events.recv().await.unwrap() {
        CoreEvent::Task(TaskEvent::Submitted {
            request_id,
            operation,
        }) => {
            assert_eq!(request_id, handle.request_id().value());
            assert_eq!(operation, "search");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Task(TaskEvent::Completed { ref outcome, .. }) if outcome == "success"
    ));
}
