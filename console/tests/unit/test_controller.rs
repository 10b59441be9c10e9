//! Resource controller tests: ordering, teardown, polling and filtering

mod common;

use std::time::Duration;

use cicd_console::resources::filter::BuildFilter;
use cicd_console::resources::source::BuildParams;
use common::{build_json, builds_body, logged_in};
use http::Method;
use serde_json::json;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

fn ids(builds: &[api_models::models::Build]) -> Vec<u64> {
    builds.iter().map(|b| b.id).collect()
}

#[tokio::test(start_paused = true)]
async fn test_slow_older_response_never_wins() {
    let h = logged_in().await;
    let controller = h.state.builds(BuildParams::default());

    h.transport.reply_once(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![build_json(1, "running", "main", "", "api")]),
        Duration::from_secs(5),
    );
    h.transport.reply_once(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![build_json(2, "success", "main", "", "api")]),
        Duration::from_secs(1),
    );

    let (first, second) = tokio::join!(controller.refresh_now(), controller.refresh_now());
    assert_ok!(first);
    assert_ok!(second);

    assert_eq!(ids(&controller.items()), vec![2]);
    assert_eq!(controller.applied_seq(), 2);
    assert!(!controller.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_applied_sequence_is_monotonic() {
    let h = logged_in().await;
    let controller = h.state.builds(BuildParams::default());

    for (id, delay) in [(1, 3), (2, 1), (3, 2)] {
        h.transport.reply_once(
            Method::GET,
            "/builds",
            200,
            builds_body(vec![build_json(id, "running", "main", "", "api")]),
            Duration::from_secs(delay),
        );
    }

    let mut changes = controller.subscribe();
    let watcher = {
        let controller = controller.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while changes.changed().await.is_ok() {
                seen.push(controller.applied_seq());
                if controller.applied_seq() == 3 && !controller.is_loading() {
                    break;
                }
            }
            seen
        })
    };

    let _ = tokio::join!(
        controller.refresh_now(),
        controller.refresh_now(),
        controller.refresh_now()
    );
    let observed = watcher.await.unwrap();

    assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(ids(&controller.items()), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_drops_late_response() {
    let h = logged_in().await;
    let controller = h.state.builds(BuildParams::default());

    h.transport.reply_once(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![build_json(1, "running", "main", "", "api")]),
        Duration::from_secs(5),
    );

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.refresh_now().await })
    };

    sleep(Duration::from_secs(1)).await;
    assert!(controller.is_loading());

    controller.stop();
    controller.stop();
    assert!(controller.is_stopped());
    assert!(!controller.is_loading());

    assert_ok!(pending.await.unwrap());
    assert!(controller.items().is_empty());
    assert_eq!(controller.applied_seq(), 0);
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn test_failure_keeps_previous_snapshot() {
    let h = logged_in().await;
    let controller = h.state.builds(BuildParams::default());

    h.transport.reply_once(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![build_json(1, "running", "main", "", "api")]),
        Duration::ZERO,
    );
    h.transport.reply(
        Method::GET,
        "/builds",
        500,
        json!({ "error": "database unavailable" }),
    );

    assert_ok!(controller.refresh_now().await);
    assert_err!(controller.refresh_now().await);

    assert_eq!(ids(&controller.items()), vec![1]);
    assert_eq!(controller.applied_seq(), 1);
    assert!(!controller.is_loading());
    assert_eq!(
        controller.last_error().as_deref(),
        Some("Request failed: database unavailable")
    );
}

#[tokio::test(start_paused = true)]
async fn test_ticker_polls_until_stopped() {
    let h = logged_in().await;
    h.transport
        .reply(Method::GET, "/builds", 200, builds_body(vec![]));

    // builds refresh every 10s by default
    let controller = h.state.builds(BuildParams::default());
    assert_ok!(controller.start().await);
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 1);

    sleep(Duration::from_secs(25)).await;
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 3);

    controller.stop();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_do_not_wait_for_slow_fetches() {
    let h = logged_in().await;
    for _ in 0..3 {
        h.transport.reply_once(
            Method::GET,
            "/builds",
            200,
            builds_body(vec![]),
            Duration::from_secs(12),
        );
    }

    let controller = h.state.builds(BuildParams::default());
    let starting = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start().await })
    };

    sleep(Duration::from_millis(10_500)).await;
    // the first fetch is still in flight when the tick issues the second
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 2);
    assert!(controller.is_loading());

    controller.stop();
    assert_ok!(starting.await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_keeps_one_ticker() {
    let h = logged_in().await;
    h.transport
        .reply(Method::GET, "/builds", 200, builds_body(vec![]));

    let controller = h.state.builds(BuildParams::default());
    assert_ok!(controller.start().await);
    assert_ok!(controller.start().await);
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 2);

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 3);

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_set_params_restarts_interval() {
    let h = logged_in().await;
    h.transport
        .reply(Method::GET, "/builds", 200, builds_body(vec![]));

    let controller = h.state.builds(BuildParams::default());
    assert_ok!(controller.start().await);

    sleep(Duration::from_secs(6)).await;
    assert_ok!(
        controller
            .set_params(BuildParams {
                pipeline_id: Some(4)
            })
            .await
    );
    let calls = h.transport.calls_to(Method::GET, "/builds");
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1].query,
        vec![("pipelineId".to_string(), "4".to_string())]
    );

    // the old baseline would have ticked at t=10
    sleep(Duration::from_secs(6)).await;
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 2);

    sleep(Duration::from_secs(5)).await;
    let calls = h.transport.calls_to(Method::GET, "/builds");
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].query, calls[1].query);
    assert_eq!(controller.params().pipeline_id, Some(4));

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_on_demand_resource_does_not_poll() {
    let h = logged_in().await;
    h.transport
        .reply(Method::GET, "/projects", 200, json!({ "projects": [] }));

    let controller = h.state.projects();
    assert_ok!(controller.start().await);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.transport.calls_to(Method::GET, "/projects").len(), 1);

    assert_ok!(controller.refresh_now().await);
    assert_eq!(h.transport.calls_to(Method::GET, "/projects").len(), 2);
}

#[tokio::test]
async fn test_filter_is_local_and_idempotent() {
    let h = logged_in().await;
    h.transport.reply(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![
            build_json(1, "running", "main", "", "api"),
            build_json(2, "success", "feature/login", "", "web"),
            build_json(3, "failed", "release", "MAIN-1.2", "worker"),
        ]),
    );

    let controller = h.state.builds(BuildParams::default());
    assert_ok!(controller.refresh_now().await);
    let changes = controller.subscribe();

    controller.set_filter(BuildFilter::text("main").into_predicate());
    assert!(changes.has_changed().unwrap());

    let first = ids(&controller.visible());
    let second = ids(&controller.visible());
    assert_eq!(first, vec![1, 3]);
    assert_eq!(first, second);

    // the snapshot itself is untouched and nothing was fetched
    assert_eq!(ids(&controller.items()), vec![1, 2, 3]);
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 1);

    controller.set_filter(BuildFilter::default().into_predicate());
    assert_eq!(ids(&controller.visible()), vec![1, 2, 3]);
}
