//! End-to-end flows across session, gateway, controllers and actions

mod common;

use std::time::Duration;

use api_models::models::{Build, CreateProjectRequest, RunStatus};
use cicd_console::app::run::{ensure_authenticated, watch, WatchView};
use cicd_console::authn::session::{AuthStatus, SessionEvent};
use cicd_console::dashboard::DashboardSummary;
use cicd_console::errors::ConsoleError;
use cicd_console::http::notifier::{Notification, Severity};
use cicd_console::resources::actions;
use cicd_console::resources::filter::BuildFilter;
use cicd_console::resources::source::{BuildParams, DeploymentParams};
use common::{
    build_json, builds_body, deployment_json, deployments_body, harness, logged_in, user,
};
use http::Method;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_login_then_expired_token_forces_logout() {
    let h = harness();
    h.state.session.restore().await;
    let mut events = h.state.session.subscribe_events();

    h.transport.reply(
        Method::POST,
        "/auth/login",
        200,
        json!({ "message": "ok", "user": user("alice"), "token": "t1" }),
    );
    assert_ok!(h.state.session.login(&h.state.gateway, "alice", "pw").await);
    assert!(h.session_file_exists());

    h.transport
        .reply(Method::GET, "/builds", 401, json!({ "error": "token expired" }));
    let controller = h.state.builds(BuildParams::default());
    let err = assert_err!(controller.refresh_now().await);
    assert!(err.is_auth_expired());

    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedIn {
            username: "alice".to_string()
        }
    );
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
    assert!(events.try_recv().is_err());
    assert!(!h.session_file_exists());

    // a later startup finds no session
    assert!(matches!(
        ensure_authenticated(&h.state).await,
        Err(ConsoleError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_cancel_running_build() {
    let h = logged_in().await;
    let mut notifications = h.state.notifier.subscribe();
    h.transport.reply(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![build_json(7, "running", "main", "", "api")]),
    );
    h.transport.reply(
        Method::POST,
        "/builds/7/cancel",
        200,
        json!({ "message": "Build cancelled successfully" }),
    );

    let controller = h.state.builds(BuildParams::default());
    assert_ok!(controller.refresh_now().await);
    let build = actions::find(&controller, 7).unwrap();

    let response = assert_ok!(actions::cancel_build(&controller, &build).await);
    assert_eq!(response.message, "Build cancelled successfully");

    assert_eq!(h.transport.calls_to(Method::POST, "/builds/7/cancel").len(), 1);
    // one initial load plus exactly one refresh after the action
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 2);
    assert!(!controller.is_pending(7));

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.severity, Severity::Success);
    assert_eq!(notification.message, "Build cancelled successfully");
}

#[tokio::test]
async fn test_cancel_requires_running_build() {
    let h = logged_in().await;
    let controller = h.state.builds(BuildParams::default());
    let build = Build {
        id: 8,
        status: RunStatus::Success,
        ..Default::default()
    };

    let err = assert_err!(actions::cancel_build(&controller, &build).await);
    assert!(matches!(err, ConsoleError::ValidationError(_)));
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_action_is_reported_without_refresh() {
    let h = logged_in().await;
    h.transport.reply_once(
        Method::POST,
        "/builds/7/cancel",
        409,
        json!({ "error": "Build already finished" }),
        Duration::from_secs(1),
    );

    let controller = h.state.builds(BuildParams::default());
    let build = Build {
        id: 7,
        status: RunStatus::Running,
        ..Default::default()
    };

    let cancelling = {
        let controller = controller.clone();
        let build = build.clone();
        tokio::spawn(async move { actions::cancel_build(&controller, &build).await })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(controller.is_pending(7));

    let err = assert_err!(cancelling.await.unwrap());
    match &err {
        ConsoleError::ActionFailed { action, source } => {
            assert_eq!(action, "Cancel build");
            assert_eq!(source.status(), Some(409));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!controller.is_pending(7));
    assert!(h.transport.calls_to(Method::GET, "/builds").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_action_clears_pending() {
    let h = logged_in().await;
    h.transport.reply_once(
        Method::POST,
        "/builds/7/cancel",
        200,
        json!({ "message": "Build cancelled successfully" }),
        Duration::from_secs(5),
    );

    let controller = h.state.builds(BuildParams::default());
    let build = Build {
        id: 7,
        status: RunStatus::Running,
        ..Default::default()
    };

    let cancelling = {
        let controller = controller.clone();
        tokio::spawn(async move { actions::cancel_build(&controller, &build).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(controller.is_pending(7));

    cancelling.abort();
    assert!(cancelling.await.unwrap_err().is_cancelled());
    assert!(!controller.is_pending(7));
    assert!(h.transport.calls_to(Method::GET, "/builds").is_empty());
}

#[tokio::test]
async fn test_main_filter_matches_branch_or_tag() {
    let h = logged_in().await;
    h.transport.reply(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![
            build_json(1, "success", "Main", "", "api"),
            build_json(2, "success", "develop", "", "web"),
            build_json(3, "running", "hotfix", "main-2024.05", "web"),
            build_json(4, "failed", "feature/docs", "", "docs"),
        ]),
    );

    let controller = h.state.builds(BuildParams::default());
    assert_ok!(controller.refresh_now().await);
    controller.set_filter(BuildFilter::text("main").into_predicate());

    let visible: Vec<u64> = controller.visible().iter().map(|b| b.id).collect();
    assert_eq!(visible, vec![1, 3]);
}

#[tokio::test]
async fn test_rollback_only_successful_deployments() {
    let h = logged_in().await;
    h.transport.reply(
        Method::GET,
        "/deployments",
        200,
        deployments_body(vec![
            deployment_json(1, "success", "prod", "web"),
            deployment_json(2, "failed", "staging", "web"),
        ]),
    );
    h.transport.reply(
        Method::POST,
        "/deployments/1/rollback",
        200,
        json!({ "message": "Rollback initiated" }),
    );

    let controller = h.state.deployments(DeploymentParams::default());
    assert_ok!(controller.refresh_now().await);

    let failed = actions::find(&controller, 2).unwrap();
    assert_err!(actions::rollback_deployment(&controller, &failed).await);
    assert!(h
        .transport
        .calls_to(Method::POST, "/deployments/2/rollback")
        .is_empty());

    let succeeded = actions::find(&controller, 1).unwrap();
    assert_ok!(actions::rollback_deployment(&controller, &succeeded).await);
    assert_eq!(
        h.transport
            .calls_to(Method::POST, "/deployments/1/rollback")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_create_project_refreshes_projects() {
    let h = logged_in().await;
    h.transport.reply(
        Method::POST,
        "/projects",
        201,
        json!({ "message": "Project created", "project": { "id": 3, "name": "api" } }),
    );
    h.transport.reply(
        Method::GET,
        "/projects",
        200,
        json!({ "projects": [{ "id": 3, "name": "api" }] }),
    );

    let controller = h.state.projects();
    let request = CreateProjectRequest {
        name: "api".to_string(),
        description: String::new(),
        git_url: "https://git.example.com/api.git".to_string(),
        git_provider: "gitlab".to_string(),
    };
    let created = assert_ok!(actions::create_project(&controller, &request).await);
    assert_eq!(created.id, 3);
    assert_eq!(controller.items().len(), 1);

    let blank = CreateProjectRequest {
        name: "  ".to_string(),
        ..request
    };
    assert_err!(actions::create_project(&controller, &blank).await);
    assert_eq!(h.transport.calls_to(Method::POST, "/projects").len(), 1);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let h = logged_in().await;
    h.transport.reply(
        Method::GET,
        "/projects",
        200,
        json!({ "projects": [{ "id": 1 }, { "id": 2 }] }),
    );
    h.transport.reply(
        Method::GET,
        "/pipelines",
        200,
        json!({ "pipelines": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] }),
    );
    h.transport.reply(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![
            build_json(1, "running", "main", "", "api"),
            build_json(2, "running", "main", "", "api"),
            build_json(3, "failed", "main", "", "api"),
        ]),
    );
    h.transport.reply(
        Method::GET,
        "/deployments",
        200,
        deployments_body(vec![
            deployment_json(1, "success", "prod", "web"),
            deployment_json(2, "failed", "dev", "web"),
        ]),
    );

    let summary = assert_ok!(DashboardSummary::load(&h.state.gateway).await);
    assert_eq!(summary.projects, 2);
    assert_eq!(summary.pipelines, 3);
    assert_eq!(summary.running_builds, 2);
    assert_eq!(summary.successful_deployments, 1);
    assert_eq!(summary.recent_builds.len(), 3);
}

#[derive(Default)]
struct RecordingView {
    renders: Vec<Vec<u64>>,
    notifications: Vec<Notification>,
}

impl WatchView<Build> for RecordingView {
    fn render(&mut self, items: &[Build], _stale_error: Option<&str>) {
        self.renders.push(items.iter().map(|b| b.id).collect());
    }

    fn notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn test_watch_ends_on_session_expiry() {
    let h = logged_in().await;
    assert_eq!(h.state.session.wait_resolved().await, AuthStatus::Authenticated);

    h.transport.reply_once(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![build_json(1, "running", "main", "", "api")]),
        Duration::ZERO,
    );
    h.transport
        .reply(Method::GET, "/builds", 401, json!({ "error": "expired" }));

    let controller = h.state.builds(BuildParams::default());
    let mut view = RecordingView::default();
    let err = assert_err!(
        watch(&h.state, &controller, &mut view, std::future::pending::<()>()).await
    );

    assert!(err.is_auth_expired());
    assert!(controller.is_stopped());
    assert_eq!(view.renders.first(), Some(&vec![1]));
    assert!(!h.session_file_exists());
}

#[tokio::test(start_paused = true)]
async fn test_watch_stops_on_shutdown() {
    let h = logged_in().await;
    h.transport.reply(
        Method::GET,
        "/builds",
        200,
        builds_body(vec![build_json(1, "running", "main", "", "api")]),
    );

    let controller = h.state.builds(BuildParams::default());
    let mut view = RecordingView::default();
    let shutdown = tokio::time::sleep(Duration::from_secs(25));
    assert_ok!(watch(&h.state, &controller, &mut view, shutdown).await);

    assert!(controller.is_stopped());
    // initial load plus the ticks at 10s and 20s
    assert_eq!(h.transport.calls_to(Method::GET, "/builds").len(), 3);
    assert_eq!(view.renders.len(), 3);
    assert!(view.notifications.is_empty());
}
