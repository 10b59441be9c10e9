//! CI/CD Console - Entry Point
//!
//! Terminal client for the CI/CD platform: login, dashboard, live build and
//! deployment views, logs and the usual actions.

use std::collections::HashMap;
use std::env;

use api_models::models::{Build, Deployment, Environment, RunStatus};
use cicd_console::app::options::AppOptions;
use cicd_console::app::run::{ensure_authenticated, watch, WatchView};
use cicd_console::app::state::AppState;
use cicd_console::dashboard::{DashboardSummary, DeploymentStats};
use cicd_console::errors::ConsoleError;
use cicd_console::http::notifier::{Notification, Severity};
use cicd_console::logs::{init_logging, LogOptions};
use cicd_console::resources::actions;
use cicd_console::resources::filter::{BuildFilter, DeploymentFilter};
use cicd_console::resources::source::{BuildParams, DeploymentParams, PipelineParams};
use cicd_console::storage::layout::StorageLayout;
use cicd_console::storage::settings::Settings;
use cicd_console::utils::version_info;
use cicd_console::viewer::logs::{LogTarget, ViewerState};

use colored::{ColoredString, Colorize};
use tracing::{error, info};

const USAGE: &str = "\
Usage: cicd-console <command> [--dir=<storage dir>]

Commands:
  --version
  --login --username=<name> --password=<password>
  --register --username=<name> --email=<email> --password=<password>
  --logout
  --whoami
  --dashboard
  --watch=builds [--pipeline=<id>] [--filter=<text>]
  --watch=deployments [--environment=dev|staging|prod] [--filter=<text>]
  --logs=build:<id>|deployment:<id>
  --cancel-build=<id>
  --rollback=<id>
  --run-pipeline=<id>";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to print version: {e}"),
        }
        return;
    }

    let layout = match cli_args.get("dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file, defaults when there is none
    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                std::process::exit(2);
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_to_file.then(|| layout.logs_dir()),
        json_format: settings.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from_settings(&settings, layout);
    info!("Running CI/CD console with options: {:?}", options);

    let state = match AppState::init(options) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    if let Err(e) = dispatch(&state, &cli_args).await {
        error!("Command failed: {e}");
        eprintln!("{} {}", "error:".red().bold(), e);
        if e.is_auth_expired() || matches!(e, ConsoleError::NotAuthenticated) {
            eprintln!("Run: cicd-console --login --username=<name> --password=<password>");
        }
        std::process::exit(1);
    }
}

async fn dispatch(state: &AppState, cli_args: &HashMap<String, String>) -> Result<(), ConsoleError> {
    if cli_args.contains_key("login") {
        let username = required(cli_args, "username")?;
        let password = required(cli_args, "password")?;
        let user = state.session.login(&state.gateway, username, password).await?;
        println!("Logged in as {}", user.username.bold());
        return Ok(());
    }

    if cli_args.contains_key("register") {
        let user = state
            .session
            .register(
                &state.gateway,
                required(cli_args, "username")?,
                required(cli_args, "email")?,
                required(cli_args, "password")?,
            )
            .await?;
        println!("Registered {}, you can now login", user.username.bold());
        return Ok(());
    }

    if cli_args.contains_key("logout") {
        state.session.restore().await;
        state.session.logout().await;
        println!("Logged out");
        return Ok(());
    }

    // Everything below needs a session
    if cli_args.contains_key("whoami") {
        let cached = ensure_authenticated(state).await?;
        let user = state
            .session
            .refresh_profile(&state.gateway)
            .await
            .unwrap_or(cached);
        println!("{} <{}> ({})", user.username.bold(), user.email, user.role);
        return Ok(());
    }

    if cli_args.contains_key("dashboard") {
        ensure_authenticated(state).await?;
        let summary = DashboardSummary::load(&state.gateway).await?;
        print_dashboard(&summary);
        return Ok(());
    }

    if let Some(resource) = cli_args.get("watch") {
        ensure_authenticated(state).await?;
        let filter_text = cli_args.get("filter").cloned().unwrap_or_default();

        return match resource.as_str() {
            "builds" => {
                let params = BuildParams {
                    pipeline_id: optional_id(cli_args, "pipeline")?,
                };
                let controller = state.builds(params);
                controller.set_filter(BuildFilter::text(filter_text).into_predicate());
                watch(state, &controller, &mut TerminalView, await_shutdown_signal()).await
            }
            "deployments" => {
                let environment = cli_args
                    .get("environment")
                    .map(|env| env.parse::<Environment>())
                    .transpose()
                    .map_err(ConsoleError::ValidationError)?;
                let controller = state.deployments(DeploymentParams {
                    build_id: optional_id(cli_args, "build")?,
                    environment,
                });
                controller.set_filter(
                    DeploymentFilter {
                        text: filter_text,
                        environment: None,
                    }
                    .into_predicate(),
                );
                watch(state, &controller, &mut TerminalView, await_shutdown_signal()).await
            }
            other => Err(ConsoleError::ValidationError(format!(
                "Cannot watch '{}', expected builds or deployments",
                other
            ))),
        };
    }

    if let Some(target) = cli_args.get("logs") {
        let target: LogTarget = target.parse()?;
        ensure_authenticated(state).await?;

        let viewer = state.log_viewer();
        match viewer.open(target).await {
            ViewerState::Loaded { text, .. } => println!("{}", text),
            ViewerState::Failed { text, .. } => {
                return Err(ConsoleError::RequestFailed { status: None, message: text });
            }
            _ => {}
        }
        viewer.close();
        return Ok(());
    }

    if let Some(id) = cli_args.get("cancel-build") {
        let id = parse_id(id, "cancel-build")?;
        ensure_authenticated(state).await?;

        let controller = state.builds(BuildParams::default());
        let build = state.gateway.get_build(id).await?;
        let response = actions::cancel_build(&controller, &build).await?;
        println!("{}", response.message);
        return Ok(());
    }

    if let Some(id) = cli_args.get("rollback") {
        let id = parse_id(id, "rollback")?;
        ensure_authenticated(state).await?;

        let controller = state.deployments(DeploymentParams::default());
        let deployment = state.gateway.get_deployment(id).await?;
        let response = actions::rollback_deployment(&controller, &deployment).await?;
        println!("{}", response.message);
        return Ok(());
    }

    if let Some(id) = cli_args.get("run-pipeline") {
        let id = parse_id(id, "run-pipeline")?;
        ensure_authenticated(state).await?;

        let controller = state.pipelines(PipelineParams::default());
        let response = actions::run_pipeline(&controller, id).await?;
        println!("{}", response.message);
        return Ok(());
    }

    println!("{}", USAGE);
    Ok(())
}

fn required<'a>(cli_args: &'a HashMap<String, String>, key: &str) -> Result<&'a str, ConsoleError> {
    cli_args
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConsoleError::ValidationError(format!("--{}=<value> is required", key)))
}

fn parse_id(value: &str, key: &str) -> Result<u64, ConsoleError> {
    value
        .parse()
        .map_err(|_| ConsoleError::ValidationError(format!("--{} expects a numeric id", key)))
}

fn optional_id(cli_args: &HashMap<String, String>, key: &str) -> Result<Option<u64>, ConsoleError> {
    cli_args.get(key).map(|value| parse_id(value, key)).transpose()
}

/// Status word padded to `width`, padding applied before coloring
fn paint(status: RunStatus, width: usize) -> ColoredString {
    let text = format!("{:<width$}", status.as_str());
    match status {
        RunStatus::Success => text.green(),
        RunStatus::Failed => text.red(),
        RunStatus::Running => text.yellow(),
        RunStatus::Pending => text.blue(),
        RunStatus::Cancelled => text.dimmed(),
    }
}

fn build_line(build: &Build) -> String {
    let pipeline = build
        .pipeline
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("-");
    let duration = if build.status.is_terminal() {
        build
            .duration()
            .map(|d| format!("{}s", d.num_seconds()))
            .unwrap_or_default()
    } else {
        "-".to_string()
    };

    format!(
        "#{:<5} {} {:<20} {:<24} {:<8} {:<6} {}",
        build.id,
        paint(build.status, 10),
        pipeline,
        build.git_ref(),
        build.short_commit(),
        duration,
        build.image()
    )
}

fn deployment_line(deployment: &Deployment) -> String {
    format!(
        "#{:<5} {} {:<8} {:<24} {:<16} {}/{}",
        deployment.id,
        paint(deployment.status, 10),
        deployment.environment,
        deployment.service_name,
        deployment.namespace,
        deployment.replicas,
        deployment.ingress_host.as_deref().unwrap_or("-")
    )
}

fn print_dashboard(summary: &DashboardSummary) {
    println!("{}", "Dashboard".bold());
    println!("  Projects:               {}", summary.projects);
    println!("  Pipelines:              {}", summary.pipelines);
    println!("  Running builds:         {}", summary.running_builds);
    println!("  Successful deployments: {}", summary.successful_deployments);

    println!("\n{}", "Recent builds".bold());
    for build in &summary.recent_builds {
        println!("  {}", build_line(build));
    }

    println!("\n{}", "Recent deployments".bold());
    for deployment in &summary.recent_deployments {
        println!("  {}", deployment_line(deployment));
    }
}

/// Live view printing each snapshot to stdout
struct TerminalView;

impl TerminalView {
    fn header(title: &str, count: usize, stale_error: Option<&str>) {
        println!(
            "\n{} ({}) {}",
            title.bold(),
            count,
            chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
        );
        if let Some(error) = stale_error {
            println!("{} {}", "showing last known data:".yellow(), error);
        }
    }

    fn print_notification(notification: &Notification) {
        match notification.severity {
            Severity::Error => eprintln!("{} {}", "!".red().bold(), notification.message),
            Severity::Success => eprintln!("{} {}", "✓".green().bold(), notification.message),
        }
    }
}

impl WatchView<Build> for TerminalView {
    fn render(&mut self, builds: &[Build], stale_error: Option<&str>) {
        Self::header("Builds", builds.len(), stale_error);
        for build in builds {
            println!("{}", build_line(build));
        }
    }

    fn notify(&mut self, notification: &Notification) {
        Self::print_notification(notification);
    }
}

impl WatchView<Deployment> for TerminalView {
    fn render(&mut self, deployments: &[Deployment], stale_error: Option<&str>) {
        let stats = DeploymentStats::from_items(deployments);
        Self::header("Deployments", deployments.len(), stale_error);
        println!(
            "{} success, {} running, {} failed",
            stats.success.to_string().green(),
            stats.running.to_string().yellow(),
            stats.failed.to_string().red()
        );
        for deployment in deployments {
            println!("{}", deployment_line(deployment));
        }
    }

    fn notify(&mut self, notification: &Notification) {
        Self::print_notification(notification);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
