//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::session::SessionStore;
use crate::errors::ConsoleError;
use crate::http::client::{HttpClient, Transport};
use crate::http::gateway::Gateway;
use crate::http::notifier::Notifier;
use crate::resources::controller::ResourceController;
use crate::resources::source::{
    BuildController, BuildParams, BuildsSource, DeploymentController, DeploymentParams,
    DeploymentsSource, PipelineController, PipelineParams, PipelinesSource, ProjectController,
    ProjectsSource,
};
use crate::viewer::logs::LogViewer;

/// Shared state of one console process
pub struct AppState {
    pub options: AppOptions,

    /// Notification channel fed by the gateway
    pub notifier: Arc<Notifier>,

    /// Session store for authentication
    pub session: Arc<SessionStore>,

    /// Gateway every component talks to the backend through
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Initialize application state with the HTTP transport
    pub fn init(options: AppOptions) -> Result<Self, ConsoleError> {
        let transport = Arc::new(HttpClient::new(&options.backend_base_url)?);
        Ok(Self::with_transport(options, transport))
    }

    /// Initialize application state over any transport
    pub fn with_transport(options: AppOptions, transport: Arc<dyn Transport>) -> Self {
        info!("Initializing application state...");

        let notifier = Arc::new(Notifier::new(options.notification_capacity));
        let session = Arc::new(SessionStore::new(options.layout.session_file()));
        let gateway = Arc::new(Gateway::new(
            transport,
            session.clone(),
            notifier.clone(),
            options.request_timeout,
        ));

        Self {
            options,
            notifier,
            session,
            gateway,
        }
    }

    pub fn builds(&self, params: BuildParams) -> BuildController {
        ResourceController::with_params(
            BuildsSource::new(self.gateway.clone(), self.options.refresh.builds),
            params,
        )
    }

    pub fn deployments(&self, params: DeploymentParams) -> DeploymentController {
        ResourceController::with_params(
            DeploymentsSource::new(self.gateway.clone(), self.options.refresh.deployments),
            params,
        )
    }

    pub fn projects(&self) -> ProjectController {
        ResourceController::new(ProjectsSource::new(
            self.gateway.clone(),
            self.options.refresh.projects,
        ))
    }

    pub fn pipelines(&self, params: PipelineParams) -> PipelineController {
        ResourceController::with_params(
            PipelinesSource::new(self.gateway.clone(), self.options.refresh.pipelines),
            params,
        )
    }

    pub fn log_viewer(&self) -> LogViewer {
        LogViewer::new(self.gateway.clone())
    }
}
