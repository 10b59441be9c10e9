//! Resource sources backed by the gateway

use std::sync::Arc;
use std::time::Duration;

use api_models::models::{Build, Deployment, Environment, Pipeline, Project};
use async_trait::async_trait;

use crate::errors::ConsoleError;
use crate::http::gateway::Gateway;
use crate::resources::controller::{ResourceController, ResourceSource};

pub type BuildController = ResourceController<BuildsSource>;
pub type DeploymentController = ResourceController<DeploymentsSource>;
pub type ProjectController = ResourceController<ProjectsSource>;
pub type PipelineController = ResourceController<PipelinesSource>;

/// Server-side parameters of the builds list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildParams {
    pub pipeline_id: Option<u64>,
}

/// Server-side parameters of the deployments list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentParams {
    pub build_id: Option<u64>,
    pub environment: Option<Environment>,
}

/// Server-side parameters of the pipelines list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineParams {
    pub project_id: Option<u64>,
}

macro_rules! gateway_source {
    ($name:ident) => {
        pub struct $name {
            gateway: Arc<Gateway>,
            interval: Option<Duration>,
        }

        impl $name {
            pub fn new(gateway: Arc<Gateway>, interval: Option<Duration>) -> Self {
                Self { gateway, interval }
            }

            pub fn gateway(&self) -> &Arc<Gateway> {
                &self.gateway
            }
        }
    };
}

gateway_source!(BuildsSource);
gateway_source!(DeploymentsSource);
gateway_source!(ProjectsSource);
gateway_source!(PipelinesSource);

#[async_trait]
impl ResourceSource for BuildsSource {
    type Item = Build;
    type Params = BuildParams;

    fn name(&self) -> &'static str {
        "builds"
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.interval
    }

    fn key(item: &Build) -> u64 {
        item.id
    }

    async fn fetch(&self, params: &BuildParams) -> Result<Vec<Build>, ConsoleError> {
        self.gateway.list_builds(params.pipeline_id).await
    }
}

#[async_trait]
impl ResourceSource for DeploymentsSource {
    type Item = Deployment;
    type Params = DeploymentParams;

    fn name(&self) -> &'static str {
        "deployments"
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.interval
    }

    fn key(item: &Deployment) -> u64 {
        item.id
    }

    async fn fetch(&self, params: &DeploymentParams) -> Result<Vec<Deployment>, ConsoleError> {
        self.gateway
            .list_deployments(params.build_id, params.environment)
            .await
    }
}

#[async_trait]
impl ResourceSource for ProjectsSource {
    type Item = Project;
    type Params = ();

    fn name(&self) -> &'static str {
        "projects"
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.interval
    }

    fn key(item: &Project) -> u64 {
        item.id
    }

    async fn fetch(&self, _params: &()) -> Result<Vec<Project>, ConsoleError> {
        self.gateway.list_projects().await
    }
}

#[async_trait]
impl ResourceSource for PipelinesSource {
    type Item = Pipeline;
    type Params = PipelineParams;

    fn name(&self) -> &'static str {
        "pipelines"
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.interval
    }

    fn key(item: &Pipeline) -> u64 {
        item.id
    }

    async fn fetch(&self, params: &PipelineParams) -> Result<Vec<Pipeline>, ConsoleError> {
        self.gateway.list_pipelines(params.project_id).await
    }
}
