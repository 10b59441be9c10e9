//! Deployment API client

use api_models::models::{
    Deployment, DeploymentListResponse, DeploymentResponse, Environment, LogsResponse,
    MessageResponse,
};

use crate::errors::ConsoleError;
use crate::http::client::ApiRequest;
use crate::http::gateway::Gateway;

impl Gateway {
    /// List deployments, optionally narrowed to a build and/or an environment
    pub async fn list_deployments(
        &self,
        build_id: Option<u64>,
        environment: Option<Environment>,
    ) -> Result<Vec<Deployment>, ConsoleError> {
        let request = ApiRequest::get("/deployments")
            .query_opt("buildId", build_id)
            .query_opt("environment", environment);
        let response: DeploymentListResponse = self.send(request).await?;
        Ok(response.deployments)
    }

    /// Get a deployment by ID
    pub async fn get_deployment(&self, deployment_id: u64) -> Result<Deployment, ConsoleError> {
        let path = format!("/deployments/{}", deployment_id);
        let response: DeploymentResponse = self.send(ApiRequest::get(path)).await?;
        Ok(response.deployment)
    }

    /// Get the full log of a deployment
    pub async fn get_deployment_logs(&self, deployment_id: u64) -> Result<String, ConsoleError> {
        let path = format!("/deployments/{}/logs", deployment_id);
        let response: LogsResponse = self.send(ApiRequest::get(path)).await?;
        Ok(response.logs)
    }

    /// Roll a deployment back to its previous revision
    pub async fn rollback_deployment(
        &self,
        deployment_id: u64,
    ) -> Result<MessageResponse, ConsoleError> {
        let path = format!("/deployments/{}/rollback", deployment_id);
        self.send_message(ApiRequest::post(path)).await
    }
}
