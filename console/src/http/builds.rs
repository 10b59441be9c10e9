//! Build API client

use api_models::models::{Build, BuildListResponse, BuildResponse, LogsResponse, MessageResponse};

use crate::errors::ConsoleError;
use crate::http::client::ApiRequest;
use crate::http::gateway::Gateway;

impl Gateway {
    /// List builds, optionally of one pipeline
    pub async fn list_builds(&self, pipeline_id: Option<u64>) -> Result<Vec<Build>, ConsoleError> {
        let request = ApiRequest::get("/builds").query_opt("pipelineId", pipeline_id);
        let response: BuildListResponse = self.send(request).await?;
        Ok(response.builds)
    }

    /// Get a build by ID
    pub async fn get_build(&self, build_id: u64) -> Result<Build, ConsoleError> {
        let path = format!("/builds/{}", build_id);
        let response: BuildResponse = self.send(ApiRequest::get(path)).await?;
        Ok(response.build)
    }

    /// Get the full log of a build
    pub async fn get_build_logs(&self, build_id: u64) -> Result<String, ConsoleError> {
        let path = format!("/builds/{}/logs", build_id);
        let response: LogsResponse = self.send(ApiRequest::get(path)).await?;
        Ok(response.logs)
    }

    /// Cancel a running build
    pub async fn cancel_build(&self, build_id: u64) -> Result<MessageResponse, ConsoleError> {
        let path = format!("/builds/{}/cancel", build_id);
        self.send_message(ApiRequest::post(path)).await
    }
}
