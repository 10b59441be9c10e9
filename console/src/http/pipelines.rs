//! Pipeline API client

use api_models::models::{
    CreatePipelineRequest, MessageResponse, Pipeline, PipelineListResponse, PipelineResponse,
    UpdatePipelineRequest,
};

use crate::errors::ConsoleError;
use crate::http::client::ApiRequest;
use crate::http::gateway::Gateway;

impl Gateway {
    /// List pipelines, optionally of one project
    pub async fn list_pipelines(&self, project_id: Option<u64>) -> Result<Vec<Pipeline>, ConsoleError> {
        let request = ApiRequest::get("/pipelines").query_opt("projectId", project_id);
        let response: PipelineListResponse = self.send(request).await?;
        Ok(response.pipelines)
    }

    /// Get a pipeline by ID
    pub async fn get_pipeline(&self, pipeline_id: u64) -> Result<Pipeline, ConsoleError> {
        let path = format!("/pipelines/{}", pipeline_id);
        let response: PipelineResponse = self.send(ApiRequest::get(path)).await?;
        Ok(response.pipeline)
    }

    /// Create a pipeline in a project
    pub async fn create_pipeline(
        &self,
        project_id: u64,
        pipeline: &CreatePipelineRequest,
    ) -> Result<Pipeline, ConsoleError> {
        let request = ApiRequest::post("/pipelines")
            .query("projectId", project_id)
            .json(pipeline)?;
        let response: PipelineResponse = self.send(request).await?;
        Ok(response.pipeline)
    }

    /// Update a pipeline
    pub async fn update_pipeline(
        &self,
        pipeline_id: u64,
        changes: &UpdatePipelineRequest,
    ) -> Result<Pipeline, ConsoleError> {
        let path = format!("/pipelines/{}", pipeline_id);
        let request = ApiRequest::put(path).json(changes)?;
        let response: PipelineResponse = self.send(request).await?;
        Ok(response.pipeline)
    }

    /// Delete a pipeline
    pub async fn delete_pipeline(&self, pipeline_id: u64) -> Result<(), ConsoleError> {
        let path = format!("/pipelines/{}", pipeline_id);
        self.send_message(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Trigger a pipeline run
    pub async fn run_pipeline(&self, pipeline_id: u64) -> Result<MessageResponse, ConsoleError> {
        let path = format!("/pipelines/{}/run", pipeline_id);
        self.send_message(ApiRequest::post(path)).await
    }
}
