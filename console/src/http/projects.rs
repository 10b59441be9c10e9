//! Project API client

use api_models::models::{
    CreateProjectRequest, Project, ProjectListResponse, ProjectResponse,
    UpdateProjectRequest,
};

use crate::errors::ConsoleError;
use crate::http::client::ApiRequest;
use crate::http::gateway::Gateway;

impl Gateway {
    /// List projects owned by the user
    pub async fn list_projects(&self) -> Result<Vec<Project>, ConsoleError> {
        let response: ProjectListResponse = self.send(ApiRequest::get("/projects")).await?;
        Ok(response.projects)
    }

    /// Get a project by ID
    pub async fn get_project(&self, project_id: u64) -> Result<Project, ConsoleError> {
        let path = format!("/projects/{}", project_id);
        let response: ProjectResponse = self.send(ApiRequest::get(path)).await?;
        Ok(response.project)
    }

    /// Create a project
    pub async fn create_project(&self, project: &CreateProjectRequest) -> Result<Project, ConsoleError> {
        let request = ApiRequest::post("/projects").json(project)?;
        let response: ProjectResponse = self.send(request).await?;
        Ok(response.project)
    }

    /// Update a project
    pub async fn update_project(
        &self,
        project_id: u64,
        changes: &UpdateProjectRequest,
    ) -> Result<Project, ConsoleError> {
        let path = format!("/projects/{}", project_id);
        let request = ApiRequest::put(path).json(changes)?;
        let response: ProjectResponse = self.send(request).await?;
        Ok(response.project)
    }

    /// Delete a project
    pub async fn delete_project(&self, project_id: u64) -> Result<(), ConsoleError> {
        let path = format!("/projects/{}", project_id);
        self.send_message(ApiRequest::delete(path)).await?;
        Ok(())
    }
}
