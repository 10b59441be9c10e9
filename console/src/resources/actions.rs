//! User-triggered mutations
//!
//! Each action runs through [`ResourceController::perform`] on the controller owning the
//! affected list, so the item is reported as pending meanwhile and the list is refreshed
//! once the server accepted the change.

use api_models::models::{
    Build, CreatePipelineRequest, CreateProjectRequest, Deployment, MessageResponse, Pipeline,
    Project, RunStatus, UpdatePipelineRequest, UpdateProjectRequest,
};

use crate::errors::ConsoleError;
use crate::resources::controller::{ResourceController, ResourceSource};
use crate::resources::source::{
    BuildController, DeploymentController, PipelineController, ProjectController,
};

fn success_message(response: &MessageResponse, fallback: &str) -> String {
    if response.message.trim().is_empty() {
        fallback.to_string()
    } else {
        response.message.clone()
    }
}

/// Cancel a running build
pub async fn cancel_build(
    controller: &BuildController,
    build: &Build,
) -> Result<MessageResponse, ConsoleError> {
    if build.status != RunStatus::Running {
        return Err(ConsoleError::ValidationError(format!(
            "build #{} is {}, only running builds can be cancelled",
            build.id, build.status
        )));
    }

    let gateway = controller.source().gateway().clone();
    let response = controller
        .perform("Cancel build", Some(build.id), gateway.cancel_build(build.id))
        .await?;

    gateway
        .notifier()
        .success(success_message(&response, "Build cancelled"));
    Ok(response)
}

/// Roll back a successful deployment
pub async fn rollback_deployment(
    controller: &DeploymentController,
    deployment: &Deployment,
) -> Result<MessageResponse, ConsoleError> {
    if deployment.status != RunStatus::Success {
        return Err(ConsoleError::ValidationError(format!(
            "deployment #{} is {}, only successful deployments can be rolled back",
            deployment.id, deployment.status
        )));
    }

    let gateway = controller.source().gateway().clone();
    let response = controller
        .perform(
            "Rollback deployment",
            Some(deployment.id),
            gateway.rollback_deployment(deployment.id),
        )
        .await?;

    gateway
        .notifier()
        .success(success_message(&response, "Rollback initiated"));
    Ok(response)
}

/// Trigger a pipeline run
pub async fn run_pipeline(
    controller: &PipelineController,
    pipeline_id: u64,
) -> Result<MessageResponse, ConsoleError> {
    let gateway = controller.source().gateway().clone();
    let response = controller
        .perform(
            "Run pipeline",
            Some(pipeline_id),
            gateway.run_pipeline(pipeline_id),
        )
        .await?;

    gateway
        .notifier()
        .success(success_message(&response, "Pipeline started"));
    Ok(response)
}

pub async fn create_project(
    controller: &ProjectController,
    project: &CreateProjectRequest,
) -> Result<Project, ConsoleError> {
    if project.name.trim().is_empty() {
        return Err(ConsoleError::ValidationError(
            "project name is required".to_string(),
        ));
    }

    let gateway = controller.source().gateway().clone();
    let created = controller
        .perform("Create project", None, gateway.create_project(project))
        .await?;
    gateway.notifier().success("Project created");
    Ok(created)
}

pub async fn update_project(
    controller: &ProjectController,
    project_id: u64,
    changes: &UpdateProjectRequest,
) -> Result<Project, ConsoleError> {
    let gateway = controller.source().gateway().clone();
    let updated = controller
        .perform(
            "Update project",
            Some(project_id),
            gateway.update_project(project_id, changes),
        )
        .await?;
    gateway.notifier().success("Project updated");
    Ok(updated)
}

pub async fn delete_project(
    controller: &ProjectController,
    project_id: u64,
) -> Result<(), ConsoleError> {
    let gateway = controller.source().gateway().clone();
    controller
        .perform(
            "Delete project",
            Some(project_id),
            gateway.delete_project(project_id),
        )
        .await?;
    gateway.notifier().success("Project deleted");
    Ok(())
}

pub async fn create_pipeline(
    controller: &PipelineController,
    project_id: u64,
    pipeline: &CreatePipelineRequest,
) -> Result<Pipeline, ConsoleError> {
    if pipeline.name.trim().is_empty() {
        return Err(ConsoleError::ValidationError(
            "pipeline name is required".to_string(),
        ));
    }

    let gateway = controller.source().gateway().clone();
    let created = controller
        .perform(
            "Create pipeline",
            None,
            gateway.create_pipeline(project_id, pipeline),
        )
        .await?;
    gateway.notifier().success("Pipeline created");
    Ok(created)
}

pub async fn update_pipeline(
    controller: &PipelineController,
    pipeline_id: u64,
    changes: &UpdatePipelineRequest,
) -> Result<Pipeline, ConsoleError> {
    let gateway = controller.source().gateway().clone();
    let updated = controller
        .perform(
            "Update pipeline",
            Some(pipeline_id),
            gateway.update_pipeline(pipeline_id, changes),
        )
        .await?;
    gateway.notifier().success("Pipeline updated");
    Ok(updated)
}

pub async fn delete_pipeline(
    controller: &PipelineController,
    pipeline_id: u64,
) -> Result<(), ConsoleError> {
    let gateway = controller.source().gateway().clone();
    controller
        .perform(
            "Delete pipeline",
            Some(pipeline_id),
            gateway.delete_pipeline(pipeline_id),
        )
        .await?;
    gateway.notifier().success("Pipeline deleted");
    Ok(())
}

/// Look up an item of the current snapshot by id
pub fn find<S: ResourceSource>(controller: &ResourceController<S>, key: u64) -> Option<S::Item> {
    controller
        .items()
        .into_iter()
        .find(|item| S::key(item) == key)
}
