//! Dashboard summary over all collections

use api_models::models::{Build, Deployment, Pipeline, Project, RunStatus};
use tracing::debug;

use crate::errors::ConsoleError;
use crate::http::gateway::Gateway;

/// Number of recent builds and deployments shown on the dashboard
pub const RECENT_LIMIT: usize = 5;

/// Counters and recent activity shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    pub projects: usize,
    pub pipelines: usize,
    pub running_builds: usize,
    pub successful_deployments: usize,
    pub recent_builds: Vec<Build>,
    pub recent_deployments: Vec<Deployment>,
}

impl DashboardSummary {
    /// Fetch the four collections concurrently and summarize them
    pub async fn load(gateway: &Gateway) -> Result<Self, ConsoleError> {
        let (projects, pipelines, builds, deployments) = futures::try_join!(
            gateway.list_projects(),
            gateway.list_pipelines(None),
            gateway.list_builds(None),
            gateway.list_deployments(None, None),
        )?;

        debug!(
            "Dashboard loaded: {} projects, {} pipelines, {} builds, {} deployments",
            projects.len(),
            pipelines.len(),
            builds.len(),
            deployments.len()
        );

        Ok(Self::from_collections(
            &projects,
            &pipelines,
            builds,
            deployments,
        ))
    }

    pub fn from_collections(
        projects: &[Project],
        pipelines: &[Pipeline],
        mut builds: Vec<Build>,
        mut deployments: Vec<Deployment>,
    ) -> Self {
        let running_builds = builds
            .iter()
            .filter(|b| b.status == RunStatus::Running)
            .count();
        let successful_deployments = deployments
            .iter()
            .filter(|d| d.status == RunStatus::Success)
            .count();

        builds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        builds.truncate(RECENT_LIMIT);
        deployments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        deployments.truncate(RECENT_LIMIT);

        Self {
            projects: projects.len(),
            pipelines: pipelines.len(),
            running_builds,
            successful_deployments,
            recent_builds: builds,
            recent_deployments: deployments,
        }
    }
}

/// Status counters of the deployments view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeploymentStats {
    pub total: usize,
    pub success: usize,
    pub running: usize,
    pub failed: usize,
}

impl DeploymentStats {
    pub fn from_items(deployments: &[Deployment]) -> Self {
        deployments
            .iter()
            .fold(Self::default(), |mut stats, deployment| {
                stats.total += 1;
                match deployment.status {
                    RunStatus::Success => stats.success += 1,
                    RunStatus::Running => stats.running += 1,
                    RunStatus::Failed => stats.failed += 1,
                    RunStatus::Pending | RunStatus::Cancelled => {}
                }
                stats
            })
    }
}
