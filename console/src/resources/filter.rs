//! Client-side filters for the list views
//!
//! Text matching is a case-insensitive substring search; empty text matches
//! everything.

use std::sync::Arc;

use api_models::models::{Build, Deployment, Environment, Pipeline, Project};

use crate::resources::controller::Predicate;
use crate::utils::{contains_ci, search_needle};

fn any_field_matches<'a>(needle: &Option<String>, fields: impl IntoIterator<Item = &'a str>) -> bool {
    match needle {
        None => true,
        Some(needle) => fields.into_iter().any(|field| contains_ci(field, needle)),
    }
}

/// Builds matched by pipeline name, branch or tag
#[derive(Debug, Clone, Default)]
pub struct BuildFilter {
    pub text: String,
    pub pipeline_id: Option<u64>,
}

impl BuildFilter {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, build: &Build) -> bool {
        self.matches_needle(&search_needle(&self.text), build)
    }

    fn matches_needle(&self, needle: &Option<String>, build: &Build) -> bool {
        if self.pipeline_id.is_some_and(|id| build.pipeline_id != id) {
            return false;
        }

        let pipeline_name = build.pipeline.as_ref().map(|p| p.name.as_str());
        let fields = [
            pipeline_name,
            Some(build.branch.as_str()),
            build.tag.as_deref(),
        ];
        any_field_matches(needle, fields.into_iter().flatten())
    }

    pub fn into_predicate(self) -> Predicate<Build> {
        let needle = search_needle(&self.text);
        Arc::new(move |build| self.matches_needle(&needle, build))
    }
}

/// Deployments matched by service name, namespace or ingress host
#[derive(Debug, Clone, Default)]
pub struct DeploymentFilter {
    pub text: String,
    pub environment: Option<Environment>,
}

impl DeploymentFilter {
    pub fn matches(&self, deployment: &Deployment) -> bool {
        self.matches_needle(&search_needle(&self.text), deployment)
    }

    fn matches_needle(&self, needle: &Option<String>, deployment: &Deployment) -> bool {
        if self.environment.is_some_and(|env| deployment.environment != env) {
            return false;
        }

        let fields = [
            Some(deployment.service_name.as_str()),
            Some(deployment.namespace.as_str()),
            deployment.ingress_host.as_deref(),
        ];
        any_field_matches(needle, fields.into_iter().flatten())
    }

    pub fn into_predicate(self) -> Predicate<Deployment> {
        let needle = search_needle(&self.text);
        Arc::new(move |deployment| self.matches_needle(&needle, deployment))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub text: String,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.matches_needle(&search_needle(&self.text), project)
    }

    fn matches_needle(&self, needle: &Option<String>, project: &Project) -> bool {
        any_field_matches(
            needle,
            [
                project.name.as_str(),
                project.description.as_str(),
                project.git_url.as_str(),
            ],
        )
    }

    pub fn into_predicate(self) -> Predicate<Project> {
        let needle = search_needle(&self.text);
        Arc::new(move |project| self.matches_needle(&needle, project))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineFilter {
    pub text: String,
    pub project_id: Option<u64>,
}

impl PipelineFilter {
    pub fn matches(&self, pipeline: &Pipeline) -> bool {
        self.matches_needle(&search_needle(&self.text), pipeline)
    }

    fn matches_needle(&self, needle: &Option<String>, pipeline: &Pipeline) -> bool {
        if self.project_id.is_some_and(|id| pipeline.project_id != id) {
            return false;
        }

        any_field_matches(
            needle,
            [pipeline.name.as_str(), pipeline.description.as_str()],
        )
    }

    pub fn into_predicate(self) -> Predicate<Pipeline> {
        let needle = search_needle(&self.text);
        Arc::new(move |pipeline| self.matches_needle(&needle, pipeline))
    }
}
