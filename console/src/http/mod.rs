pub mod auth;
pub mod builds;
pub mod client;
pub mod deployments;
pub mod gateway;
pub mod notifier;
pub mod pipelines;
pub mod projects;
