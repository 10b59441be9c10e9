//! Wire models for the CI/CD platform REST API

pub mod models;
