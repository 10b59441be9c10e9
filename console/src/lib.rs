//! CI/CD Console Library
//!
//! Client core of the CI/CD console: session store, HTTP gateway, polling
//! resource controllers and the log viewer.

pub mod app;
pub mod authn;
pub mod dashboard;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod resources;
pub mod storage;
pub mod utils;
pub mod viewer;
pub mod workers;
