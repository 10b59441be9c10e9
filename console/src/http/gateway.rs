//! Gateway: the single outbound path to the backend
//!
//! Every call goes through [`Gateway::send`], which
//! - attaches the session token (copied at call time),
//! - turns a 401 on an authenticated call into a session expiry,
//! - publishes any other failure to the [`Notifier`] before returning it,
//! - bounds the call with the configured timeout.
//!
//! The gateway never retries and never swallows an error.

use std::sync::Arc;
use std::time::Duration;

use api_models::models::{ErrorResponse, MessageResponse};
use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::authn::session::SessionStoreExt;
use crate::errors::ConsoleError;
use crate::http::client::{ApiRequest, RawResponse, Transport};
use crate::http::notifier::Notifier;

/// Message shown when the server gives nothing better
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Default upper bound for a single call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated, error-normalizing client shared by every component
pub struct Gateway {
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStoreExt>,
    notifier: Arc<Notifier>,
    timeout: Duration,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStoreExt>,
        notifier: Arc<Notifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            session,
            notifier,
            timeout,
        }
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request and decode the JSON body of a 2xx response
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ConsoleError> {
        let response = self.exchange(&request).await?;
        self.decode(&request, &response.body)
    }

    /// Send a request whose 2xx reply is a bare acknowledgement; an empty
    /// body is accepted
    pub async fn send_message(&self, request: ApiRequest) -> Result<MessageResponse, ConsoleError> {
        let response = self.exchange(&request).await?;
        if response.body.trim().is_empty() {
            return Ok(MessageResponse::default());
        }
        self.decode(&request, &response.body)
    }

    async fn exchange(&self, request: &ApiRequest) -> Result<RawResponse, ConsoleError> {
        let token = if request.anonymous {
            None
        } else {
            match self.session.current_token().await {
                Some(token) => Some(token),
                None => {
                    debug!("Refusing {} {} without a session", request.method, request.path);
                    return Err(ConsoleError::NotAuthenticated);
                }
            }
        };

        debug!("{} {}", request.method, request.path);

        let outcome =
            tokio::time::timeout(self.timeout, self.transport.execute(request, token.as_deref()))
                .await;

        let response = match outcome {
            Err(_) => {
                warn!(
                    "{} {} timed out after {:?}",
                    request.method, request.path, self.timeout
                );
                self.notifier.error(format!(
                    "Request timed out after {} seconds",
                    self.timeout.as_secs()
                ));
                return Err(ConsoleError::Timeout(self.timeout));
            }
            Ok(Err(e)) => {
                error!("{} {} failed: {}", request.method, request.path, e);
                let message = format!("Unable to reach the server: {}", e);
                self.notifier.error(message.clone());
                return Err(ConsoleError::RequestFailed {
                    status: None,
                    message,
                });
            }
            Ok(Ok(response)) => response,
        };

        if response.status == StatusCode::UNAUTHORIZED {
            if let Some(token) = token {
                warn!("{} {} rejected the session token", request.method, request.path);
                self.session.expire(&token).await;
                return Err(ConsoleError::AuthExpired(
                    extract_message(&response)
                        .unwrap_or_else(|| "session is no longer valid".to_string()),
                ));
            }
        }

        if !response.status.is_success() {
            let message =
                extract_message(&response).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            error!(
                "{} {} failed: {} - {}",
                request.method, request.path, response.status, message
            );
            self.notifier.error(message.clone());
            return Err(ConsoleError::RequestFailed {
                status: Some(response.status.as_u16()),
                message,
            });
        }

        Ok(response)
    }

    fn decode<T: DeserializeOwned>(&self, request: &ApiRequest, body: &str) -> Result<T, ConsoleError> {
        decode_body(body).map_err(|e| {
            error!("{} {} returned an unexpected body: {}", request.method, request.path, e);
            self.notifier.error("Unexpected response from the server");
            e
        })
    }
}

/// Human readable message of a failed response, if the body carries one
fn extract_message(response: &RawResponse) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(&response.body)
        .ok()
        .and_then(ErrorResponse::into_message)
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ConsoleError> {
    serde_json::from_str(body).map_err(|e| ConsoleError::Decode(e.to_string()))
}
