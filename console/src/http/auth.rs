//! Auth and profile API client

use api_models::models::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserResponse,
};

use crate::errors::ConsoleError;
use crate::http::client::ApiRequest;
use crate::http::gateway::Gateway;

impl Gateway {
    /// Exchange credentials for a token
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ConsoleError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = ApiRequest::post("/auth/login").json(&body)?.anonymous();
        self.send(request).await
    }

    /// Create a new account
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ConsoleError> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = ApiRequest::post("/auth/register").json(&body)?.anonymous();
        let response: UserResponse = self.send(request).await?;
        Ok(response.user)
    }

    /// Get the profile of the logged in user
    pub async fn get_profile(&self) -> Result<User, ConsoleError> {
        let response: UserResponse = self.send(ApiRequest::get("/users/profile")).await?;
        Ok(response.user)
    }

    /// Update the profile of the logged in user
    pub async fn update_profile(&self, changes: &UpdateProfileRequest) -> Result<User, ConsoleError> {
        let request = ApiRequest::put("/users/profile").json(changes)?;
        let response: UserResponse = self.send(request).await?;
        Ok(response.user)
    }
}
