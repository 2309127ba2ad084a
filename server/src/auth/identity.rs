//! Session presence against the store's auth endpoint.

use std::future::Future;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use shelf_engine::UserId;

use crate::remote::{HttpClient, RemoteError};

/// Source of the signed-in user.
pub trait Identity: Send + Sync + 'static {
    /// The current user, or `None` when no session is present.
    fn current_user(&self) -> impl Future<Output = Result<Option<UserId>, RemoteError>> + Send;

    /// End the session at the identity provider.
    fn sign_out(&self) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

/// [`Identity`] over the store's `/auth/v1` endpoints.
#[derive(Debug, Clone)]
pub struct HttpIdentity {
    http: HttpClient,
}

impl HttpIdentity {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl Identity for HttpIdentity {
    async fn current_user(&self) -> Result<Option<UserId>, RemoteError> {
        let request = self.http.request(Method::GET, "/auth/v1/user");

        match self.http.send(request).await {
            Ok(response) => {
                let user: UserResponse = response.json().await?;
                Ok(Some(user.id))
            }
            // An expired or revoked token means nobody is signed in.
            Err(RemoteError::Rejected { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        let request = self.http.request(Method::POST, "/auth/v1/logout");
        self.http.send(request).await?;
        Ok(())
    }
}
