use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

const IDENTITY_HOST: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("failed to build auth client")]
    Init(#[source] reqwest::Error),

    #[error("sign-in request failed")]
    Http(#[source] reqwest::Error),

    #[error("sign-in response was malformed: {0}")]
    Malformed(String),
}

/// Signed-in operator session. Passed explicitly to every admin call;
/// signing out is dropping the value.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Email/password sign-in collaborator gating the admin surface
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
}

/// Identity Toolkit REST implementation
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
}

impl FirebaseAuth {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(AuthError::Init)?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl AuthClient for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let endpoint = format!("{IDENTITY_HOST}/accounts:signInWithPassword");
        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true
            }))
            .send()
            .await
            .map_err(AuthError::Http)?;

        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            // the API reports wrong credentials as a 400
            return Err(AuthError::InvalidCredentials);
        }
        let body: Value = response.json().await.map_err(AuthError::Http)?;

        let user_id = body
            .get("localId")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::Malformed("missing localId".to_string()))?
            .to_string();
        let id_token = body
            .get("idToken")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::Malformed("missing idToken".to_string()))?
            .to_string();
        let expires_in: i64 = body
            .get("expiresIn")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        info!(email = %email, "operator signed in");
        Ok(Session {
            user_id,
            email: email.to_string(),
            id_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}
