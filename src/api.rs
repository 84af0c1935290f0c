use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::model::{
    Category, CategoryTotal, Credential, Goal, GoalDraft, Loan, LoanDraft, Summary, Transaction,
    TransactionDraft, User,
};

/// Fixed message shown for every failed login.
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid username or password.";

/// Errors from the finance API boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("username already registered")]
    UsernameTaken,
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Server refused the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Operations the finance API offers. Protected calls take the session
/// credential explicitly.
///
/// Trait so screens can be driven by a stub in tests.
#[async_trait]
pub trait FinanceApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError>;
    async fn register(&self, username: &str, password: &str) -> Result<User, ApiError>;
    async fn current_user(&self, credential: &Credential) -> Result<User, ApiError>;

    async fn fetch_summary(&self, credential: &Credential) -> Result<Summary, ApiError>;
    async fn fetch_expense_by_category(
        &self,
        credential: &Credential,
    ) -> Result<Vec<CategoryTotal>, ApiError>;

    async fn fetch_transactions(&self, credential: &Credential)
        -> Result<Vec<Transaction>, ApiError>;
    async fn fetch_categories(&self, credential: &Credential) -> Result<Vec<Category>, ApiError>;
    async fn create_transaction(
        &self,
        credential: &Credential,
        draft: &TransactionDraft,
    ) -> Result<Transaction, ApiError>;

    async fn fetch_loans(&self, credential: &Credential) -> Result<Vec<Loan>, ApiError>;
    async fn create_loan(&self, credential: &Credential, draft: &LoanDraft)
        -> Result<Loan, ApiError>;

    async fn fetch_goals(&self, credential: &Credential) -> Result<Vec<Goal>, ApiError>;
    async fn create_goal(&self, credential: &Credential, draft: &GoalDraft)
        -> Result<Goal, ApiError>;
}

#[derive(Debug, Serialize)]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
}

/// HTTP implementation of [`FinanceApi`] using reqwest
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, credential: &Credential, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(credential.token())
    }

    fn post(&self, credential: &Credential, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(credential.token())
    }

    async fn request_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/token"))
            .form(&LoginForm { username, password })
            .send()
            .await?;
        read_json("/token", response).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
    ) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self.get(credential, path).send().await?;
        read_json(path, response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "POST");
        let response = self.post(credential, path).json(body).send().await?;
        read_json(path, response).await
    }
}

/// Decode a success body, or turn a non-success status into `ApiError::Status`.
async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = error_message(&body);
        warn!(path, status = status.as_u16(), %message, "request rejected");
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
}

/// Pull `detail` out of an error body if the server sent one.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            detail: Some(serde_json::Value::String(s)),
        }) => s,
        Ok(ErrorResponse {
            detail: Some(other),
        }) => other.to_string(),
        _ if body.is_empty() => "no response body".to_string(),
        _ => body.to_string(),
    }
}

#[async_trait]
impl FinanceApi for HttpApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        match self.request_token(username, password).await {
            Ok(token) => {
                info!(username, "login succeeded");
                Ok(Credential::new(token.access_token))
            }
            Err(e) => {
                warn!(username, error = %e, "login failed");
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    async fn register(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let response = self
            .client
            .post(self.url("/register"))
            .json(&RegisterRequest { username, password })
            .send()
            .await?;
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ApiError::UsernameTaken);
        }
        let user: User = read_json("/register", response).await?;
        info!(username = %user.username, "account registered");
        Ok(user)
    }

    async fn current_user(&self, credential: &Credential) -> Result<User, ApiError> {
        self.fetch_json(credential, "/users/me").await
    }

    async fn fetch_summary(&self, credential: &Credential) -> Result<Summary, ApiError> {
        self.fetch_json(credential, "/summary").await
    }

    async fn fetch_expense_by_category(
        &self,
        credential: &Credential,
    ) -> Result<Vec<CategoryTotal>, ApiError> {
        self.fetch_json(credential, "/charts/expense-by-category").await
    }

    async fn fetch_transactions(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Transaction>, ApiError> {
        self.fetch_json(credential, "/transactions").await
    }

    async fn fetch_categories(&self, credential: &Credential) -> Result<Vec<Category>, ApiError> {
        self.fetch_json(credential, "/categories").await
    }

    async fn create_transaction(
        &self,
        credential: &Credential,
        draft: &TransactionDraft,
    ) -> Result<Transaction, ApiError> {
        self.post_json(credential, "/transactions", draft).await
    }

    async fn fetch_loans(&self, credential: &Credential) -> Result<Vec<Loan>, ApiError> {
        self.fetch_json(credential, "/loans").await
    }

    async fn create_loan(
        &self,
        credential: &Credential,
        draft: &LoanDraft,
    ) -> Result<Loan, ApiError> {
        self.post_json(credential, "/loans", draft).await
    }

    async fn fetch_goals(&self, credential: &Credential) -> Result<Vec<Goal>, ApiError> {
        self.fetch_json(credential, "/goals").await
    }

    async fn create_goal(
        &self,
        credential: &Credential,
        draft: &GoalDraft,
    ) -> Result<Goal, ApiError> {
        self.post_json(credential, "/goals", draft).await
    }
}
