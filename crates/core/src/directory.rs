//! Client for the external user directory, which also issues login tokens.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::RequestError;
use crate::http::{build_client, check_status, decode, transport_error};
use crate::model::{Credentials, UserProfile};

const USERS_PER_PAGE: u32 = 12;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    data: Vec<UserProfile>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, credentials: &Credentials) -> Result<String, RequestError>;
    async fn register(&self, credentials: &Credentials) -> Result<(), RequestError>;
    async fn users(&self) -> Result<Vec<UserProfile>, RequestError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, RequestError> {
        let users = self.users().await?;
        Ok(find_user(users, email))
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl DirectoryClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.directory_url().to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl UserDirectory for DirectoryClient {
    async fn login(&self, credentials: &Credentials) -> Result<String, RequestError> {
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .json(credentials)
            .send()
            .await
            .map_err(|err| transport_error(err, self.timeout))?;
        let response = check_status(response, None).await?;
        let body: TokenResponse = decode(response).await?;
        Ok(body.token)
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), RequestError> {
        let response = self
            .client
            .post(format!("{}/register", self.base_url))
            .json(credentials)
            .send()
            .await
            .map_err(|err| transport_error(err, self.timeout))?;
        check_status(response, None).await?;
        Ok(())
    }

    async fn users(&self) -> Result<Vec<UserProfile>, RequestError> {
        let response = self
            .client
            .get(format!("{}/users", self.base_url))
            .query(&[("per_page", USERS_PER_PAGE)])
            .send()
            .await
            .map_err(|err| transport_error(err, self.timeout))?;
        let response = check_status(response, None).await?;
        let page: UsersPage = decode(response).await?;
        Ok(page.data)
    }
}

pub(crate) fn find_user(users: Vec<UserProfile>, email: &str) -> Option<UserProfile> {
    let email = email.trim();
    users
        .into_iter()
        .find(|user| user.email.eq_ignore_ascii_case(email))
}
