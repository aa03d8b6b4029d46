use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Credentials;
use crate::error::{JenkinsError, Result};

/// Thin authenticated wrapper over the Jenkins REST API.
///
/// Requests are issued one at a time; nothing here retries.
pub struct JenkinsClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl JenkinsClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jenkins-helpers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JenkinsError::Config(format!("Failed to create HTTP client: {e}")))?;

        Url::parse(base_url)
            .map_err(|e| JenkinsError::Config(format!("Invalid base URL {base_url}: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(creds.user(), Some(creds.secret())),
            None => request,
        }
    }

    /// GET `url` with the given query and decode the JSON body.
    pub async fn get_json<T>(&self, url: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url} {query:?}");
        let response = self
            .auth_request(self.client.get(url).query(query))
            .send()
            .await?;
        let response = ensure_success(url, response).await?;
        Ok(response.json().await?)
    }

    /// GET `url` and return the body as text (used for `config.xml`).
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let response = self.auth_request(self.client.get(url)).send().await?;
        let response = ensure_success(url, response).await?;
        Ok(response.text().await?)
    }

    /// POST with an empty body.
    pub async fn post(&self, url: &str) -> Result<()> {
        debug!("POST {url}");
        let response = self.auth_request(self.client.post(url)).send().await?;
        ensure_success(url, response).await?;
        Ok(())
    }

    /// POST an XML document as `text/xml`.
    pub async fn post_xml(&self, url: &str, query: &[(&str, &str)], body: Vec<u8>) -> Result<()> {
        debug!("POST {url} {query:?} ({} bytes)", body.len());
        let request = self
            .client
            .post(url)
            .query(query)
            .header(CONTENT_TYPE, "text/xml")
            .body(body);
        let response = self.auth_request(request).send().await?;
        ensure_success(url, response).await?;
        Ok(())
    }
}

async fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(JenkinsError::Api {
        status: status.as_u16(),
        message,
        url: url.to_string(),
    })
}

/// Joins `path` onto `base`, tolerating the trailing slash Jenkins puts on item URLs.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
