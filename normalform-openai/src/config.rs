use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use normalform_core::{OutboundRequest, RequestHook};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, USER_AGENT,
};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{OpenAiClient, OpenAiError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const ORGANIZATION_HEADER: &str = "openai-organization";
const PROJECT_HEADER: &str = "openai-project";
const DEFAULT_USER_AGENT: &str = concat!("normalform/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Default)]
pub struct OpenAiClientBuilder {
    base_url: Option<String>,
    api_key: Option<SecretString>,
    organization: Option<String>,
    project: Option<String>,
    timeout: Option<Duration>,
    default_headers: Vec<(String, String)>,
    hooks: Vec<Arc<dyn RequestHook>>,
}

impl fmt::Debug for OpenAiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };

        f.debug_struct("OpenAiClientBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &api_key)
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("timeout", &self.timeout)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl OpenAiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded from `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `OPENAI_ORG_ID` and `OPENAI_PROJECT_ID`. Unset variables are skipped.
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            builder = builder.api_key(api_key);
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        if let Ok(organization) = std::env::var("OPENAI_ORG_ID") {
            builder = builder.organization(organization);
        }
        if let Ok(project) = std::env::var("OPENAI_PROJECT_ID") {
            builder = builder.project(project);
        }
        builder
    }

    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = Some(value.into());
        self
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.api_key = if value.trim().is_empty() {
            None
        } else {
            Some(SecretString::new(value))
        };
        self
    }

    pub fn organization(mut self, value: impl Into<String>) -> Self {
        self.organization = Some(value.into());
        self
    }

    pub fn project(mut self, value: impl Into<String>) -> Self {
        self.project = Some(value.into());
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    /// Header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Registers a hook; hooks run in registration order.
    pub fn hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn build(self) -> Result<OpenAiClient, OpenAiError> {
        let settings = self.into_settings()?;
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(OpenAiClient::from_parts(http, settings))
    }

    #[cfg(feature = "blocking")]
    pub fn build_blocking(self) -> Result<crate::BlockingOpenAiClient, OpenAiError> {
        let settings = self.into_settings()?;
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(crate::BlockingOpenAiClient::from_parts(http, settings))
    }

    fn into_settings(self) -> Result<ClientSettings, OpenAiError> {
        let api_key = self.api_key.ok_or(OpenAiError::MissingApiKey)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        Url::parse(&base_url).map_err(|err| OpenAiError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: err.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        let mut bearer = header_value(
            AUTHORIZATION.as_str(),
            &format!("Bearer {}", api_key.expose_secret()),
        )?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        if let Some(organization) = &self.organization {
            insert_header(&mut headers, ORGANIZATION_HEADER, organization)?;
        }
        if let Some(project) = &self.project {
            insert_header(&mut headers, PROJECT_HEADER, project)?;
        }
        for (name, value) in &self.default_headers {
            insert_header(&mut headers, name, value)?;
        }

        Ok(ClientSettings {
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            headers,
            hooks: self.hooks,
        })
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, OpenAiError> {
    HeaderValue::from_str(value).map_err(|err| OpenAiError::InvalidHeader {
        name: name.to_string(),
        reason: err.to_string(),
    })
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), OpenAiError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|err| OpenAiError::InvalidHeader {
            name: name.to_string(),
            reason: err.to_string(),
        })?;
    headers.insert(header_name, header_value(name, value)?);
    Ok(())
}

/// Settings shared by the async and blocking clients.
#[derive(Clone)]
pub(crate) struct ClientSettings {
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    pub(crate) headers: HeaderMap,
    pub(crate) hooks: Vec<Arc<dyn RequestHook>>,
}

impl ClientSettings {
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Runs every hook against the request about to be sent. A panicking hook
    /// is logged and skipped; it never reaches the caller.
    pub(crate) fn observe(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) {
        // The transport adds content-length after this point; hooks see it
        // as it will go out.
        let with_length;
        let headers = match body {
            Some(bytes) if !headers.contains_key(CONTENT_LENGTH) => {
                let mut copy = headers.clone();
                copy.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                with_length = copy;
                &with_length
            }
            _ => headers,
        };
        let request = OutboundRequest {
            method,
            url,
            base_url: &self.base_url,
            headers,
            body,
        };
        for hook in &self.hooks {
            if catch_unwind(AssertUnwindSafe(|| hook.on_request(&request))).is_err() {
                tracing::warn!(url = %url, "request hook panicked; sending request anyway");
            }
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
