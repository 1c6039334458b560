use reqwest::{Method, RequestBuilder, StatusCode, header};
use serde::de::DeserializeOwned;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// Base URL baked in at build time, if any.
const BUILD_BASE_URL: Option<&str> = option_env!("API_BASE_URL");

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// Sent url-encoded. Build the pairs with [`to_form_data`].
    Form(Vec<(String, String)>),
}

/// Per-request options. Anything left unset falls back to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub authorization: Option<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    pub fn query(
        mut self,
        key: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(pairs));
        self
    }
}

/// Stringify every value of a key/value list into form fields.
pub fn to_form_data<K, V>(
    pairs: impl IntoIterator<Item = (K, V)>,
) -> Vec<(String, String)>
where
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.to_string()))
        .collect()
}

/// A thin client over reqwest.
///
/// Paths starting with `/` are resolved against `base_url`; anything else is
/// sent as given. `authorization` is attached to every request unless the
/// request options carry their own.
#[derive(Clone, Default)]
pub struct ApiClient {
    pub base_url: Option<String>,
    pub authorization: Option<String>,
    pub inner_client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            authorization: None,
            inner_client: reqwest::Client::new(),
        }
    }

    /// Client configured from `API_BASE_URL` at build time. Without it,
    /// relative paths are sent unchanged.
    pub fn from_build_env() -> Self {
        Self {
            base_url: BUILD_BASE_URL.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_authorization(
        mut self,
        authorization: impl Into<String>,
    ) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    pub fn to_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') && !base.is_empty() => {
                format!("{}{url}", base.trim_end_matches('/'))
            }
            _ => url.to_string(),
        }
    }

    /// Prepare a request without sending it.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        opts: &RequestOptions,
    ) -> RequestBuilder {
        let mut request =
            self.inner_client.request(method, self.to_url(url));

        if let Some(authorization) =
            opts.authorization.as_ref().or(self.authorization.as_ref())
        {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        if !opts.query.is_empty() {
            request = request.query(&opts.query);
        }
        request = match &opts.body {
            Some(RequestBody::Json(body)) => request.json(body),
            Some(RequestBody::Form(pairs)) => request.form(pairs),
            None => request,
        };

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        opts: &RequestOptions,
    ) -> ReqwestResult {
        tracing::debug!(%method, url, "sending request");
        self.request(method, url, opts).send().await
    }
}

/// Helper methods for http actions
impl ApiClient {
    /// Send a request and deserialize the response body.
    pub async fn exec<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        opts: &RequestOptions,
    ) -> Result<T, ClientError> {
        let response = self.send(method, url, opts).await?;
        ok_body(response).await
    }

    /// Send a request whose response body is ignored.
    pub async fn exec_empty(
        &self,
        method: Method,
        url: &str,
        opts: &RequestOptions,
    ) -> Result<(), ClientError> {
        let response = self.send(method, url, opts).await?;
        ok_empty(response).await
    }

    /// GET never carries a body; one set on `opts` is dropped.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: &RequestOptions,
    ) -> Result<T, ClientError> {
        let opts = RequestOptions {
            body: None,
            ..opts.clone()
        };
        self.exec(Method::GET, url, &opts).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: &RequestOptions,
    ) -> Result<T, ClientError> {
        self.exec(Method::POST, url, opts).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: &RequestOptions,
    ) -> Result<T, ClientError> {
        self.exec(Method::PUT, url, opts).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: &RequestOptions,
    ) -> Result<T, ClientError> {
        self.exec(Method::DELETE, url, opts).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}
