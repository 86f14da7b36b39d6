//! Typed JSON wrapper over the byte-oriented client.

use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::RequestSpec;
use crate::options::{set_type_json, RequestOption};
use crate::{Client, Error, Result};

/// A thin adapter that talks JSON: serializes the typed body, forces the
/// JSON content type, delegates to [`Client::execute`], and deserializes the
/// typed result.
///
/// Marshal failures surface as [`Error::Encode`] before any network call;
/// unmarshal failures surface as [`Error::Decode`]. An empty response body
/// yields `Ok(None)`.
///
/// # Examples
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use sturdyhttp::Client;
///
/// #[derive(Serialize)]
/// struct Hello {
///     hello: String,
/// }
///
/// #[derive(Deserialize)]
/// struct HelloResult {
///     errno: i32,
///     errmsg: String,
/// }
///
/// # async fn example() -> sturdyhttp::Result<()> {
/// let client = Client::builder().build()?;
/// let hello = Hello { hello: "world".to_string() };
///
/// let result: Option<HelloResult> = client
///     .json()
///     .post("https://api.example.com/hello", Some(&hello), vec![])
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JsonClient {
    client: Client,
}

impl JsonClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sends a GET request.
    pub async fn get<Res>(
        &self,
        url: impl Into<String>,
        options: Vec<RequestOption>,
    ) -> Result<Option<Res>>
    where
        Res: DeserializeOwned,
    {
        self.execute::<(), Res>(Method::GET, url, None, options).await
    }

    /// Sends a POST request with an optional typed body.
    pub async fn post<Req, Res>(
        &self,
        url: impl Into<String>,
        body: Option<&Req>,
        options: Vec<RequestOption>,
    ) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.execute(Method::POST, url, body, options).await
    }

    /// Sends a PUT request with an optional typed body.
    pub async fn put<Req, Res>(
        &self,
        url: impl Into<String>,
        body: Option<&Req>,
        options: Vec<RequestOption>,
    ) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.execute(Method::PUT, url, body, options).await
    }

    /// Sends a PATCH request with an optional typed body.
    pub async fn patch<Req, Res>(
        &self,
        url: impl Into<String>,
        body: Option<&Req>,
        options: Vec<RequestOption>,
    ) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.execute(Method::PATCH, url, body, options).await
    }

    /// Sends a DELETE request.
    pub async fn delete<Res>(
        &self,
        url: impl Into<String>,
        options: Vec<RequestOption>,
    ) -> Result<Option<Res>>
    where
        Res: DeserializeOwned,
    {
        self.execute::<(), Res>(Method::DELETE, url, None, options).await
    }

    /// Sends a request with any method, JSON in and JSON out.
    pub async fn execute<Req, Res>(
        &self,
        method: Method,
        url: impl Into<String>,
        body: Option<&Req>,
        mut options: Vec<RequestOption>,
    ) -> Result<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let payload = match body {
            Some(body) => Bytes::from(
                serde_json::to_vec(body).map_err(|e| Error::Encode(format!("json: {e}")))?,
            ),
            None => Bytes::new(),
        };

        // The forced content type goes last so it wins over caller options.
        options.push(set_type_json());

        let result = self
            .client
            .execute(RequestSpec::new(method, url).body(payload).options(options))
            .await?;

        if result.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&result)
            .map(Some)
            .map_err(|e| Error::Decode(format!("json: {e}")))
    }
}
