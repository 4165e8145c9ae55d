//! Authenticated REST client for the backend services.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every call to a protected backend goes through `ApiClient::send`, which
//! asks the session manager for a bearer token (refreshing it when it is
//! about to expire) and reports 401s back so the session is invalidated in
//! one place.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures become `NetworkUnavailable` and leave the session
//! alone. 401 becomes `SessionExpired`, 403 becomes `Forbidden`, and any
//! other non-2xx becomes `Status` carrying the server's message.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::transport::{HttpRequest, HttpResponse, Method, Transport};
use crate::auth::manager::SessionManager;
use crate::error::ClientError;

fn request_failed_message(status: u16) -> String {
    format!("request failed: {status}")
}

/// Bearer-token HTTP client. Clones share the transport and session.
#[derive(Clone)]
pub struct ApiClient {
    transport: Rc<dyn Transport>,
    session: SessionManager,
}

impl ApiClient {
    pub fn new(transport: Rc<dyn Transport>, session: SessionManager) -> Self {
        Self { transport, session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send `request` with the current bearer token and map the status.
    ///
    /// # Errors
    ///
    /// See the module docs for the status mapping. Token renewal failures
    /// (`SessionExpired`, `Cancelled`) are returned before anything is sent.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let token = self.session.fresh_access_token().await?;
        let request = match token.as_deref() {
            Some(token) => request.bearer(token),
            None => request,
        };
        let method = request.method;
        let url = request.url.clone();

        let resp = self.transport.send(request).await.map_err(|e| {
            log::warn!("api: {} {url} got no response: {e}", method.as_str());
            ClientError::NetworkUnavailable(e.0)
        })?;

        match resp.status {
            401 => {
                if self.sent_current_token(token.as_deref()) {
                    log::info!("api: {} {url} returned 401; invalidating session", method.as_str());
                    self.session.invalidate();
                } else {
                    log::debug!("api: ignoring 401 for a token that was already replaced");
                }
                Err(ClientError::SessionExpired)
            }
            403 => Err(ClientError::Forbidden),
            status if !resp.is_success() => Err(ClientError::Status { status, message: error_message(&resp) }),
            _ => Ok(resp),
        }
    }

    /// # Errors
    ///
    /// As [`ApiClient::send`], plus `MalformedServerResponse` when the body
    /// does not decode into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let resp = self.send(HttpRequest::get(url)).await?;
        decode_payload(&resp)
    }

    /// # Errors
    ///
    /// See [`ApiClient::get_json`].
    pub async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::Post, url, body).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::get_json`].
    pub async fn put_json<T, B>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::Put, url, body).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn delete(&self, url: &str) -> Result<(), ClientError> {
        self.send(HttpRequest::new(Method::Delete, url)).await.map(|_| ())
    }

    async fn send_json<T, B>(&self, method: Method, url: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::MalformedServerResponse(format!("request body: {e}")))?;
        let request = HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .json_body(&body);
        let resp = self.send(request).await?;
        decode_payload(&resp)
    }

    /// A 401 only invalidates when it answers the token the session still
    /// holds; a request that raced a refresh must not sign the user out.
    fn sent_current_token(&self, sent: Option<&str>) -> bool {
        match sent {
            None => true,
            Some(sent) => self.session.session().access_token.as_deref() == Some(sent),
        }
    }
}

/// Decode a success body, unwrapping `{ success, data, message }` when the
/// service uses that envelope.
///
/// # Errors
///
/// `Status` for an envelope with `success: false`, `MalformedServerResponse`
/// when the payload does not decode.
pub fn decode_payload<T: DeserializeOwned>(resp: &HttpResponse) -> Result<T, ClientError> {
    let value: Value = if resp.body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&resp.body).map_err(|e| ClientError::MalformedServerResponse(e.to_string()))?
    };
    let payload = match unwrap_envelope(value) {
        Ok(payload) => payload,
        Err(message) => return Err(ClientError::Status { status: resp.status, message }),
    };
    serde_json::from_value(payload).map_err(|e| ClientError::MalformedServerResponse(e.to_string()))
}

fn unwrap_envelope(value: Value) -> Result<Value, String> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };
    let is_envelope =
        map.get("success").is_some_and(Value::is_boolean) && (map.contains_key("data") || map.contains_key("message"));
    if !is_envelope {
        return Ok(Value::Object(map));
    }
    if map.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(map.remove("data").unwrap_or(Value::Null));
    }
    Err(map
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or("An error occurred")
        .to_owned())
}

/// Server-provided error text from `message` or `error`, else a generic line.
fn error_message(resp: &HttpResponse) -> String {
    serde_json::from_str::<Value>(&resp.body)
        .ok()
        .and_then(|body| {
            ["message", "error"]
                .iter()
                .find_map(|key| body.get(key).and_then(Value::as_str).map(str::to_owned))
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| request_failed_message(resp.status))
}
