//! Handler results and their translation into HTTP responses.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::warn;

use crate::error::{FunctionError, FunctionResult};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Text(String),
    Binary(Bytes),
}

/// A structured HTTP response returned by a handler.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    body: ResponseBody,
    status: StatusCode,
    headers: HeaderMap,
    mimetype: Option<String>,
}

impl HttpResponse {
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_body(ResponseBody::Text(body.into()))
    }

    pub fn binary(body: impl Into<Bytes>) -> Self {
        Self::with_body(ResponseBody::Binary(body.into()))
    }

    /// A `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::text("").status(StatusCode::FOUND);
        if let Ok(value) = HeaderValue::from_str(location) {
            response.headers.insert(LOCATION, value);
        }
        response
    }

    fn with_body(body: ResponseBody) -> Self {
        Self {
            body,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            mimetype: None,
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }
}

/// What a handler produced.
#[derive(Debug, Clone)]
pub enum HandlerOutput {
    PlainText(String),
    Structured(HttpResponse),
    /// The handler returned nothing; normal for queue and timer triggers.
    None,
}

impl From<String> for HandlerOutput {
    fn from(body: String) -> Self {
        Self::PlainText(body)
    }
}

impl From<&str> for HandlerOutput {
    fn from(body: &str) -> Self {
        Self::PlainText(body.to_string())
    }
}

impl From<HttpResponse> for HandlerOutput {
    fn from(response: HttpResponse) -> Self {
        Self::Structured(response)
    }
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl HandlerOutput {
    /// Translate into an HTTP response.
    ///
    /// Fails only for a redirect status without a `Location` header.
    pub fn into_response(self, function: &str) -> FunctionResult<Response> {
        match self {
            Self::PlainText(body) => Ok(([(CONTENT_TYPE, TEXT_PLAIN)], body).into_response()),
            Self::Structured(response) => structured(response),
            Self::None => {
                warn!(%function, "handler returned no response, answering ok");
                Ok(([(CONTENT_TYPE, TEXT_PLAIN)], "ok").into_response())
            }
        }
    }
}

fn structured(response: HttpResponse) -> FunctionResult<Response> {
    let HttpResponse {
        body,
        status,
        headers,
        mimetype,
    } = response;

    if status.is_redirection() {
        let location = headers
            .get(LOCATION)
            .cloned()
            .ok_or(FunctionError::MissingLocation)?;
        return Ok((status, [(LOCATION, location)]).into_response());
    }

    let (body, default_type) = match body {
        ResponseBody::Text(text) => (Body::from(text), TEXT_PLAIN),
        ResponseBody::Binary(bytes) => (Body::from(bytes), OCTET_STREAM),
    };
    let content_type = mimetype
        .and_then(|m| HeaderValue::from_str(&m).ok())
        .unwrap_or(HeaderValue::from_static(default_type));

    let mut out = (status, body).into_response();
    out.headers_mut().extend(headers);
    out.headers_mut().insert(CONTENT_TYPE, content_type);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn plain_text_is_200() {
        let response = HandlerOutput::from("Hello.\n").into_response("f").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(body_of(response).await, "Hello.\n");
    }

    #[tokio::test]
    async fn redirect_uses_location() {
        let response = HandlerOutput::from(HttpResponse::redirect("/api/elsewhere"))
            .into_response("f")
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/api/elsewhere");
    }

    #[test]
    fn redirect_keeps_handler_status() {
        for status in [
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::SEE_OTHER,
            StatusCode::TEMPORARY_REDIRECT,
            StatusCode::PERMANENT_REDIRECT,
        ] {
            let redirect = HttpResponse::text("ignored")
                .status(status)
                .header(LOCATION, HeaderValue::from_static("/new"));
            let response = HandlerOutput::from(redirect).into_response("f").unwrap();
            assert_eq!(response.status(), status);
            assert_eq!(response.headers()[LOCATION], "/new");
        }
    }

    #[test]
    fn redirect_without_location_fails() {
        let bare = HttpResponse::text("").status(StatusCode::TEMPORARY_REDIRECT);
        assert!(matches!(
            HandlerOutput::from(bare).into_response("f"),
            Err(FunctionError::MissingLocation)
        ));
    }

    #[tokio::test]
    async fn text_keeps_status_headers_and_mimetype() {
        let response = HttpResponse::text("{\"error\":\"nope\"}")
            .status(StatusCode::BAD_REQUEST)
            .mimetype("application/json")
            .header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            );
        let response = HandlerOutput::from(response).into_response("f").unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["x-request-id"], "abc");
        assert_eq!(body_of(response).await, "{\"error\":\"nope\"}");
    }

    #[tokio::test]
    async fn binary_defaults_to_octet_stream() {
        let response = HandlerOutput::from(HttpResponse::binary(vec![0u8, 1, 2]))
            .into_response("f")
            .unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], OCTET_STREAM);
        assert_eq!(body_of(response).await.as_ref(), &[0u8, 1, 2]);

        let png = HttpResponse::binary(&b"\x89PNG"[..]).mimetype("image/png");
        let response = HandlerOutput::from(png).into_response("f").unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn nothing_becomes_ok() {
        let response = HandlerOutput::None.into_response("f").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "ok");
    }
}
