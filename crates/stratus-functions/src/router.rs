//! HTTP front door for function routes.
//!
//! Every registered [`RoutePattern`] is mounted as an axum route whose
//! method router carries only the verbs its function declared. Verbs a
//! route does not serve get 404, the same as paths no function claims.
//! Literal segments take precedence over placeholders, so `items/latest`
//! wins over `items/{id}` whatever the registration order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, Request};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, warn};

use crate::function::Function;
use crate::invoke::{HttpRequest, Trigger};
use crate::route::{RouteParams, RoutePattern};

/// Largest request body handed to a function.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// One function serving some verbs on one pattern.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: RoutePattern,
    pub methods: Vec<Method>,
    pub function: Arc<Function>,
}

/// Build the function router, optionally allowing cross-origin calls.
///
/// Entries sharing a pattern are merged into one method router; callers
/// must have rejected overlapping verbs and colliding patterns already.
pub fn build_router(entries: &[RouteEntry], cors: bool) -> Router {
    let mut paths: BTreeMap<String, MethodRouter> = BTreeMap::new();
    for entry in entries {
        let path = entry.pattern.to_string();
        let mut route = paths
            .remove(&path)
            .unwrap_or_else(|| MethodRouter::new().fallback(not_found));
        for method in &entry.methods {
            let Ok(filter) = MethodFilter::try_from(method.clone()) else {
                warn!(function = entry.function.name(), %method, "method cannot be routed");
                continue;
            };
            let function = entry.function.clone();
            route = route.on(
                filter,
                move |params: Result<Path<HashMap<String, String>>, PathRejection>, request: Request| {
                    invoke_http(function.clone(), params, request)
                },
            );
        }
        paths.insert(path, route);
    }

    let mut router = Router::new();
    for (path, route) in paths {
        router = router.route(&path, route);
    }
    let router = router.fallback(not_found).layer(CatchPanicLayer::new());
    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn not_found(method: Method, uri: Uri) -> StatusCode {
    debug!(%method, path = uri.path(), "no function route");
    StatusCode::NOT_FOUND
}

async fn invoke_http(
    function: Arc<Function>,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    request: Request,
) -> Response {
    let route_params: RouteParams = match params {
        Ok(Path(params)) => params.into_iter().collect(),
        Err(PathRejection::MissingPathParams(_)) => RouteParams::new(),
        Err(rejection) => {
            debug!(function = function.name(), error = %rejection, "route parameters rejected");
            return rejection.into_response();
        }
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(function = function.name(), error = %e, "request body rejected");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };
    let params = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(params)| params)
        .unwrap_or_default();

    let request = HttpRequest::new(parts.method, parts.uri.to_string())
        .with_headers(parts.headers)
        .with_params(params)
        .with_route_params(route_params)
        .with_body(body);

    let result = match function.invoke(Trigger::Http(request)).await {
        Ok(output) => output.into_response(function.name()),
        Err(e) => Err(e),
    };
    match result {
        Ok(response) => response,
        Err(e) => {
            error!(function = function.name(), error = %e, "http invocation failed");
            e.status().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path as FsPath;

    use axum::body::Body;
    use tower::ServiceExt;

    use stratus_core::Environment;
    use stratus_storage::BlobStore;

    use crate::handler::Handler;
    use crate::invoke::Invocation;
    use crate::manifest::Manifest;
    use crate::response::HandlerOutput;
    use crate::route::RouteTemplate;

    fn entry(dir: &FsPath, name: &str, route: &str, method: Method, reply: &'static str) -> RouteEntry {
        let manifest = Manifest::parse(
            FsPath::new("function.json"),
            r#"{"bindings": [{"type": "httpTrigger", "direction": "in", "name": "req",
                "route": "unused", "methods": ["get"]}]}"#,
        )
        .unwrap();
        let function = Function::new(
            &dir.join(name),
            manifest,
            Handler::new(move |_: Invocation| async move { anyhow::Ok(HandlerOutput::from(reply)) }),
            BlobStore::open(dir).unwrap(),
            Arc::new(Environment::default()),
        );
        RouteEntry {
            pattern: RouteTemplate::parse(route).unwrap().compile("/api").remove(0),
            methods: vec![method],
            function: Arc::new(function),
        }
    }

    async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, String) {
        let req = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn literal_route_beats_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(
            &[
                entry(dir.path(), "generic", "items/{id}", Method::GET, "generic"),
                entry(dir.path(), "special", "items/latest", Method::GET, "special"),
            ],
            false,
        );

        assert_eq!(call(&router, Method::GET, "/api/items/latest").await.1, "special");
        assert_eq!(call(&router, Method::GET, "/api/items/7").await.1, "generic");
        assert_eq!(call(&router, Method::GET, "/api/other").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn functions_share_a_path_by_verb() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(
            &[
                entry(dir.path(), "reader", "items/{id}", Method::GET, "read"),
                entry(dir.path(), "remover", "items/{id}", Method::DELETE, "removed"),
            ],
            false,
        );

        assert_eq!(call(&router, Method::GET, "/api/items/7").await.1, "read");
        assert_eq!(call(&router, Method::DELETE, "/api/items/7").await.1, "removed");
        assert_eq!(call(&router, Method::POST, "/api/items/7").await.0, StatusCode::NOT_FOUND);
    }
}
