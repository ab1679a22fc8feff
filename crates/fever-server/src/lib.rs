//! HTTP dispatch for Fever artifacts (Axum).
//!
//! [`mount`] layers the artifact handler and the content negotiation
//! pass-through onto any router. Requests that do not name a committed
//! artifact fall through to the router unchanged.

pub mod error;
pub mod headers;
pub mod negotiate;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    Router,
};
use error::ApiError;
use fever::{File, Fever, FileOptions, Snapshot};
use negotiate::{AcceptedEncodings, ServedEncoding};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// Router that serves `fever`'s artifacts and answers everything else 404.
pub fn app(fever: Arc<Fever>) -> Router {
    mount(Router::new().fallback(not_found), fever)
}

/// Layer the artifact handler onto `router`, with content negotiation
/// running ahead of it.
pub fn mount<S>(router: Router<S>, fever: Arc<Fever>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn_with_state(fever, serve))
        .layer(middleware::from_fn(negotiate::negotiate))
}

/// Serve the artifact named by a `GET` request's path, or hand the request on.
pub async fn serve(State(fever): State<Arc<Fever>>, request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }
    let Some(file) = fever.resolve(request.uri().path()) else {
        return next.run(request).await;
    };

    if fever.record_request(&file) {
        if let Err(e) = fever.cache().await {
            warn!(error = %e, "Failed to update the cache");
        }
    }

    let max_age = fever.config().max_age_secs;
    // Headers and body come from the same commit even if the file is
    // recompiled while this request is in flight.
    let Some(snapshot) = file.snapshot() else {
        return next.run(request).await;
    };
    if let Some(bytes) = fever.cached_fingerprint(&snapshot.fingerprint) {
        debug!(file = %file.id(), "hot cache hit");
        return respond(snapshot_headers(&snapshot, max_age), Body::from(bytes));
    }

    let accepted = request
        .extensions()
        .get::<AcceptedEncodings>()
        .map(|a| a.0.clone())
        .unwrap_or_default();
    match file.stream(&accepted).await {
        Ok(delivery) => {
            let served = ServedEncoding { encoding: delivery.encoding, length: delivery.length };
            let headers = snapshot_headers(&delivery.snapshot, max_age);
            let mut response = respond(headers, Body::from_stream(ReaderStream::new(delivery.stream)));
            response.extensions_mut().insert(served);
            response
        }
        Err(e) => {
            warn!(file = %file.id(), error = %e, "failed to open artifact, passing request on");
            next.run(request).await
        }
    }
}

fn snapshot_headers(snapshot: &Snapshot, max_age_secs: u64) -> axum::http::HeaderMap {
    headers::cache_headers(&snapshot.content_type, snapshot.sizes.raw, max_age_secs)
}

fn respond(headers: axum::http::HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = headers;
    response
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("no artifact at {}", uri.path()))
}

/// Compile each configured bundle into a registered file.
///
/// Bundles that fail to compile are logged and left out of the result; their
/// files stay registered and serve once a later recompute succeeds.
pub async fn compile(fever: &Fever) -> Vec<Arc<File>> {
    let mut compiled = Vec::new();
    for bundle in &fever.config().bundles {
        let file = match fever.create_file(bundle.clone(), FileOptions::default()) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "failed to register bundle");
                continue;
            }
        };
        match file.recompute().await {
            Ok(_) => {
                info!(url = file.url().as_deref().unwrap_or("(empty)"), fragments = bundle.len(), "bundle compiled");
                compiled.push(file);
            }
            Err(e) => warn!(error = %e, fragments = ?bundle, "failed to compile bundle"),
        }
    }
    compiled
}
