//! Content negotiation pass-through layer.
//!
//! Runs ahead of [`crate::serve`]: it records which encodings the client
//! accepts and, on the way out, labels responses that carry a compressed
//! artifact variant. Every other response passes through untouched.

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use fever_core::codec::parse_accept_encoding;
use fever_core::Encoding;

/// Encodings the client accepts, in the order it listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptedEncodings(pub Vec<Encoding>);

impl AcceptedEncodings {
    pub fn from_request(request: &Request) -> Self {
        let accepted = request
            .headers()
            .get_all(header::ACCEPT_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_accept_encoding)
            .collect();
        Self(accepted)
    }
}

/// Set by the serving handler on responses streaming an artifact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServedEncoding {
    pub encoding: Encoding,
    pub length: u64,
}

pub async fn negotiate(mut request: Request, next: Next) -> Response {
    let accepted = AcceptedEncodings::from_request(&request);
    request.extensions_mut().insert(accepted);

    let mut response = next.run(request).await;
    if let Some(served) = response.extensions_mut().remove::<ServedEncoding>() {
        label(&mut response, served);
    }
    response
}

fn label(response: &mut Response, served: ServedEncoding) {
    if served.encoding == Encoding::Identity {
        return;
    }
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(served.encoding.as_str()));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(served.length));
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
}
