//! Request log line with capability keys censored.
//!
//! Every request is logged with its method, path, status and client address.
//! Capability keys in the path are replaced with their hash, which is also
//! the storage address, so logs can be correlated without exposing keys.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use percent_encoding::percent_decode_str;

use crate::state::AppState;
use opencdn_crypto::HashAlgorithm;

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Top level segments that never carry a key in first position.
const STATIC_SEGMENTS: [&str; 2] = ["group", "authentication"];

pub async fn log_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = censor_path(req.uri().path(), state.engine.hash_algorithm());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client = client_address(req.headers(), peer, state.settings.proxy_redirecting);

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        client = %client,
        "Request"
    );
    response
}

/// Replace the capability key segment of an object path with its hash.
pub fn censor_path(path: &str, hash: HashAlgorithm) -> String {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let key_index = match segments.as_slice() {
        [first, _] if !STATIC_SEGMENTS.contains(first) => 0,
        [_, _, _] => 1,
        _ => return path.to_string(),
    };

    let mut censored: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
    let key = percent_decode_str(segments[key_index]).decode_utf8_lossy();
    censored[key_index] = hash.hash_hex(&key);
    format!("/{}", censored.join("/"))
}

/// Client address, from proxy headers when the server sits behind one.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>, proxied: bool) -> String {
    if proxied {
        let forwarded = headers
            .get(CF_CONNECTING_IP)
            .or_else(|| headers.get(X_FORWARDED_FOR))
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(address) = forwarded {
            return address.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
