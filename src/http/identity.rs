//! Client identity resolution.

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Header carrying the proxy chain, client first.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Header carrying the client address as seen by a single proxy.
pub const REAL_IP: &str = "x-real-ip";
/// Identity used when no source yields an address.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Resolve the identity a request is rate limited under.
///
/// Precedence: the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// peer address of the connection, then `"unknown"`.
pub fn resolve_identity(request: &Request) -> String {
    let headers = request.headers();

    header_str(headers, FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .and_then(non_empty)
        .or_else(|| header_str(headers, REAL_IP).and_then(non_empty))
        .map(str::to_string)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
