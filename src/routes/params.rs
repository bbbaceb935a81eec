// Request parameter helpers: history window parsing and client address resolution.

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub(crate) const DEFAULT_HISTORY_WINDOW: &str = "20m";
pub(crate) const DEFAULT_PROCESS_LIMIT: u32 = 20;

/// Parses a window like "20m", "1h30m", "90s", "1.5h" or "7d".
/// Units: ms, s, m, h, d. Returns None for empty, unitless or malformed input.
pub fn parse_window(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s == "0" {
        return Some(Duration::ZERO);
    }
    let mut total = 0.0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let secs_per_unit = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "d" => 86_400.0,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += value * secs_per_unit;
    }
    if !total.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(total).ok()
}

/// Lenient limit: missing, unparsable or zero falls back to the default.
pub(crate) fn parse_limit(s: Option<&str>) -> u32 {
    s.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_PROCESS_LIMIT)
}

/// Address recorded against a server on ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// Proxy headers first (first X-Forwarded-For hop, then X-Real-IP), else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    forwarded
        .or(real)
        .map(String::from)
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub(super) async fn record_client_ip(mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = client_ip(req.headers(), peer);
    req.extensions_mut().insert(ClientIp(ip));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_common_windows() {
        assert_eq!(parse_window("20m"), Some(Duration::from_secs(1_200)));
        assert_eq!(parse_window("1h30m"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_window("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_window("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_window("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_window("1.5h"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_window("0"), Some(Duration::ZERO));
    }

    #[test]
    fn rejects_malformed_windows() {
        for bad in ["", "abc", "20", "m", "10x", "-5m", "1..2h", "h5"] {
            assert_eq!(parse_window(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn limit_falls_back_to_default() {
        assert_eq!(parse_limit(None), 20);
        assert_eq!(parse_limit(Some("abc")), 20);
        assert_eq!(parse_limit(Some("0")), 20);
        assert_eq!(parse_limit(Some("5")), 5);
    }

    #[test]
    fn client_ip_prefers_proxy_headers() {
        let peer = Some("192.168.1.9".parse().unwrap());
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, peer), "192.168.1.9");
        assert_eq!(client_ip(&headers, None), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("10.1.1.1"));
        assert_eq!(client_ip(&headers, peer), "10.1.1.1");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.4, 10.0.0.1"));
        assert_eq!(client_ip(&headers, peer), "203.0.113.4");
    }
}
