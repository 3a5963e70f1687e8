use super::api::AppState;
use crate::models::chat::ErrorResponse;

use axum::{
    extract::{ ConnectInfo, Request, State },
    http::StatusCode,
    middleware::Next,
    response::{ IntoResponse, Response },
    Json,
};
use governor::{ DefaultKeyedRateLimiter, Quota, RateLimiter };
use log::warn;
use std::net::{ IpAddr, Ipv4Addr, SocketAddr };
use std::num::NonZeroU32;
use std::time::Duration;

pub type ClientRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

pub const RATE_LIMIT_MESSAGE: &str = "You have made too many requests. Please wait a little while.";

/// Address the request is accounted to, stored in request extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Each client may burst `max_requests` calls; capacity refills evenly over
/// `window`.
pub fn build_limiter(window: Duration, max_requests: u32) -> Result<ClientRateLimiter, String> {
    let burst = NonZeroU32::new(max_requests).ok_or_else(||
        "RATE_LIMIT_MAX_REQUESTS must be greater than zero".to_string()
    )?;
    if window.is_zero() {
        return Err("RATE_LIMIT_WINDOW_SECS must be greater than zero".to_string());
    }
    let quota = Quota::with_period(window / max_requests)
        .ok_or_else(||
            format!(
                "RATE_LIMIT_WINDOW_SECS ({}s) is too short for RATE_LIMIT_MAX_REQUESTS ({}): refill period rounds to zero",
                window.as_secs(),
                max_requests
            )
        )?
        .allow_burst(burst);
    Ok(RateLimiter::keyed(quota))
}

/// Behind a single trusted proxy only the rightmost `X-Forwarded-For` entry is
/// written by that proxy; everything left of it comes from the caller.
pub fn client_ip(req: &Request, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn enforce(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let ip = client_ip(&req, state.trust_proxy);

    if state.limiter.check_key(&ip).is_err() {
        warn!("Rate limit exceeded for {}. Rejecting {} {}", ip, req.method(), req.uri().path());
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse { error: RATE_LIMIT_MESSAGE.to_string() }),
        ).into_response();
    }

    req.extensions_mut().insert(ClientIp(ip));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn zero_requests_is_a_configuration_error() {
        assert!(build_limiter(Duration::from_secs(60), 0).is_err());
        let err = build_limiter(Duration::ZERO, 5).unwrap_err();
        assert!(err.contains("greater than zero"), "{}", err);
    }

    #[test]
    fn window_too_short_for_quota_names_the_real_cause() {
        let err = build_limiter(Duration::from_secs(1), u32::MAX).unwrap_err();
        assert!(err.contains("refill period rounds to zero"), "{}", err);
        assert!(!err.contains("greater than zero"), "{}", err);
    }

    #[test]
    fn limiter_allows_burst_then_blocks_per_ip() {
        let limiter = build_limiter(Duration::from_secs(900), 3).unwrap();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        for _ in 0..3 {
            assert!(limiter.check_key(&a).is_ok());
        }
        assert!(limiter.check_key(&a).is_err());
        assert!(limiter.check_key(&b).is_ok());
    }

    #[test]
    fn forwarded_header_only_counts_behind_a_proxy() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req, true), "10.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(client_ip(&req, false), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn connect_info_is_used_for_direct_clients() {
        let mut req = axum::http::Request::builder().body(Body::empty()).unwrap();
        let addr: SocketAddr = "192.0.2.4:5123".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_ip(&req, true), addr.ip());
    }
}
