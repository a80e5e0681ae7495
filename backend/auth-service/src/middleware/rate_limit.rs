use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use redis::aio::ConnectionManager;

use crate::error::AppError;

/// Fixed-window limiter: INCR with a one-minute TTL on an ip+path key.
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    limit_per_minute: i64,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, limit_per_minute: i64) -> Self {
        let limit_per_minute = if limit_per_minute <= 0 {
            60
        } else {
            limit_per_minute
        };
        Self {
            redis,
            limit_per_minute,
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let key = format!("rl:{}:{}", req.uri().path(), addr.ip());
    let mut conn = limiter.redis.clone();
    let counted: Result<(i64,), redis::RedisError> = redis::pipe()
        .atomic()
        .incr(&key, 1)
        .expire(&key, 60)
        .ignore()
        .query_async(&mut conn)
        .await;

    match counted {
        Ok((count,)) if count > limiter.limit_per_minute => {
            let mut response = AppError::RateLimited.into_response();
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from_static("60"));
            response
        }
        Err(e) => {
            // The limiter must not take the API down with it.
            tracing::warn!(error = %e, "rate limiter unavailable, letting request through");
            next.run(req).await
        }
        Ok(_) => next.run(req).await,
    }
}
