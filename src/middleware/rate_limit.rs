use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::{config::Config, error::AppError};

const REFILL_WINDOW: Duration = Duration::from_secs(60);

/// Coarse group of paths sharing one budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Recommendations,
    Api,
}

impl RouteClass {
    /// `None` for paths outside `/api/`, which are never limited
    pub fn classify(path: &str) -> Option<Self> {
        if !path.starts_with("/api/") {
            return None;
        }
        if path.contains("/recommendations") {
            Some(RouteClass::Recommendations)
        } else {
            Some(RouteClass::Api)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Recommendations => "recommendations",
            RouteClass::Api => "api",
        }
    }
}

impl Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capacity plus a greedy refill of `capacity` tokens per `window`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBudget {
    pub capacity: u32,
    pub window: Duration,
}

impl RateBudget {
    pub fn per_minute(capacity: u32) -> Self {
        Self {
            capacity,
            window: REFILL_WINDOW,
        }
    }

    fn refill_per_sec(&self) -> f64 {
        self.capacity as f64 / self.window.as_secs_f64()
    }
}

/// Token bucket state; tokens stay within [0, capacity]
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(budget: RateBudget, now: Instant) -> Self {
        Self {
            tokens: budget.capacity as f64,
            capacity: budget.capacity as f64,
            refill_per_sec: budget.refill_per_sec(),
            last_refill: now,
        }
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}

/// Per-(client IP, route class) admission control
///
/// Buckets are created lazily on first hit. Consuming a token holds only the
/// map shard that owns the bucket, so distinct clients proceed independently.
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    recommendations: RateBudget,
    api: RateBudget,
    idle_after: Duration,
    client_ip_header: HeaderName,
}

impl RateLimiter {
    pub fn new(
        recommendations: RateBudget,
        api: RateBudget,
        idle_after: Duration,
        client_ip_header: HeaderName,
    ) -> Self {
        // A bucket idle for a full window is full again; reaping it loses nothing
        let idle_after = idle_after
            .max(recommendations.window)
            .max(api.window);

        tracing::info!(
            recommendations_capacity = recommendations.capacity,
            api_capacity = api.capacity,
            idle_secs = idle_after.as_secs(),
            header = %client_ip_header,
            "Initializing rate limiter"
        );

        Self {
            buckets: DashMap::new(),
            recommendations,
            api,
            idle_after,
            client_ip_header,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            RateBudget::per_minute(config.recommendations_per_minute),
            RateBudget::per_minute(config.api_per_minute),
            config.rate_limit_idle(),
            config.client_ip_header_name()?,
        ))
    }

    fn budget(&self, class: RouteClass) -> RateBudget {
        match class {
            RouteClass::Recommendations => self.recommendations,
            RouteClass::Api => self.api,
        }
    }

    /// Tries to take one token for this client and class
    pub fn check(&self, client_ip: &str, class: RouteClass) -> bool {
        self.check_at(client_ip, class, Instant::now())
    }

    fn check_at(&self, client_ip: &str, class: RouteClass, now: Instant) -> bool {
        let key = format!("{}:{}", client_ip, class);
        let budget = self.budget(class);
        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(budget, now));
        bucket.try_consume(now)
    }

    /// Drops buckets untouched for longer than the idle threshold
    pub fn reap_idle(&self) -> usize {
        self.reap_idle_at(Instant::now())
    }

    fn reap_idle_at(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < self.idle_after);
        before.saturating_sub(self.buckets.len())
    }

    /// Periodically reaps idle buckets until the runtime shuts down
    pub fn spawn_reaper(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.idle_after / 2;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reaped = self.reap_idle();
                if reaped > 0 {
                    tracing::debug!(reaped, remaining = self.bucket_count(), "Reaped idle rate-limit buckets");
                }
            }
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn client_ip_header(&self) -> &HeaderName {
        &self.client_ip_header
    }
}

/// Client identity: first value of the trusted forwarded header, else the
/// transport peer address
pub fn client_ip(headers: &HeaderMap, header: &HeaderName, remote: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, remote) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Middleware admitting or rejecting `/api/*` requests
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(class) = RouteClass::classify(request.uri().path()) else {
        return next.run(request).await;
    };

    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), limiter.client_ip_header(), remote);

    if limiter.check(&ip, class) {
        next.run(request).await
    } else {
        tracing::warn!(
            client_ip = %ip,
            route_class = %class,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        AppError::TooManyRequests.into_response()
    }
}
