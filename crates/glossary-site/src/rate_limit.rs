//! Per-client token-bucket rate limiting for the public API.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::warn;

const LOG_INTERVAL: Duration = Duration::from_secs(60);
/// Buckets idle this long are dropped during sweeps.
const IDLE_EVICT: Duration = Duration::from_secs(300);
/// Sweep the bucket map whenever it grows past this.
const SWEEP_THRESHOLD: usize = 4096;

#[derive(Clone)]
pub struct RateLimiterLayer {
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiterLayer {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        Self {
            rate_per_sec: rate_per_sec as f64,
            burst: burst as f64,
        }
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            shared: Arc::new(Shared {
                buckets: DashMap::new(),
                dropped_since_log: AtomicU64::new(0),
                last_log: std::sync::Mutex::new(Instant::now()),
            }),
            rate_per_sec: self.rate_per_sec,
            burst: self.burst,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter<S> {
    inner: S,
    shared: Arc<Shared>,
    rate_per_sec: f64,
    burst: f64,
}

struct Shared {
    buckets: DashMap<String, Bucket>,
    dropped_since_log: AtomicU64,
    last_log: std::sync::Mutex<Instant>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl<S, ReqBody> Service<axum::http::Request<ReqBody>> for RateLimiter<S>
where
    S: Service<axum::http::Request<ReqBody>, Response = axum::http::Response<axum::body::Body>>
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: axum::http::Request<ReqBody>) -> Self::Future {
        if let Some(client) = client_ip(&req)
            && !self.try_consume(&client)
        {
            self.shared.dropped_since_log.fetch_add(1, Ordering::Relaxed);
            log_drops_if_due(&self.shared);
            return Box::pin(async move {
                Ok(axum::http::Response::builder()
                    .status(axum::http::StatusCode::TOO_MANY_REQUESTS)
                    .body(axum::body::Body::from("rate limited"))
                    .unwrap())
            });
        }

        let fut = self.inner.call(req);
        Box::pin(fut)
    }
}

/// Client identity: first hop of `X-Forwarded-For`. Requests without the
/// header (direct connections, local dev) are not limited.
fn client_ip<B>(req: &axum::http::Request<B>) -> Option<String> {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl<S> RateLimiter<S> {
    fn try_consume(&self, client: &str) -> bool {
        if self.shared.buckets.len() > SWEEP_THRESHOLD {
            self.sweep();
        }

        let now = Instant::now();
        let mut bucket = self
            .shared
            .buckets
            .entry(client.to_string())
            .or_insert(Bucket {
                tokens: self.burst,
                last_refill: now,
            });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst);
            bucket.last_refill = now;
        }
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.shared
            .buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < IDLE_EVICT);
    }
}

fn log_drops_if_due(shared: &Shared) {
    let now = Instant::now();
    let mut last = match shared.last_log.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if now.saturating_duration_since(*last) >= LOG_INTERVAL {
        let dropped = shared.dropped_since_log.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!("rate limiter dropped {dropped} requests in the last minute");
        }
        *last = now;
    }
}
