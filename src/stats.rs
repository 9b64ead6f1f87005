use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use actix_service::{Service, Transform};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::Error;
use futures::future::{ok, Ready};
use futures::Future;

lazy_static! {
    static ref STATS: Stats = Stats::new();
}

pub struct Stats {
    requests: AtomicU32,
    errors: AtomicU32,
    admitted: AtomicU32,
    denied: AtomicU32,
}

#[derive(Serialize, Debug)]
pub struct LoadedStats {
    pub requests: u32,
    /// responses with a 5xx status
    pub errors: u32,
    pub admitted: u32,
    pub denied: u32,
}

impl Stats {
    fn new() -> Stats {
        Stats {
            requests: AtomicU32::new(0u32),
            errors: AtomicU32::new(0u32),
            admitted: AtomicU32::new(0u32),
            denied: AtomicU32::new(0u32),
        }
    }

    /// count the outcome of a capacity check
    pub fn admission(admitted: bool) {
        if admitted {
            STATS.admitted.fetch_add(1, Ordering::Relaxed);
        } else {
            STATS.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn load() -> LoadedStats {
        LoadedStats {
            requests: STATS.requests.load(Ordering::Relaxed),
            errors: STATS.errors.load(Ordering::Relaxed),
            admitted: STATS.admitted.load(Ordering::Relaxed),
            denied: STATS.denied.load(Ordering::Relaxed),
        }
    }
}

/// Counts every request and every server error passing through the app.
pub struct Middleware;

impl Middleware {
    pub fn default() -> Middleware {
        Middleware
    }
}

impl<S, B> Transform<S> for Middleware
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestCountMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestCountMiddleware { service })
    }
}

pub struct RequestCountMiddleware<S> {
    service: S,
}

impl<S, B> Service for RequestCountMiddleware<S>
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: ServiceRequest) -> Self::Future {
        STATS.requests.fetch_add(1, Ordering::Relaxed);

        let fut = self.service.call(request);

        Box::pin(async move {
            let res = fut.await?;

            if res.response().status().is_server_error() {
                STATS.errors.fetch_add(1, Ordering::Relaxed);
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admissions_are_counted_by_outcome() {
        let before = Stats::load();

        Stats::admission(true);
        Stats::admission(false);
        Stats::admission(false);

        let after = Stats::load();
        // other tests count admissions concurrently
        assert!(after.admitted >= before.admitted + 1);
        assert!(after.denied >= before.denied + 2);
    }
}
