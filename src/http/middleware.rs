//! Request instrumentation middleware.
//!
//! Wraps exactly one downstream dispatch per request:
//!
//! 1. Log "Request started" with method, path, client address, user agent
//! 2. Run the downstream dispatch under the configured deadline
//! 3. Success: request counter + duration histogram + completion log
//! 4. Failure (classified error, elapsed deadline, or cancelled dispatch):
//!    error counter + ERROR log with the failure kind
//!
//! Exactly one of 3/4 happens per request. A dispatch that times out is
//! recorded under the `timeout` kind; a dispatch dropped mid-flight
//! (client disconnect, connection reset) is recorded under `cancelled`
//! by a drop guard, since the middleware future itself never resumes.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use crate::errors::handler::{render_error, ApiError, FailureInfo};
use crate::http::request::{RequestContext, X_REQUEST_ID};
use crate::http::server::AppState;
use crate::observability::logging::{Level, StructuredLogger};
use crate::observability::metrics::Counter;

/// Bookkeeping guard armed for the duration of one downstream dispatch.
///
/// The runtime drops the whole middleware future when the connection goes
/// away, so the code after `next.run` never executes for a cancelled
/// request. `Drop` is the only hook that still runs; an armed guard
/// records the failure there so the request cannot vanish unaccounted.
struct DispatchGuard {
    armed: bool,
    method: String,
    path: String,
    request_id: String,
    error_count: Counter,
    logger: StructuredLogger,
}

impl DispatchGuard {
    fn arm(ctx: &RequestContext, error_count: Counter, logger: StructuredLogger) -> Self {
        Self {
            armed: true,
            method: ctx.method.clone(),
            path: ctx.path.clone(),
            request_id: ctx.request_id.to_string(),
            error_count,
            logger,
        }
    }

    /// The dispatch completed; normal bookkeeping takes over.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self
            .error_count
            .inc(&[&self.method, &self.path, "cancelled"])
        {
            tracing::warn!(error = %e, "failed to record cancellation metric");
        }
        self.logger.error(
            &format!("Request cancelled: {} {}", self.method, self.path),
            crate::fields! {
                "request_id" => &self.request_id,
                "method" => &self.method,
                "path" => &self.path,
                "error_type" => "cancelled",
            },
        );
    }
}

/// Instrument one request dispatch.
pub async fn instrument(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ctx = RequestContext::capture(&request);
    let logger = state.loggers.get("middleware");

    logger.info(
        &format!("Request started: {} {}", ctx.method, ctx.path),
        crate::fields! {
            "request_id" => ctx.request_id.to_string(),
            "method" => &ctx.method,
            "path" => &ctx.path,
            "client_ip" => &ctx.client_ip,
            "user_agent" => &ctx.user_agent,
        },
    );

    let deadline = Duration::from_secs(state.settings.listener.request_timeout_secs);
    let mut guard = DispatchGuard::arm(&ctx, state.metrics.error_count.clone(), logger.clone());
    let mut response = match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        // The dispatch future was dropped at the deadline; the taxonomy
        // layer under it never ran, so finish the envelope here.
        Err(_) => render_error(
            &ApiError::Timeout,
            &ctx.method,
            &ctx.path,
            &state.loggers.get("exceptions"),
        ),
    };
    guard.disarm();

    let duration = ctx.elapsed_secs();

    match response.extensions().get::<FailureInfo>().cloned() {
        Some(failure) => {
            if let Err(e) =
                state
                    .metrics
                    .error_count
                    .inc(&[&ctx.method, &ctx.path, &failure.error_type])
            {
                tracing::warn!(error = %e, "failed to record error metric");
            }

            logger.log_exception(
                Level::Error,
                &format!("Request failed: {} {}", ctx.method, ctx.path),
                crate::fields! {
                    "request_id" => ctx.request_id.to_string(),
                    "method" => &ctx.method,
                    "path" => &ctx.path,
                    "error_type" => &failure.error_type,
                    "error_message" => &failure.message,
                    "response_time" => duration,
                },
                &failure.message,
            );
        }
        None => {
            let status = response.status().as_u16();
            if let Err(e) =
                state
                    .metrics
                    .request_count
                    .inc(&[&ctx.method, &ctx.path, &status.to_string()])
            {
                tracing::warn!(error = %e, "failed to record request metric");
            }
            state.metrics.request_duration.observe(duration);

            logger.log_api_request(
                &ctx.method,
                &ctx.path,
                status,
                duration,
                crate::fields! { "request_id" => ctx.request_id.to_string() },
            );
        }
    }

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    response
}
