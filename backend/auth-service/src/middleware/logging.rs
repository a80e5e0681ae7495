use axum::http;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Level;

/// Request/response logging with latency, one span per request.
pub fn add_tracing<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().path().to_string();
                tracing::span!(Level::INFO, "http", %method, %uri)
            })
            .on_response(
                |res: &http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    tracing::info!(status = %res.status(), elapsed_ms = latency.as_millis() as u64, "response");
                },
            ),
    )
}
