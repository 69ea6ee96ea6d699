use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

const REQUEST_DURATION: &str = "http_request_duration_seconds";

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Labels for one request. Unrouted requests all get `path="unmatched"`.
pub fn request_labels(method: &Method, route: Option<&str>, status: StatusCode) -> [(&'static str, String); 3] {
    [
        ("method", method.as_str().to_string()),
        ("path", route.unwrap_or("unmatched").to_string()),
        ("status", status.as_u16().to_string()),
    ]
}

/// Records `http_requests_total` and `http_request_duration_seconds`, labelled by route template.
pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();

    let response = next.run(req).await;

    let labels = request_labels(&method, matched_path.as_ref().map(MatchedPath::as_str), response.status());
    counter!("http_requests_total", &labels).increment(1);
    histogram!(REQUEST_DURATION, &labels).record(start.elapsed().as_secs_f64());

    response
}

/// Installs the global Prometheus recorder; every series carries a `service` label.
pub fn init_metrics(service_name: &str) -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .add_global_label("service", service_name)
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)?
        .install_recorder()?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routed_request_is_labelled_by_template() {
        let labels = request_labels(&Method::POST, Some("/posts/:id/like"), StatusCode::OK);
        assert_eq!(labels[0].1, "POST");
        assert_eq!(labels[1].1, "/posts/:id/like");
        assert_eq!(labels[2].1, "200");
    }

    #[test]
    fn unrouted_request_shares_one_label() {
        let labels = request_labels(&Method::GET, None, StatusCode::NOT_FOUND);
        assert_eq!(labels[1].1, "unmatched");
        assert_eq!(labels[2].1, "404");
    }
}
