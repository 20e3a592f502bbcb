//! Request counters and latency histograms, rendered in the Prometheus text
//! exposition format.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// Upper bounds of the latency histogram, in seconds.
pub const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RequestLabels {
    method: String,
    path: String,
}

#[derive(Debug, Clone, Default)]
struct Histogram {
    /// Non-cumulative counts, one per bucket.
    buckets: [u64; LATENCY_BUCKETS.len()],
    sum: f64,
    count: u64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        if let Some(index) = LATENCY_BUCKETS.iter().position(|bound| seconds <= *bound) {
            self.buckets[index] += 1;
        }
        self.sum += seconds;
        self.count += 1;
    }
}

#[derive(Debug, Default)]
struct Inner {
    requests: BTreeMap<(RequestLabels, u16), u64>,
    latency: BTreeMap<RequestLabels, Histogram>,
}

#[derive(Debug, Default)]
pub struct RequestMetrics {
    inner: Mutex<Inner>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let labels = RequestLabels {
            method: method.to_string(),
            path: path.to_string(),
        };
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *inner.requests.entry((labels.clone(), status)).or_default() += 1;
        inner
            .latency
            .entry(labels)
            .or_default()
            .observe(elapsed.as_secs_f64());
    }

    pub fn requests_total(&self, method: &str, path: &str, status: u16) -> u64 {
        let labels = RequestLabels {
            method: method.to_string(),
            path: path.to_string(),
        };
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.requests.get(&(labels, status)).copied().unwrap_or(0)
    }

    /// Full exposition, including the current task gauge value.
    pub fn render(&self, tasks_count: i64) -> String {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Exposition {
            inner: &inner,
            tasks_count,
        }
        .to_string()
    }
}

struct Exposition<'a> {
    inner: &'a Inner,
    tasks_count: i64,
}

impl fmt::Display for Exposition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# HELP requests_total Total number of HTTP requests.")?;
        writeln!(f, "# TYPE requests_total counter")?;
        for ((labels, status), count) in &self.inner.requests {
            writeln!(
                f,
                "requests_total{{method=\"{}\",path=\"{}\",status=\"{status}\"}} {count}",
                escape(&labels.method),
                escape(&labels.path),
            )?;
        }

        writeln!(f, "# HELP request_latency_seconds HTTP request latency in seconds.")?;
        writeln!(f, "# TYPE request_latency_seconds histogram")?;
        for (labels, histogram) in &self.inner.latency {
            let base = format!(
                "method=\"{}\",path=\"{}\"",
                escape(&labels.method),
                escape(&labels.path)
            );
            let mut cumulative = 0;
            for (bound, count) in LATENCY_BUCKETS.iter().zip(histogram.buckets) {
                cumulative += count;
                writeln!(
                    f,
                    "request_latency_seconds_bucket{{{base},le=\"{bound}\"}} {cumulative}"
                )?;
            }
            writeln!(
                f,
                "request_latency_seconds_bucket{{{base},le=\"+Inf\"}} {}",
                histogram.count
            )?;
            writeln!(f, "request_latency_seconds_sum{{{base}}} {}", histogram.sum)?;
            writeln!(f, "request_latency_seconds_count{{{base}}} {}", histogram.count)?;
        }

        writeln!(f, "# HELP tasks_count Number of stored tasks.")?;
        writeln!(f, "# TYPE tasks_count gauge")?;
        writeln!(f, "tasks_count {}", self.tasks_count)
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Path label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Records every request under its route template, so `/tasks/{id}` is one
/// series no matter which id was asked for. Layered outside the timeout, so
/// it also sees the 408s.
pub async fn track_requests(
    State(metrics): State<Arc<RequestMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_PATH, MatchedPath::as_str)
        .to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    metrics.observe(&method, &path, response.status().as_u16(), started.elapsed());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_status() {
        let metrics = RequestMetrics::new();
        metrics.observe("GET", "/api/v1/tasks/{id}", 200, Duration::from_millis(3));
        metrics.observe("GET", "/api/v1/tasks/{id}", 200, Duration::from_millis(3));
        metrics.observe("GET", "/api/v1/tasks/{id}", 404, Duration::from_millis(1));
        assert_eq!(metrics.requests_total("GET", "/api/v1/tasks/{id}", 200), 2);
        assert_eq!(metrics.requests_total("GET", "/api/v1/tasks/{id}", 404), 1);
        assert_eq!(metrics.requests_total("PUT", "/api/v1/tasks/{id}", 200), 0);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let metrics = RequestMetrics::new();
        metrics.observe("GET", "/health", 200, Duration::from_millis(2));
        metrics.observe("GET", "/health", 200, Duration::from_millis(200));
        metrics.observe("GET", "/health", 200, Duration::from_secs(30));
        let text = metrics.render(0);

        let base = "method=\"GET\",path=\"/health\"";
        assert!(text.contains(&format!("request_latency_seconds_bucket{{{base},le=\"0.005\"}} 1")));
        assert!(text.contains(&format!("request_latency_seconds_bucket{{{base},le=\"0.25\"}} 2")));
        assert!(text.contains(&format!("request_latency_seconds_bucket{{{base},le=\"10\"}} 2")));
        assert!(text.contains(&format!("request_latency_seconds_bucket{{{base},le=\"+Inf\"}} 3")));
        assert!(text.contains(&format!("request_latency_seconds_count{{{base}}} 3")));
    }

    #[test]
    fn renders_task_gauge() {
        let text = RequestMetrics::new().render(7);
        assert!(text.contains("# TYPE tasks_count gauge\ntasks_count 7\n"));
        assert!(text.contains("# TYPE requests_total counter"));
    }

    #[test]
    fn escapes_label_values() {
        assert_eq!(escape("a\"b\\c"), "a\\\"b\\\\c");
    }
}
