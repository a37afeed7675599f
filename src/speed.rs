//! The optional network-speed probe: only ever used to seed an ETA estimate.

use std::time::Instant;

use crate::transport::Transport;

/// Measure upstream throughput, in megabits per second. Any failure must be silent: the caller
/// simply leaves `upload_speed_mbps` unset and falls back to the stopwatch-derived estimate.
pub trait SpeedProbe: Send + Sync {
    fn measure(&self) -> Option<f64>;
}

/// Sends a fixed-size filler payload to each configured measurement endpoint via `POST` and
/// times the round trip. Returns the fastest observed rate, or `None` if every endpoint failed.
pub struct HttpSpeedProbe<T: Transport> {
    transport: T,
    endpoints: Vec<String>,
    payload_size: usize,
}

impl<T: Transport> HttpSpeedProbe<T> {
    pub fn new(transport: T, endpoints: Vec<String>) -> Self {
        Self { transport, endpoints, payload_size: 256 * 1024 }
    }

    pub fn with_payload_size(mut self, bytes: usize) -> Self {
        self.payload_size = bytes;
        self
    }
}

impl<T: Transport> SpeedProbe for HttpSpeedProbe<T> {
    fn measure(&self) -> Option<f64> {
        let payload = vec![0u8; self.payload_size];
        let mut best: Option<f64> = None;

        for endpoint in &self.endpoints {
            let start = Instant::now();
            let result = self.transport.post(
                endpoint,
                &[("Content-Type".to_owned(), "application/octet-stream".to_owned())],
            );
            let elapsed = start.elapsed();

            let Ok(resp) = result else { continue };
            if !resp.is_success() {
                continue;
            }
            if elapsed.as_secs_f64() <= 0.0 {
                continue;
            }

            let mbps = (self.payload_size as f64 * 8.0) / 1_000_000.0 / elapsed.as_secs_f64();
            best = Some(best.map_or(mbps, |b: f64| b.max(mbps)));
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Header, TransportResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct FakeTransport {
        calls: AtomicUsize,
        fail_first_n: usize,
    }

    impl Transport for FakeTransport {
        fn post(&self, _url: &str, _headers: &[Header]) -> Result<TransportResponse, crate::error::UploadError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            if n < self.fail_first_n {
                return Ok(TransportResponse { status: 500, headers: vec![] });
            }
            Ok(TransportResponse { status: 200, headers: vec![] })
        }

        fn head(&self, _url: &str, _headers: &[Header]) -> Result<TransportResponse, crate::error::UploadError> {
            unreachable!("speed probe never issues HEAD")
        }

        fn patch(
            &self,
            _url: &str,
            _headers: &[Header],
            _body: &[u8],
        ) -> Result<TransportResponse, crate::error::UploadError> {
            unreachable!("speed probe never issues PATCH")
        }
    }

    #[test]
    fn measures_something_positive_on_success() {
        let transport = FakeTransport { calls: AtomicUsize::new(0), fail_first_n: 0 };
        let probe = HttpSpeedProbe::new(transport, vec!["https://speed.example/test".into()])
            .with_payload_size(4096);
        let mbps = probe.measure().expect("measurement must succeed");
        assert!(mbps > 0.0);
    }

    #[test]
    fn all_endpoints_failing_yields_none() {
        let transport = FakeTransport { calls: AtomicUsize::new(0), fail_first_n: 100 };
        let probe = HttpSpeedProbe::new(transport, vec!["https://speed.example/test".into()]);
        assert_eq!(probe.measure(), None);
    }

    #[test]
    fn one_good_endpoint_among_bad_ones_still_measures() {
        let transport = FakeTransport { calls: AtomicUsize::new(0), fail_first_n: 1 };
        let probe = HttpSpeedProbe::new(
            transport,
            vec!["https://speed.example/a".into(), "https://speed.example/b".into()],
        );
        assert!(probe.measure().is_some());
    }
}
