//! The HTTP transport seam.
//!
//! The protocol itself is out of this crate's scope beyond the three verbs it needs
//! (`POST`/`HEAD`/`PATCH` with custom headers and, for `PATCH`, a body). [`Transport`] is that
//! seam: implement it for whatever HTTP client your application already uses, or enable the
//! `default_transport` feature to get a ready-made blocking implementation backed by `ureq`.

use crate::error::UploadError;

/// A single HTTP header as `(name, value)`.
pub type Header = (String, String);

/// The parts of an HTTP response the engine needs: status and headers. Response bodies are
/// never consumed by this crate (`Create`/`Probe`/`Patch` are all header-driven), so they are
/// not part of this type.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<Header>,
}

impl TransportResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Make `POST`/`HEAD`/`PATCH` requests with custom headers and, for `PATCH`, a streamed body.
///
/// Implementations should *not* treat a non-2xx status as an error: the engine needs to inspect
/// the status code itself (a `404` on create is accepted as a legacy quirk, for instance), so
/// status codes belong in [`TransportResponse::status`], not in the `Result`'s `Err` arm. `Err`
/// is reserved for transport-level failures (DNS, connection refused, TLS, timeout).
pub trait Transport: Send + Sync {
    fn post(&self, url: &str, headers: &[Header]) -> Result<TransportResponse, UploadError>;
    fn head(&self, url: &str, headers: &[Header]) -> Result<TransportResponse, UploadError>;
    fn patch(&self, url: &str, headers: &[Header], body: &[u8]) -> Result<TransportResponse, UploadError>;
}

#[cfg(feature = "default_transport")]
mod ureq_transport {
    use super::*;
    use ureq::Agent;

    /// A ready-to-use blocking [`Transport`] backed by `ureq`.
    ///
    /// Status-code-as-error is disabled on the underlying agent: this crate classifies statuses
    /// itself (see the [`Transport`] trait docs), so a `404` or `500` response is decoded into a
    /// normal [`TransportResponse`], not an `Err`.
    pub struct UreqTransport {
        agent: Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let config = Agent::config_builder().http_status_as_error(false).build();
            Self { agent: Agent::new_with_config(config) }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    fn collect_headers(resp: &ureq::http::Response<ureq::Body>) -> Vec<Header> {
        resp.headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect()
    }

    fn to_transport_response(resp: ureq::http::Response<ureq::Body>) -> TransportResponse {
        let status = resp.status().as_u16();
        let headers = collect_headers(&resp);
        TransportResponse { status, headers }
    }

    fn transport_err(e: ureq::Error) -> UploadError {
        UploadError::transport(e)
    }

    impl Transport for UreqTransport {
        fn post(&self, url: &str, headers: &[Header]) -> Result<TransportResponse, UploadError> {
            let mut req = self.agent.post(url);
            for (name, value) in headers {
                req = req.header(name.as_str(), value.as_str());
            }
            req.call().map(to_transport_response).map_err(transport_err)
        }

        fn head(&self, url: &str, headers: &[Header]) -> Result<TransportResponse, UploadError> {
            let mut req = self.agent.head(url);
            for (name, value) in headers {
                req = req.header(name.as_str(), value.as_str());
            }
            req.call().map(to_transport_response).map_err(transport_err)
        }

        fn patch(
            &self,
            url: &str,
            headers: &[Header],
            body: &[u8],
        ) -> Result<TransportResponse, UploadError> {
            let mut req = self.agent.patch(url);
            for (name, value) in headers {
                req = req.header(name.as_str(), value.as_str());
            }
            req.send(body).map(to_transport_response).map_err(transport_err)
        }
    }
}

#[cfg(feature = "default_transport")]
pub use ureq_transport::UreqTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let resp = TransportResponse {
            status: 204,
            headers: vec![("Upload-Offset".to_owned(), "8".to_owned())],
        };
        assert_eq!(resp.header("upload-offset"), Some("8"));
        assert_eq!(resp.header("Upload-Offset"), Some("8"));
        assert_eq!(resp.header("missing"), None);
    }

    #[test]
    fn is_success_range() {
        assert!(TransportResponse { status: 200, headers: vec![] }.is_success());
        assert!(TransportResponse { status: 299, headers: vec![] }.is_success());
        assert!(!TransportResponse { status: 300, headers: vec![] }.is_success());
        assert!(!TransportResponse { status: 404, headers: vec![] }.is_success());
    }
}
