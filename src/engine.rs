//! The upload state machine: create/resume resolution, offset synchronization, chunked
//! transmission, progress/ETA notification, and pause/cancel/retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use url::Url;

use crate::chunk::{read_chunk, UploadSource};
use crate::error::UploadError;
use crate::fingerprint::derive_fingerprint;
use crate::metadata::encode_metadata;
use crate::observer::{ControlHandle, UploadObserver};
use crate::retry::{interval, RetryScale};
use crate::speed::SpeedProbe;
use crate::store::HandleStore;
use crate::transport::Transport;

const TUS_RESUMABLE: &str = "1.0.0";

/// Policy constants held for the lifetime of a session.
pub struct UploadOptions {
    pub store: Option<Arc<dyn HandleStore>>,
    pub max_chunk_bytes: u64,
    pub max_retries: u32,
    pub retry_scale: RetryScale,
    pub first_retry_cooldown_s: f64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            store: None,
            max_chunk_bytes: 6 * 1024 * 1024,
            max_retries: 5,
            retry_scale: RetryScale::Exponential,
            first_retry_cooldown_s: 0.0,
        }
    }
}

/// Per-call parameters: metadata/headers for this particular transfer, plus the optional
/// collaborators (`speed_probe`, `retry_hook`) that aren't part of the session's fixed policy.
#[derive(Default)]
pub struct UploadParams<'a> {
    pub metadata: Option<HashMap<String, String>>,
    pub headers: Option<Vec<(String, String)>>,
    pub measure_speed: bool,
    pub speed_probe: Option<&'a dyn SpeedProbe>,
    /// Owns the sleep between retries. If absent, a failure past the first attempt is fatal.
    pub retry_hook: Option<&'a dyn Fn(Duration)>,
}

/// The state machine's current stage. Exposed mainly for observability/debugging; callers drive
/// the session purely through [`Upload::upload`] and [`Upload::control_handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Preparing,
    Resolving,
    Transmitting,
    Paused,
    Completing,
    Failing,
    Done,
    Cancelled,
    FailedFatally,
}

/// The outcome of a call to [`Upload::upload`] that did not return an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed,
    Paused,
    Cancelled,
}

/// A single upload session.
pub struct Upload<S: UploadSource, T: Transport> {
    source: S,
    transport: T,
    options: UploadOptions,
    fingerprint: String,
    resource_uri: Option<String>,
    file_size: u64,
    offset: u64,
    attempt: u32,
    control: ControlHandle,
    state: State,
}

impl<S: UploadSource, T: Transport> Upload<S, T> {
    pub fn new(source: S, transport: T, options: UploadOptions) -> Self {
        let fingerprint = derive_fingerprint(source.path());
        let control = ControlHandle::new(options.store.clone(), fingerprint.clone());
        Self {
            source,
            transport,
            options,
            fingerprint,
            resource_uri: None,
            file_size: 0,
            offset: 0,
            attempt: 0,
            control,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// A cheaply-clonable handle for pausing or cancelling this session from another thread, or
    /// from inside an [`UploadObserver`] callback. Safe to call before, during, or after
    /// [`Upload::upload`].
    pub fn control_handle(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Returns `true` iff a store is configured and holds an entry for this session's
    /// fingerprint.
    pub fn is_resumable(&self) -> Result<bool, UploadError> {
        match &self.options.store {
            Some(store) => Ok(store.get(&self.fingerprint)?.is_some()),
            None => Ok(false),
        }
    }

    /// Drive only the create step: resolve or establish `resource_uri`, without transmitting any
    /// data. Mostly useful for callers who want to pre-create a resource ahead of time.
    pub fn create_upload(&mut self, endpoint: &str, metadata: &HashMap<String, String>) -> Result<String, UploadError> {
        self.file_size = self.source.length()?;
        self.resolve_resource(endpoint, metadata)
    }

    /// Drive the session to completion, pause, or cancellation.
    pub fn upload(
        &mut self,
        endpoint: &str,
        observer: &mut dyn UploadObserver,
        params: UploadParams<'_>,
    ) -> Result<UploadOutcome, UploadError> {
        self.state = State::Preparing;
        self.control.clear_paused();
        self.attempt = 0;
        self.file_size = self.source.length()?;

        let metadata = params.metadata.unwrap_or_default();
        let extra_headers = params.headers.unwrap_or_default();

        self.state = State::Resolving;
        if self.resource_uri.is_none() {
            self.resource_uri = Some(self.resolve_resource(endpoint, &metadata)?);
        }
        let resource_uri = self.resource_uri.clone().expect("resource_uri set by resolve_resource");

        self.offset = self.probe_offset(&resource_uri)?;
        let start = Instant::now();
        let mut bytes_sent_this_session: u64 = 0;

        let mut upload_speed_mbps = None;
        if params.measure_speed {
            if let Some(probe) = params.speed_probe {
                upload_speed_mbps = probe.measure();
            }
        }

        let eta0 = upload_speed_mbps.map(|mbps| eta_from_mbps(self.file_size, mbps));
        observer.on_start(eta0, &self.control);

        self.state = State::Transmitting;
        loop {
            if self.control.is_cancelled() {
                self.state = State::Cancelled;
                return Ok(UploadOutcome::Cancelled);
            }
            if self.control.is_paused() {
                self.state = State::Paused;
                return Ok(UploadOutcome::Paused);
            }
            if self.offset >= self.file_size {
                break;
            }

            match self.send_one_chunk(&resource_uri, &extra_headers) {
                Ok(chunk_len) => {
                    self.attempt = 0;
                    bytes_sent_this_session += chunk_len;

                    let percent = if self.file_size == 0 {
                        100.0
                    } else {
                        (100.0 * self.offset as f64 / self.file_size as f64).clamp(0.0, 100.0)
                    };
                    let eta = upload_speed_mbps
                        .map(|mbps| eta_from_mbps(self.file_size.saturating_sub(self.offset), mbps))
                        .or_else(|| {
                            let elapsed = start.elapsed().as_secs_f64();
                            if elapsed <= 0.0 || bytes_sent_this_session == 0 {
                                None
                            } else {
                                let rate = bytes_sent_this_session as f64 / elapsed;
                                Some((self.file_size.saturating_sub(self.offset)) as f64 / rate)
                            }
                        });
                    observer.on_progress(percent, eta, &self.control);
                }
                Err(e) => {
                    if self.attempt >= self.options.max_retries {
                        self.state = State::FailedFatally;
                        error!("upload {} failed fatally after {} attempts: {e}", self.fingerprint, self.attempt);
                        return Err(e);
                    }
                    self.state = State::Failing;
                    let wait = interval(self.attempt, self.options.first_retry_cooldown_s, self.options.retry_scale);
                    self.attempt += 1;
                    match params.retry_hook {
                        Some(hook) => {
                            warn!("upload {} chunk failed ({e}), retrying in {wait:?} (attempt {})", self.fingerprint, self.attempt);
                            hook(wait);
                            self.state = State::Transmitting;
                        }
                        None => {
                            self.state = State::FailedFatally;
                            error!("upload {} failed, no retry_hook configured: {e}", self.fingerprint);
                            return Err(e);
                        }
                    }
                }
            }
        }

        self.state = State::Completing;
        observer.on_complete(&self.control);
        self.state = State::Done;
        info!("upload {} completed, {} bytes", self.fingerprint, self.file_size);
        Ok(UploadOutcome::Completed)
    }

    fn resolve_resource(&self, endpoint: &str, metadata: &HashMap<String, String>) -> Result<String, UploadError> {
        if let Some(store) = &self.options.store {
            if let Some(uri) = store.get(&self.fingerprint)? {
                debug!("resuming upload {} at stored uri {uri}", self.fingerprint);
                return Ok(uri);
            }
        }

        let encoded_metadata = encode_metadata(metadata, self.source.path());
        let headers = vec![
            ("Tus-Resumable".to_owned(), TUS_RESUMABLE.to_owned()),
            ("Upload-Length".to_owned(), self.file_size.to_string()),
            ("Upload-Metadata".to_owned(), encoded_metadata),
        ];

        debug!("creating upload resource at {endpoint}");
        let resp = self.transport.post(endpoint, &headers)?;
        if !resp.is_success() && resp.status != 404 {
            return Err(UploadError::protocol_status(resp.status, "create request failed"));
        }

        let location = resp
            .header("Location")
            .ok_or_else(|| UploadError::protocol("missing upload Uri"))?;
        let location = first_comma_segment(location);

        let resource_uri = resolve_location(endpoint, location)?;
        if let Some(store) = &self.options.store {
            store.put(&self.fingerprint, &resource_uri)?;
        }
        Ok(resource_uri)
    }

    fn probe_offset(&self, resource_uri: &str) -> Result<u64, UploadError> {
        let headers = [("Tus-Resumable".to_owned(), TUS_RESUMABLE.to_owned())];
        let resp = self.transport.head(resource_uri, &headers)?;
        if !resp.is_success() {
            return Err(UploadError::protocol_status(resp.status, "probe request failed"));
        }
        let raw = resp
            .header("Upload-Offset")
            .ok_or_else(|| UploadError::protocol("missing Upload-Offset on probe"))?;
        parse_offset(raw, "Upload-Offset on probe")
    }

    fn send_one_chunk(&mut self, resource_uri: &str, extra_headers: &[(String, String)]) -> Result<u64, UploadError> {
        let chunk = read_chunk(&self.source, self.offset, self.options.max_chunk_bytes)?;
        let chunk_len = chunk.len() as u64;

        let mut headers = vec![
            ("Tus-Resumable".to_owned(), TUS_RESUMABLE.to_owned()),
            ("Upload-Offset".to_owned(), self.offset.to_string()),
            ("Content-Type".to_owned(), "application/offset+octet-stream".to_owned()),
        ];
        headers.extend_from_slice(extra_headers);

        let resp = self.transport.patch(resource_uri, &headers, &chunk)?;
        if !resp.is_success() {
            return Err(UploadError::protocol_status(resp.status, "patch request failed"));
        }

        let raw = resp
            .header("Upload-Offset")
            .ok_or_else(|| UploadError::protocol("missing Upload-Offset on patch response"))?;
        let server_offset = parse_offset(raw, "Upload-Offset on patch response")?;

        let expected = self.offset + chunk_len;
        if server_offset != expected {
            return Err(UploadError::protocol(format!(
                "offset mismatch: server={server_offset}, expected={expected}"
            )));
        }

        self.offset = server_offset;
        Ok(chunk_len)
    }
}

fn parse_offset(raw: &str, what: &str) -> Result<u64, UploadError> {
    first_comma_segment(raw)
        .trim()
        .parse::<u64>()
        .map_err(|_| UploadError::protocol(format!("unparseable {what}: {raw:?}")))
}

fn first_comma_segment(value: &str) -> &str {
    value.split(',').next().unwrap_or(value).trim()
}

fn resolve_location(endpoint: &str, location: &str) -> Result<String, UploadError> {
    let base = Url::parse(endpoint).map_err(|e| UploadError::protocol(format!("invalid endpoint: {e}")))?;
    let resolved = base
        .join(location)
        .map_err(|e| UploadError::protocol(format!("invalid Location header {location:?}: {e}")))?;
    Ok(resolved.to_string())
}

/// `eta_s = bytes / (mbps * 10^6)`, the formula this crate's spec pins for a known measured
/// speed. Applied to `file_size` for the `on_start` estimate and to the remaining byte count for
/// each `on_progress` update.
fn eta_from_mbps(bytes: u64, mbps: f64) -> f64 {
    if mbps <= 0.0 {
        return 0.0;
    }
    bytes as f64 / (mbps * 1_000_000.0)
}
