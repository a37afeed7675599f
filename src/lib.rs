//! Client library for a resumable, chunked-upload protocol in the style of tus: `PATCH`-based
//! transfers with a server-tracked byte offset, supporting pause, resume across process
//! restarts, and recovery from transient network failures.
//!
//! The core is [`engine::Upload`], the state machine driving a single transfer. Everything else
//! is a collaborator it consumes: a [`transport::Transport`] to speak HTTP, an
//! [`chunk::UploadSource`] to read file bytes, an optional [`store::HandleStore`] to persist
//! `fingerprint -> resource-uri` mappings across restarts, and an optional
//! [`speed::SpeedProbe`] to seed an ETA estimate.

#[macro_use]
extern crate log;

pub mod chunk;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod metadata;
pub mod observer;
pub mod retry;
pub mod speed;
pub mod store;
pub mod transport;

pub use chunk::{FileSource, UploadSource};
pub use engine::{State, Upload, UploadOptions, UploadOutcome, UploadParams};
pub use error::{ProtocolError, UploadError};
pub use fingerprint::derive_fingerprint;
pub use observer::{ControlHandle, UploadObserver};
pub use retry::RetryScale;
pub use speed::{HttpSpeedProbe, SpeedProbe};
pub use store::{FileStore, HandleStore, MemoryStore};
pub use transport::{Header, Transport, TransportResponse};

#[cfg(feature = "default_transport")]
pub use transport::UreqTransport;
