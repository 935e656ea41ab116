//! Submission of encoded programs to chains.
//!
//! The IR itself never talks to a chain. A [`ChainGateway`] takes encoded
//! bytes for a target network and reports what happened to them on an event
//! stream. Submission is asynchronous; dropping the returned future cancels
//! it, and [`submit_with_timeout`] bounds how long a caller waits.

pub mod local_gateway;

use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::types::wrapper_types::BoxFuture;
use crate::xcvm::errors::XcvmError;
use crate::xcvm::network::Network;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

/// Identifies an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionHandle {
    /// Hash of the submitted envelope.
    pub id: Hash,
    pub network: Network,
}

impl fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.network)
    }
}

/// Outcome of a submission, as observed on the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Accepted { handle: SubmissionHandle },
    Rejected { network: Network, reason: XcvmError },
}

/// Errors returned to the submitter.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The bytes did not decode to a valid program.
    #[error("submission rejected: {0}")]
    Rejected(#[from] XcvmError),

    /// The gateway is not connected to the target network.
    #[error("unknown {0}")]
    UnknownNetwork(Network),

    /// The submission did not complete in time.
    #[error("submission timed out")]
    Timeout,
}

/// Async seam between program construction and chain submission.
pub trait ChainGateway: Send + Sync {
    /// Submits an encoded program envelope for execution on `network`.
    fn submit(
        self: &Arc<Self>,
        network: Network,
        bytes: Bytes,
    ) -> BoxFuture<'static, Result<SubmissionHandle, GatewayError>>;

    /// Takes the event stream. Only the first caller receives it.
    fn events(self: &Arc<Self>) -> BoxFuture<'static, Option<Receiver<GatewayEvent>>>;
}

/// Submits through `gateway`, giving up after `timeout`.
pub async fn submit_with_timeout<G: ChainGateway>(
    gateway: &Arc<G>,
    network: Network,
    bytes: Bytes,
    timeout: Duration,
) -> Result<SubmissionHandle, GatewayError> {
    tokio::time::timeout(timeout, gateway.submit(network, bytes))
        .await
        .map_err(|_| GatewayError::Timeout)?
}
