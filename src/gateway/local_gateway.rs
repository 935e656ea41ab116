//! In-memory gateway for tests and local simulation.
//!
//! Treats every submission as untrusted: bytes are decoded under the
//! configured limits, validating every node, before being stored.

use crate::config::CodecLimits;
use crate::gateway::{ChainGateway, GatewayError, GatewayEvent, SubmissionHandle};
use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::types::wrapper_types::BoxFuture;
use crate::xcvm::network::Network;
use crate::xcvm::program::Program;
use crate::{info, warn};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{Receiver, Sender, channel};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Accepts programs for a fixed set of networks and keeps them by hash.
pub struct LocalGateway {
    networks: DashSet<Network>,
    programs: DashMap<Hash, Program>,
    limits: CodecLimits,
    tx: Sender<GatewayEvent>,
    rx: Arc<Mutex<Option<Receiver<GatewayEvent>>>>,
}

impl LocalGateway {
    /// Creates a gateway connected to `networks`, using the global limits.
    pub fn new(networks: &[Network]) -> Arc<LocalGateway> {
        Self::with_limits(networks, *CodecLimits::global())
    }

    pub fn with_limits(networks: &[Network], limits: CodecLimits) -> Arc<LocalGateway> {
        let (tx, rx) = channel(EVENT_CHANNEL_CAPACITY);

        Arc::new(LocalGateway {
            networks: networks.iter().copied().collect(),
            programs: DashMap::new(),
            limits,
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        })
    }

    /// Connects an additional network.
    pub fn connect(&self, network: Network) {
        self.networks.insert(network);
    }

    /// Returns an accepted program by its submission id.
    pub fn program(&self, id: &Hash) -> Option<Program> {
        self.programs.get(id).map(|entry| entry.value().clone())
    }

    /// Number of distinct programs accepted so far.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Event delivery is best effort; a closed or full stream never fails
    /// the submission itself.
    fn publish(&self, event: GatewayEvent) {
        if self.tx.try_send(event).is_err() {
            warn!("gateway event dropped: event stream closed or full");
        }
    }
}

impl ChainGateway for LocalGateway {
    fn submit(
        self: &Arc<Self>,
        network: Network,
        bytes: Bytes,
    ) -> BoxFuture<'static, Result<SubmissionHandle, GatewayError>> {
        let this = self.clone();

        Box::pin(async move {
            if !this.networks.contains(&network) {
                warn!("submission to unknown {network} refused");
                return Err(GatewayError::UnknownNetwork(network));
            }

            let program = match Program::from_bytes_with(&bytes, &this.limits) {
                Ok(program) => program,
                Err(reason) => {
                    warn!("rejected program for {network}: {reason}");
                    this.publish(GatewayEvent::Rejected {
                        network,
                        reason: reason.clone(),
                    });
                    return Err(GatewayError::Rejected(reason));
                }
            };

            let handle = SubmissionHandle {
                id: program.hash(),
                network,
            };
            info!(
                "accepted program {} ({} instructions, depth {})",
                handle,
                program.instruction_count(),
                program.depth()
            );
            this.programs.insert(handle.id, program);
            this.publish(GatewayEvent::Accepted { handle });
            Ok(handle)
        })
    }

    fn events(self: &Arc<Self>) -> BoxFuture<'static, Option<Receiver<GatewayEvent>>> {
        let rx = self.rx.clone();

        Box::pin(async move { rx.lock().await.take() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::DecodeError;
    use crate::utils::test_utils::utils::{nested_program, sample_call, sample_transfer};
    use crate::xcvm::errors::XcvmError;
    use crate::xcvm::instruction::Instructions;

    fn program() -> Program {
        Program::new(Instructions::new(vec![sample_transfer().into(), sample_call().into()]).unwrap())
    }

    #[tokio::test]
    async fn accepts_valid_program() {
        let gateway = LocalGateway::new(&[Network::PICASSO, Network::ETHEREUM]);
        let mut events = gateway.events().await.unwrap();

        let program = program();
        let handle = gateway
            .submit(Network::ETHEREUM, program.to_bytes())
            .await
            .unwrap();

        assert_eq!(handle.id, program.hash());
        assert_eq!(handle.network, Network::ETHEREUM);
        assert_eq!(gateway.program(&handle.id), Some(program));
        assert_eq!(events.recv().await, Some(GatewayEvent::Accepted { handle }));
    }

    #[tokio::test]
    async fn rejects_corrupt_bytes() {
        let gateway = LocalGateway::new(&[Network::PICASSO]);
        let mut events = gateway.events().await.unwrap();

        let mut bytes = program().to_bytes().to_vec();
        bytes[0] = b'Z';
        let err = gateway
            .submit(Network::PICASSO, Bytes::from(bytes))
            .await
            .unwrap_err();

        let expected = XcvmError::Decode(DecodeError::BadMagic);
        assert!(matches!(&err, GatewayError::Rejected(reason) if *reason == expected));
        assert!(gateway.is_empty());
        assert_eq!(
            events.recv().await,
            Some(GatewayEvent::Rejected {
                network: Network::PICASSO,
                reason: expected
            })
        );
    }

    #[tokio::test]
    async fn rejects_unknown_network() {
        let gateway = LocalGateway::new(&[Network::PICASSO]);
        let err = gateway
            .submit(Network::ETHEREUM, program().to_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownNetwork(n) if n == Network::ETHEREUM));

        gateway.connect(Network::ETHEREUM);
        assert!(gateway.submit(Network::ETHEREUM, program().to_bytes()).await.is_ok());
    }

    #[tokio::test]
    async fn enforces_configured_depth() {
        let limits = CodecLimits {
            max_spawn_depth: 1,
            ..CodecLimits::default()
        };
        let gateway = LocalGateway::with_limits(&[Network::PICASSO], limits);

        assert!(gateway.submit(Network::PICASSO, nested_program(1).to_bytes()).await.is_ok());
        let err = gateway
            .submit(Network::PICASSO, nested_program(2).to_bytes())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rejected(XcvmError::Decode(DecodeError::DepthExceeded { limit: 1 }))
        ));
    }

    #[tokio::test]
    async fn events_taken_once() {
        let gateway = LocalGateway::new(&[Network::PICASSO]);
        assert!(gateway.events().await.is_some());
        assert!(gateway.events().await.is_none());
    }

    #[tokio::test]
    async fn dropped_stream_does_not_fail_submission() {
        let gateway = LocalGateway::new(&[Network::PICASSO]);
        drop(gateway.events().await);
        assert!(gateway.submit(Network::PICASSO, program().to_bytes()).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_submissions() {
        let gateway = LocalGateway::new(&[Network::PICASSO]);
        let mut tasks = Vec::new();
        for depth in 0..8 {
            let gateway = gateway.clone();
            tasks.push(tokio::spawn(async move {
                gateway
                    .submit(Network::PICASSO, nested_program(depth).to_bytes())
                    .await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(gateway.len(), 8);
    }
}
