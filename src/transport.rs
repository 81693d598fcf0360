//! The wire boundary between a cluster client and a silo: frames envelopes
//! so message boundaries and per-stream order survive the underlying byte
//! stream, without prescribing what that stream actually is (TCP, a test
//! in-memory pipe, anything `AsyncRead + AsyncWrite`).

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Envelope;

/// Sends and receives whole envelopes, preserving the order within one
/// connection. Implementations are responsible for length-prefixing or
/// otherwise framing their underlying byte stream.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: Envelope) -> Result<()>;
    async fn recv(&self) -> Result<Option<Envelope>>;
}

/// An in-process transport over an unbounded channel pair, for tests and
/// single-process examples that want to exercise the client/host boundary
/// without a real socket.
pub mod in_memory {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::sync::Mutex;

    pub struct InMemoryTransport {
        tx: mpsc::UnboundedSender<Envelope>,
        rx: Mutex<mpsc::UnboundedReceiver<Envelope>>,
    }

    /// Builds a connected pair: whatever is sent on one side is received on
    /// the other, in order.
    pub fn pair() -> (InMemoryTransport, InMemoryTransport) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (
            InMemoryTransport {
                tx: tx_a,
                rx: Mutex::new(rx_b),
            },
            InMemoryTransport {
                tx: tx_b,
                rx: Mutex::new(rx_a),
            },
        )
    }

    #[async_trait]
    impl Transport for InMemoryTransport {
        async fn send(&self, envelope: Envelope) -> Result<()> {
            self.tx
                .send(envelope)
                .map_err(|_| crate::error::QuarkError::TransportFailed {
                    reason: "peer dropped".into(),
                })
        }

        async fn recv(&self) -> Result<Option<Envelope>> {
            Ok(self.rx.lock().await.recv().await)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::identity::{ActorIdentity, MessageIdGenerator};

        #[tokio::test]
        async fn pair_preserves_order() {
            let (a, b) = pair();
            let gen = MessageIdGenerator::new();
            let target = ActorIdentity::new("T", "1");
            let first = Envelope::new(target.clone(), "m1", vec![], gen.next());
            let second = Envelope::new(target.clone(), "m2", vec![], gen.next());
            a.send(first.clone()).await.unwrap();
            a.send(second.clone()).await.unwrap();

            let got_first = b.recv().await.unwrap().unwrap();
            let got_second = b.recv().await.unwrap().unwrap();
            assert_eq!(got_first.method, "m1");
            assert_eq!(got_second.method, "m2");
        }
    }
}
