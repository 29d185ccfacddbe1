//! WebSocket-backed participant connection
//!
//! Each connection owns a bounded queue drained by a single writer task, so
//! any number of routing tasks can `send` concurrently while the socket only
//! ever sees one writer. Messages queued by one task come out in the order
//! they went in.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use crate::connection::{Connection, SendError};
use crate::router::SignalMessage;
use crate::server::session::SessionError;

/// Frame queued for the writer task
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Encoded signaling message
    Text(String),
    /// Keepalive ping
    Ping,
}

/// Connection handle registered for a WebSocket session
pub struct WsConnection {
    session_id: u64,
    tx: mpsc::Sender<Outbound>,
    close: Arc<Notify>,
}

impl WsConnection {
    pub(crate) fn new(session_id: u64, tx: mpsc::Sender<Outbound>, close: Arc<Notify>) -> Self {
        Self {
            session_id,
            tx,
            close,
        }
    }

    /// Queue a keepalive ping
    pub(crate) fn ping(&self) -> Result<(), SendError> {
        self.enqueue(Outbound::Ping)
    }

    fn enqueue(&self, frame: Outbound) -> Result<(), SendError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

impl Connection for WsConnection {
    fn session_id(&self) -> u64 {
        self.session_id
    }

    fn send(&self, message: &SignalMessage) -> Result<(), SendError> {
        let text = message.encode()?;
        self.enqueue(Outbound::Text(text))
    }

    fn close(&self) {
        tracing::debug!(session_id = self.session_id, "Close requested");
        self.close.notify_one();
    }
}

/// Drain the outbound queue into the WebSocket sink
///
/// Runs until every sender is dropped or a write fails. A failed or timed-out
/// write wakes the session's read loop through `close` so the whole session
/// tears down. The closing handshake is bounded by `write_timeout` too.
pub(crate) async fn writer_task<S>(
    session_id: u64,
    mut sink: S,
    mut rx: mpsc::Receiver<Outbound>,
    write_timeout: Duration,
    close: Arc<Notify>,
) where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let result = async {
        while let Some(frame) = rx.recv().await {
            let message = match frame {
                Outbound::Text(text) => Message::Text(text),
                Outbound::Ping => Message::Ping(Vec::new()),
            };

            timeout(write_timeout, sink.send(message))
                .await
                .map_err(|_| SessionError::WriteTimeout)??;
        }
        Ok::<(), SessionError>(())
    }
    .await;

    if let Err(e) = result {
        tracing::debug!(session_id = session_id, error = %e, "Writer stopped");
        close.notify_one();
    }

    let _ = timeout(write_timeout, async {
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    })
    .await;
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    /// Sink that fails every write, or never completes one when stalled
    struct BrokenSink {
        stalled: bool,
    }

    impl Sink<Message> for BrokenSink {
        type Error = axum::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            if self.stalled {
                Poll::Pending
            } else {
                Poll::Ready(Err(axum::Error::new("connection reset")))
            }
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            self.poll_ready(cx)
        }

        fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            self.poll_ready(cx)
        }
    }

    fn connection(capacity: usize) -> (WsConnection, mpsc::Receiver<Outbound>, Arc<Notify>) {
        let (tx, rx) = mpsc::channel(capacity);
        let close = Arc::new(Notify::new());
        (WsConnection::new(7, tx, Arc::clone(&close)), rx, close)
    }

    #[tokio::test]
    async fn test_send_encodes_in_order() {
        let (conn, mut rx, _) = connection(8);

        conn.send(&SignalMessage::new("offer").from("a")).unwrap();
        conn.send(&SignalMessage::new("answer").from("a")).unwrap();

        let Some(Outbound::Text(first)) = rx.recv().await else {
            panic!("expected text frame");
        };
        let Some(Outbound::Text(second)) = rx.recv().await else {
            panic!("expected text frame");
        };
        assert_eq!(first.parse::<SignalMessage>().unwrap().kind, "offer");
        assert_eq!(second.parse::<SignalMessage>().unwrap().kind, "answer");
    }

    #[tokio::test]
    async fn test_full_queue() {
        let (conn, _rx, _) = connection(1);

        conn.send(&SignalMessage::new("offer")).unwrap();
        let err = conn.send(&SignalMessage::new("offer")).unwrap_err();
        assert!(matches!(err, SendError::QueueFull));
    }

    #[tokio::test]
    async fn test_closed_queue() {
        let (conn, rx, _) = connection(1);
        drop(rx);

        let err = conn.send(&SignalMessage::new("offer")).unwrap_err();
        assert!(matches!(err, SendError::Closed));
    }

    #[tokio::test]
    async fn test_close_notifies_session() {
        let (conn, _rx, close) = connection(1);

        // Permit is stored even with no waiter yet
        conn.close();
        tokio::time::timeout(Duration::from_secs(1), close.notified())
            .await
            .unwrap();
        assert_eq!(conn.session_id(), 7);
    }

    #[tokio::test]
    async fn test_write_failure_wakes_session() {
        let (conn, rx, close) = connection(8);
        let writer = tokio::spawn(writer_task(
            7,
            BrokenSink { stalled: false },
            rx,
            Duration::from_secs(1),
            Arc::clone(&close),
        ));

        conn.send(&SignalMessage::new("offer").from("a")).unwrap();

        tokio::time::timeout(Duration::from_secs(1), close.notified())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .unwrap()
            .unwrap();

        // The writer is gone, so later sends see a closed queue
        let err = conn.send(&SignalMessage::new("answer")).unwrap_err();
        assert!(matches!(err, SendError::Closed));
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        let (conn, rx, close) = connection(8);
        let writer = tokio::spawn(writer_task(
            7,
            BrokenSink { stalled: true },
            rx,
            Duration::from_millis(50),
            Arc::clone(&close),
        ));

        conn.send(&SignalMessage::new("offer").from("a")).unwrap();

        tokio::time::timeout(Duration::from_secs(1), close.notified())
            .await
            .unwrap();
        // The close frame hits the same stalled sink and must not hang the writer
        tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .unwrap()
            .unwrap();
    }
}
