//! The acceptor loop: one independent task per accepted connection, a
//! shared atomic shutdown flag, and the connection boundary that turns
//! parse failures into 400 responses before handing off to the handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use crate::headers::Headers;
use crate::request::{Request, RequestError};
use crate::response::{StatusCode, Writer};

/// The user-supplied per-request callback. Implementors drive `writer`
/// through a legal state sequence; failing to reach at least
/// `headers-written` produces a malformed response on the wire (the
/// writer does not prevent this — see the response module's state
/// machine for what it *does* prevent).
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, writer: &mut Writer<'_, TcpStream>, request: &Request);
}

/// A bound TCP listener plus the shared shutdown flag. Closing the
/// listener and flipping `closed` is the only cross-task coordination in
/// this crate; in-flight connection tasks are not otherwise signalled.
pub struct Server {
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
    local_addr: std::net::SocketAddr,
}

impl Server {
    /// Bind `addr` and spawn the acceptor loop, dispatching every accepted
    /// connection to its own task running `handler`.
    pub async fn serve(addr: &str, handler: Arc<dyn Handler>) -> std::io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let closed = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());

        let accept_closed = closed.clone();
        let accept_notify = notify.clone();
        tokio::spawn(async move {
            accept_loop(listener, handler, accept_closed, accept_notify).await;
        });

        Ok(Server {
            closed,
            notify,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Flip the shutdown flag and wake the acceptor loop. The loop checks
    /// the flag every time it wakes — whether from a failed `accept` or
    /// from this notification — and exits cleanly rather than logging.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _peer_addr)) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, handler).await;
                        });
                    }
                    Err(err) => {
                        if closed.load(Ordering::SeqCst) {
                            tracing::debug!("listener closed, acceptor exiting");
                            return;
                        }
                        tracing::warn!(error = %err, "accept failed");
                    }
                }
            }
            _ = notify.notified() => {
                if closed.load(Ordering::SeqCst) {
                    tracing::debug!("shutdown requested, acceptor exiting");
                    return;
                }
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, handler: Arc<dyn Handler>) {
    let request = match Request::from_reader(&mut stream).await {
        Ok(request) => request,
        Err(err @ RequestError::Io(_)) => {
            tracing::warn!(error = %err, "transport error while reading request, aborting connection");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to parse request");
            let _ = write_bad_request(&mut stream, &err.to_string()).await;
            return;
        }
    };

    let mut writer = Writer::new(&mut stream);
    handler.handle(&mut writer, &request).await;
}

async fn write_bad_request(stream: &mut TcpStream, message: &str) -> Result<(), std::io::Error> {
    let body = message.as_bytes();
    let mut writer = Writer::new(stream);
    writer
        .write_status_line(StatusCode::BAD_REQUEST)
        .await
        .map_err(to_io_error)?;
    writer
        .write_headers(&Headers::default_response_headers(body.len()))
        .await
        .map_err(to_io_error)?;
    writer.write_body(body).await.map_err(to_io_error)?;
    Ok(())
}

fn to_io_error(err: crate::response::WriterError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}
