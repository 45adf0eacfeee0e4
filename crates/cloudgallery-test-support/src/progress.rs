//! Local WebSocket server standing in for the backend progress endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// One-connection progress server.
#[derive(Debug)]
pub struct ProgressServer {
    addr: SocketAddr,
    path: oneshot::Receiver<String>,
    task: JoinHandle<Result<()>>,
}

impl ProgressServer {
    /// Accept a single client, wait `delay`, push `lines`, then close.
    ///
    /// # Errors
    ///
    /// Returns an error when no local port can be bound.
    pub async fn start(lines: Vec<String>, delay: Duration) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind progress server")?;
        let addr = listener.local_addr().context("progress server address")?;
        let (path_tx, path) = oneshot::channel();
        let task = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.context("accept")?;
            let mut requested = None;
            let mut ws = accept_hdr_async(
                socket,
                |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    requested = Some(request.uri().path().to_string());
                    Ok(response)
                },
            )
            .await
            .context("websocket handshake")?;
            if let Some(requested) = requested {
                let _ = path_tx.send(requested);
            }
            tokio::time::sleep(delay).await;
            for line in lines {
                ws.send(Message::Text(line)).await.context("send line")?;
            }
            ws.close(None).await.context("close")?;
            Ok(())
        });
        Ok(Self { addr, path, task })
    }

    /// Address the server listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `ws://` URL for `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }

    /// Path requested by the client during the handshake.
    ///
    /// # Errors
    ///
    /// Returns an error when no client completed a handshake.
    pub async fn requested_path(&mut self) -> Result<String> {
        (&mut self.path)
            .await
            .context("no client connected to the progress server")
    }

    /// Wait for the server task to finish.
    ///
    /// # Errors
    ///
    /// Returns the server task's error.
    pub async fn finish(self) -> Result<()> {
        self.task.await.context("progress server task panicked")?
    }
}
