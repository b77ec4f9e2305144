//! Newline-delimited TCP intake for `(command, reading)` pairs.

use std::net::SocketAddr;

use anyhow::{Context, anyhow};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One cycle's worth of raw wire input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePair {
    /// Command symbol, "0" to "4"
    pub command: String,
    /// Range reading in millimetres
    pub reading: String,
}

/// Accepts sources on `bind` and forwards their pairs to the localization loop.
///
/// Each connection alternates command and reading lines. Pairing is per
/// connection, so concurrent sources never split each other's pairs.
pub async fn serve(bind: SocketAddr, tx: mpsc::Sender<WirePair>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding command/reading listener on {}", bind))?;
    info!(%bind, "Listening for command/reading pairs");

    loop {
        let (socket, peer) = listener.accept().await.context("accepting source connection")?;
        if tx.is_closed() {
            error!("Localization loop has stopped. Closing listener.");
            return Ok(());
        }
        info!(%peer, "Source connected");
        let tx = tx.clone();
        tokio::spawn(async move {
            match handle_connection(socket, &tx).await {
                Ok(pairs) => info!(%peer, pairs, "Source disconnected"),
                Err(e) => warn!(%peer, error = %e, "Source connection failed"),
            }
        });
    }
}

async fn handle_connection(socket: TcpStream, tx: &mpsc::Sender<WirePair>) -> anyhow::Result<u64> {
    socket.set_nodelay(true)?;
    read_pairs(BufReader::new(socket), tx).await
}

/// Reads alternating command and reading lines until EOF.
///
/// Blank lines in command position are ignored. A blank line in reading
/// position is an absent reading and still completes the pair.
///
/// # Returns
/// * `anyhow::Result<u64>` - Number of pairs forwarded
pub async fn read_pairs<R>(reader: R, tx: &mpsc::Sender<WirePair>) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut pending: Option<String> = None;
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match pending.take() {
            None if line.is_empty() => continue,
            None => pending = Some(line.to_string()),
            Some(command) => {
                let pair = WirePair {
                    command,
                    reading: line.to_string(),
                };
                debug!(?pair, "Pair received");
                tx.send(pair)
                    .await
                    .map_err(|_| anyhow!("localization loop has stopped"))?;
                forwarded += 1;
            }
        }
    }

    if let Some(command) = pending {
        warn!(%command, "Connection closed between command and reading");
    }
    Ok(forwarded)
}
