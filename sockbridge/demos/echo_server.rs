//! Echo server: accepts connections on 127.0.0.1:11000, reads until
//! `<EOF>`, sends the text back and closes the connection.
//!
//! Run with `cargo run --example echo_server`; set `RUST_LOG=debug` (or
//! `trace`) to see the I/O thread at work.

use sockbridge::{BufferView, Socket, SocketExt, SocketFlags, task};

use std::net::{Shutdown, SocketAddr};
use tracing_subscriber::EnvFilter;

const ADDRESS: &str = "127.0.0.1:11000";
const BACKLOG: i32 = 100;
const EOF: &str = "<EOF>";

/// Whether `data` holds the terminator, in any letter case.
fn ends_message(data: &[u8]) -> bool {
    String::from_utf8_lossy(data)
        .to_ascii_lowercase()
        .contains(&EOF.to_ascii_lowercase())
}

async fn handle_request(socket: Socket) -> sockbridge::Result<()> {
    let mut data = Vec::new();
    let mut buffer = BufferView::full(vec![0; 1024]);

    loop {
        let received = socket.receive(buffer, SocketFlags::NONE)?.await;
        let (n, view) = (received.0?, received.1);
        buffer = view;

        if n == 0 {
            // Zero-byte reads are skipped, not treated as end of stream.
            continue;
        }

        data.extend_from_slice(&buffer.as_slice()[..n]);

        if ends_message(&data) {
            break;
        }
    }

    tracing::info!(
        bytes = data.len(),
        text = %String::from_utf8_lossy(&data),
        "text received"
    );

    let sent = socket.send(BufferView::full(data), SocketFlags::NONE)?.await;
    sent.0?;

    socket.shutdown(Shutdown::Both)?;
    socket.close();

    Ok(())
}

#[sockbridge::main]
async fn main() -> sockbridge::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let address: SocketAddr = ADDRESS.parse().expect("valid listen address");

    let listener = Socket::builder().reuse_address(true).build();
    listener.bind(address)?;
    listener.listen(BACKLOG)?;

    tracing::info!(%address, "waiting for connections");

    loop {
        let socket = listener.accept()?.await?;

        tracing::debug!(peer = ?socket.peer_addr().ok(), "connection accepted");

        task::spawn(async move {
            if let Err(e) = handle_request(socket).await {
                tracing::warn!(error = %e, "request failed");
            }
        });
    }
}
