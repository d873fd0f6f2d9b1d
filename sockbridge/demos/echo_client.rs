//! Echo client: connects to 127.0.0.1:11000 over and over, sends the
//! current time terminated by `<EOF>` and prints the echoed text.
//!
//! Start `echo_server` first, then `cargo run --example echo_client`.

use sockbridge::{Ascii, BufferView, Socket, SocketExt, SocketFlags};

use std::net::Shutdown;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

const HOST: &str = "127.0.0.1";
const PORT: u16 = 11000;
const EOF: &str = "<EOF>";

async fn exchange() -> sockbridge::Result<String> {
    let socket = Socket::new();
    socket.connect_host(HOST, PORT)?.await?;

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let message = format!("ClientTime: {millis}{EOF}");
    let sent = socket
        .send_message(message.as_str(), &Ascii, SocketFlags::NONE)?
        .await;
    sent.0?;

    let mut text = String::new();
    let mut buffer = BufferView::full(vec![0; 1024]);

    loop {
        let received = socket.receive(buffer, SocketFlags::NONE)?.await;
        let (n, view) = (received.0?, received.1);
        buffer = view;

        if n == 0 {
            // Kept as the original sample behaves: a closed peer makes this
            // spin instead of ending the exchange.
            continue;
        }

        text.push_str(&String::from_utf8_lossy(&buffer.as_slice()[..n]));

        if text.to_ascii_lowercase().contains(&EOF.to_ascii_lowercase()) {
            break;
        }
    }

    socket.shutdown(Shutdown::Both)?;
    Ok(text)
}

#[sockbridge::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    loop {
        match exchange().await {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::error!(error = %e, "exchange failed"),
        }
    }
}
