mod common;

use common::MECHANISMS;

use sockbridge::{
    Ascii, BufferView, Error, Mechanism, Operation, RuntimeBuilder, Socket, SocketError,
    SocketExt, SocketFlags, SocketKind, TransmitFileOptions,
};

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Echoes everything up to and including `<EOF>`, then closes.
fn spawn_echo_server() -> (SocketAddr, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept connection");
        let mut data = Vec::new();
        let mut buffer = [0; 64];

        while !String::from_utf8_lossy(&data).contains("<EOF>") {
            let n = stream.read(&mut buffer).expect("Failed to read from stream");
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buffer[..n]);
        }

        stream.write_all(&data).expect("Failed to write to stream");
    });

    (addr, handle)
}

async fn read_until_eof(socket: &Socket) -> String {
    let mut text = String::new();
    let mut buffer = BufferView::full(vec![0; 16]);

    while !text.contains("<EOF>") {
        let received = socket.receive(buffer, SocketFlags::NONE).unwrap().await;
        let n = received.0.unwrap();
        buffer = received.1;

        assert!(n > 0, "peer closed before <EOF>");
        text.push_str(&String::from_utf8_lossy(&buffer.as_slice()[..n]));
    }

    text
}

#[sockbridge::test]
async fn test_ping_echo_round_trip() {
    for mechanism in MECHANISMS {
        let (addr, server) = spawn_echo_server();
        let socket = Socket::builder().mechanism(mechanism).build();

        socket.connect(addr).unwrap().await.unwrap();

        let sent = socket
            .send_message("ping<EOF>", &Ascii, SocketFlags::NONE)
            .unwrap()
            .await;
        assert_eq!(sent.0.unwrap(), 9);

        assert_eq!(read_until_eof(&socket).await, "ping<EOF>");

        socket.shutdown(Shutdown::Both).unwrap();
        server.join().expect("Thread panicked");
    }
}

#[sockbridge::test]
async fn test_accept_waits_for_connection() {
    for mechanism in MECHANISMS {
        let listener = Socket::builder().mechanism(mechanism).build();
        listener.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        listener.listen(16).unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = listener.accept().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!accept.is_complete(), "{mechanism:?}");

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).expect("Failed to connect to listener");
            stream.write_all(b"hi<EOF>").expect("Failed to write to stream");

            let mut reply = Vec::new();
            stream.read_to_end(&mut reply).expect("Failed to read from stream");
            reply
        });

        let socket = accept.await.unwrap();
        assert_eq!(read_until_eof(&socket).await, "hi<EOF>");

        let sent = socket
            .send(BufferView::full(b"bye".to_vec()), SocketFlags::NONE)
            .unwrap()
            .await;
        assert_eq!(sent.0.unwrap(), 3);

        socket.disconnect(false).unwrap().await.unwrap();
        assert!(socket.is_closed());

        assert_eq!(client.join().expect("Thread panicked"), b"bye".to_vec());
    }
}

/// Awaits `operation` on a separate runtime, giving up after a few seconds.
fn resolve_within<T: Send + 'static>(operation: Operation<T>) -> T {
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let runtime = RuntimeBuilder::new().worker_threads(1).build();
        let _ = sender.send(runtime.block_on(operation));
    });

    receiver
        .recv_timeout(Duration::from_secs(3))
        .expect("Operation did not resolve")
}

fn parked_accept(mechanism: Mechanism) -> (Socket, Operation<sockbridge::Result<Socket>>) {
    let listener = Socket::builder().mechanism(mechanism).build();
    listener.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    listener.listen(16).unwrap();

    let accept = listener.accept().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(!accept.is_complete(), "{mechanism:?}");

    (listener, accept)
}

#[test]
fn test_close_aborts_parked_accept() {
    for mechanism in MECHANISMS {
        let (listener, accept) = parked_accept(mechanism);
        listener.close();

        let err = resolve_within(accept).unwrap_err();
        assert_eq!(err.status(), Some(SocketError::OperationAborted), "{err:?}");
    }
}

#[test]
fn test_disconnect_aborts_parked_accept() {
    for mechanism in MECHANISMS {
        let (listener, accept) = parked_accept(mechanism);
        resolve_within(listener.disconnect(false).unwrap()).unwrap();
        assert!(listener.is_closed());

        let err = resolve_within(accept).unwrap_err();
        assert_eq!(err.status(), Some(SocketError::OperationAborted), "{err:?}");
    }
}

#[sockbridge::test]
async fn test_connect_to_closed_port_is_refused() {
    for mechanism in MECHANISMS {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
            listener.local_addr().expect("Failed to get local address")
        };

        let socket = Socket::builder().mechanism(mechanism).build();
        let err = socket.connect(addr).unwrap().await.unwrap_err();

        assert_eq!(err.status(), Some(SocketError::ConnectionRefused), "{err:?}");
    }
}

#[cfg(target_os = "linux")]
#[sockbridge::test]
async fn test_connect_tries_addresses_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let port = listener.local_addr().expect("Failed to get local address").port();

    let socket = Socket::new();
    socket
        .connect_addresses(
            &["127.0.0.2".parse().unwrap(), "127.0.0.1".parse().unwrap()],
            port,
        )
        .unwrap()
        .await
        .unwrap();

    assert_eq!(socket.peer_addr().unwrap().port(), port);
    drop(listener);
}

#[sockbridge::test]
async fn test_unresolvable_host_is_a_name_resolution_failure() {
    for mechanism in MECHANISMS {
        let socket = Socket::builder().mechanism(mechanism).build();
        let err = socket
            .connect_host("name.invalid", 80)
            .unwrap()
            .await
            .unwrap_err();

        assert!(
            matches!(&err, Error::NameResolution { host, .. } if host == "name.invalid"),
            "{mechanism:?}: {err:?}"
        );
    }
}

#[sockbridge::test]
async fn test_send_file_streams_pre_file_post() {
    let path = std::env::temp_dir().join(format!("sockbridge-send-file-{}", std::process::id()));
    std::fs::write(&path, vec![b'f'; 100_000]).expect("Failed to write temp file");

    for mechanism in MECHANISMS {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("Failed to accept connection");
            let mut data = Vec::new();
            stream.read_to_end(&mut data).expect("Failed to read from stream");
            data
        });

        let socket = Socket::builder().mechanism(mechanism).build();
        socket.connect(addr).unwrap().await.unwrap();

        socket
            .send_file_with(
                &path,
                Some(b"head:".to_vec()),
                Some(b":tail".to_vec()),
                TransmitFileOptions::DISCONNECT | TransmitFileOptions::REUSE_SOCKET,
            )
            .unwrap()
            .await
            .unwrap();

        let data = server.join().expect("Thread panicked");
        assert_eq!(data.len(), 5 + 100_000 + 5);
        assert!(data.starts_with(b"head:"));
        assert!(data.ends_with(b":tail"));

        // Reused: the socket may connect again.
        assert!(!socket.is_closed());
    }

    let _ = std::fs::remove_file(&path);
}

#[sockbridge::test]
async fn test_send_file_missing_file_fails() {
    let (addr, _server) = spawn_echo_server();
    let socket = Socket::new();
    socket.connect(addr).unwrap().await.unwrap();

    let err = socket
        .send_file(std::path::Path::new("/nonexistent/sockbridge/file"))
        .unwrap()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Socket { .. }), "{err:?}");

    // Unblock the echo thread.
    let sent = socket
        .send(BufferView::full(b"<EOF>".to_vec()), SocketFlags::NONE)
        .unwrap()
        .await;
    sent.0.unwrap();
}

#[sockbridge::test]
async fn test_send_to_delivers_datagram() {
    for mechanism in MECHANISMS {
        let receiver = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind receiver");
        let addr = receiver.local_addr().expect("Failed to get local address");

        let socket = Socket::builder()
            .kind(SocketKind::Datagram)
            .mechanism(mechanism)
            .build();

        let sent = socket
            .send_to(
                BufferView::new(b"..datagram..".to_vec(), 2, 8).unwrap(),
                SocketFlags::NONE,
                addr,
            )
            .unwrap()
            .await;
        assert_eq!(sent.0.unwrap(), 8);

        let mut buffer = [0; 32];
        let (n, _) = receiver.recv_from(&mut buffer).expect("Failed to receive");
        assert_eq!(&buffer[..n], b"datagram");
    }
}

#[sockbridge::test]
async fn test_vectored_receive_fills_windows_in_order() {
    let (addr, server) = spawn_echo_server();
    let socket = Socket::builder().mechanism(Mechanism::EventCompletion).build();
    socket.connect(addr).unwrap().await.unwrap();

    let sent = socket
        .send_vectored(
            vec![
                BufferView::full(b"abc".to_vec()),
                BufferView::full(b"<EOF>".to_vec()),
            ],
            SocketFlags::NONE,
        )
        .unwrap()
        .await;
    assert_eq!(sent.0.unwrap(), 8);

    server.join().expect("Thread panicked");

    let received = socket
        .receive_vectored(
            vec![BufferView::full(vec![0; 2]), BufferView::full(vec![0; 6])],
            SocketFlags::NONE,
        )
        .unwrap()
        .await;

    assert_eq!(received.0.unwrap(), 8);
    assert_eq!(received.1[0].as_slice(), b"ab");
    assert_eq!(received.1[1].as_slice(), b"c<EOF>");
}

#[test]
fn test_closed_socket_operation_fails() {
    let runtime = sockbridge::RuntimeBuilder::new().worker_threads(1).build();

    let result = runtime.block_on(async {
        let socket = Socket::new();
        socket.close();
        socket.accept().unwrap().await
    });

    assert!(matches!(result, Err(Error::Socket { .. })));
}
