mod common;

use common::{MECHANISMS, MockSocket};

use sockbridge::{BufferView, Error, SocketError, SocketExt, SocketFlags};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::thread;
use std::time::Duration;

const LATER: Duration = Duration::from_millis(30);

fn endpoint() -> SocketAddr {
    "127.0.0.1:9000".parse().unwrap()
}

#[sockbridge::test]
async fn test_every_operation_resolves_once_inline() {
    for mechanism in MECHANISMS {
        let socket = MockSocket::new(mechanism);

        socket.connect(endpoint()).unwrap().await.unwrap();
        socket.connect_host("example.test", 80).unwrap().await.unwrap();
        socket
            .connect_address(IpAddr::V4(Ipv4Addr::LOCALHOST), 80)
            .unwrap()
            .await
            .unwrap();
        socket
            .connect_addresses(&[IpAddr::V4(Ipv4Addr::LOCALHOST)], 80)
            .unwrap()
            .await
            .unwrap();
        socket.disconnect(true).unwrap().await.unwrap();
        socket.accept().unwrap().await.unwrap();

        let received = socket
            .receive(BufferView::full(vec![0; 8]), SocketFlags::NONE)
            .unwrap()
            .await;
        assert_eq!(received.0.unwrap(), 8);

        let sent = socket
            .send(BufferView::full(b"abc".to_vec()), SocketFlags::NONE)
            .unwrap()
            .await;
        assert_eq!(sent.0.unwrap(), 3);

        let sent = socket
            .send_vectored(
                vec![BufferView::full(b"ab".to_vec()), BufferView::full(b"cd".to_vec())],
                SocketFlags::NONE,
            )
            .unwrap()
            .await;
        assert_eq!(sent.0.unwrap(), 4);
        assert_eq!(sent.1.len(), 2);

        socket
            .send_to(BufferView::full(b"x".to_vec()), SocketFlags::NONE, endpoint())
            .unwrap()
            .await
            .0
            .unwrap();
        socket
            .send_file(Path::new("/dev/null"))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(socket.calls(), 12, "{mechanism:?}");
    }
}

#[sockbridge::test]
async fn test_operation_resolves_after_late_completion() {
    for mechanism in MECHANISMS {
        let socket = MockSocket::new(mechanism).later(LATER);

        let operation = socket
            .receive(BufferView::full(vec![0; 4]), SocketFlags::NONE)
            .unwrap();
        assert!(!operation.is_complete(), "{mechanism:?}");

        let received = operation.await;
        assert_eq!(received.0.unwrap(), 4);
        assert_eq!(received.1.len(), 4);
        assert_eq!(socket.calls(), 1);
    }
}

#[sockbridge::test]
async fn test_reset_receive_keeps_status_and_buffer() {
    for mechanism in MECHANISMS {
        for socket in [
            MockSocket::new(mechanism).failing(SocketError::ConnectionReset),
            MockSocket::new(mechanism)
                .failing(SocketError::ConnectionReset)
                .later(LATER),
        ] {
            let received = socket
                .receive(BufferView::new(vec![7; 16], 4, 8).unwrap(), SocketFlags::NONE)
                .unwrap()
                .await;

            let err = received.0.unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Socket {
                        status: SocketError::ConnectionReset,
                        ..
                    }
                ),
                "{mechanism:?}: {err:?}"
            );
            assert_eq!(err.status(), Some(SocketError::ConnectionReset));

            assert_eq!(received.1.offset(), 4);
            assert_eq!(received.1.len(), 8);
            assert_eq!(received.1.into_inner(), vec![7; 16]);
        }
    }
}

#[sockbridge::test]
async fn test_name_resolution_failure_names_host() {
    for mechanism in MECHANISMS {
        let socket = MockSocket::new(mechanism).unresolvable();
        let err = socket
            .connect_host("nowhere.test", 443)
            .unwrap()
            .await
            .unwrap_err();

        match err {
            Error::NameResolution { host, .. } => assert_eq!(host, "nowhere.test"),
            other => panic!("{mechanism:?}: unexpected {other:?}"),
        }
    }
}

#[sockbridge::test]
async fn test_refused_begin_resolves_to_failure() {
    for mechanism in MECHANISMS {
        let socket = MockSocket::new(mechanism).refusing();

        let sent = socket
            .send(BufferView::full(b"data".to_vec()), SocketFlags::NONE)
            .unwrap()
            .await;

        assert_eq!(sent.0.unwrap_err().status(), Some(SocketError::NotConnected));
        assert_eq!(sent.1.as_slice(), b"data");
    }
}

#[test]
fn test_operation_can_be_awaited_from_another_runtime_thread() {
    let runtime = sockbridge::RuntimeBuilder::new().worker_threads(2).build();
    let socket = MockSocket::new(sockbridge::Mechanism::EventCompletion).later(LATER);

    let operation = socket.disconnect(false).unwrap();

    let waiter = thread::spawn(move || runtime.block_on(operation));
    assert!(waiter.join().unwrap().is_ok());
}
