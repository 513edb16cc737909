use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use pkv_client::{ClientError, Security};
use pkv_settings::{redis_instance, CacheSettings};

#[test]
fn fallback_handle_talks_plain_resp() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        // *1\r\n$4\r\nPING\r\n
        let mut line = String::new();
        for _ in 0..3 {
            line.clear();
            reader.read_line(&mut line).expect("read");
        }
        assert_eq!(line, "PING\r\n");
        stream.write_all(b"+PONG\r\n").expect("write");
    });

    let settings = CacheSettings {
        url: None,
        host: "127.0.0.1".to_string(),
        port,
    };
    let client = redis_instance(&settings);
    assert_eq!(client.config().security, Security::Plain);
    assert_eq!(client.ping(None).expect("ping"), b"PONG".to_vec());
}

#[test]
fn url_handle_opens_tls_session() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut first = [0u8; 1];
        let _ = stream.read_exact(&mut first);
        let _ = tx.send(first[0]);
        // Dropping the socket aborts the handshake.
    });

    let settings = CacheSettings {
        url: Some(format!("rediss://:pw@127.0.0.1:{}", port)),
        ..CacheSettings::default()
    };
    let client = redis_instance(&settings);
    assert!(client.ping(None).is_err());

    // 0x16 is the TLS handshake record type; a plain client would send '*'.
    let first_byte = rx.recv_timeout(Duration::from_secs(2)).expect("server saw bytes");
    assert_eq!(first_byte, 0x16);
}

#[test]
fn unreachable_hosts_fail_lazily() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let settings = CacheSettings {
        url: None,
        host: "127.0.0.1".to_string(),
        port,
    };
    let client = redis_instance(&settings);
    assert!(matches!(client.get(b"key"), Err(ClientError::Io(_))));
}

#[test]
fn malformed_url_fails_lazily() {
    let settings = CacheSettings {
        url: Some("rediss://:pw@host:not-a-port".to_string()),
        ..CacheSettings::default()
    };
    let client = redis_instance(&settings);
    assert!(matches!(client.ping(None), Err(ClientError::InvalidEndpoint(_))));
}
