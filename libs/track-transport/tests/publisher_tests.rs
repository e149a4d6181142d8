use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, UdpSocket};
use zeromq::{Socket, SocketRecv, SubSocket};

use track_api::{ErrorKind, RECORD_SIZE, TrackRecord, Transport, Vec3};
use track_transport::{
    ByteOrder, Endpoint, FramingConfig, FramingKind, TcpPublisher, TransportOptions, UdpPublisher, ZmqPublisher,
    open,
};

fn record(n: i64) -> TrackRecord {
    TrackRecord {
        track_id: 1001,
        velocity: Vec3::new(0.0, 1000.0, 0.0),
        position: Vec3::new(10_000.0, 0.0, 5_000.0),
        capture_time_ms: 1_760_000_000_000 + n,
    }
}

async fn wait_for_subscribers(publisher: &TcpPublisher, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while publisher.subscribers() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber never attached");
}

fn tcp_publisher(framing: FramingConfig) -> TcpPublisher {
    TcpPublisher::new("127.0.0.1:0".parse().unwrap(), framing.build().unwrap(), 64)
}

/// Split a length-prefixed stream (2-byte little-endian header) into payloads.
fn split_frames_le16(mut buf: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while buf.len() >= 2 {
        let len = u16::from_le_bytes([buf[0], buf[1]]) as usize;
        frames.push(buf[2..2 + len].to_vec());
        buf = &buf[2 + len..];
    }
    assert!(buf.is_empty(), "trailing partial frame");
    frames
}

// ═══════════════════════════════════════════════════════════════
//  tcp+raw
// ═══════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_publisher_delivers_raw_records() {
    let mut publisher = tcp_publisher(FramingConfig::default());
    publisher.start().await.unwrap();
    let addr = publisher.local_addr().unwrap();

    let mut sub = TcpStream::connect(addr).await.unwrap();
    wait_for_subscribers(&publisher, 1).await;

    for n in 0..3 {
        publisher.publish(&record(n).encode()).await.unwrap();
    }

    for n in 0..3 {
        let mut buf = [0u8; RECORD_SIZE];
        tokio::time::timeout(Duration::from_secs(5), sub.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(TrackRecord::decode(&buf).unwrap(), record(n));
    }

    publisher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_stop_flushes_queued_records() {
    for _ in 0..20 {
        let mut publisher = tcp_publisher(FramingConfig::default());
        publisher.start().await.unwrap();
        let mut sub = TcpStream::connect(publisher.local_addr().unwrap()).await.unwrap();
        wait_for_subscribers(&publisher, 1).await;

        for n in 0..10 {
            publisher.publish(&record(n).encode()).await.unwrap();
        }
        publisher.stop().await.unwrap();

        let mut received = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), sub.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.len(), 10 * RECORD_SIZE);
        for (n, chunk) in received.chunks(RECORD_SIZE).enumerate() {
            assert_eq!(TrackRecord::decode(chunk).unwrap(), record(n as i64));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_publisher_length_prefixed_fan_out() {
    let framing = FramingConfig {
        kind: FramingKind::LengthPrefixed,
        length_bytes: 2,
        byte_order: ByteOrder::Little,
    };
    let mut publisher = tcp_publisher(framing);
    publisher.start().await.unwrap();
    let addr = publisher.local_addr().unwrap();

    let mut a = TcpStream::connect(addr).await.unwrap();
    let mut b = TcpStream::connect(addr).await.unwrap();
    wait_for_subscribers(&publisher, 2).await;

    publisher.publish(&record(9).encode()).await.unwrap();
    publisher.publish(&record(10).encode()).await.unwrap();
    publisher.stop().await.unwrap();

    for sub in [&mut a, &mut b] {
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), sub.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..2], &[60, 0]);
        let frames = split_frames_le16(&buf);
        assert_eq!(frames.len(), 2);
        assert_eq!(TrackRecord::decode(&frames[0]).unwrap(), record(9));
        assert_eq!(TrackRecord::decode(&frames[1]).unwrap(), record(10));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_publish_without_subscribers_succeeds() {
    let mut publisher = tcp_publisher(FramingConfig::default());
    publisher.start().await.unwrap();
    assert_eq!(publisher.subscribers(), 0);
    publisher.publish(&record(0).encode()).await.unwrap();
    publisher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_stop_closes_idle_subscribers() {
    let mut publisher = tcp_publisher(FramingConfig::default());
    publisher.start().await.unwrap();
    let mut sub = TcpStream::connect(publisher.local_addr().unwrap()).await.unwrap();
    wait_for_subscribers(&publisher, 1).await;

    publisher.stop().await.unwrap();

    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(5), sub.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);
    assert_eq!(publisher.subscribers(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_stop_gives_up_on_stalled_subscriber() {
    // A subscriber that never reads: ~12 MB outgrows the loopback socket
    // buffers, the writer blocks, and only the linger bounds `stop()`.
    let framing = FramingConfig::default().build().unwrap();
    let mut publisher = TcpPublisher::new("127.0.0.1:0".parse().unwrap(), framing, 1 << 18)
        .with_linger(Duration::from_millis(200));
    publisher.start().await.unwrap();
    let _stalled = TcpStream::connect(publisher.local_addr().unwrap()).await.unwrap();
    wait_for_subscribers(&publisher, 1).await;

    for n in 0..200_000 {
        publisher.publish(&record(n).encode()).await.unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), publisher.stop())
        .await
        .expect("stop did not honour the linger")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_bind_conflict_is_io_error() {
    let mut first = tcp_publisher(FramingConfig::default());
    first.start().await.unwrap();
    let taken = first.local_addr().unwrap();

    let mut second = TcpPublisher::new(taken, FramingConfig::default().build().unwrap(), 64);
    let err = second.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    first.stop().await.unwrap();
}

#[tokio::test]
async fn test_publish_before_start_fails() {
    let mut tcp = tcp_publisher(FramingConfig::default());
    assert_eq!(tcp.publish(&[0u8; RECORD_SIZE]).await.unwrap_err().kind(), ErrorKind::Io);

    let mut udp = UdpPublisher::new("127.0.0.1:9".parse().unwrap(), 1);
    assert_eq!(udp.publish(&[0u8; RECORD_SIZE]).await.unwrap_err().kind(), ErrorKind::Io);

    let mut zmq = ZmqPublisher::new("127.0.0.1:0".parse().unwrap());
    assert_eq!(zmq.publish(&[0u8; RECORD_SIZE]).await.unwrap_err().kind(), ErrorKind::Io);
}

// ═══════════════════════════════════════════════════════════════
//  udp
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_udp_publisher_sends_one_datagram_per_record() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = receiver.local_addr().unwrap();

    let mut publisher = UdpPublisher::new(target, 1);
    publisher.start().await.unwrap();
    publisher.publish(&record(1).encode()).await.unwrap();
    publisher.publish(&record(2).encode()).await.unwrap();

    let mut buf = [0u8; 256];
    for n in 1..=2 {
        let len = tokio::time::timeout(Duration::from_secs(5), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(len, RECORD_SIZE);
        assert_eq!(TrackRecord::decode(&buf[..len]).unwrap(), record(n));
    }

    publisher.stop().await.unwrap();
    assert!(publisher.local_addr().is_none());
}

#[tokio::test]
async fn test_udp_publish_to_closed_port_keeps_succeeding() {
    let target: SocketAddr = {
        let released = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        released.local_addr().unwrap()
    };

    let mut publisher = UdpPublisher::new(target, 1);
    publisher.start().await.unwrap();
    for n in 0..4 {
        publisher.publish(&record(n).encode()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    publisher.stop().await.unwrap();
}

// ═══════════════════════════════════════════════════════════════
//  tcp (ZeroMQ PUB)
// ═══════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zmq_publisher_reaches_sub_socket() {
    let mut publisher = ZmqPublisher::new("127.0.0.1:0".parse().unwrap());
    publisher.start().await.unwrap();
    let endpoint = publisher.local_endpoint().unwrap().to_string();

    let mut sub = SubSocket::new();
    sub.connect(&endpoint).await.unwrap();
    sub.subscribe("").await.unwrap();
    let recv = tokio::spawn(async move { sub.recv().await });

    // The subscription reaches the PUB side asynchronously; keep sending
    // the same record until one arrives.
    tokio::time::timeout(Duration::from_secs(5), async {
        while !recv.is_finished() {
            publisher.publish(&record(7).encode()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("no message reached the SUB socket");

    let msg = recv.await.unwrap().unwrap();
    let payload = msg.get(0).unwrap();
    assert_eq!(payload.len(), RECORD_SIZE);
    assert_eq!(TrackRecord::decode(payload).unwrap(), record(7));

    publisher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zmq_publish_without_subscribers_succeeds() {
    let mut publisher = ZmqPublisher::new("127.0.0.1:0".parse().unwrap());
    publisher.start().await.unwrap();
    for n in 0..3 {
        publisher.publish(&record(n).encode()).await.unwrap();
    }
    publisher.stop().await.unwrap();
    assert!(publisher.start().await.is_ok(), "stopped publisher can bind again");
    publisher.stop().await.unwrap();
}

// ═══════════════════════════════════════════════════════════════
//  open()
// ═══════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_open_selects_transport_by_scheme() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let endpoint: Endpoint = format!("udp://{}", receiver.local_addr().unwrap()).parse().unwrap();

    let mut transport = open(&endpoint, &TransportOptions::default()).unwrap();
    transport.start().await.unwrap();
    transport.publish(&record(5).encode()).await.unwrap();
    transport.stop().await.unwrap();

    let mut buf = [0u8; RECORD_SIZE];
    let len = tokio::time::timeout(Duration::from_secs(5), receiver.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(len, RECORD_SIZE);

    for ep in ["tcp://127.0.0.1:0", "tcp+raw://127.0.0.1:0"] {
        let ep: Endpoint = ep.parse().unwrap();
        let mut transport = open(&ep, &TransportOptions::default()).unwrap();
        transport.start().await.unwrap();
        transport.publish(&record(6).encode()).await.unwrap();
        transport.stop().await.unwrap();
    }
}

#[test]
fn test_open_rejects_bad_framing() {
    let options = TransportOptions {
        framing: FramingConfig { kind: FramingKind::LengthPrefixed, length_bytes: 3, ..FramingConfig::default() },
        ..TransportOptions::default()
    };
    let raw: Endpoint = "tcp+raw://127.0.0.1:0".parse().unwrap();
    let err = open(&raw, &options).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);

    // framing is not used by the ZeroMQ transport
    let zmq: Endpoint = "tcp://127.0.0.1:0".parse().unwrap();
    assert!(open(&zmq, &options).is_ok());
}
