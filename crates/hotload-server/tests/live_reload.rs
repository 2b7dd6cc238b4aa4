//! End-to-end tests over real sockets.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use hotload_server::{Server, ServerConfig};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const TIMEOUT: Duration = Duration::from_secs(5);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Running {
    live_addr: SocketAddr,
    status_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), hotload_server::ServerError>>,
}

async fn start(dir: &Path) -> Running {
    let config = ServerConfig {
        host: "127.0.0.1".to_owned(),
        ws_port: 0,
        http_port: 0,
        dist_dir: dir.join("dist"),
        plugin_json: dir.join("plugin.json"),
        ..ServerConfig::default()
    };
    let server = Server::bind(config).await.unwrap();
    let live_addr = server.live_addr().unwrap();
    let status_addr = server.status_addr().unwrap();

    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.serve(async move {
        let _ = rx.await;
    }));

    Running {
        live_addr,
        status_addr,
        shutdown,
        task,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = timeout(TIMEOUT, connect_async(format!("ws://{addr}")))
        .await
        .expect("timeout connecting")
        .unwrap();
    client
}

async fn next_build(client: &mut Client) -> Value {
    loop {
        let message = timeout(TIMEOUT, client.next())
            .await
            .expect("timeout waiting for build")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_closed(client: &mut Client) {
    loop {
        match timeout(TIMEOUT, client.next())
            .await
            .expect("timeout waiting for close")
        {
            Some(Ok(Message::Close(_)) | Err(_)) | None => return,
            Some(Ok(_)) => {}
        }
    }
}

#[tokio::test]
async fn test_late_join_then_rebuild_broadcast() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("plugin.json"),
        r#"{"name": "e2e-plugin", "version": "0.1.0", "author": "tests"}"#,
    )
    .unwrap();
    fs::create_dir(dir.path().join("dist")).unwrap();
    let artifact = dir.path().join("dist").join("index_1.js");
    fs::write(&artifact, "export default 'v1';").unwrap();
    let server = start(dir.path()).await;

    let mut first = connect(server.live_addr).await;
    let message = next_build(&mut first).await;
    assert_eq!(message["type"], "code");
    assert_eq!(message["fileName"], "index_1.js");
    assert_eq!(message["code"], "export default 'v1';");
    assert_eq!(message["metadata"]["name"], "e2e-plugin");
    assert_eq!(message["metadata"]["author"], "tests");

    let mut second = connect(server.live_addr).await;
    assert_eq!(next_build(&mut second).await["code"], "export default 'v1';");

    fs::write(&artifact, "export default 'v2';").unwrap();
    assert_eq!(next_build(&mut first).await["code"], "export default 'v2';");
    assert_eq!(next_build(&mut second).await["code"], "export default 'v2';");

    server.shutdown.send(()).unwrap();
    wait_closed(&mut first).await;
    wait_closed(&mut second).await;
    timeout(TIMEOUT, server.task)
        .await
        .expect("timeout waiting for server to stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_first_build_reaches_waiting_client() {
    let dir = tempfile::tempdir().unwrap();
    let server = start(dir.path()).await;

    let mut client = connect(server.live_addr).await;
    fs::write(dir.path().join("dist").join("index_7.js"), "console.log(7);").unwrap();

    let message = next_build(&mut client).await;
    assert_eq!(message["fileName"], "index_7.js");
    assert_eq!(message["code"], "console.log(7);");
    assert_eq!(message["metadata"]["name"], "unknown");
    assert_eq!(message["metadata"]["version"], "0.0.0");

    server.shutdown.send(()).unwrap();
    wait_closed(&mut client).await;
}

#[tokio::test]
async fn test_status_page_over_http() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("plugin.json"),
        r#"{"name": "status-plugin", "version": "3.1.4"}"#,
    )
    .unwrap();
    let server = start(dir.path()).await;

    let mut stream = TcpStream::connect(server.status_addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    timeout(TIMEOUT, stream.read_to_string(&mut response))
        .await
        .expect("timeout reading status page")
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("text/html"));
    assert!(response.contains("status-plugin"));
    assert!(response.contains("3.1.4"));
    assert!(response.contains(&format!("ws://localhost:{}", server.live_addr.port())));

    server.shutdown.send(()).unwrap();
}
