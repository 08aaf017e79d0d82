//! Tests for the admin endpoint.

use std::{future, time::Duration};

use rstest::rstest;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

use super::*;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn spawn_server<F>(shutdown: F) -> (String, JoinHandle<Result<()>>)
where
    F: Future<Output = ()> + Send + 'static,
{
    let server = AdminServer::bind("127.0.0.1:0").await.expect("bind");
    let addr = server.local_addr().expect("addr").to_string();
    let handle = tokio::spawn(server.serve(shutdown));
    (addr, handle)
}

async fn finish(handle: JoinHandle<Result<()>>) {
    timeout(TEST_TIMEOUT, handle)
        .await
        .expect("server should stop in time")
        .expect("server task")
        .expect("server result");
}

#[rstest]
#[tokio::test]
async fn stop_request_shuts_server_down() {
    let (addr, handle) = spawn_server(future::pending()).await;

    request_stop(&addr).await.expect("stop request");

    finish(handle).await;
    assert!(TcpStream::connect(&addr).await.is_err(), "listener must be closed");
}

#[rstest]
#[tokio::test]
async fn shutdown_future_stops_server() {
    let (tx, rx) = oneshot::channel::<()>();
    let (_addr, handle) = spawn_server(async move {
        let _ = rx.await;
    })
    .await;

    tx.send(()).expect("signal shutdown");

    finish(handle).await;
}

#[rstest]
#[tokio::test]
async fn unknown_requests_get_error_and_connection_stays_open() {
    let (addr, handle) = spawn_server(future::pending()).await;
    let stream = TcpStream::connect(&addr).await.expect("connect");
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let greeting = lines.next_line().await.expect("read").expect("greeting");
    assert_eq!(greeting, ADMIN_GREETING);

    writer.write_all(b"\nRELOAD\n").await.expect("write");
    let reply = lines.next_line().await.expect("read").expect("reply");
    assert_eq!(reply, "ERR unknown request \"RELOAD\"");

    writer.write_all(b"stop\n").await.expect("write");
    let reply = lines.next_line().await.expect("read").expect("reply");
    assert_eq!(reply, ADMIN_OK);

    finish(handle).await;
}

#[rstest]
#[tokio::test]
async fn idle_clients_are_released_on_shutdown() {
    let (addr, handle) = spawn_server(future::pending()).await;
    let idle = TcpStream::connect(&addr).await.expect("connect idle client");
    let mut idle_lines = BufReader::new(idle).lines();
    let greeting = idle_lines.next_line().await.expect("read").expect("greeting");
    assert_eq!(greeting, ADMIN_GREETING);

    request_stop(&addr).await.expect("stop request");

    finish(handle).await;
    let after = timeout(TEST_TIMEOUT, idle_lines.next_line())
        .await
        .expect("idle client should be released")
        .expect("read");
    assert_eq!(after, None);
}

#[rstest]
#[tokio::test]
async fn stop_fails_against_foreign_endpoint() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let _ = socket.write_all(b"HELLO\n").await;
        }
    });

    let err = request_stop(&addr).await.expect_err("must fail");

    assert!(
        err.to_string().contains("is not a portico admin endpoint"),
        "unexpected error: {err:#}"
    );
}

#[rstest]
#[tokio::test]
async fn stop_fails_when_nothing_listens() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    drop(listener);

    let err = request_stop(&addr).await.expect_err("must fail");

    assert!(
        err.to_string().contains("failed to connect to admin endpoint"),
        "unexpected error: {err:#}"
    );
}

#[rstest]
fn module_ids_are_unique() {
    let mut ids: Vec<_> = MODULES.iter().map(|module| module.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), MODULES.len());
}
