// tests/reload_channel.rs

//! Live reload push channel over a real loopback websocket.

mod common;

use std::error::Error;
use std::fs;
use std::net::TcpStream;
use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use pipewatch::reload::ReloadHub;

use crate::common::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;
type ClientSocket = WebSocket<MaybeTlsStream<TcpStream>>;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

fn bind_hub(site_root: &Path) -> ReloadHub {
    ReloadHub::bind("127.0.0.1:0", site_root.to_path_buf()).unwrap()
}

fn subscribe(hub: &ReloadHub, path_key: &str) -> ClientSocket {
    let url = format!("ws://{}/api/v1/live_reload/{path_key}", hub.local_addr());
    let (socket, _response) = tungstenite::connect(url.as_str()).unwrap();

    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
    }

    socket
}

fn read_text(socket: &mut ClientSocket) -> String {
    loop {
        match socket.read().unwrap() {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected websocket message: {other:?}"),
        }
    }
}

/// Poll the hub until the expected number of subscribers is registered.
fn wait_for_subscribers(hub: &ReloadHub, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while hub.subscriber_count() != expected {
        assert!(
            Instant::now() < deadline,
            "hub never reached {expected} subscriber(s), currently {}",
            hub.subscriber_count()
        );
        sleep(Duration::from_millis(10));
    }
}

#[test]
fn subscriber_receives_the_current_document_immediately() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("index.html"), "<p>hello</p>")?;

    let hub = bind_hub(dir.path());
    let mut client = subscribe(&hub, "");

    assert_eq!(read_text(&mut client), "<p>hello</p>");
    Ok(())
}

#[test]
fn publish_pushes_the_rewritten_document() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("docs"))?;
    fs::write(dir.path().join("docs/index.html"), "<p>v1</p>")?;

    let hub = bind_hub(dir.path());
    let mut client = subscribe(&hub, "docs/");

    assert_eq!(read_text(&mut client), "<p>v1</p>");
    wait_for_subscribers(&hub, 1);

    fs::write(dir.path().join("docs/index.html"), "<p>v2</p>")?;
    hub.publish(1);

    assert_eq!(read_text(&mut client), "<p>v2</p>");
    Ok(())
}

#[test]
fn missing_document_keeps_the_subscription_alive() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let hub = bind_hub(dir.path());

    // Nothing rendered yet for this path, so no initial push.
    let mut client = subscribe(&hub, "late");
    wait_for_subscribers(&hub, 1);

    // Still registered after a publish that finds no document.
    hub.publish(1);
    assert_eq!(hub.subscriber_count(), 1);

    // Once the page exists, the next pass reaches the subscriber.
    fs::write(dir.path().join("late.html"), "<p>late</p>")?;
    hub.publish(2);

    assert_eq!(read_text(&mut client), "<p>late</p>");
    Ok(())
}

#[test]
fn disconnected_subscriber_is_pruned_on_publish() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("index.html"), "<p>doc</p>")?;

    let hub = bind_hub(dir.path());
    let mut client = subscribe(&hub, "");
    assert_eq!(read_text(&mut client), "<p>doc</p>");
    wait_for_subscribers(&hub, 1);

    client.close(None)?;
    drop(client);

    // The failed send surfaces within a publish or two.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut build_id = 1;
    while hub.subscriber_count() != 0 {
        assert!(Instant::now() < deadline, "dead subscriber never pruned");
        hub.publish(build_id);
        build_id += 1;
        sleep(Duration::from_millis(50));
    }

    Ok(())
}

#[test]
fn subscribers_on_different_paths_get_their_own_documents() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("index.html"), "<p>home</p>")?;
    fs::write(dir.path().join("about.html"), "<p>about</p>")?;

    let hub = bind_hub(dir.path());

    let mut home = subscribe(&hub, "");
    assert_eq!(read_text(&mut home), "<p>home</p>");
    let mut about = subscribe(&hub, "about");
    assert_eq!(read_text(&mut about), "<p>about</p>");
    wait_for_subscribers(&hub, 2);

    fs::write(dir.path().join("index.html"), "<p>home v2</p>")?;
    fs::write(dir.path().join("about.html"), "<p>about v2</p>")?;
    hub.publish(1);

    assert_eq!(read_text(&mut home), "<p>home v2</p>");
    assert_eq!(read_text(&mut about), "<p>about v2</p>");
    Ok(())
}
