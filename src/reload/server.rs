// src/reload/server.rs

//! Server side of the live-reload channel.
//!
//! One push channel per subscribed page path: a browser subscribes by
//! connecting to `ws://<addr>/api/v1/live_reload/<path>`; after every
//! successful watch pass the hub re-reads each subscriber's rendered
//! document and pushes it as a UTF-8 text message. There is no client →
//! server payload beyond the implicit subscribe-by-connect, and a client
//! disappearing without an explicit unsubscribe is tolerated: the failed
//! send just drops the subscriber.

use std::fs;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{Request, Response};
use tungstenite::{Message, WebSocket, accept_hdr};

/// URI prefix clients subscribe under; the remainder is the path key.
pub const SUBSCRIBE_PREFIX: &str = "/api/v1/live_reload";

/// A connected browser, keyed by the page path it is viewing.
struct Subscriber {
    path_key: String,
    socket: WebSocket<TcpStream>,
}

/// Shared websocket push hub.
///
/// Cloning is cheap; all clones share the subscriber registry.
#[derive(Clone)]
pub struct ReloadHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    addr: SocketAddr,
    site_root: PathBuf,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl std::fmt::Debug for ReloadHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadHub")
            .field("site_root", &self.inner.site_root)
            .finish_non_exhaustive()
    }
}

impl ReloadHub {
    /// Bind the push channel and start accepting subscribers on a background
    /// thread.
    pub fn bind(addr: &str, site_root: PathBuf) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .with_context(|| format!("binding live reload listener on {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("reading live reload listener address")?;

        let hub = Self {
            inner: Arc::new(HubInner {
                addr: local_addr,
                site_root,
                subscribers: Mutex::new(Vec::new()),
            }),
        };

        info!(addr = %local_addr, "live reload channel listening");

        let inner = Arc::clone(&hub.inner);
        std::thread::spawn(move || accept_loop(listener, inner));

        Ok(hub)
    }

    /// Address the channel is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// Number of currently registered subscribers (for tests).
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().unwrap().len()
    }

    /// Push the current rendered document to every subscriber.
    ///
    /// Called after each successful watch pass. Subscribers whose socket
    /// send fails are dropped; subscribers whose document is missing are
    /// kept (the page may reappear in a later pass).
    pub fn publish(&self, build_id: u64) {
        let mut subscribers = self.inner.subscribers.lock().unwrap();

        subscribers.retain_mut(|subscriber| {
            let Some(document) = resolve_document(&self.inner.site_root, &subscriber.path_key)
            else {
                warn!(
                    build_id,
                    path = %subscriber.path_key,
                    "no rendered document for subscribed path"
                );
                return true;
            };

            match subscriber.socket.send(Message::Text(document.into())) {
                Ok(()) => true,
                Err(err) => {
                    debug!(
                        build_id,
                        path = %subscriber.path_key,
                        error = %err,
                        "dropping live reload subscriber"
                    );
                    false
                }
            }
        });

        debug!(build_id, subscribers = subscribers.len(), "live reload published");
    }
}

fn accept_loop(listener: TcpListener, inner: Arc<HubInner>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(err) = handle_subscription(stream, &inner) {
                    debug!(error = %err, "live reload handshake failed");
                }
            }
            Err(err) => {
                warn!(error = %err, "live reload accept failed");
            }
        }
    }

    debug!("live reload accept loop finished");
}

fn handle_subscription(stream: TcpStream, inner: &Arc<HubInner>) -> Result<()> {
    let mut path_key = String::new();

    // The handshake error type owns the callback, so it cannot be wrapped
    // with context while the callback borrows `path_key`; format it instead.
    let socket = accept_hdr(stream, |req: &Request, resp: Response| {
        path_key = path_key_from_uri(req.uri().path());
        Ok(resp)
    })
    .map_err(|err| anyhow::anyhow!("websocket handshake: {err}"))?;

    let mut subscriber = Subscriber { path_key, socket };

    info!(path = %subscriber.path_key, "live reload client subscribed");

    // Push the current document right away so a client connecting after a
    // rebuild does not wait for the next pass.
    if let Some(document) = resolve_document(&inner.site_root, &subscriber.path_key) {
        if let Err(err) = subscriber.socket.send(Message::Text(document.into())) {
            debug!(path = %subscriber.path_key, error = %err, "initial push failed");
            return Ok(());
        }
    }

    inner.subscribers.lock().unwrap().push(subscriber);
    Ok(())
}

/// Extract the page path key from the request URI.
pub fn path_key_from_uri(uri_path: &str) -> String {
    uri_path
        .strip_prefix(SUBSCRIBE_PREFIX)
        .unwrap_or(uri_path)
        .trim_start_matches('/')
        .to_string()
}

/// Resolve the rendered document for a path key under the site root.
///
/// `""` and directory-style keys resolve to their `index.html`; a bare key
/// also tries the `.html` sibling. Keys with non-normal components (`..`,
/// absolute paths, drive prefixes) never resolve: the key comes from the
/// client, and the handshake is reachable cross-origin.
fn resolve_document(site_root: &Path, path_key: &str) -> Option<String> {
    let trimmed = path_key.trim_matches('/');

    if !Path::new(trimmed)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        warn!(path = %path_key, "refusing path key escaping the site root");
        return None;
    }

    let candidate = if trimmed.is_empty() {
        site_root.join("index.html")
    } else {
        site_root.join(trimmed)
    };

    if candidate.is_file() {
        return fs::read_to_string(candidate).ok();
    }

    let with_index = candidate.join("index.html");
    if with_index.is_file() {
        return fs::read_to_string(with_index).ok();
    }

    let with_ext = candidate.with_extension("html");
    if with_ext.is_file() {
        return fs::read_to_string(with_ext).ok();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_key_strips_subscribe_prefix() {
        assert_eq!(path_key_from_uri("/api/v1/live_reload/docs/intro"), "docs/intro");
        assert_eq!(path_key_from_uri("/api/v1/live_reload/"), "");
        assert_eq!(path_key_from_uri("/api/v1/live_reload"), "");
    }

    #[test]
    fn unprefixed_uri_is_used_as_is() {
        assert_eq!(path_key_from_uri("/docs/intro"), "docs/intro");
    }

    #[test]
    fn resolves_index_and_html_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("index.html"), "<p>root</p>").unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/index.html"), "<p>docs</p>").unwrap();
        fs::write(root.join("about.html"), "<p>about</p>").unwrap();

        assert_eq!(resolve_document(root, "").as_deref(), Some("<p>root</p>"));
        assert_eq!(
            resolve_document(root, "docs/").as_deref(),
            Some("<p>docs</p>")
        );
        assert_eq!(
            resolve_document(root, "about").as_deref(),
            Some("<p>about</p>")
        );
        assert!(resolve_document(root, "missing").is_none());
    }

    #[test]
    fn path_keys_escaping_the_site_root_never_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("public")).unwrap();
        fs::write(root.join("public/index.html"), "<p>ok</p>").unwrap();
        fs::write(root.join("secret.html"), "<p>secret</p>").unwrap();

        let site_root = root.join("public");
        assert!(resolve_document(&site_root, "../secret").is_none());
        assert!(resolve_document(&site_root, "../secret.html").is_none());
        assert!(resolve_document(&site_root, "a/../../secret").is_none());

        // Normal keys are unaffected.
        assert_eq!(
            resolve_document(&site_root, "").as_deref(),
            Some("<p>ok</p>")
        );
    }
}
