// src/reload/mod.rs

//! Live-reload push channel.
//!
//! - [`server`] owns the websocket hub: one push channel per subscribed page
//!   path, server → client only.
//! - [`client`] models the browser-side connection as a pure finite-state
//!   machine so reconnect and merge behaviour can be tested without a real
//!   socket.
//!
//! The wire payload is UTF-8 text: either a full document prefixed by the
//! literal `<!DOCTYPE html>` marker or a fragment. The client strips the
//! marker before handing the content to the document merge.

pub mod client;
pub mod server;

pub use client::{Connection, ConnectionState, Effect, PageSession, SocketEvent};
pub use server::ReloadHub;

/// Document-type marker prefixing full-document payloads.
pub const DOCTYPE_MARKER: &str = "<!DOCTYPE html>";

/// Normalize a payload to fragment content by stripping the leading
/// document-type marker, if present.
pub fn strip_document_marker(payload: &str) -> &str {
    payload.strip_prefix(DOCTYPE_MARKER).unwrap_or(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_marker_only() {
        assert_eq!(
            strip_document_marker("<!DOCTYPE html>\n<html>...</html>"),
            "\n<html>...</html>"
        );
    }

    #[test]
    fn fragment_payload_is_untouched() {
        assert_eq!(strip_document_marker("<div>x</div>"), "<div>x</div>");
    }

    #[test]
    fn marker_in_the_middle_is_kept() {
        let payload = "<div><!DOCTYPE html></div>";
        assert_eq!(strip_document_marker(payload), payload);
    }
}
