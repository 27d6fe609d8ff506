// src/server/livereload.rs

//! Live-reload side channel for the edit server.
//!
//! HTML responses get `<script src="/__livereload.js"></script>` injected
//! before `</body>`; the script listens on `/__livereload` (server-sent
//! events) and reloads the page on every `reload` event.

use std::convert::Infallible;

use axum::body::{self, Body};
use axum::extract::State;
use axum::http::{header, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

pub const EVENTS_PATH: &str = "/__livereload";
pub const SCRIPT_PATH: &str = "/__livereload.js";
pub const SCRIPT_TAG: &str = r#"<script src="/__livereload.js"></script>"#;

/// Pages larger than this are served without the script.
const MAX_INJECT_BYTES: usize = 8 * 1024 * 1024;

const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource('/__livereload');
  source.addEventListener('reload', function () {
    window.location.reload();
  });
})();
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Reload,
    Shutdown,
}

/// Fan-out of reload notifications to every connected browser.
#[derive(Debug, Clone)]
pub struct ReloadBroadcaster {
    tx: broadcast::Sender<Signal>,
}

impl Default for ReloadBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadBroadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    /// Tell every connected page to reload. Returns how many listeners were
    /// connected.
    pub fn notify(&self) -> usize {
        let listeners = self.tx.send(Signal::Reload).unwrap_or(0);
        debug!(listeners, "reload notification sent");
        listeners
    }

    /// End every open event stream so the server can shut down.
    pub fn close(&self) {
        let _ = self.tx.send(Signal::Shutdown);
    }

    /// Listen for reload notifications.
    pub fn subscribe(&self) -> ReloadSubscription {
        ReloadSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// One listener's view of the broadcast.
#[derive(Debug)]
pub struct ReloadSubscription {
    rx: broadcast::Receiver<Signal>,
}

impl ReloadSubscription {
    /// Wait for the next reload. `None` once the server is shutting down.
    pub async fn next(&mut self) -> Option<()> {
        match self.rx.recv().await {
            Ok(Signal::Reload) => Some(()),
            // Missed notifications still mean "reload".
            Err(RecvError::Lagged(_)) => Some(()),
            Ok(Signal::Shutdown) | Err(RecvError::Closed) => None,
        }
    }
}

pub async fn events(
    State(reload): State<ReloadBroadcaster>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = reload.subscribe();
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().event("hello").data("connected"));
        while subscription.next().await.is_some() {
            yield Ok(Event::default().event("reload").data("reload"));
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

/// Middleware adding [`SCRIPT_TAG`] to full `200 OK` HTML responses.
pub async fn inject_script(req: Request<Body>, next: Next) -> Response {
    let is_head = req.method() == Method::HEAD;
    let response = next.run(req).await;
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if is_head || !is_html || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, inner) = response.into_parts();
    let bytes = match body::to_bytes(inner, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("cannot buffer html response for live reload: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = match String::from_utf8(bytes.to_vec()) {
        Ok(html) => add_script_tag(&html),
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Insert the tag before the last `</body>`, or append it.
fn add_script_tag(html: &str) -> String {
    if html.contains(SCRIPT_TAG) {
        return html.to_string();
    }
    // ASCII lowering keeps byte offsets stable.
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => format!("{}{SCRIPT_TAG}{}", &html[..at], &html[at..]),
        None => format!("{html}{SCRIPT_TAG}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_reload_then_shutdown() {
        let reload = ReloadBroadcaster::new();
        let mut sub = reload.subscribe();
        assert_eq!(reload.notify(), 1);
        assert_eq!(sub.next().await, Some(()));
        reload.close();
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn notify_without_listeners_is_fine() {
        assert_eq!(ReloadBroadcaster::new().notify(), 0);
    }

    #[test]
    fn script_tag_goes_before_closing_body() {
        assert_eq!(
            add_script_tag("<html><BODY><p>x</p></BODY></html>"),
            format!("<html><BODY><p>x</p>{SCRIPT_TAG}</BODY></html>")
        );
        assert_eq!(add_script_tag("<p>x</p>"), format!("<p>x</p>{SCRIPT_TAG}"));

        let already = format!("<body>{SCRIPT_TAG}</body>");
        assert_eq!(add_script_tag(&already), already);
    }
}
