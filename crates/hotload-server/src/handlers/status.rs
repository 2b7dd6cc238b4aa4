//! Status page.
//!
//! Shows the WebSocket addresses clients can connect to and the loaded
//! plugin's name and version.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use html_escape::encode_text;

use crate::state::StatusState;

/// Handle GET /.
pub(crate) async fn get_status(State(state): State<Arc<StatusState>>) -> Html<String> {
    Html(render_status_page(&state))
}

/// Render the status page.
///
/// The external address is filled in by the browser from its own location,
/// rewriting preview hostnames that embed the status port. Clicking any
/// address copies it to the clipboard.
pub(crate) fn render_status_page(state: &StatusState) -> String {
    let ws_port = state.ws_port;
    let http_port = state.http_port;
    let name = encode_text(&state.metadata.name);
    let version = encode_text(&state.metadata.version);
    let lan_host = encode_text(&state.lan_host);

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Plugin Development Server</title>
    <style>
      body {{ font-family: system-ui, -apple-system, sans-serif; max-width: 800px; margin: 40px auto; padding: 0 20px; line-height: 1.6; color: #333; }}
      .container {{ background: #f5f5f5; border-radius: 8px; padding: 20px; margin: 20px 0; }}
      .code {{ background: #e0e0e0; padding: 10px; border-radius: 4px; font-family: monospace; cursor: pointer; }}
      .code:hover {{ background: #d0d0d0; }}
      #toast {{ position: fixed; bottom: 20px; left: 50%; transform: translateX(-50%); background: #333; color: #fff; padding: 8px 16px; border-radius: 4px; opacity: 0; transition: opacity 0.3s; }}
      #toast.visible {{ opacity: 1; }}
    </style>
  </head>
  <body>
    <h1>Plugin Development Server</h1>
    <div class="container">
      <h2>Connection Instructions</h2>
      <p>Enter one of the following WebSocket URLs in your plugin settings (click to copy):</p>
      <p>Local Network Access:</p>
      <div class="code">ws://{lan_host}:{ws_port}</div>
      <p>Local Access:</p>
      <div class="code">ws://localhost:{ws_port}</div>
      <p>External Access:</p>
      <div class="code" id="external-url">ws://&lt;this host&gt;:{ws_port}</div>
    </div>
    <div class="container">
      <h3>Plugin Information</h3>
      <p><strong>Name:</strong> {name}</p>
      <p><strong>Version:</strong> {version}</p>
    </div>
    <p>Keep this window open while developing your plugin.</p>
    <div id="toast">Copied</div>
    <script>
      function showToast() {{
        const toast = document.getElementById('toast');
        toast.classList.add('visible');
        setTimeout(() => toast.classList.remove('visible'), 1500);
      }}
      document.addEventListener('DOMContentLoaded', () => {{
        document.querySelectorAll('.code').forEach((code) => {{
          code.addEventListener('click', () => {{
            navigator.clipboard.writeText(code.textContent.trim()).then(showToast);
          }});
        }});
        const element = document.getElementById('external-url');
        const hostname = window.location.hostname;
        if (/-\d{{4}}\.preview\.csb\.app$/.test(hostname) || hostname.includes('-{http_port}.')) {{
          const wsHostname = hostname
            .replace(/-\d{{4}}\.preview\.csb\.app$/, '-{ws_port}.preview.csb.app')
            .replace(/-{http_port}\./, '-{ws_port}.');
          element.textContent = `ws://${{wsHostname}}`;
        }} else {{
          element.textContent = `ws://${{hostname}}:{ws_port}`;
        }}
      }});
    </script>
  </body>
</html>
"#
    )
}
