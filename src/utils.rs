// utils.rs

/// Convert an HTTP(S) URL to the WS(S) scheme. `ws://` and `wss://` pass
/// through unchanged.
pub fn http_to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

/// Socket URL for a device API base URL: `<api_url>/ws`.
pub fn socket_url(api_url: &str) -> String {
    let url = http_to_ws_scheme(api_url.trim());
    let url = url.trim_end_matches('/');
    if url.ends_with("/ws") {
        url.to_string()
    } else {
        format!("{url}/ws")
    }
}
