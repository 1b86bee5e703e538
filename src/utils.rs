use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// reduce a client supplied name to a bare file name inside the shared folder.
/// returns None when nothing usable is left (empty, only dots, etc)
pub fn sanitize_filename(filename: &str) -> Option<String> {
    // keep only the last path component, whichever separator the client used
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();

    // leading dots would make hidden names, and hidden names are our staging files
    let cleaned = cleaned.trim_start_matches('.').trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// hidden names are staging files and never part of the shared folder view
pub fn is_visible_name(name: &str) -> bool {
    !name.starts_with('.')
}

/// percent-encode a single url path segment
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// escape text for use inside html element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// address other devices on the lan can reach us at.
/// connecting a udp socket sends nothing, it only makes the os pick a route
pub fn local_ip() -> IpAddr {
    let fallback = IpAddr::V4(Ipv4Addr::LOCALHOST);

    let socket = match UdpSocket::bind("0.0.0.0:0") {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!("Could not bind probe socket: {}", e);
            return fallback;
        }
    };

    if let Err(e) = socket.connect("10.255.255.255:1") {
        tracing::debug!("No route for lan ip detection: {}", e);
        return fallback;
    }

    socket.local_addr().map(|a| a.ip()).unwrap_or(fallback)
}

/// resolves on ctrl-c or sigterm
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Signal received, starting graceful shutdown");
}
