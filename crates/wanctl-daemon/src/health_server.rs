//! Tiny blocking JSON health endpoint, modeled on a plain Prometheus-style
//! metrics server but serving a `HealthSnapshot` instead.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use wanctl_common::health::HealthSnapshot;

pub fn run_health_server(addr: SocketAddr, health: Arc<Mutex<HealthSnapshot>>, shutdown: Arc<AtomicBool>) {
    let listener = match TcpListener::bind(addr) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind health endpoint");
            return;
        }
    };
    listener
        .set_nonblocking(true)
        .expect("TcpListener::set_nonblocking should not fail on a freshly bound socket");
    tracing::info!(%addr, "health endpoint listening");

    while !shutdown.load(Ordering::SeqCst) {
        let stream = match listener.accept() {
            Ok((stream, _)) => stream,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(100));
                continue;
            }
            Err(e) => {
                tracing::debug!(error = %e, "health endpoint accept error");
                continue;
            }
        };
        handle_connection(stream, &health);
    }
}

fn handle_connection(mut stream: std::net::TcpStream, health: &Arc<Mutex<HealthSnapshot>>) {
    let _ = stream.set_nonblocking(false);
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }

    let mut header = String::new();
    loop {
        header.clear();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header.trim().is_empty() => break,
            _ => {}
        }
    }

    let (status, body) = if request_line.starts_with("GET /health") {
        let guard = health.lock().unwrap_or_else(|e| e.into_inner());
        let body = serde_json::to_string(&*guard).unwrap_or_else(|_| "{}".to_string());
        ("200 OK", body)
    } else {
        ("404 Not Found", "{\"error\":\"not found\"}".to_string())
    };

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}
