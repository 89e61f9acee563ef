//! Minimal HTTP/1.1 build server for integration tests.
//!
//! Serves a crumb issuer, trigger endpoints and a JSON job page, and records
//! every request it receives. One request per connection; responses always
//! carry `Connection: close`.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BuildServerOptions {
    /// `(field, value)` served by the crumb issuer; `None` answers 404.
    pub crumb: Option<(String, String)>,
    /// Reject trigger POSTs that lack the crumb header with 403.
    pub require_crumb: bool,
    /// Drop the first N trigger POSTs without answering.
    pub drop_first_triggers: usize,
    /// Status returned for trigger POSTs that get through.
    pub trigger_status: u16,
}

impl Default for BuildServerOptions {
    fn default() -> Self {
        Self {
            crumb: Some(("Jenkins-Crumb".to_string(), "abc123".to_string())),
            require_crumb: true,
            drop_first_triggers: 0,
            trigger_status: 201,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path plus query, as sent.
    pub target: String,
    /// Header names lower-cased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_trigger(&self) -> bool {
        self.method == "POST"
            && (self.target.contains("/build?")
                || self.target.contains("/buildWithParameters?"))
    }
}

pub struct BuildServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl BuildServer {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn triggers(&self) -> Vec<Recorded> {
        self.requests().into_iter().filter(Recorded::is_trigger).collect()
    }

    pub fn crumb_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.target.starts_with("/crumbIssuer/"))
            .count()
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(opts: BuildServerOptions) -> BuildServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let dropped = Arc::new(AtomicUsize::new(0));
    let opts = Arc::new(opts);
    {
        let requests = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let requests = Arc::clone(&requests);
                let dropped = Arc::clone(&dropped);
                let opts = Arc::clone(&opts);
                thread::spawn(move || handle(stream, &opts, &requests, &dropped));
            }
        });
    }
    BuildServer {
        base_url: format!("http://127.0.0.1:{port}"),
        requests,
    }
}

/// Address on which nothing listens.
pub fn unused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn handle(
    mut stream: TcpStream,
    opts: &BuildServerOptions,
    requests: &Mutex<Vec<Recorded>>,
    dropped: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    requests.lock().unwrap().push(request.clone());

    if request.is_trigger() && dropped.fetch_add(1, Ordering::SeqCst) < opts.drop_first_triggers {
        return;
    }

    let (status, extra, body) = route(&request, opts);
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n{extra}\r\n",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body.as_bytes());
}

fn route(request: &Recorded, opts: &BuildServerOptions) -> (String, String, String) {
    if request.method == "GET" && request.target.starts_with("/crumbIssuer/api/xml") {
        return match &opts.crumb {
            Some((field, value)) => ("200 OK".to_string(), String::new(), format!("{field}:{value}")),
            None => ("404 Not Found".to_string(), String::new(), String::new()),
        };
    }
    if request.is_trigger() {
        if opts.require_crumb {
            if let Some((field, value)) = &opts.crumb {
                if request.header(field) != Some(value.as_str()) {
                    return ("403 Forbidden".to_string(), String::new(), "No valid crumb".to_string());
                }
            }
        }
        if request.target.contains("/job/missing/") {
            return ("404 Not Found".to_string(), String::new(), String::new());
        }
        let reason = match opts.trigger_status {
            200 => "OK",
            201 => "Created",
            _ => "Status",
        };
        return (
            format!("{} {reason}", opts.trigger_status),
            "Location: /queue/item/17/\r\n".to_string(),
            String::new(),
        );
    }
    if request.method == "GET" && request.target.ends_with("/api/json") {
        return (
            "200 OK".to_string(),
            "Content-Type: application/json\r\n".to_string(),
            "{\"number\":3,\"building\":false,\"result\":\"SUCCESS\"}".to_string(),
        );
    }
    ("404 Not Found".to_string(), String::new(), String::new())
}

fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&data[..header_end]).ok()?;
    let mut lines = head.lines();
    let mut start = lines.next()?.split_whitespace();
    let method = start.next()?.to_string();
    let target = start.next()?.to_string();
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = data[header_end..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }

    Some(Recorded {
        method,
        target,
        headers,
        body,
    })
}
