//! Local stand-in for the GitHub REST API.
//!
//! [`FakeGitHub`] serves the two endpoints forksync uses:
//! `GET /repos/{owner}/{name}` and `POST /repos/{owner}/{name}/forks`.
//! Repository documents point their `clone_url` at local bare repositories,
//! so clones and pushes never leave the machine. Requests without the
//! expected bearer token are rejected with `401`. Repository names are
//! matched case-insensitively, as on GitHub.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// A request observed by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path, e.g. `/repos/acme/widgets`.
    pub path: String,
    /// Headers in arrival order, names lower-cased.
    pub headers: Vec<(String, String)>,
    /// Request body decoded as UTF-8 (lossily).
    pub body: String,
}

impl RecordedRequest {
    /// First value of header `name`, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct State {
    token: String,
    repos: HashMap<String, Value>,
    pending_forks: HashMap<String, Value>,
    requests: Vec<RecordedRequest>,
}

/// Fake GitHub API served from a background thread on `127.0.0.1`.
///
/// Connections are handled one at a time on that thread. It stops and is
/// joined when the handle is dropped.
#[derive(Debug)]
pub struct FakeGitHub {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("repos", &self.repos.keys().collect::<Vec<_>>())
            .field("requests", &self.requests.len())
            .finish_non_exhaustive()
    }
}

/// Build a repository document in the shape GitHub returns.
#[must_use]
pub fn repository_json(full_name: &str, clone_url: &str, parent: Option<&str>) -> Value {
    let (owner, name) = full_name.split_once('/').unwrap_or(("", full_name));
    let mut doc = json!({
        "name": name,
        "full_name": full_name,
        "owner": { "login": owner },
        "clone_url": clone_url,
        "ssh_url": format!("git@github.invalid:{full_name}.git"),
        "html_url": format!("https://github.invalid/{full_name}"),
        "default_branch": "master",
        "private": false,
        "fork": parent.is_some()
    });
    if let (Some(parent), Some(map)) = (parent, doc.as_object_mut()) {
        map.insert(String::from("parent"), json!({ "full_name": parent }));
    }
    doc
}

impl FakeGitHub {
    /// Start a server accepting `Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns an error when the listener cannot be bound.
    pub fn start(token: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(State {
            token: token.to_owned(),
            ..State::default()
        }));
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = {
            let state = Arc::clone(&state);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || serve(&listener, &state, &shutdown))
        };
        Ok(Self {
            addr,
            state,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Base URL to use as the API root.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve `full_name` as an ordinary repository.
    pub fn add_repository(&self, full_name: &str, clone_url: &str) {
        self.lock()
            .repos
            .insert(key(full_name), repository_json(full_name, clone_url, None));
    }

    /// Serve `full_name` as an existing fork of `parent`.
    pub fn add_fork(&self, full_name: &str, clone_url: &str, parent: &str) {
        self.lock().repos.insert(
            key(full_name),
            repository_json(full_name, clone_url, Some(parent)),
        );
    }

    /// Make `POST /repos/{upstream}/forks` create `fork_full_name`.
    ///
    /// The fork is only visible through `GET` after the POST arrives.
    pub fn on_fork(&self, upstream: &str, fork_full_name: &str, clone_url: &str) {
        self.lock().pending_forks.insert(
            key(upstream),
            repository_json(fork_full_name, clone_url, Some(upstream)),
        );
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock_state(&self.state)
    }
}

impl Drop for FakeGitHub {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            eprintln!("fake GitHub server thread panicked");
        }
    }
}

fn key(full_name: &str) -> String {
    full_name.to_ascii_lowercase()
}

fn lock_state(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn serve(listener: &TcpListener, state: &Mutex<State>, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, state) {
                    eprintln!("fake GitHub connection failed: {err}");
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(err) => {
                eprintln!("fake GitHub accept failed: {err}");
                return;
            }
        }
    }
}


fn read_request(stream: &TcpStream) -> io::Result<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_owned();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    Ok(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn handle_connection(mut stream: TcpStream, state: &Mutex<State>) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let request = read_request(&stream)?;
    let (status, body) = route(&request, state);
    let reason = match status {
        200 => "OK",
        202 => "Accepted",
        401 => "Unauthorized",
        _ => "Not Found",
    };
    let payload = body.to_string();
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

fn route(request: &RecordedRequest, state: &Mutex<State>) -> (u16, Value) {
    let mut guard = lock_state(state);
    guard.requests.push(request.clone());
    let expected = format!("Bearer {}", guard.token);
    if request.header("authorization") != Some(expected.as_str()) {
        return (401, json!({ "message": "Bad credentials" }));
    }
    let not_found = (404, json!({ "message": "Not Found" }));
    let Some(rest) = request.path.strip_prefix("/repos/") else {
        return not_found;
    };
    let segments: Vec<&str> = rest.split('/').collect();
    match (request.method.as_str(), segments.as_slice()) {
        ("GET", [owner, name]) => guard
            .repos
            .get(&key(&format!("{owner}/{name}")))
            .map_or(not_found, |doc| (200, doc.clone())),
        ("POST", [owner, name, "forks"]) => {
            let upstream = key(&format!("{owner}/{name}"));
            let Some(fork) = guard.pending_forks.remove(&upstream) else {
                return not_found;
            };
            let full_name = fork
                .get("full_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            guard.repos.insert(key(&full_name), fork.clone());
            (202, fork)
        }
        _ => not_found,
    }
}
