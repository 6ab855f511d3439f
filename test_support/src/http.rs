//! Lightweight HTTP fixtures for tests.
//!
//! Provides a scripted HTTP server that answers successive connections with
//! canned responses and records each request it receives. The listener is
//! configured in non-blocking mode and guarded by a deadline so hung clients
//! cannot stall the test suite.

use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread,
    time::{Duration, Instant},
};

/// Response served for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub reason: String,
    /// Response body.
    pub body: String,
}

impl CannedResponse {
    /// `200 OK` with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, "OK", body)
    }

    /// Arbitrary status with `body`.
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }
}

/// Request captured by the fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request target, e.g. `/candlepin/users/alice`.
    pub path: String,
    /// Header name/value pairs in the order received.
    pub headers: Vec<(String, String)>,
    /// Request body decoded as UTF-8.
    pub body: String,
}

impl RecordedRequest {
    /// Value of the first header called `name`, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Join handle for a spawned HTTP fixture.
///
/// The handle joins the underlying thread when dropped to avoid leaking
/// background work if a test aborts early. Call [`HttpServer::join`] to
/// collect the recorded requests and surface any panic from the server
/// thread explicitly.
#[derive(Debug)]
#[must_use]
pub struct HttpServer {
    handle: Option<thread::JoinHandle<Vec<RecordedRequest>>>,
    addr: SocketAddr,
}

impl HttpServer {
    /// Join the server thread and return the requests it served.
    pub fn join(mut self) -> thread::Result<Vec<RecordedRequest>> {
        self.handle.take().expect("server already joined").join()
    }

    fn shutdown_listener(&self) {
        // Connect to unblock the accept loop; the outcome is irrelevant.
        let _ = TcpStream::connect(self.addr);
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown_listener();
            let _ = handle.join();
        }
    }
}

/// Spawn a server that answers one request per entry of `responses`.
///
/// The server listens on `127.0.0.1` and returns its base URL, e.g.
/// `http://127.0.0.1:41234`. A connection that sends no bytes ends the
/// script early.
pub fn spawn_scripted_server(responses: Vec<CannedResponse>) -> (String, HttpServer) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind HTTP listener");
    listener
        .set_nonblocking(true)
        .expect("set listener non-blocking");
    let addr = listener.local_addr().expect("local addr");
    let url = format!("http://{addr}");
    let handle = thread::spawn(move || serve(&listener, responses));
    (
        url,
        HttpServer {
            handle: Some(handle),
            addr,
        },
    )
}

/// Spawn a single-use server that returns `body` with `200 OK`.
pub fn spawn_http_server(body: impl Into<String>) -> (String, HttpServer) {
    spawn_scripted_server(vec![CannedResponse::ok(body)])
}

/// Return a `http://127.0.0.1:<port>` URL on which nothing listens.
pub fn unused_local_url() -> String {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

fn serve(listener: &TcpListener, responses: Vec<CannedResponse>) -> Vec<RecordedRequest> {
    let mut recorded = Vec::with_capacity(responses.len());
    for response in responses {
        let accept_deadline = Instant::now() + Duration::from_secs(2);
        let mut stream = accept_connection(listener, accept_deadline);
        stream
            .set_nonblocking(true)
            .expect("set stream non-blocking");
        let read_deadline = Instant::now() + Duration::from_millis(500);
        let Some(request) = read_request(&mut stream, read_deadline) else {
            break;
        };
        recorded.push(request);
        write_response(&mut stream, &response);
    }
    recorded
}

fn accept_connection(listener: &TcpListener, deadline: Instant) -> TcpStream {
    loop {
        match listener.accept() {
            Ok((stream, _)) => return stream,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                assert!(
                    Instant::now() < deadline,
                    "timed out waiting for client connection"
                );
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => panic!("failed to accept connection: {err}"),
        }
    }
}

fn read_request(stream: &mut TcpStream, deadline: Instant) -> Option<RecordedRequest> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        if let Some(request) = parse_request(&raw) {
            return Some(request);
        }
        if Instant::now() >= deadline {
            return None;
        }
        match stream.read(&mut buf) {
            Ok(0) => return None,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(err) => panic!("failed to read request: {err}"),
        }
    }
}

/// Parse `raw` once the head and the declared body have both arrived.
fn parse_request(raw: &[u8]) -> Option<RecordedRequest> {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = text.split_once("\r\n\r\n")?;
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_owned();
    let path = request_line.next()?.to_owned();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect();
    let expected = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    if body.len() < expected {
        return None;
    }
    Some(RecordedRequest {
        method,
        path,
        headers,
        body: body.to_owned(),
    })
}

fn write_response(stream: &mut TcpStream, response: &CannedResponse) {
    let payload = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.reason,
        response.body.len(),
        response.body
    );
    let _ = stream.set_nonblocking(false);
    let _ = stream.write_all(payload.as_bytes());
    let _ = stream.flush();
}
