//! Minimal HTTP listener for client tests.
//!
//! Records each request line and answers with a JSON body chosen by the test.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

type Responder = Box<dyn Fn(&str) -> String + Send>;

pub struct RecordingServer {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RecordingServer {
    /// Answer every request with `{}`
    pub fn start() -> Self {
        Self::with_responder(|_| "{}".to_string())
    }

    /// Answer each request with the body returned for its request line
    pub fn with_responder(respond: impl Fn(&str) -> String + Send + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let respond: Responder = Box::new(respond);

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(stream, &recorded, &respond);
            }
        });

        Self { url, requests }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request lines received so far, e.g. `PUT /library/sections/1/all?... HTTP/1.1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Request targets (method and path with query), without the HTTP version
    pub fn targets(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|line| line.rsplit_once(' ').map(|(target, _)| target).unwrap_or(line).to_string())
            .collect()
    }
}

fn serve(mut stream: TcpStream, recorded: &Mutex<Vec<String>>, respond: &Responder) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }

    let mut content_length = 0;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap_or(0) == 0 || header == "\r\n" {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0; content_length];
    let _ = reader.read_exact(&mut body);

    let request_line = request_line.trim_end().to_string();
    let payload = respond(&request_line);
    recorded.lock().unwrap().push(request_line);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let _ = stream.write_all(response.as_bytes());
}
