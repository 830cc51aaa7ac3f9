use std::{cell::RefCell, collections::VecDeque, rc::Rc, str, time::Duration};

use log::debug;
use ureq::Agent;

use crate::errors::{Error, Result};

/// Default cap on the response bodies [`HttpTransport`] will read.
pub const MAX_BODY_BYTES: u64 = 1 << 30;

/// A GET request. The library only ever reads from the servers it talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            url: url.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Response {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Result<&str> {
        Ok(str::from_utf8(&self.body)?)
    }
}

pub trait Transport {
    fn send(&mut self, request: &Request) -> Result<Response>;
}

/// Blocking HTTP over `ureq`. Non-2xx statuses are returned, not raised.
pub struct HttpTransport {
    agent: Agent,
    user_agent: String,
    body_limit: u64,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let agent: Agent = config.into();
        HttpTransport {
            agent,
            user_agent: user_agent.to_string(),
            body_limit: MAX_BODY_BYTES,
        }
    }

    /// Refuse response bodies longer than `limit` bytes.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &Request) -> Result<Response> {
        debug!(url = request.url.as_str(), params = request.params.len(); "Sending request");
        let mut builder = self
            .agent
            .get(request.url.as_str())
            .header("User-Agent", self.user_agent.as_str());
        for (key, value) in &request.params {
            builder = builder.query(key, value);
        }

        let mut response = builder.call()?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()?;
        debug!(url = request.url.as_str(), status = status; "Received response");
        Ok(Response { status, body })
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<Response>,
    requests: Vec<Request>,
}

/// Replays queued responses in the order they were added.
///
/// Clones share the same queue, so a test can keep one handle to inspect the
/// requests after giving another to a client.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    pub fn add_response(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.state.borrow_mut().responses.push_back(Response {
            status,
            body: body.into(),
        });
        self
    }

    pub fn add_body(&self, body: impl Into<Vec<u8>>) -> &Self {
        self.add_response(200, body)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.state.borrow().responses.len()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, request: &Request) -> Result<Response> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request.clone());
        state
            .responses
            .pop_front()
            .ok_or_else(|| Error::transport(format!("No mock response left for {}", request.url)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn mock_replays_in_order_and_records() {
        let mock = MockTransport::new();
        mock.add_body("first").add_response(404, "second");

        let mut transport = mock.clone();
        let first = transport.send(&Request::get("http://a/")).unwrap();
        let second = transport
            .send(&Request::get("http://b/").param("q", "Nenagh"))
            .unwrap();

        assert_eq!(first.text().unwrap(), "first");
        assert!(first.is_success());
        assert_eq!(second.status, 404);
        assert!(!second.is_success());

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].param_value("q"), Some("Nenagh"));
        assert_eq!(mock.remaining(), 0);
    }

    #[test]
    fn exhausted_mock_is_a_transport_error() {
        let mut mock = MockTransport::new();
        let err = mock.send(&Request::get("http://a/")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
    }

    /// Serve `body` once from a local socket and return its URL.
    fn serve_once(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        });
        format!("http://{addr}/api/0.6/map")
    }

    fn large_map(bytes: usize) -> Vec<u8> {
        let mut xml = String::from("<osm version=\"0.6\">\n");
        let mut id = 1;
        while xml.len() < bytes {
            xml.push_str(&format!("<node id=\"{id}\" lat=\"52.86\" lon=\"-8.19\"/>\n"));
            id += 1;
        }
        xml.push_str("</osm>\n");
        xml.into_bytes()
    }

    #[test]
    fn http_bodies_past_ten_megabytes_are_read_whole() {
        let map = large_map(12 * 1024 * 1024);
        let url = serve_once(map.clone());

        let mut transport = HttpTransport::new(Duration::from_secs(30), "osm_services-test");
        let response = transport.send(&Request::get(url)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), map.len());
    }

    #[test]
    fn http_body_limit_is_enforced() {
        let url = serve_once(large_map(64 * 1024));

        let mut transport =
            HttpTransport::new(Duration::from_secs(30), "osm_services-test").with_body_limit(1024);
        let err = transport.send(&Request::get(url)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
    }

    #[test]
    fn invalid_utf8_body_is_rejected() {
        let response = Response::ok(vec![0xff, 0xfe]);
        assert!(response.text().is_err());
    }
}
