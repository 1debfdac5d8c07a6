#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use persist_fetch::{BodyStream, Connection, HttpClient, TransportError};

const FRAME: usize = 4096;

/// How the next connection behaves.
#[derive(Debug, Clone)]
pub enum Plan {
    /// Serve everything from the requested offset.
    Full,
    /// Serve `n` bytes from the requested offset, then reset the connection.
    DropAfter(usize),
    /// Fail to connect.
    Refuse,
    /// Accept the request and never answer it.
    Hang,
    /// Answer with this status and no body.
    Status(u16),
    /// Answer 200 with the whole resource, whatever was asked.
    IgnoreRange,
    /// Answer 206 claiming the resource has this many bytes.
    LieTotal(u64),
    /// Serve `n` bytes, then go silent without closing.
    StallAfter(usize),
    /// Connect, then end the body at once.
    EndEarly,
}

/// One request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub range: Option<u64>,
}

/// An in-memory origin that plays back a script of connection plans, then
/// falls back to [`Plan::Full`].
pub struct ScriptedServer {
    data:     Bytes,
    plans:    Mutex<VecDeque<Plan>>,
    requests: Mutex<Vec<Seen>>,
}

impl ScriptedServer {
    pub fn new(data: Vec<u8>, plans: impl IntoIterator<Item = Plan>) -> Self {
        Self {
            data:     Bytes::from(data),
            plans:    Mutex::new(plans.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn data(&self) -> &[u8] { &self.data }

    pub fn requests(&self) -> Vec<Seen> { self.requests.lock().unwrap().clone() }

    fn next_plan(&self) -> Plan { self.plans.lock().unwrap().pop_front().unwrap_or(Plan::Full) }

    fn partial(&self, offset: u64, body: BodyStream) -> Connection {
        let total = self.data.len() as u64;
        let (status, content_range) = if offset > 0 {
            (206, Some(format!("bytes {offset}-{}/{total}", total.saturating_sub(1))))
        } else {
            (200, None)
        };
        Connection {
            status,
            content_length: Some(total - offset),
            content_range,
            body,
        }
    }
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> { (0..len).map(|i| (i * 31 % 251) as u8).collect() }

pub fn range_of(headers: &[(String, String)]) -> Option<u64> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("range"))
        .and_then(|(_, v)| v.strip_prefix("bytes="))
        .and_then(|v| v.trim_end_matches('-').parse().ok())
}

fn frames(data: Bytes, tail: Option<TransportError>) -> BodyStream {
    let mut items: Vec<Result<Bytes, TransportError>> = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let take = FRAME.min(rest.len());
        items.push(Ok(rest.split_to(take)));
    }
    if let Some(err) = tail {
        items.push(Err(err));
    }
    Box::pin(stream::iter(items))
}

impl HttpClient for ScriptedServer {
    async fn open(&self, _url: &str, headers: &[(String, String)]) -> Result<Connection, TransportError> {
        let range = range_of(headers);
        self.requests.lock().unwrap().push(Seen { range });

        let offset = range.unwrap_or(0);
        let from = (offset as usize).min(self.data.len());
        let rest = self.data.slice(from..);

        let connection = match self.next_plan() {
            Plan::Full => self.partial(offset, frames(rest, None)),
            Plan::DropAfter(n) => {
                let sent = rest.slice(..n.min(rest.len()));
                self.partial(offset, frames(sent, Some(TransportError::body("connection reset by peer"))))
            }
            Plan::Refuse => return Err(TransportError::connect("connection refused")),
            Plan::Hang => return std::future::pending().await,
            Plan::Status(status) => Connection {
                status,
                content_length: Some(0),
                content_range: None,
                body: frames(Bytes::new(), None),
            },
            Plan::IgnoreRange => Connection {
                status: 200,
                content_length: Some(self.data.len() as u64),
                content_range: None,
                body: frames(self.data.clone(), None),
            },
            Plan::LieTotal(total) => Connection {
                status: 206,
                content_length: Some(rest.len() as u64),
                content_range: Some(format!("bytes {offset}-{}/{total}", total.saturating_sub(1))),
                body: frames(rest, None),
            },
            Plan::StallAfter(n) => {
                let sent = frames(rest.slice(..n.min(rest.len())), None);
                self.partial(offset, Box::pin(sent.chain(stream::pending())))
            }
            Plan::EndEarly => self.partial(offset, frames(Bytes::new(), None)),
        };
        Ok(connection)
    }
}
