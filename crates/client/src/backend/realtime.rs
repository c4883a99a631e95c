//! Postgres change feeds over the realtime websocket.
//!
//! The realtime server speaks the Phoenix channel protocol (v1 JSON
//! serializer): every frame is `{"topic", "event", "payload", "ref"}`.
//! A subscription joins one `realtime:<channel>` topic carrying one
//! `postgres_changes` binding, then keeps the socket alive with a heartbeat
//! on the `phoenix` topic.
//!
//! Frame encoding and parsing are pure functions; the socket loop in
//! [`Backend::subscribe`] only moves frames between them and the wire.

use std::fmt;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::{SinkExt, Stream, StreamExt};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::tungstenite::Message;
use tracing::instrument;
use url::Url;

use super::{Backend, BackendError};

const PHOENIX_VSN: &str = "1.0.0";
const PHOENIX_TOPIC: &str = "phoenix";
const JOIN_REF: &str = "1";

/// Kind of row change carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Which change kinds a subscription asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    Insert,
    Update,
    Delete,
}

impl EventFilter {
    const fn as_str(self) -> &'static str {
        match self {
            Self::All => "*",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// A `postgres_changes` binding: table, change kinds and an optional
/// single-column equality filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub schema: String,
    pub table: String,
    pub event: EventFilter,
    pub filter: Option<String>,
}

impl ChangeFilter {
    /// All changes to a table in the `public` schema.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: "public".to_string(),
            table: table.into(),
            event: EventFilter::All,
            filter: None,
        }
    }

    /// Restrict to one change kind.
    #[must_use]
    pub const fn event(mut self, event: EventFilter) -> Self {
        self.event = event;
        self
    }

    /// Only rows where `column` equals `value`.
    ///
    /// The realtime server supports a single filter per binding; a second
    /// call replaces the first.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.filter = Some(format!("{column}=eq.{value}"));
        self
    }

    fn to_binding(&self) -> Value {
        let mut binding = json!({
            "event": self.event.as_str(),
            "schema": self.schema,
            "table": self.table,
        });
        if let (Some(filter), Some(map)) = (&self.filter, binding.as_object_mut()) {
            map.insert("filter".to_string(), Value::String(filter.clone()));
        }
        binding
    }
}

/// One Phoenix protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    /// Join `topic` with a single change binding.
    #[must_use]
    pub fn join(topic: &str, filter: &ChangeFilter, access_token: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [filter.to_binding()],
                },
                "access_token": access_token,
            }),
            reference: Some(JOIN_REF.to_string()),
            join_ref: Some(JOIN_REF.to_string()),
        }
    }

    /// Keep-alive frame.
    #[must_use]
    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: None,
        }
    }
}

/// A row change delivered by the feed.
///
/// `record` is the row after the change (absent for deletes); `old_record`
/// holds the previous values the table's replica identity exposes, often
/// only the primary key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent<T> {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub commit_timestamp: Option<DateTime<Utc>>,
    #[serde(default = "Option::default")]
    pub record: Option<T>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

impl ChangeEvent<Value> {
    /// Decode the record into a typed row.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Parse` if the record does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ChangeEvent<T>, BackendError> {
        let record = match self.record {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|e| {
                BackendError::Parse(format!("Failed to decode {} record: {e}", self.table))
            })?),
        };
        Ok(ChangeEvent {
            kind: self.kind,
            schema: self.schema,
            table: self.table,
            commit_timestamp: self.commit_timestamp,
            record,
            old_record: self.old_record,
        })
    }
}

/// A parsed incoming frame, from the point of view of one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A row change on the joined channel.
    Change(ChangeEvent<Value>),
    /// The server accepted the join.
    Joined,
    /// The server refused the join.
    Rejected(String),
    /// The channel failed after joining.
    ChannelError(String),
    /// The server closed the channel.
    Closed,
    /// Anything else (heartbeat replies, presence, other topics).
    Ignored,
}

/// Parse a text frame received while joined to `topic`.
///
/// # Errors
///
/// Returns `BackendError::Parse` for frames that are not valid Phoenix JSON
/// or change payloads that do not decode.
pub fn parse_frame(text: &str, topic: &str) -> Result<Incoming, BackendError> {
    let frame: PhoenixMessage = serde_json::from_str(text)
        .map_err(|e| BackendError::Parse(format!("Invalid realtime frame: {e}")))?;

    if frame.topic != topic {
        return Ok(Incoming::Ignored);
    }

    let status = frame.payload.get("status").and_then(Value::as_str);

    match frame.event.as_str() {
        "postgres_changes" => {
            let data = frame
                .payload
                .get("data")
                .cloned()
                .ok_or_else(|| BackendError::Parse("change frame without data".to_string()))?;
            let change = serde_json::from_value(data)
                .map_err(|e| BackendError::Parse(format!("Invalid change payload: {e}")))?;
            Ok(Incoming::Change(change))
        }
        "phx_reply" if frame.reference.as_deref() == Some(JOIN_REF) => {
            if status == Some("ok") {
                Ok(Incoming::Joined)
            } else {
                let reason = frame
                    .payload
                    .pointer("/response/reason")
                    .and_then(Value::as_str)
                    .unwrap_or("join refused");
                Ok(Incoming::Rejected(reason.to_string()))
            }
        }
        "system" if status == Some("error") => {
            let message = frame
                .payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("realtime system error");
            Ok(Incoming::ChannelError(message.to_string()))
        }
        "phx_error" => Ok(Incoming::ChannelError("channel crashed".to_string())),
        "phx_close" => Ok(Incoming::Closed),
        _ => Ok(Incoming::Ignored),
    }
}

/// Turn an `http(s)` endpoint into the realtime `ws(s)` URL.
///
/// # Errors
///
/// Returns `BackendError::Realtime` for schemes other than http and https.
pub fn websocket_url(mut endpoint: Url, anon_key: &str) -> Result<Url, BackendError> {
    let scheme = match endpoint.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(BackendError::Realtime(format!(
                "unsupported URL scheme: {other}"
            )));
        }
    };
    endpoint
        .set_scheme(scheme)
        .map_err(|()| BackendError::Realtime(format!("cannot switch to {scheme}")))?;
    endpoint
        .query_pairs_mut()
        .append_pair("apikey", anon_key)
        .append_pair("vsn", PHOENIX_VSN);
    Ok(endpoint)
}

fn encode(frame: &PhoenixMessage) -> Result<Message, BackendError> {
    serde_json::to_string(frame)
        .map(|text| Message::Text(text.into()))
        .map_err(|e| BackendError::Parse(format!("Failed to encode frame: {e}")))
}

fn socket_error(err: impl fmt::Display) -> BackendError {
    BackendError::Realtime(err.to_string())
}

enum Step<F> {
    Heartbeat,
    Frame(Option<F>),
}

impl Backend {
    /// Subscribe to row changes matching `filter`.
    ///
    /// The returned stream owns its socket; dropping it closes the
    /// subscription. It ends when the server closes the channel, and yields
    /// one error before ending if the connection or join fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the websocket cannot be opened or the join frame
    /// cannot be sent.
    #[instrument(skip(self, filter), fields(table = %filter.table))]
    pub async fn subscribe<T>(
        &self,
        channel: &str,
        filter: ChangeFilter,
    ) -> Result<impl Stream<Item = Result<ChangeEvent<T>, BackendError>> + Send + use<T>, BackendError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = websocket_url(
            self.endpoint("realtime/v1/websocket")?,
            self.inner.config.anon_key.expose_secret(),
        )?;
        let access_token = self.bearer().await;
        let heartbeat_every = self.inner.config.heartbeat_interval;

        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(socket_error)?;
        let (mut sink, mut source) = socket.split();

        let topic = format!("realtime:{channel}");
        sink.send(encode(&PhoenixMessage::join(&topic, &filter, &access_token))?)
            .await
            .map_err(socket_error)?;
        tracing::debug!(topic = %topic, "Realtime join sent");

        Ok(stream! {
            let mut heartbeat = interval_at(Instant::now() + heartbeat_every, heartbeat_every);
            let mut next_ref: u64 = 2;

            loop {
                let step = tokio::select! {
                    _ = heartbeat.tick() => Step::Heartbeat,
                    frame = source.next() => Step::Frame(frame),
                };

                match step {
                    Step::Heartbeat => {
                        let sent = match encode(&PhoenixMessage::heartbeat(next_ref)) {
                            Ok(frame) => sink.send(frame).await.map_err(socket_error),
                            Err(e) => Err(e),
                        };
                        next_ref += 1;
                        if let Err(e) = sent {
                            yield Err(e);
                            break;
                        }
                    }
                    Step::Frame(None) | Step::Frame(Some(Ok(Message::Close(_)))) => break,
                    Step::Frame(Some(Err(e))) => {
                        yield Err(socket_error(e));
                        break;
                    }
                    Step::Frame(Some(Ok(Message::Text(text)))) => {
                        match parse_frame(text.as_str(), &topic) {
                            Ok(Incoming::Change(change)) => {
                                yield change.decode::<T>();
                            }
                            Ok(Incoming::Joined) => {
                                tracing::debug!(topic = %topic, "Realtime channel joined");
                            }
                            Ok(Incoming::Rejected(reason) | Incoming::ChannelError(reason)) => {
                                tracing::warn!(topic = %topic, reason = %reason, "Realtime channel failed");
                                yield Err(BackendError::Realtime(reason));
                                break;
                            }
                            Ok(Incoming::Closed) => break,
                            Ok(Incoming::Ignored) => {}
                            Err(e) => {
                                yield Err(e);
                            }
                        }
                    }
                    Step::Frame(Some(Ok(_))) => {}
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOPIC: &str = "realtime:store_orders:42";

    #[test]
    fn test_join_frame() {
        let filter = ChangeFilter::table("orders").eq("store_id", "42");
        let frame = PhoenixMessage::join(TOPIC, &filter, "jwt");
        let value = serde_json::to_value(&frame).unwrap();

        assert_eq!(
            value,
            json!({
                "topic": TOPIC,
                "event": "phx_join",
                "payload": {
                    "config": {
                        "broadcast": { "self": false },
                        "presence": { "key": "" },
                        "postgres_changes": [{
                            "event": "*",
                            "schema": "public",
                            "table": "orders",
                            "filter": "store_id=eq.42"
                        }]
                    },
                    "access_token": "jwt"
                },
                "ref": "1",
                "join_ref": "1"
            })
        );
    }

    #[test]
    fn test_binding_without_filter() {
        let filter = ChangeFilter::table("order_messages").event(EventFilter::Insert);
        assert_eq!(
            filter.to_binding(),
            json!({"event": "INSERT", "schema": "public", "table": "order_messages"})
        );
    }

    #[test]
    fn test_heartbeat_frame() {
        let text = serde_json::to_string(&PhoenixMessage::heartbeat(7)).unwrap();
        assert_eq!(
            text,
            r#"{"topic":"phoenix","event":"heartbeat","payload":{},"ref":"7"}"#
        );
    }

    #[test]
    fn test_parse_insert_change() {
        let text = json!({
            "topic": TOPIC,
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "type": "INSERT",
                    "schema": "public",
                    "table": "orders",
                    "commit_timestamp": "2025-03-01T12:00:00.123Z",
                    "record": {"id": "o1", "status": "pending"},
                    "old_record": null,
                    "errors": null
                },
                "ids": [12]
            },
            "ref": null
        })
        .to_string();

        let Incoming::Change(change) = parse_frame(&text, TOPIC).unwrap() else {
            panic!("expected a change");
        };
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.table, "orders");
        assert!(change.commit_timestamp.is_some());
        assert_eq!(
            change.record.as_ref().and_then(|r| r.get("status")),
            Some(&json!("pending"))
        );
    }

    #[test]
    fn test_delete_change_has_no_record() {
        let change: ChangeEvent<Value> = serde_json::from_value(json!({
            "type": "DELETE",
            "schema": "public",
            "table": "products",
            "record": {},
            "old_record": {"id": "p1"}
        }))
        .unwrap();

        #[derive(Debug, Deserialize)]
        struct Row {
            #[allow(dead_code)]
            id: String,
        }

        let typed = change.decode::<Row>().unwrap();
        assert_eq!(typed.kind, ChangeKind::Delete);
        assert!(typed.record.is_none());
        assert_eq!(typed.old_record, Some(json!({"id": "p1"})));
    }

    #[test]
    fn test_parse_join_replies() {
        let ok = json!({
            "topic": TOPIC, "event": "phx_reply", "ref": "1",
            "payload": {"status": "ok", "response": {"postgres_changes": []}}
        })
        .to_string();
        assert_eq!(parse_frame(&ok, TOPIC).unwrap(), Incoming::Joined);

        let refused = json!({
            "topic": TOPIC, "event": "phx_reply", "ref": "1",
            "payload": {"status": "error", "response": {"reason": "unauthorized"}}
        })
        .to_string();
        assert_eq!(
            parse_frame(&refused, TOPIC).unwrap(),
            Incoming::Rejected("unauthorized".to_string())
        );
    }

    #[test]
    fn test_parse_ignores_other_topics_and_events() {
        let heartbeat_reply = json!({
            "topic": "phoenix", "event": "phx_reply", "ref": "2",
            "payload": {"status": "ok", "response": {}}
        })
        .to_string();
        assert_eq!(parse_frame(&heartbeat_reply, TOPIC).unwrap(), Incoming::Ignored);

        let presence = json!({"topic": TOPIC, "event": "presence_state", "payload": {}, "ref": null})
            .to_string();
        assert_eq!(parse_frame(&presence, TOPIC).unwrap(), Incoming::Ignored);

        let close = json!({"topic": TOPIC, "event": "phx_close", "payload": {}, "ref": "1"})
            .to_string();
        assert_eq!(parse_frame(&close, TOPIC).unwrap(), Incoming::Closed);
    }

    #[test]
    fn test_parse_system_error() {
        let text = json!({
            "topic": TOPIC, "event": "system", "ref": null,
            "payload": {"status": "error", "message": "invalid filter", "extension": "postgres_changes"}
        })
        .to_string();
        assert_eq!(
            parse_frame(&text, TOPIC).unwrap(),
            Incoming::ChannelError("invalid filter".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_frame("not json", TOPIC),
            Err(BackendError::Parse(_))
        ));
    }

    #[test]
    fn test_websocket_url() {
        let url = websocket_url(
            Url::parse("https://abc.supabase.co/realtime/v1/websocket").unwrap(),
            "anon",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "wss://abc.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );

        let local = websocket_url(Url::parse("http://127.0.0.1:54321/realtime/v1/websocket").unwrap(), "k")
            .unwrap();
        assert_eq!(local.scheme(), "ws");
        assert!(websocket_url(Url::parse("ftp://x/realtime").unwrap(), "k").is_err());
    }
}
