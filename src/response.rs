// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Composable interpretation of responses.
//!
//! The transport reads every response body exactly once into a [Reply], whatever the status, and
//! hands it to a [ResponseHandler]. Handlers classify the status code, turn error payloads into
//! [Error]s and decode successful payloads into caller supplied targets. Like request builders,
//! handlers are chained with [compose], which stops at the first failure.

use crate::acl::ACL;
use crate::error::{
    Error, ErrorCode, NilValueSnafu, ResponseBodySnafu, Result, SliceSnafu, UndefinedSnafu,
};
use serde::{de::DeserializeOwned, Deserialize};
use snafu::IntoError;
use std::borrow::Cow;
use tracing::{event, Level};

/// A completed response, with its body already read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    /// The essence of the Content-Type header (`application/json`, without parameters).
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_body(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn is_xml(&self) -> bool {
        matches!(
            self.content_type.as_deref(),
            Some("text/xml") | Some("application/xml") | Some("application/atom+xml")
        )
    }
}

/// One step in the interpretation of a response.
pub type ResponseHandler<'a> = Box<dyn FnOnce(&Reply) -> Result<()> + Send + 'a>;

/// Chain handlers left to right, stopping at the first failure.
pub fn compose<'a>(handlers: Vec<ResponseHandler<'a>>) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        for handler in handlers {
            handler(reply)?;
        }
        Ok(())
    })
}

/// A step which accepts any response.
pub fn noop<'a>() -> ResponseHandler<'a> {
    Box::new(|_| Ok(()))
}

/// Deserialize the body of a reply.
///
/// The Content-Type is used to determine the format: XML types are decoded as XML, everything
/// else (including a missing Content-Type) as JSON.
pub fn decode<T: DeserializeOwned>(reply: &Reply) -> Result<T> {
    if reply.is_xml() {
        quick_xml::de::from_str(&reply.text()).map_err(|err| {
            ResponseBodySnafu {
                message: format!("XML body of HTTP {} reply fails to deserialize", reply.status),
            }
            .into_error(err.into())
        })
    } else {
        serde_json::from_slice(&reply.body).map_err(|err| {
            ResponseBodySnafu {
                message: format!("JSON body of HTTP {} reply fails to deserialize", reply.status),
            }
            .into_error(err.into())
        })
    }
}

/// Decode the body into `target`.
pub fn decode_body<'a, T: DeserializeOwned + Send>(target: &'a mut T) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        *target = decode(reply)?;
        Ok(())
    })
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Messages {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct XmlResponse {
    #[serde(default)]
    messages: XmlMessages,
}

#[derive(Debug, Default, Deserialize)]
struct XmlMessages {
    #[serde(default)]
    msg: Vec<XmlMessage>,
}

#[derive(Debug, Deserialize)]
struct XmlMessage {
    #[serde(rename = "@type", default)]
    kind: String,
    #[serde(rename = "$text", default)]
    text: String,
}

fn decode_messages(reply: &Reply) -> Result<Vec<Message>> {
    if reply.is_xml() {
        let response: XmlResponse = decode(reply)?;
        Ok(response
            .messages
            .msg
            .into_iter()
            .map(|msg| Message {
                kind: msg.kind,
                text: msg.text,
            })
            .collect())
    } else {
        Ok(decode::<Messages>(reply)?.messages)
    }
}

/// Turn the `messages` of an error reply into a Splunk message error.
pub fn messages_error<'a>() -> ResponseHandler<'a> {
    messages_error_code(ErrorCode::SplunkMessage)
}

/// Turn the `messages` of an error reply into an error with the given code.
///
/// An empty body still produces an error of that code, naming the status. A body which is not a
/// message document is a response body error.
pub fn messages_error_code<'a>(code: ErrorCode) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        let messages = if reply.body.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            decode_messages(reply)?
        };
        let mut text = messages
            .iter()
            .map(|message| {
                if message.kind.is_empty() {
                    message.text.clone()
                } else {
                    format!("{}: {}", message.kind, message.text)
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        if text.is_empty() {
            text = format!("HTTP status {}", reply.status);
        }
        event!(
            Level::WARN,
            "error reply {{status: {}, code: {}, messages: {}}}",
            reply.status,
            code,
            text
        );
        Err(Error::with_code(code, text))
    })
}

/// Run `handler` only if the reply has the given status.
pub fn on_code<'a>(status: u16, handler: ResponseHandler<'a>) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        if reply.status == status {
            handler(reply)
        } else {
            Ok(())
        }
    })
}

/// Require the reply to have the given status, running `handler` to explain any other status.
///
/// A reply with the wrong status is always a failure, even if `handler` accepts it.
pub fn require_code<'a>(status: u16, handler: ResponseHandler<'a>) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        if reply.status == status {
            return Ok(());
        }
        handler(reply)?;
        UndefinedSnafu {
            message: format!("expected HTTP status {}, got {}", status, reply.status),
        }
        .fail()
    })
}

#[derive(Debug, Deserialize)]
struct Entries<E> {
    #[serde(default = "Vec::new")]
    entry: Vec<E>,
}

/// Decode the `entry` array of a reply into `target`, replacing its contents.
pub fn decode_entries<'a, E: DeserializeOwned + Send>(
    target: &'a mut Vec<E>,
) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        let entries: Entries<E> = decode(reply)?;
        *target = entries.entry;
        Ok(())
    })
}

/// Decode a reply holding exactly one entry into `target`.
pub fn decode_entry<'a, E: DeserializeOwned + Send>(target: &'a mut E) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        let mut entries: Vec<E> = Vec::new();
        decode_entries(&mut entries)(reply)?;
        if entries.len() != 1 {
            return SliceSnafu {
                message: format!("expected exactly one entry, got {}", entries.len()),
            }
            .fail();
        }
        if let Some(entry) = entries.pop() {
            *target = entry;
        }
        Ok(())
    })
}

#[derive(Debug, Deserialize)]
struct AclEnvelope {
    #[serde(default)]
    acl: Option<ACL>,
}

#[derive(Debug, Deserialize)]
struct AclReply {
    #[serde(default)]
    entry: Option<Vec<AclEnvelope>>,
    #[serde(default)]
    acl: Option<ACL>,
}

/// Decode the access control list of a reply into `target`.
///
/// The list is read from an `{"acl": ...}` document, or from the single element of an `entry`
/// array when the server wraps it as an entry.
pub fn decode_acl<'a>(target: &'a mut ACL) -> ResponseHandler<'a> {
    Box::new(move |reply| {
        let decoded: AclReply = decode(reply)?;
        let acl = match decoded.entry {
            Some(mut entries) => {
                if entries.len() != 1 {
                    return SliceSnafu {
                        message: format!("expected exactly one ACL entry, got {}", entries.len()),
                    }
                    .fail();
                }
                entries.pop().and_then(|envelope| envelope.acl)
            }
            None => decoded.acl,
        };
        match acl {
            Some(acl) => {
                *target = acl;
                Ok(())
            }
            None => NilValueSnafu {
                message: "reply has no acl",
            }
            .fail(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::tests::{Index, IndexContent};
    use crate::Sharing;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn json_reply(status: u16, body: serde_json::Value) -> Reply {
        Reply::with_body(status, "application/json", body.to_string())
    }

    fn index_reply() -> Reply {
        json_reply(
            200,
            json!({
                "entry": [{
                    "name": "metrics",
                    "id": "https://localhost:8089/servicesNS/nobody/search/data/indexes/metrics",
                    "content": {"datatype": "metric", "maxTotalDataSizeMB": 500},
                    "acl": {"owner": "nobody", "sharing": "app"},
                }]
            }),
        )
    }

    fn counting(ran: &AtomicUsize) -> ResponseHandler<'_> {
        Box::new(move |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn compose_short_circuits() {
        let ran = AtomicUsize::new(0);
        let err = compose(vec![
            counting(&ran),
            require_code(201, messages_error()),
            counting(&ran),
        ])(&Reply::new(500))
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SplunkMessage);
        assert_eq!(err.message(), "HTTP status 500");
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decode_entry_populates_target() {
        let mut index = Index::default();
        decode_entry(&mut index)(&index_reply()).unwrap();
        assert_eq!(index.id.title, "metrics");
        assert_eq!(
            index.content,
            IndexContent {
                datatype: Some("metric".into()),
                max_size_mb: Some(500),
                frozen_time_period_in_secs: None,
            }
        );
        assert!(crate::Identifier::url(&index.id).is_ok());
    }

    #[test]
    fn decode_entry_requires_exactly_one() {
        let mut index = Index::default();
        let err = decode_entry(&mut index)(&json_reply(200, json!({"entry": []}))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Slice);
    }

    #[test]
    fn decode_entries_replaces_target() {
        let mut indexes = vec![Index::default(), Index::default()];
        decode_entries(&mut indexes)(&index_reply()).unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].id.title, "metrics");
    }

    #[test]
    fn malformed_body_is_a_response_body_error() {
        let mut index = Index::default();
        let reply = Reply::with_body(200, "application/json", "<html>bad gateway</html>");
        let err = decode_entry(&mut index)(&reply).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ResponseBody);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_skips_decoding() {
        let mut index = Index::default();
        let reply = json_reply(
            404,
            json!({"messages": [{"type": "ERROR", "text": "Could not find object id=metrics"}]}),
        );
        let err = compose(vec![
            on_code(404, messages_error_code(ErrorCode::NotFound)),
            require_code(200, messages_error()),
            decode_entry(&mut index),
        ])(&reply)
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "ERROR: Could not find object id=metrics");
        assert_eq!(index, Index::default());
    }

    #[test]
    fn xml_messages_are_decoded() {
        let reply = Reply::with_body(
            400,
            "text/xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <messages>
    <msg type="ERROR">Argument "bogus" is not supported by this handler.</msg>
  </messages>
</response>"#,
        );
        let err = messages_error()(&reply).unwrap_err();
        assert_eq!(
            err.message(),
            "ERROR: Argument \"bogus\" is not supported by this handler."
        );
    }

    #[test]
    fn require_code_fails_even_if_handler_accepts() {
        let err = require_code(200, noop())(&Reply::new(204)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Undefined);
        assert!(require_code(204, noop())(&Reply::new(204)).is_ok());
    }

    #[test]
    fn decode_acl_envelopes() {
        let mut acl = ACL::default();
        decode_acl(&mut acl)(&json_reply(
            200,
            json!({"acl": {"owner": "admin", "sharing": "global", "perms": {"read": ["*"]}}}),
        ))
        .unwrap();
        assert_eq!(acl.owner, "admin");
        assert_eq!(acl.sharing, Sharing::GLOBAL);

        let mut acl = ACL::default();
        decode_acl(&mut acl)(&index_reply()).unwrap();
        assert_eq!(acl.sharing, Sharing::APP);

        let err = decode_acl(&mut acl)(&json_reply(200, json!({}))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NilValue);
    }

    #[test]
    fn decode_body_into_any_target() {
        let mut value = serde_json::Value::Null;
        decode_body(&mut value)(&json_reply(200, json!({"generator": {"version": "9.1"}}))).unwrap();
        assert_eq!(value["generator"]["version"], "9.1");
    }
}
