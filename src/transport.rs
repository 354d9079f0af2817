// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The HTTP transport: a `surf` client with cookie and tracing middleware.

use crate::config::ClientConfig;
use crate::error::{
    transport_cause, Cause, HttpClientSnafu, NilValueSnafu, ResponseBodySnafu, Result,
};
use crate::request::PendingRequest;
use crate::response::Reply;
use futures::future::BoxFuture;
use snafu::IntoError;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, PoisonError};
use surf::middleware::{Middleware, Next};
use surf::{Client, Request, Response};
use tracing::{event, Level};

/// Build the HTTP client described by `config`.
pub fn build(config: &ClientConfig) -> Result<Client> {
    let mut http = surf::Config::new().set_timeout(Some(config.timeout()));
    if config.insecure_skip_verify {
        let tls = async_native_tls::TlsConnector::new()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
        http = http.set_tls_config(Some(Arc::new(tls)));
    }
    let client = Client::try_from(http).map_err(|err| {
        HttpClientSnafu {
            message: "unable to build HTTP client",
        }
        .into_error(Cause::from(err.to_string()))
    })?;
    event!(
        Level::DEBUG,
        "built HTTP client {{timeout: {:?}, insecure_skip_verify: {}}}",
        config.timeout(),
        config.insecure_skip_verify
    );
    Ok(client.with(trace).with(CookieJar::default()))
}

/// Send a fully built request and read the whole reply.
///
/// The body is read on every path, error statuses included, so the connection is released before
/// any response handler runs.
pub async fn send(client: &Client, request: PendingRequest) -> Result<Reply> {
    let PendingRequest {
        method,
        url,
        body,
        headers,
    } = request;
    let method = match method {
        Some(method) => method,
        None => {
            return NilValueSnafu {
                message: "request has no method",
            }
            .fail()
        }
    };
    let url = match url {
        Some(url) => url,
        None => {
            return NilValueSnafu {
                message: "request has no URL",
            }
            .fail()
        }
    };
    let target = format!("{} {}", method, url.path());

    let mut req = Request::new(method, url);
    if let Some(body) = body {
        req.set_body(body);
    }
    for (name, value) in &headers {
        req.insert_header(name.as_str(), value.as_str());
    }

    let mut res = client.send(req).await.map_err(|err| {
        HttpClientSnafu {
            message: format!("{} failed", target),
        }
        .into_error(transport_cause(err))
    })?;
    let status = u16::from(res.status());
    let content_type = res.content_type().map(|mime| mime.essence().to_string());
    let body = res.body_bytes().await.map_err(|err| {
        ResponseBodySnafu {
            message: format!("unable to read the body of {}", target),
        }
        .into_error(transport_cause(err))
    })?;
    Ok(Reply {
        status,
        content_type,
        body,
    })
}

/// Client middleware which logs requests and responses.
fn trace(req: Request, client: Client, next: Next<'_>) -> BoxFuture<surf::Result<Response>> {
    Box::pin(async move {
        let method = req.method();
        let path = req.url().path().to_string();
        event!(
            Level::DEBUG,
            "--> sending request {{method: {}, path: {}}}",
            method,
            path
        );
        let res = next.run(req, client).await;
        match &res {
            Ok(res) => event!(
                Level::DEBUG,
                "<-- received response {{method: {}, path: {}, status: {}, content-type: {:?}}}",
                method,
                path,
                res.status(),
                res.content_type(),
            ),
            Err(err) => event!(
                Level::WARN,
                "<-- request failed {{method: {}, path: {}, error: {}}}",
                method,
                path,
                err
            ),
        }
        res
    })
}

/// Client middleware which keeps the cookies set by the server and replays them.
///
/// The jar is shared by every request made through one client and holds cookies for a single
/// server. A cookie is removed when the server sets it empty or with a `Max-Age` of zero or less.
/// `Path`, `Domain` and `Expires` are not interpreted.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    cookies: Arc<Mutex<BTreeMap<String, String>>>,
}

impl CookieJar {
    fn header(&self) -> Option<String> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn store<'a>(&self, set_cookies: impl IntoIterator<Item = &'a str>) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        for set_cookie in set_cookies {
            let mut parts = set_cookie.split(';');
            let (name, value) = match parts.next().and_then(split_pair) {
                Some(pair) => pair,
                None => continue,
            };
            let expired = parts.filter_map(split_pair).any(|(attribute, value)| {
                attribute.eq_ignore_ascii_case("Max-Age")
                    && value.parse::<i64>().map(|age| age <= 0).unwrap_or(false)
            });
            if value.is_empty() || expired {
                cookies.remove(name);
            } else {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
    }
}

fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let mut parts = pair.splitn(2, '=');
    let name = parts.next()?.trim();
    let value = parts.next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some((name, value))
    }
}

#[surf::utils::async_trait]
impl Middleware for CookieJar {
    async fn handle(
        &self,
        mut req: Request,
        client: Client,
        next: Next<'_>,
    ) -> surf::Result<Response> {
        if let Some(cookie) = self.header() {
            req.insert_header("Cookie", cookie);
        }
        let res = next.run(req, client).await?;
        if let Some(values) = res.header("Set-Cookie") {
            self.store(values.iter().map(|value| value.as_str()));
        }
        Ok(res)
    }
}
