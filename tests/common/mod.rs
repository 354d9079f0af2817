// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! An in-process stand-in for the management API, serving indexes and one conf file.
#![allow(dead_code)]

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use splunk_rest::{
    Client, ClientConfig, ConfID, Entry, PendingRequest, Result, Selective, ID,
};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tide::{http::mime, Body, Next, Request, Response, StatusCode};

pub const TOKEN: &str = "Splunk secret";
pub const SESSION_COOKIE: &str = "splunkd_8089=session-1";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "maxTotalDataSizeMB", skip_serializing_if = "Option::is_none")]
    pub max_size_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_time_period_in_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Index {
    pub id: ID,
    #[serde(default)]
    pub content: IndexContent,
}

impl Entry for Index {
    type Id = ID;
    type Content = IndexContent;
    const SERVICE: &'static str = "data/indexes";
    const SELECTIVE: &'static [Selective] = &[
        Selective::create("datatype"),
        Selective::update("frozen_time_period_in_secs"),
    ];

    fn id(&self) -> &ID {
        &self.id
    }

    fn id_mut(&mut self) -> &mut ID {
        &mut self.id
    }

    fn content(&self) -> &IndexContent {
        &self.content
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropsContent {
    #[serde(rename = "TRANSFORMS", skip_serializing_if = "Option::is_none")]
    pub transforms: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Props {
    pub id: ConfID,
    #[serde(default)]
    pub content: PropsContent,
}

impl Entry for Props {
    type Id = ConfID;
    type Content = PropsContent;
    const SERVICE: &'static str = "configs";

    fn id(&self) -> &ConfID {
        &self.id
    }

    fn id_mut(&mut self) -> &mut ConfID {
        &mut self.id
    }

    fn content(&self) -> &PropsContent {
        &self.content
    }
}

/// A request as the mock server saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub cookie: Option<String>,
    pub form: Vec<(String, String)>,
}

impl Recorded {
    pub fn field(&self, name: &str) -> Option<&str> {
        field(&self.form, name)
    }
}

#[derive(Debug)]
struct Stored {
    content: Map<String, Value>,
    acl: Value,
}

#[derive(Debug, Default)]
pub struct State {
    indexes: BTreeMap<String, Stored>,
    pub requests: Vec<Recorded>,
}

#[derive(Clone, Debug, Default)]
pub struct Mock {
    state: Arc<Mutex<State>>,
}

impl Mock {
    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.lock().requests.last().cloned().unwrap()
    }
}

/// Start the mock server on an ephemeral port.
///
/// Returns its state and the base URL to configure a client with.
pub fn serve() -> (Mock, String) {
    let mock = Mock::default();
    let mut app = tide::with_state(mock.clone());
    app.with(session);
    app.at("/services/data/indexes").get(list_indexes);
    app.at("/servicesNS/nobody/search/data/indexes")
        .get(list_indexes)
        .post(create_index);
    app.at("/servicesNS/nobody/search/data/indexes/:name")
        .get(read_index)
        .post(update_index)
        .delete(delete_index);
    app.at("/servicesNS/nobody/search/data/indexes/:name/acl")
        .get(read_acl)
        .post(update_acl);
    app.at("/servicesNS/nobody/search/configs/conf-props")
        .get(list_props);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    async_std::task::spawn(app.listen(listener));
    (mock, format!("http://127.0.0.1:{}", port))
}

/// A client of the mock server which authenticates with `token`.
pub fn client(base: &str, token: &'static str) -> Client {
    Client::new(
        ClientConfig::new(base).unwrap(),
        move |request: &mut PendingRequest| -> Result<()> {
            request.insert_header("Authorization", token);
            Ok(())
        },
    )
}

/// Server middleware which records requests, checks credentials, and hands out a session cookie.
fn session(mut req: Request<Mock>, next: Next<'_, Mock>) -> BoxFuture<'_, tide::Result> {
    Box::pin(async move {
        let body = req.body_string().await?;
        let recorded = Recorded {
            method: req.method().to_string(),
            path: req.url().path().to_string(),
            query: req.url().query().map(str::to_string),
            content_type: req.content_type().map(|mime| mime.essence().to_string()),
            cookie: req.header("Cookie").map(|value| value.as_str().to_string()),
            form: parse_form(&body),
        };
        req.state().lock().requests.push(recorded);
        req.set_body(body);

        let authorized = req
            .header("Authorization")
            .map(|value| value.as_str() == TOKEN)
            .unwrap_or(false);
        let mut res = if authorized {
            next.run(req).await
        } else {
            messages(StatusCode::Unauthorized, "call not properly authenticated")
        };
        res.insert_header("Set-Cookie", format!("{}; Path=/; HttpOnly", SESSION_COOKIE));
        Ok(res)
    })
}

fn parse_form(body: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(body).unwrap_or_default()
}

fn decode(component: &str) -> String {
    urlencoding::decode(&component.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| component.to_string())
}

fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
    form.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn json_response(status: StatusCode, body: Value) -> tide::Result {
    Ok(Response::builder(status)
        .body(Body::from_json(&body)?)
        .content_type(mime::JSON)
        .build())
}

fn messages(status: StatusCode, text: &str) -> Response {
    Response::builder(status)
        .body(json!({"messages": [{"type": "ERROR", "text": text}]}).to_string())
        .content_type(mime::JSON)
        .build()
}

/// Numbers are sent as form text; store them the way the server reports them.
fn typed(value: &str) -> Value {
    value
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(value))
}

fn index_url(req: &Request<Mock>, name: &str) -> String {
    let mut url = req.url().clone();
    url.set_query(None);
    url.set_path(&format!(
        "/servicesNS/nobody/search/data/indexes/{}",
        urlencoding::encode(name)
    ));
    url.to_string()
}

fn index_entry(req: &Request<Mock>, name: &str, stored: &Stored) -> Value {
    json!({
        "name": name,
        "id": index_url(req, name),
        "content": stored.content,
        "acl": stored.acl,
    })
}

fn name_param(req: &Request<Mock>) -> tide::Result<String> {
    Ok(decode(req.param("name")?))
}

async fn create_index(mut req: Request<Mock>) -> tide::Result {
    let form = parse_form(&req.body_string().await?);
    let name = match field(&form, "name") {
        Some(name) => name.to_string(),
        None => return Ok(messages(StatusCode::BadRequest, "Missing argument: name")),
    };
    let mut state = req.state().lock();
    if state.indexes.contains_key(&name) {
        return Ok(messages(
            StatusCode::Conflict,
            &format!("An object with name={} already exists", name),
        ));
    }
    let stored = Stored {
        content: form
            .iter()
            .filter(|(key, _)| key != "name")
            .map(|(key, value)| (key.clone(), typed(value)))
            .collect(),
        acl: json!({
            "owner": "nobody",
            "sharing": "app",
            "perms": {"read": ["*"], "write": ["admin"]},
        }),
    };
    let entry = index_entry(&req, &name, &stored);
    state.indexes.insert(name, stored);
    json_response(StatusCode::Created, json!({ "entry": [entry] }))
}

async fn read_index(req: Request<Mock>) -> tide::Result {
    let name = name_param(&req)?;
    let state = req.state().lock();
    match state.indexes.get(&name) {
        Some(stored) => json_response(
            StatusCode::Ok,
            json!({ "entry": [index_entry(&req, &name, stored)] }),
        ),
        None => Ok(not_found(&name)),
    }
}

async fn update_index(mut req: Request<Mock>) -> tide::Result {
    let form = parse_form(&req.body_string().await?);
    let name = name_param(&req)?;
    if let Some((key, _)) = form
        .iter()
        .find(|(key, _)| key == "name" || key == "datatype")
    {
        return Ok(messages(
            StatusCode::BadRequest,
            &format!("Argument \"{}\" is not supported by this handler.", key),
        ));
    }
    let mut state = req.state().lock();
    match state.indexes.get_mut(&name) {
        Some(stored) => {
            for (key, value) in &form {
                stored.content.insert(key.clone(), typed(value));
            }
            let entry = index_entry(&req, &name, stored);
            json_response(StatusCode::Ok, json!({ "entry": [entry] }))
        }
        None => Ok(not_found(&name)),
    }
}

async fn delete_index(req: Request<Mock>) -> tide::Result {
    let name = name_param(&req)?;
    let mut state = req.state().lock();
    match state.indexes.remove(&name) {
        Some(_) => json_response(StatusCode::Ok, json!({ "entry": [] })),
        None => Ok(not_found(&name)),
    }
}

async fn list_indexes(req: Request<Mock>) -> tide::Result {
    let state = req.state().lock();
    let entries = state
        .indexes
        .iter()
        .map(|(name, stored)| index_entry(&req, name, stored))
        .collect::<Vec<_>>();
    json_response(StatusCode::Ok, json!({ "entry": entries }))
}

async fn read_acl(req: Request<Mock>) -> tide::Result {
    let name = name_param(&req)?;
    let state = req.state().lock();
    match state.indexes.get(&name) {
        Some(stored) => json_response(StatusCode::Ok, json!({ "acl": stored.acl })),
        None => Ok(not_found(&name)),
    }
}

async fn update_acl(mut req: Request<Mock>) -> tide::Result {
    let form = parse_form(&req.body_string().await?);
    let name = name_param(&req)?;
    let mut state = req.state().lock();
    let stored = match state.indexes.get_mut(&name) {
        Some(stored) => stored,
        None => return Ok(not_found(&name)),
    };
    if let Some(owner) = field(&form, "owner") {
        stored.acl["owner"] = Value::from(owner);
    }
    if let Some(sharing) = field(&form, "sharing") {
        stored.acl["sharing"] = Value::from(sharing);
    }
    for kind in ["read", "write"].iter() {
        if let Some(principals) = field(&form, &format!("perms.{}", kind)) {
            stored.acl["perms"][*kind] = principals.split(',').map(Value::from).collect();
        }
    }
    json_response(StatusCode::Ok, json!({ "acl": stored.acl }))
}

async fn list_props(req: Request<Mock>) -> tide::Result {
    let mut url = req.url().clone();
    url.set_query(None);
    let entries = ["access_combined", "syslog"]
        .iter()
        .map(|stanza| {
            url.set_path(&format!(
                "/servicesNS/nobody/search/configs/conf-props/{}",
                stanza
            ));
            json!({
                "name": stanza,
                "id": url.as_str(),
                "content": {"TRANSFORMS": format!("{}-extractions", stanza)},
            })
        })
        .collect::<Vec<_>>();
    json_response(StatusCode::Ok, json!({ "entry": entries }))
}

fn not_found(name: &str) -> Response {
    messages(
        StatusCode::NotFound,
        &format!("Could not find object id={}", name),
    )
}
