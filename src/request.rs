// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Composable construction of outbound requests.
//!
//! A [RequestBuilder] performs one step of assembling a [PendingRequest] and may fail. Builders
//! are chained with [compose], which stops at the first failing step, so a request is only ever
//! sent once every step (path resolution, body encoding, authentication, ...) has succeeded. All
//! validation therefore happens before any network I/O.

use crate::acl::ACL;
use crate::entry::{Entry, StatusCodes};
use crate::error::{EndpointSnafu, Error, NilValueSnafu, OverwriteValueSnafu, Result};
use crate::paths;
use crate::values::{self, Operation};
use snafu::IntoError;
use std::sync::Arc;
use surf::{http::Method, Url};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A request under construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingRequest {
    pub method: Option<Method>,
    pub url: Option<Url>,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl PendingRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any previous value of the same (case insensitive) name.
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Attaches credentials to outbound requests.
///
/// The client never implements an authentication scheme itself; it calls the authenticator it was
/// constructed with as the last step of every request. Closures with the right signature are
/// authenticators too.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, request: &mut PendingRequest) -> Result<()>;
}

impl<F> Authenticator for F
where
    F: Fn(&mut PendingRequest) -> Result<()> + Send + Sync,
{
    fn authenticate(&self, request: &mut PendingRequest) -> Result<()> {
        self(request)
    }
}

/// One step in the construction of a request.
pub type RequestBuilder<'a> = Box<dyn FnOnce(&mut PendingRequest) -> Result<()> + Send + 'a>;

/// Chain builders left to right, stopping at the first failure.
pub fn compose<'a>(builders: Vec<RequestBuilder<'a>>) -> RequestBuilder<'a> {
    Box::new(move |request| {
        for builder in builders {
            builder(&mut *request)?;
        }
        Ok(())
    })
}

/// A step which does nothing.
pub fn noop<'a>() -> RequestBuilder<'a> {
    Box::new(|_| Ok(()))
}

/// A step which fails with an error raised before the chain was assembled.
pub fn fail_with<'a>(err: Error) -> RequestBuilder<'a> {
    Box::new(move |_| Err(err))
}

/// Look up the status codes of `E`.
///
/// A failed lookup is not returned directly: it is turned into a failing first step, so the
/// request chain reports it in order. The default codes are returned alongside such a step, and
/// are never used since the chain will not run past it.
pub fn resolve_status_codes<'a, E: Entry>() -> (StatusCodes, RequestBuilder<'a>) {
    match E::status_codes() {
        Ok(codes) => (codes, noop()),
        Err(err) => (StatusCodes::default(), fail_with(err)),
    }
}

pub fn method<'a>(method: Method) -> RequestBuilder<'a> {
    Box::new(move |request| {
        request.method = Some(method);
        Ok(())
    })
}

/// Resolve `path` against the base URL of the server.
pub fn resolve(base: &Url, path: &str) -> Result<Url> {
    let path = format!("/{}", paths::join(&[base.path(), path]).trim_start_matches('/'));
    base.join(&path).map_err(|err| {
        EndpointSnafu {
            message: format!("unable to resolve {:?} against {}", path, base),
        }
        .into_error(err.into())
    })
}

/// Set the URL to `path` below `base`.
pub fn url<'a>(base: &'a Url, path: String) -> RequestBuilder<'a> {
    Box::new(move |request| {
        request.url = Some(resolve(base, &path)?);
        Ok(())
    })
}

/// Set the URL to the collection `entry` belongs to.
pub fn service_url<'a, E: Entry>(base: &'a Url, entry: &'a E) -> RequestBuilder<'a> {
    Box::new(move |request| {
        request.url = Some(resolve(base, &entry.collection_path()?)?);
        Ok(())
    })
}

/// Set the URL to `entry` itself.
pub fn entry_url<'a, E: Entry>(base: &'a Url, entry: &'a E) -> RequestBuilder<'a> {
    Box::new(move |request| {
        request.url = Some(resolve(base, &entry.entry_path()?)?);
        Ok(())
    })
}

/// Set the URL to the access control sub-resource of `entry`.
pub fn acl_url<'a, E: Entry>(base: &'a Url, entry: &'a E) -> RequestBuilder<'a> {
    Box::new(move |request| {
        let path = paths::join(&[entry.entry_path()?.as_str(), "acl"]);
        request.url = Some(resolve(base, &path)?);
        Ok(())
    })
}

/// Ask for JSON responses.
///
/// This has to be the first query parameter set; a non-empty query is an overwrite error rather
/// than something silently extended.
pub fn output_mode_json<'a>() -> RequestBuilder<'a> {
    Box::new(|request| {
        let url = match request.url.as_mut() {
            Some(url) => url,
            None => {
                return NilValueSnafu {
                    message: "no URL to set output_mode on",
                }
                .fail()
            }
        };
        if let Some(query) = url.query().filter(|query| !query.is_empty()) {
            return OverwriteValueSnafu {
                message: format!("query {:?} already set", query),
            }
            .fail();
        }
        url.query_pairs_mut().append_pair("output_mode", "json");
        Ok(())
    })
}

/// Append a query parameter to an already resolved URL.
pub fn query_value<'a>(key: &'static str, value: &'static str) -> RequestBuilder<'a> {
    Box::new(move |request| match request.url.as_mut() {
        Some(url) => {
            url.query_pairs_mut().append_pair(key, value);
            Ok(())
        }
        None => NilValueSnafu {
            message: format!("no URL to set {} on", key),
        }
        .fail(),
    })
}

/// Set a form encoded body.
pub fn form_body<'a>(pairs: Vec<(String, String)>) -> RequestBuilder<'a> {
    Box::new(move |request| set_form(request, &pairs))
}

/// Encode all fields of `entry` as the body.
pub fn body_values<'a, E: Entry>(entry: &'a E) -> RequestBuilder<'a> {
    Box::new(move |request| set_form(request, &entry.form_values()?))
}

/// Encode the fields of `entry` which `operation` sends as the body.
pub fn body_values_selective<'a, E: Entry>(
    entry: &'a E,
    operation: Operation,
) -> RequestBuilder<'a> {
    Box::new(move |request| set_form(request, &entry.form_values_for(operation)?))
}

/// Encode a complete access control list as the body.
pub fn body_acl<'a>(acl: &'a ACL) -> RequestBuilder<'a> {
    Box::new(move |request| set_form(request, &acl.form_values()?))
}

/// Attach credentials.
pub fn authenticate<'a>(authenticator: Arc<dyn Authenticator>) -> RequestBuilder<'a> {
    Box::new(move |request| authenticator.authenticate(request))
}

fn set_form(request: &mut PendingRequest, pairs: &[(String, String)]) -> Result<()> {
    if request.body.is_some() {
        return OverwriteValueSnafu {
            message: "request body already set",
        }
        .fail();
    }
    request.body = Some(values::form_encode(pairs)?);
    request.insert_header("Content-Type", FORM_CONTENT_TYPE);
    Ok(())
}
