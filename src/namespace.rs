// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{NamespaceSnafu, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use surf::{http::url::ParseError, Url};

const GLOBAL_MARKER: &str = "services";
const SCOPED_MARKER: &str = "servicesNS";

/// The (user, app) scope of a remote object.
///
/// A namespace is either global (both fields empty) or scoped to a user and an app (both fields
/// set). A namespace with only one of the two set is invalid, and every operation that renders it
/// into a path rejects it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub app: String,
}

impl Namespace {
    /// A validated namespace.
    pub fn new(user: impl Into<String>, app: impl Into<String>) -> Result<Self> {
        let ns = Self {
            user: user.into(),
            app: app.into(),
        };
        ns.validate()?;
        Ok(ns)
    }

    /// The unscoped namespace, rendered as `services/...`.
    pub fn global() -> Self {
        Self::default()
    }

    pub fn is_global(&self) -> bool {
        self.user.is_empty() && self.app.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if paths::is_dot_segment(&self.user) || paths::is_dot_segment(&self.app) {
            return NamespaceSnafu {
                message: format!(
                    "user ({:?}) and app ({:?}) can not be . or ..",
                    self.user, self.app
                ),
            }
            .fail();
        }
        if self.user.is_empty() != self.app.is_empty() {
            return NamespaceSnafu {
                message: format!(
                    "user ({:?}) and app ({:?}) must both be set or both be empty",
                    self.user, self.app
                ),
            }
            .fail();
        }
        Ok(())
    }

    /// The path of `base_path` within this namespace.
    pub fn service_path(&self, base_path: &str) -> Result<String> {
        self.validate()?;
        if self.is_global() {
            Ok(paths::join(&[GLOBAL_MARKER, base_path]))
        } else {
            Ok(paths::join(&[
                SCOPED_MARKER,
                paths::escape(&self.user).as_str(),
                paths::escape(&self.app).as_str(),
                base_path,
            ]))
        }
    }

    /// Parse the namespace out of an identifier URL.
    ///
    /// The path is scanned from the end for the last `services` or `servicesNS` segment, so a
    /// prefix added by a proxy is skipped. A candidate marker only counts when the segments it
    /// needs follow it: at least one after `services`, and a user, an app and at least one more
    /// after `servicesNS`. An entry titled `services` is therefore not mistaken for the marker.
    ///
    /// Returns the namespace together with the decoded path segments which follow it, which the
    /// caller still has to interpret (the title of an [ID](crate::ID), for instance).
    pub fn parse(identifier_url: &str) -> Result<(Self, Vec<String>)> {
        let segments = path_segments(identifier_url)?;
        for (i, segment) in segments.iter().enumerate().rev() {
            let following = &segments[i + 1..];
            if segment == GLOBAL_MARKER && !following.is_empty() {
                return Ok((Self::global(), following.to_vec()));
            }
            if segment == SCOPED_MARKER && following.len() > 2 {
                let ns = Self {
                    user: following[0].clone(),
                    app: following[1].clone(),
                };
                return Ok((ns, following[2..].to_vec()));
            }
        }
        NamespaceSnafu {
            message: format!(
                "no {} or {} segment followed by a service path in {:?}",
                GLOBAL_MARKER, SCOPED_MARKER, identifier_url
            ),
        }
        .fail()
    }
}

/// Split the path of an absolute URL (or of a bare relative path) into decoded, non-empty
/// segments.
fn path_segments(identifier_url: &str) -> Result<Vec<String>> {
    let path = match Url::parse(identifier_url) {
        Ok(url) => url.path().to_string(),
        Err(ParseError::RelativeUrlWithoutBase) => identifier_url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
        Err(err) => {
            return NamespaceSnafu {
                message: format!("unable to parse {:?}: {}", identifier_url, err),
            }
            .fail()
        }
    };

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match urlencoding::decode(segment) {
            Ok(decoded) => Ok(decoded.into_owned()),
            Err(err) => NamespaceSnafu {
                message: format!("unable to decode path segment {:?}: {}", segment, err),
            }
            .fail(),
        })
        .collect()
}
