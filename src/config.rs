// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{EndpointSnafu, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use snafu::IntoError;
use std::time::Duration;
use surf::Url;

/// Timeout of a request when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Connection settings of a [Client](crate::Client).
///
/// Deserializable so it can be read from whatever configuration format the caller uses:
///
/// ```json
/// {"url": "https://localhost:8089", "insecure_skip_verify": true, "timeout_secs": 60}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(serialize_with = "serialize_url", deserialize_with = "deserialize_url")]
    pub url: Url,
    /// Accept any TLS certificate and host name presented by the server.
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|err| {
            EndpointSnafu {
                message: format!("invalid server URL {:?}", url),
            }
            .into_error(err.into())
        })?;
        Ok(Self {
            url,
            insecure_skip_verify: false,
            timeout_secs: None,
        })
    }

    pub fn with_insecure_skip_verify(mut self, insecure_skip_verify: bool) -> Self {
        self.insecure_skip_verify = insecure_skip_verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

fn serialize_url<S: Serializer>(url: &Url, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(url.as_str())
}

fn deserialize_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
    let url = String::deserialize(deserializer)?;
    Url::parse(&url).map_err(de::Error::custom)
}
