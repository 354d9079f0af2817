// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Identifiers of remote objects.
//!
//! An identifier says *which* object an entry refers to. It is built either by the caller from a
//! [Namespace] and a title (before the object exists, or to look it up), or by parsing the `id`
//! URL the server reports for an object. Only parsed identifiers know their canonical URL.

use crate::error::{IdSnafu, MissingTitleSnafu, MissingUrlSnafu, Result};
use crate::namespace::Namespace;
use crate::paths;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::fmt::Debug;

static CONF_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^conf-(.+)$").expect("CONF_FILE is a valid regex pattern"));

/// The identifier embedded in every entry.
pub trait Identifier: Clone + Debug + Default + PartialEq + Send + Sync + DeserializeOwned {
    /// Parse an identifier from an absolute URL or a relative path.
    fn parse(identifier_url: &str) -> Result<Self>;

    fn namespace(&self) -> &Namespace;

    fn namespace_mut(&mut self) -> &mut Namespace;

    /// The canonical URL this identifier was parsed from.
    fn url(&self) -> Result<&str>;

    /// Path of the collection holding this object, for an entry type served at `service`.
    fn collection_path(&self, service: &str) -> Result<String>;

    /// Path of this object.
    fn entry_path(&self, service: &str) -> Result<String>;

    /// Form fields contributed to a create request.
    fn form_values(&self) -> Result<Vec<(String, String)>>;
}

/// Identifier of a plainly titled object, e.g. `servicesNS/nobody/search/saved/searches/foo`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ID {
    pub namespace: Namespace,
    pub title: String,
    url: Option<String>,
}

impl ID {
    pub fn new(namespace: Namespace, title: impl Into<String>) -> Self {
        Self {
            namespace,
            title: title.into(),
            url: None,
        }
    }
}

impl Identifier for ID {
    fn parse(identifier_url: &str) -> Result<Self> {
        let (namespace, mut remnants) = Namespace::parse(identifier_url)?;
        let title = match remnants.pop() {
            Some(title) => title,
            None => {
                return IdSnafu {
                    message: format!("no title in {:?}", identifier_url),
                }
                .fail()
            }
        };
        Ok(Self {
            namespace,
            title,
            url: Some(identifier_url.to_string()),
        })
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    fn url(&self) -> Result<&str> {
        let url = match &self.url {
            Some(url) => url,
            None => {
                return MissingUrlSnafu {
                    message: format!("ID {:?} has no URL", self.title),
                }
                .fail()
            }
        };
        let parsed = Self::parse(url)?;
        if parsed.namespace != self.namespace || parsed.title != self.title {
            return IdSnafu {
                message: format!(
                    "URL {:?} does not match namespace {:?} and title {:?}",
                    url, self.namespace, self.title
                ),
            }
            .fail();
        }
        Ok(url.as_str())
    }

    fn collection_path(&self, service: &str) -> Result<String> {
        self.namespace.service_path(service)
    }

    fn entry_path(&self, service: &str) -> Result<String> {
        if self.title.is_empty() {
            return MissingTitleSnafu {
                message: format!("no title to address an entry of {:?}", service),
            }
            .fail();
        }
        if paths::is_dot_segment(&self.title) {
            return IdSnafu {
                message: format!("title {:?} can not address an entry", self.title),
            }
            .fail();
        }
        let collection = self.collection_path(service)?;
        Ok(paths::join(&[collection, paths::escape(&self.title)]))
    }

    fn form_values(&self) -> Result<Vec<(String, String)>> {
        if self.title.is_empty() {
            return MissingTitleSnafu {
                message: "an ID without a title can not be written",
            }
            .fail();
        }
        Ok(vec![("name".to_string(), self.title.clone())])
    }
}

impl<'de> Deserialize<'de> for ID {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        <Self as Identifier>::parse(&url).map_err(de::Error::custom)
    }
}

/// Identifier of a stanza in a configuration file, e.g.
/// `servicesNS/nobody/search/configs/conf-props/my_stanza`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfID {
    pub namespace: Namespace,
    pub file: String,
    pub stanza: String,
    url: Option<String>,
}

impl ConfID {
    pub fn new(namespace: Namespace, file: impl Into<String>, stanza: impl Into<String>) -> Self {
        Self {
            namespace,
            file: file.into(),
            stanza: stanza.into(),
            url: None,
        }
    }
}

impl Identifier for ConfID {
    fn parse(identifier_url: &str) -> Result<Self> {
        let (namespace, remnants) = Namespace::parse(identifier_url)?;
        if remnants.len() < 2 {
            return IdSnafu {
                message: format!("no conf file and stanza in {:?}", identifier_url),
            }
            .fail();
        }
        let stanza = remnants[remnants.len() - 1].clone();
        let marker = &remnants[remnants.len() - 2];
        let file = match CONF_FILE.captures(marker) {
            Some(captures) => captures[1].to_string(),
            None => {
                return IdSnafu {
                    message: format!(
                        "{:?} in {:?} is not a conf-<file> segment",
                        marker, identifier_url
                    ),
                }
                .fail()
            }
        };
        Ok(Self {
            namespace,
            file,
            stanza,
            url: Some(identifier_url.to_string()),
        })
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    fn url(&self) -> Result<&str> {
        let url = match &self.url {
            Some(url) => url,
            None => {
                return MissingUrlSnafu {
                    message: format!("ConfID {:?}/{:?} has no URL", self.file, self.stanza),
                }
                .fail()
            }
        };
        let parsed = Self::parse(url)?;
        if parsed.namespace != self.namespace
            || parsed.file != self.file
            || parsed.stanza != self.stanza
        {
            return IdSnafu {
                message: format!(
                    "URL {:?} does not match namespace {:?}, file {:?} and stanza {:?}",
                    url, self.namespace, self.file, self.stanza
                ),
            }
            .fail();
        }
        Ok(url.as_str())
    }

    fn collection_path(&self, service: &str) -> Result<String> {
        if self.file.is_empty() {
            return IdSnafu {
                message: format!("no conf file to address {:?}", service),
            }
            .fail();
        }
        let conf = format!("conf-{}", paths::escape(&self.file));
        self.namespace
            .service_path(&paths::join(&[service, conf.as_str()]))
    }

    fn entry_path(&self, service: &str) -> Result<String> {
        if self.stanza.is_empty() {
            return MissingTitleSnafu {
                message: format!("no stanza to address an entry of conf-{}", self.file),
            }
            .fail();
        }
        if paths::is_dot_segment(&self.stanza) {
            return IdSnafu {
                message: format!("stanza {:?} can not address an entry", self.stanza),
            }
            .fail();
        }
        let collection = self.collection_path(service)?;
        Ok(paths::join(&[collection, paths::escape(&self.stanza)]))
    }

    fn form_values(&self) -> Result<Vec<(String, String)>> {
        if self.stanza.is_empty() {
            return MissingTitleSnafu {
                message: "a ConfID without a stanza can not be written",
            }
            .fail();
        }
        Ok(vec![("name".to_string(), self.stanza.clone())])
    }
}

impl<'de> Deserialize<'de> for ConfID {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        <Self as Identifier>::parse(&url).map_err(de::Error::custom)
    }
}
