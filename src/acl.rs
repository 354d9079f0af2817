// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{Result, SharingSnafu};
use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

/// The level at which a remote object is shared.
///
/// Values received from the server are accepted as is. Only the four values with associated
/// constants can be sent back: encoding anything else fails with a sharing error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Sharing(Cow<'static, str>);

impl Sharing {
    /// Unspecified; the object keeps (or inherits) its current sharing.
    pub const UNSET: Sharing = Sharing(Cow::Borrowed(""));
    pub const GLOBAL: Sharing = Sharing(Cow::Borrowed("global"));
    pub const USER: Sharing = Sharing(Cow::Borrowed("user"));
    pub const APP: Sharing = Sharing(Cow::Borrowed("app"));

    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<()> {
        match self.as_str() {
            "" | "global" | "user" | "app" => Ok(()),
            other => SharingSnafu {
                message: format!(
                    "{:?} is not one of \"\", \"global\", \"user\" or \"app\"",
                    other
                ),
            }
            .fail(),
        }
    }
}

impl Display for Sharing {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sharing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.validate().map_err(ser::Error::custom)?;
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sharing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value: Option<String> = Deserialize::deserialize(deserializer)?;
        Ok(value.map(Sharing::new).unwrap_or_default())
    }
}

/// Principals allowed to read and write an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub read: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub write: Vec<String>,
}

/// Access control of a remote object, served at the object's `acl` sub-resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ACL {
    #[serde(rename = "perms", default, deserialize_with = "null_as_default")]
    pub permissions: Permissions,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner: String,
    #[serde(default)]
    pub sharing: Sharing,
}

impl ACL {
    /// The form fields of an ACL update.
    ///
    /// Permission lists are sent comma separated. Empty fields are left out so the server keeps
    /// its current value for them.
    pub fn form_values(&self) -> Result<Vec<(String, String)>> {
        self.sharing.validate()?;

        let mut values = Vec::new();
        if !self.owner.is_empty() {
            values.push(("owner".to_string(), self.owner.clone()));
        }
        if !self.sharing.as_str().is_empty() {
            values.push(("sharing".to_string(), self.sharing.to_string()));
        }
        if !self.permissions.read.is_empty() {
            values.push(("perms.read".to_string(), self.permissions.read.join(",")));
        }
        if !self.permissions.write.is_empty() {
            values.push(("perms.write".to_string(), self.permissions.write.join(",")));
        }
        Ok(values)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
