// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Splunk REST library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Generic client for the Splunk REST management API.
//!
//! Every object managed through the API is an [Entry]: an identifier, which locates the object
//! in a namespace, paired with a content payload. Entry types are ordinary Rust structs decoded
//! with serde from the `entry` array the server answers with, and encoded as form bodies when
//! they are written. A single generic [Client] therefore handles every entry type with the same
//! create, read, update, delete and list operations, plus reads and writes of an entry's access
//! control list.
//!
//! Each operation is a fixed composition of small steps. The [request] module provides steps
//! which build an outbound request (method, URL, query, body, credentials) and the [response]
//! module provides steps which interpret the reply (status codes, error messages, decoding).
//! Both kinds of chain stop at their first failing step, so invalid input is rejected before
//! anything is sent. Glue code can compose its own calls from the same steps with
//! [Client::request_and_handle].
//!
//! Every failure is an [Error] carrying one [ErrorCode] from a closed set, so callers can branch
//! on, for example, [ErrorCode::NotFound] to recreate an object which was removed remotely.

pub mod acl;
pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod id;
pub mod namespace;
pub mod paths;
pub mod request;
pub mod response;
pub mod transport;
pub mod values;

pub use acl::{Permissions, Sharing, ACL};
pub use client::Client;
pub use config::ClientConfig;
pub use entry::{Entry, StatusCodes};
pub use error::{Error, ErrorCode, Result};
pub use id::{ConfID, Identifier, ID};
pub use namespace::Namespace;
pub use request::{Authenticator, PendingRequest};
pub use response::Reply;
pub use values::{Operation, Selective};
