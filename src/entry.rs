use crate::error::Result;
use crate::id::Identifier;
use crate::values::{self, Operation, Selective};
use serde::{de::DeserializeOwned, Serialize};

/// The HTTP status codes the server answers each operation with when it succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatusCodes {
    pub created: u16,
    pub read: u16,
    pub updated: u16,
    pub deleted: u16,
    pub not_found: u16,
}

impl Default for StatusCodes {
    fn default() -> Self {
        Self {
            created: 201,
            read: 200,
            updated: 200,
            deleted: 200,
            not_found: 404,
        }
    }
}

/// A remote object type managed through the [Client](crate::Client).
///
/// An entry pairs an [Identifier] with a content payload. It is decoded from one element of the
/// `entry` array of a response, so a typical implementation looks like
///
/// ```ignore
/// #[derive(Debug, Default, Deserialize)]
/// struct Index {
///     id: ID,
///     content: IndexContent,
/// }
///
/// impl Entry for Index {
///     type Id = ID;
///     type Content = IndexContent;
///     const SERVICE: &'static str = "data/indexes";
///     const SELECTIVE: &'static [Selective] = &[Selective::create("datatype")];
///
///     fn id(&self) -> &ID { &self.id }
///     fn id_mut(&mut self) -> &mut ID { &mut self.id }
///     fn content(&self) -> &IndexContent { &self.content }
/// }
/// ```
pub trait Entry: DeserializeOwned + Default + Send + Sync {
    type Id: Identifier;
    type Content: Serialize;

    /// Path of the entry's collection below the namespace, e.g. `saved/searches`.
    const SERVICE: &'static str;

    /// Content fields which are only sent by some operations.
    const SELECTIVE: &'static [Selective] = &[];

    fn id(&self) -> &Self::Id;

    fn id_mut(&mut self) -> &mut Self::Id;

    fn content(&self) -> &Self::Content;

    /// The status codes of this entry type, when they differ from [StatusCodes::default].
    fn status_codes() -> Result<StatusCodes> {
        Ok(StatusCodes::default())
    }

    fn collection_path(&self) -> Result<String> {
        self.id().collection_path(Self::SERVICE)
    }

    fn entry_path(&self) -> Result<String> {
        self.id().entry_path(Self::SERVICE)
    }

    /// All form fields of this entry: the identifier's followed by the content's.
    fn form_values(&self) -> Result<Vec<(String, String)>> {
        let mut pairs = self.id().form_values()?;
        pairs.extend(values::encode(self.content())?);
        Ok(pairs)
    }

    /// The form fields `operation` sends.
    ///
    /// The identifier is only sent on create; afterwards it is part of the entry's path.
    fn form_values_for(&self, operation: Operation) -> Result<Vec<(String, String)>> {
        let mut pairs = match operation {
            Operation::Create => self.id().form_values()?,
            Operation::Update => Vec::new(),
        };
        pairs.extend(values::encode_selective(
            self.content(),
            Self::SELECTIVE,
            operation,
        )?);
        Ok(pairs)
    }
}
