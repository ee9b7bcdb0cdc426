//! Document Codec - converts caller documents to and from field maps.
//!
//! A document is anything serde can turn into a string-keyed map. The
//! identifier lives under [`ID_KEY`] and is managed here, separately from the
//! rest of the payload, so a stored document carries exactly one identifier.
//!
//! ## Example
//!
//! ```ignore
//! use pucci::codec::{self, Identifier};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User { name: String }
//!
//! let mut fields = codec::encode(&User { name: "a".into() })?;
//! codec::inject_identifier(&mut fields, &Identifier::parse("42"));
//! let user: User = codec::decode(fields)?;
//! ```

mod identifier;

use bson::{Bson, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

pub use identifier::{Identifier, UnsupportedIdentifier};

/// The backend-native field map.
pub type Fields = Document;

/// A field-name to expected-value matcher, forwarded to the backend verbatim.
pub type Filter = Document;

/// Key under which documents carry their identifier.
pub const ID_KEY: &str = "_id";

/// Serialize a document into a field map.
///
/// Fails with `StoreError::Encoding` when the value is not map-shaped
/// (a bare string, number, sequence...).
pub fn encode<D>(document: &D) -> Result<Fields, StoreError>
where
    D: Serialize + ?Sized,
{
    Ok(bson::to_document(document)?)
}

/// Deserialize a field map into the caller's type.
pub fn decode<T>(fields: Fields) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    Ok(bson::from_document(fields)?)
}

/// Store `id` as the document's identifier, replacing any identifier the
/// payload already carried. The identifier is placed first, where backends
/// keep it.
pub fn inject_identifier(fields: &mut Fields, id: &Identifier) {
    let mut with_id = Fields::new();
    with_id.insert(ID_KEY, id.to_bson());
    for (key, value) in std::mem::take(fields) {
        if key != ID_KEY {
            with_id.insert(key, value);
        }
    }
    *fields = with_id;
}

/// Remove and return the identifier field, leaving only the payload.
pub fn take_identifier(fields: &mut Fields) -> Option<Bson> {
    fields.remove(ID_KEY)
}

/// Filter matching exactly the document with this identifier.
pub fn id_filter(id: &Identifier) -> Filter {
    let mut filter = Filter::new();
    filter.insert(ID_KEY, id.to_bson());
    filter
}
