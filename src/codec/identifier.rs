//! Identifier - the key addressing one document within one table.

use std::fmt;

use bson::oid::ObjectId;
use bson::Bson;

/// A document identifier in one of the two representations a backend accepts.
///
/// Strings that parse as a 12-byte object identifier (24 hex characters) are
/// stored natively; everything else is kept as an opaque string. The same
/// parse is applied on create, read-by-id and delete, so an identifier always
/// finds its own document again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Native(ObjectId),
    Opaque(String),
}

impl Identifier {
    /// Parse a caller-supplied identifier.
    pub fn parse(raw: &str) -> Self {
        match ObjectId::parse_str(raw) {
            Ok(oid) => Identifier::Native(oid),
            Err(_) => Identifier::Opaque(raw.to_string()),
        }
    }

    /// A fresh native identifier.
    pub fn generate() -> Self {
        Identifier::Native(ObjectId::new())
    }

    /// Read an identifier back from a stored `_id` value.
    pub fn from_bson(value: &Bson) -> Result<Self, UnsupportedIdentifier> {
        match value {
            Bson::ObjectId(oid) => Ok(Identifier::Native(*oid)),
            Bson::String(s) => Ok(Identifier::Opaque(s.clone())),
            other => Err(UnsupportedIdentifier(format!("{:?}", other.element_type()))),
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Identifier::Native(oid) => Bson::ObjectId(*oid),
            Identifier::Opaque(s) => Bson::String(s.clone()),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Identifier::Native(_))
    }

    /// Raw bytes of a native identifier.
    pub fn native_bytes(&self) -> Option<[u8; 12]> {
        match self {
            Identifier::Native(oid) => Some(oid.bytes()),
            Identifier::Opaque(_) => None,
        }
    }
}

/// Canonical string form: lowercase hex for native identifiers, the string
/// itself for opaque ones.
impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Native(oid) => write!(f, "{}", oid.to_hex()),
            Identifier::Opaque(s) => f.write_str(s),
        }
    }
}

impl From<ObjectId> for Identifier {
    fn from(oid: ObjectId) -> Self {
        Identifier::Native(oid)
    }
}

impl From<Identifier> for Bson {
    fn from(id: Identifier) -> Self {
        id.to_bson()
    }
}

/// A stored `_id` of a type that is neither an object identifier nor a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedIdentifier(pub String);

impl fmt::Display for UnsupportedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported identifier type: {}", self.0)
    }
}

impl std::error::Error for UnsupportedIdentifier {}
