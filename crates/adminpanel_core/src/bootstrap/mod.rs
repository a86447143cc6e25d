//! Bootstrap data seeding from an XML document.
//!
//! # Responsibility
//! - Parse the `<bootstrap>` seed document into typed seeds.
//! - Apply roles, menus, grants and users in one read-write transaction.
//!
//! # Invariants
//! - Seeding is all-or-nothing.
//! - Re-running a document whose users or roles already exist is a no-op.

mod document;
mod seed;

pub use document::{parse_seed_document, MenuSeed, RoleSeed, SeedDocument, UserSeed};
pub use seed::{seed_document, seed_from_file, seed_from_xml, SeedReport};

use crate::service::ServiceError;
use crate::session::PersistenceError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Errors from reading or applying a seed document.
#[derive(Debug)]
pub enum SeedError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Malformed XML or unexpected structure; `position` is a byte offset.
    Xml { position: usize, message: String },
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
    /// A `<user role="...">` names a role neither seeded nor stored.
    UnknownRole(String),
    Service(ServiceError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read seed file `{}`: {source}", path.display())
            }
            Self::Xml { position, message } => {
                write!(f, "invalid seed xml at byte {position}: {message}")
            }
            Self::MissingAttribute { element, attribute } => {
                write!(f, "<{element}> is missing required attribute `{attribute}`")
            }
            Self::InvalidAttribute {
                element,
                attribute,
                value,
            } => write!(f, "<{element}> has invalid {attribute}=\"{value}\""),
            Self::UnknownRole(role) => write!(f, "seed user references unknown role: {role}"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for SeedError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<PersistenceError> for SeedError {
    fn from(value: PersistenceError) -> Self {
        Self::Service(value.into())
    }
}
