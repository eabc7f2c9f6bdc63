use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::command::ErrorCode;

/// type alias for all operations on the registry that could fail with a [`RegistryError`]
pub type Result<T> = std::result::Result<T, RegistryError>;

/// The Error variants used by the registry.
///
/// Domain variants (everything except `Io`, `Serde` and `Parsing`) are never fatal: the
/// server turns them into an error [`Response`](crate::Response) and keeps serving the client.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// an entity with the given identifier was not found
    #[error("{entity} {id} not found")]
    NotFound {
        /// the kind of entity that was searched for
        entity: &'static str,
        /// the identifier that was searched for
        id: String,
    },

    /// the course named in an enrollment request does not exist
    #[error("course {0} not found")]
    CourseNotFound(String),

    /// an insert collided with an existing identifier
    #[error("{entity} {id} already exists")]
    DuplicateKey {
        /// the kind of entity being inserted
        entity: &'static str,
        /// the colliding identifier
        id: String,
    },

    /// the student is already enrolled in the course
    #[error("student {student} is already enrolled in course {course}")]
    AlreadyEnrolled {
        /// student identifier
        student: String,
        /// course identifier
        course: String,
    },

    /// the student is not enrolled in the course
    #[error("student {student} is not enrolled in course {course}")]
    NotEnrolled {
        /// student identifier
        student: String,
        /// course identifier
        course: String,
    },

    /// every seat of the course is taken
    #[error("course {0} is full")]
    CourseFull(String),

    /// the student has no free enrollment slot left
    #[error("student {0} has no free enrollment slots")]
    SlotsFull(String),

    /// the student account is blocked
    #[error("student {0} is blocked")]
    Blocked(String),

    /// validation of an identifier, name, password or number failed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// the authenticated user may not perform the request
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// a request other than login arrived on an unauthenticated session
    #[error("not logged in")]
    NotAuthenticated,

    /// a stored block could not be decoded
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// a string does not fit (with its terminator) into its fixed-width field
    #[error("field {field} too long: {len} bytes does not fit in {capacity}")]
    FieldTooLong {
        /// name of the field
        field: &'static str,
        /// field capacity in bytes, including the terminator
        capacity: usize,
        /// length of the offending value in bytes
        len: usize,
    },

    /// a data file could not be opened or locked
    #[error("storage unavailable at {path:?}: {source}")]
    StorageUnavailable {
        /// path of the data file
        path: PathBuf,
        /// the underlying cause
        #[source]
        source: io::Error,
    },

    /// variant for errors caused from file or socket IO
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Serde Error
    #[error("{0}")]
    Serde(#[from] serde_json::Error),

    /// command line arguments could not be parsed
    #[error("{0}")]
    Parsing(String),

    /// an error response that was received from the server
    #[error("{message}")]
    Server {
        /// the error code sent by the server
        code: ErrorCode,
        /// the server's error message
        message: String,
    },
}

impl RegistryError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        RegistryError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RegistryError::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    /// the wire [`ErrorCode`] that corresponds to this error
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::NotFound { .. } => ErrorCode::NotFound,
            RegistryError::CourseNotFound(_) => ErrorCode::CourseNotFound,
            RegistryError::DuplicateKey { .. } => ErrorCode::DuplicateKey,
            RegistryError::AlreadyEnrolled { .. } => ErrorCode::AlreadyEnrolled,
            RegistryError::NotEnrolled { .. } => ErrorCode::NotEnrolled,
            RegistryError::CourseFull(_) => ErrorCode::CourseFull,
            RegistryError::SlotsFull(_) => ErrorCode::SlotsFull,
            RegistryError::Blocked(_) => ErrorCode::Blocked,
            RegistryError::InvalidInput(_) | RegistryError::Parsing(_) => ErrorCode::InvalidInput,
            RegistryError::FieldTooLong { .. } => ErrorCode::FieldTooLong,
            RegistryError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            RegistryError::NotAuthenticated => ErrorCode::NotAuthenticated,
            RegistryError::CorruptRecord(_) => ErrorCode::CorruptRecord,
            RegistryError::StorageUnavailable { .. } => ErrorCode::StorageUnavailable,
            RegistryError::Io(_) | RegistryError::Serde(_) => ErrorCode::Internal,
            RegistryError::Server { code, .. } => *code,
        }
    }
}
