use std::time::Duration;

pub type Result<T> = ::std::result::Result<T, ::failure::Error>;

/// Classifiable failures of a single fetch. They are recorded on the request and
/// logged, the waiters observe an empty result instead of an error value.
#[derive(Debug, Fail)]
pub enum FetchError {
    #[fail(display = "The schema of url {} has not been supported yet!", _0)]
    SchemaNotSupported(String),
    #[fail(display = "Request timeout after {:?}.", _0)]
    Timeout(Duration),
    #[fail(display = "Could not found {}.", _0)]
    NotFound(String),
    #[fail(display = "Malformed payload: {}.", _0)]
    Malformed(String),
}
