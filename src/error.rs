use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the collaborators around a typing session.
///
/// The session engine itself never fails; everything here comes from storage,
/// the network, or user-supplied configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("quote source returned an empty quote")]
    EmptyQuote,

    #[error("there were no missed characters")]
    NoMissedCharacters,

    #[error("api key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("user '{0}' already exists")]
    UserExists(String),

    #[error("user '{0}' not found")]
    UnknownUser(String),

    #[error("wrong password for user '{0}'")]
    InvalidCredentials(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Error::Http(err.to_string())
    }
}
