use thiserror::Error;

#[derive(Error, Debug)]
pub enum JenkinsError {
    #[error("Jenkins request to {url} failed with status {status}: {message}")]
    Api {
        status: u16,
        message: String,
        url: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Invalid folder type: {0}")]
    InvalidFolderType(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JenkinsError>;

/// Failures while listing branches of a remote repository.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("error calling {command}: {reason}")]
    Process {
        command: String,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("git output is not valid UTF-8")]
    Decode(#[from] std::string::FromUtf8Error),
}
