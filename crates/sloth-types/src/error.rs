/// Rejection of a relay body before any chain interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestShapeError {
    /// Body is not a JSON object.
    NotAnObject,
    /// `type` discriminator missing or not one of `create-token | buy | sell`.
    InvalidType,
    /// Discriminator is valid but the fields do not match the variant.
    InvalidFields(String),
}

impl std::fmt::Display for RequestShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "request must be a JSON object"),
            Self::InvalidType => write!(f, "invalid request type"),
            Self::InvalidFields(msg) => write!(f, "invalid request fields: {msg}"),
        }
    }
}

impl std::error::Error for RequestShapeError {}
