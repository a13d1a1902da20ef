use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogueError>;

/// Failure taxonomy shared by the compiler, resolver and store gateway.
///
/// Validation variants are raised synchronously before any store call.
/// `Internal` wraps unexpected store failures with their original cause so
/// the message survives to the response envelope unchanged.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("{0}")]
    InvalidSyntax(String),

    #[error("{0}")]
    InvalidSchema(String),

    #[error("{0}")]
    InvalidUuid(String),

    #[error("{0}")]
    InvalidParamValue(String),

    #[error("{0}")]
    InvalidGeoValue(String),

    #[error("{0}")]
    ItemNotFound(String),

    #[error("{0}")]
    LinkValidationFailed(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CatalogueError {
    /// Stable urn code reported in the response envelope's `type` field.
    pub fn urn(&self) -> &'static str {
        match self {
            Self::InvalidSyntax(_) => "urn:dx:cat:InvalidSyntax",
            Self::InvalidSchema(_) => "urn:dx:cat:InvalidSchema",
            Self::InvalidUuid(_) => "urn:dx:cat:InvalidUuid",
            Self::InvalidParamValue(_) => "urn:dx:cat:InvalidParamValue",
            Self::InvalidGeoValue(_) => "urn:dx:cat:InvalidGeoValue",
            Self::ItemNotFound(_) => "urn:dx:cat:ItemNotFound",
            Self::LinkValidationFailed(_) => "urn:dx:cat:LinkValidationFailed",
            Self::Conflict(_) => "urn:dx:cat:Conflict",
            Self::Internal(_) => "urn:dx:cat:InternalError",
        }
    }

    /// Short human-readable title matching the urn code.
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidSyntax(_) => "Invalid Syntax",
            Self::InvalidSchema(_) => "Invalid Schema",
            Self::InvalidUuid(_) => "Invalid Uuid",
            Self::InvalidParamValue(_) => "Invalid Query Param Value",
            Self::InvalidGeoValue(_) => "Invalid Geo Value",
            Self::ItemNotFound(_) => "Item Not Found",
            Self::LinkValidationFailed(_) => "Link Validation Failed",
            Self::Conflict(_) => "Conflict",
            Self::Internal(_) => "Internal Server Error",
        }
    }

    /// HTTP status the thin API layer maps this error kind to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidSyntax(_)
            | Self::InvalidSchema(_)
            | Self::InvalidUuid(_)
            | Self::InvalidParamValue(_)
            | Self::InvalidGeoValue(_)
            | Self::LinkValidationFailed(_) => 400,
            Self::ItemNotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }
}
