use thiserror::Error;

/// Geography-identity failures. Fatal for the one geography they occur in,
/// never for a whole build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecodeError {
    #[error("unknown state code `{0}`")]
    UnknownStateCode(String),

    #[error("unknown geography: state `{0}` is not mapped to any census region")]
    UnknownGeography(String),

    #[error("invalid district code `{0}`")]
    InvalidDistrictCode(String),
}

/// Structural failures that abort a build outright.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no raw geography records supplied for {year}")]
    EmptyInput { year: u16 },
}
