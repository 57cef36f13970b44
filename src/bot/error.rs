#[derive(Debug)]
pub enum Error {
    CallbackCommandParseError(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CallbackCommandParseError(reason) => {
                write!(f, "cannot parse callback command: {reason}")
            }
        }
    }
}
