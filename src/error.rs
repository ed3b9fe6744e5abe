#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ADC read failed: {0}")]
    AdcRead(String),

    #[error("hardware access failed: {0}")]
    Hardware(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("battery device already open")]
    AlreadyOpen,
}

impl Error {
    pub fn adc_read<S: Into<String>>(msg: S) -> Self {
        Error::AdcRead(msg.into())
    }

    pub fn hardware<S: Into<String>>(msg: S) -> Self {
        Error::Hardware(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
