use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Client(#[from] villa_api_client::ClientError),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),
}
