#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Journal queries were made while journaling is turned off.
    #[error("the message journal is disabled")]
    JournalDisabled,
}

pub type Result<T> = std::result::Result<T, Error>;
