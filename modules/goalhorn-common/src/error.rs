use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoalhornError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Post exceeds platform limit: {length} units (max {max})")]
    PostTooLong { length: usize, max: usize },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
