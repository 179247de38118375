use gigboard_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveError {
    #[error("Subscription error: {0}")]
    SubscriptionError(#[from] StoreError),
}
