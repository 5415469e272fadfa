//! External service integrations.

pub mod sheets_client {
    pub use crate::sheets_client::*;
}
