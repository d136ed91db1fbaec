//! Session Management
//!
//! Credential and profile of the signed-in user.
//!
//! - **types**: `Session`, `UserProfile`, `Role`
//! - **storage**: durable `token` / `user` slots (file or memory backed)
//! - **store**: `SessionStore` with `init` / `save` / `clear`

mod storage;
mod store;
mod types;

pub use storage::{
    FileSlotStorage, MemorySlotStorage, SessionStorageError, SlotStorage, TOKEN_SLOT, USER_SLOT,
};
pub use store::SessionStore;
pub use types::{Role, Session, UserProfile};
