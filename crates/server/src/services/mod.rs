pub mod calls;
pub mod expiry;
pub mod media;
pub mod push;
pub mod reactions;
pub mod router;
