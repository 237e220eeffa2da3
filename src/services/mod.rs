pub mod auth;
pub mod billing;
pub mod feed;
pub mod gate;
pub mod intake;
pub mod positions;
pub mod storage;
