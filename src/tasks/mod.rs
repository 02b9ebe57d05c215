pub mod fusion;
pub mod notify;
pub mod status;
