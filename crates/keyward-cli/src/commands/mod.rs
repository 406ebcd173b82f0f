pub mod demo;
pub mod lock;
pub mod session;
