pub mod animator;
pub mod constants;
pub mod dispatch;
pub mod gate;
pub mod gesture;
pub mod local_service;
pub mod service;
pub mod session;
pub mod timer;
pub mod types;
