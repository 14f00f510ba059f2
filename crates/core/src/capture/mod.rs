pub mod domain;
pub mod frame_gatekeeper;
pub mod infrastructure;
