pub mod capture_loop;
pub mod identity_session_use_case;
pub mod overlay;
pub mod session_display;
pub mod session_logger;
