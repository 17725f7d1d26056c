//! Window Manager Module
//!
//! The menu's view of the running window manager: desktops, the client a
//! window menu targets, and the EWMH requests menu commands become.

pub mod client;
pub mod client_flags;
pub mod executor;
pub mod ewmh;
pub mod workspace;

pub use executor::{Lifecycle, WmLink, X11Executor};
