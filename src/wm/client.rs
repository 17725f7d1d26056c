use crate::wm::client_flags::{ClientState, WindowLayer};

/// Desktop value EWMH uses for windows shown on every desktop
pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// Snapshot of the client a window menu was opened for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    /// X11 window ID
    pub window: u32,

    /// Window title
    pub title: String,

    /// _NET_WM_DESKTOP value
    pub desktop: u32,

    /// _NET_WM_STATE flags
    pub state: ClientState,
}

impl ClientSnapshot {
    pub fn new(window: u32) -> Self {
        Self {
            window,
            title: String::new(),
            desktop: 0,
            state: ClientState::empty(),
        }
    }

    /// Sticky clients have no single current desktop
    pub fn is_sticky(&self) -> bool {
        self.state.contains(ClientState::STICKY) || self.desktop == ALL_DESKTOPS
    }

    /// Desktop the client lives on, if exactly one
    pub fn current_desktop(&self) -> Option<u32> {
        if self.is_sticky() {
            None
        } else {
            Some(self.desktop)
        }
    }

    pub fn layer(&self) -> WindowLayer {
        self.state.layer()
    }
}
