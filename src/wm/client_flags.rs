//! Client Flags
//!
//! EWMH window state as seen from outside the window manager, and the
//! stacking layers a user can pick from the window menu.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// _NET_WM_STATE bits that change what the window menu offers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientState: u32 {
        const STICKY          = 1 << 0;
        const MAXIMIZED_VERT  = 1 << 1;
        const MAXIMIZED_HORZ  = 1 << 2;
        const SHADED          = 1 << 3;
        const HIDDEN          = 1 << 4;
        const ABOVE           = 1 << 5;
        const BELOW           = 1 << 6;
        const FULLSCREEN      = 1 << 7;
    }
}

impl ClientState {
    pub fn maximized() -> Self {
        Self::MAXIMIZED_VERT | Self::MAXIMIZED_HORZ
    }

    pub fn is_maximized(&self) -> bool {
        self.contains(Self::MAXIMIZED_VERT) && self.contains(Self::MAXIMIZED_HORZ)
    }

    /// Layer implied by the above/below bits
    pub fn layer(&self) -> WindowLayer {
        if self.contains(Self::ABOVE) {
            WindowLayer::Above
        } else if self.contains(Self::BELOW) {
            WindowLayer::Below
        } else {
            WindowLayer::Normal
        }
    }
}

/// User-selectable window layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLayer {
    Below = 1,
    Normal = 2,
    Above = 3,
}

impl WindowLayer {
    /// Top to bottom, the order the layer menu lists them
    pub const ALL: [WindowLayer; 3] = [WindowLayer::Above, WindowLayer::Normal, WindowLayer::Below];

    pub fn name(&self) -> &'static str {
        match self {
            WindowLayer::Below => "Below",
            WindowLayer::Normal => "Normal",
            WindowLayer::Above => "Above",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_from_state() {
        assert_eq!(ClientState::empty().layer(), WindowLayer::Normal);
        assert_eq!(ClientState::ABOVE.layer(), WindowLayer::Above);
        assert_eq!((ClientState::BELOW | ClientState::STICKY).layer(), WindowLayer::Below);
        assert!(ClientState::maximized().is_maximized());
        assert!(!ClientState::MAXIMIZED_VERT.is_maximized());
    }
}
