//! Menu backend interface
//!
//! Everything the menu engine needs from the display server: on-screen
//! surfaces, exclusive input capture, pointer warping, a filtered event
//! source, pipelined text measurement and the label renderer.

use anyhow::Result;
use std::time::Duration;

use crate::menu::IconRef;
use crate::shared::Geometry;

/// Handle of an on-screen menu surface
pub type SurfaceId = u32;

/// Keys the menu reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    Up,
    Down,
    Left,
    Right,
    Escape,
    Enter,
}

/// Input delivered to the modal loop (root coordinates)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent {
    Motion { x: i32, y: i32 },
    ButtonPress { x: i32, y: i32, button: u8 },
    ButtonRelease { x: i32, y: i32, button: u8 },
    Key(MenuKey),
    Expose { surface: SurfaceId },
    /// Not meant for the menu; already handed to the application's handler
    Foreign,
}

/// Visual style used by the label renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    MenuLabel,
    MenuItem,
    MenuActive,
}

/// One box to paint: optional icon, optional text, background by style
#[derive(Debug, Clone, Copy)]
pub struct Label<'a> {
    pub style: LabelStyle,
    pub text: Option<&'a str>,
    pub icon: Option<&'a IconRef>,
    /// Horizontal start of the text inside the box
    pub text_offset: u16,
    /// Draw the submenu disclosure arrow at the right edge
    pub submenu_arrow: bool,
}

/// Display services consumed by the menu engine.
///
/// Text measurement is two-phase so callers can issue every request before
/// waiting on the first reply.
pub trait MenuBackend {
    /// Pending text-width request
    type TextRequest<'a>
    where
        Self: 'a;

    /// Root window size in pixels
    fn screen_size(&self) -> (u32, u32);

    /// Height of the menu font (ascent + descent)
    fn font_height(&self) -> u16;

    /// Issue a width query without waiting for the reply
    fn request_text_width<'a>(&'a self, text: &str) -> Result<Self::TextRequest<'a>>;

    /// Wait for a previously issued width query
    fn resolve_text_width(&self, request: Self::TextRequest<'_>) -> Result<u16>;

    /// Create an unmapped save-under surface
    fn create_surface(&mut self, geometry: Geometry) -> Result<SurfaceId>;

    fn set_surface_opacity(&mut self, surface: SurfaceId, opacity: f32) -> Result<()>;

    /// Raise above siblings and map
    fn show_surface(&mut self, surface: SurfaceId) -> Result<()>;

    fn move_surface(&mut self, surface: SurfaceId, x: i32, y: i32) -> Result<()>;

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()>;

    /// Paint a label box; `area` is relative to the surface
    fn draw_label(&mut self, surface: SurfaceId, area: Geometry, label: &Label<'_>) -> Result<()>;

    fn draw_separator(&mut self, surface: SurfaceId, area: Geometry) -> Result<()>;

    /// Raised 2px frame around the whole surface
    fn draw_frame(&mut self, surface: SurfaceId, width: u32, height: u32) -> Result<()>;

    /// Take pointer and keyboard. `Ok(false)` means the server refused.
    fn grab_input(&mut self) -> Result<bool>;

    fn release_input(&mut self) -> Result<()>;

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()>;

    /// Next menu-relevant event, or `None` once `timeout` elapses
    fn next_event(&mut self, timeout: Duration) -> Result<Option<MenuEvent>>;

    /// Run periodic callbacks owned by other subsystems
    fn run_timeouts(&mut self);

    fn flush(&mut self) -> Result<()>;

    fn shutting_down(&self) -> bool;
}
