//! X11 menu backend
//!
//! Implements [`MenuBackend`] on an x11rb connection: override-redirect
//! menu windows, pointer/keyboard grabs, core-font text and the modal
//! event source.

pub mod draw;
pub mod events;
pub mod keys;

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use x11rb::connection::Connection;
use x11rb::cookie::Cookie;
use x11rb::protocol::xproto::{
    AtomEnum, ConfigureWindowAux, ConnectionExt, CreateWindowAux, EventMask, GrabMode,
    GrabStatus, PropMode, QueryTextExtentsReply, StackMode, Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::config::MenuConfig;
use crate::menu::{Label, MenuBackend, MenuEvent, SurfaceId};
use crate::shared::Geometry;
use draw::Painter;
use events::EventQueue;
use keys::KeyMap;

/// Called with every event the menu does not consume
pub type ForeignHook = Box<dyn FnMut(&Event)>;
/// Called once per poll interval while a menu is open
pub type TimeoutHook = Box<dyn FnMut()>;

pub struct X11MenuBackend {
    conn: Arc<RustConnection>,
    root: Window,
    screen: (u32, u32),
    painter: Painter,
    keys: KeyMap,
    events: EventQueue,
    opacity_atom: u32,
    shutdown: Arc<AtomicBool>,
    foreign: Option<ForeignHook>,
    timeouts: Vec<TimeoutHook>,
}

impl X11MenuBackend {
    pub fn new(
        conn: Arc<RustConnection>,
        screen_num: usize,
        settings: &MenuConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let size = (
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );

        let painter = Painter::new(&conn, root, &settings.font, &settings.colors)?;
        let keys = KeyMap::new(&conn)?;
        let events = EventQueue::new(&conn)?;
        let opacity_atom = conn
            .intern_atom(false, b"_NET_WM_WINDOW_OPACITY")?
            .reply()
            .context("Failed to intern _NET_WM_WINDOW_OPACITY")?
            .atom;

        debug!(
            "Menu backend ready: screen {}x{}, font height {}",
            size.0,
            size.1,
            painter.font_height()
        );

        Ok(Self {
            conn,
            root,
            screen: size,
            painter,
            keys,
            events,
            opacity_atom,
            shutdown,
            foreign: None,
            timeouts: Vec::new(),
        })
    }

    /// Hand events the menu does not use to the application while modal
    pub fn set_foreign_hook(&mut self, hook: ForeignHook) {
        self.foreign = Some(hook);
    }

    pub fn add_timeout_hook(&mut self, hook: TimeoutHook) {
        self.timeouts.push(hook);
    }

    /// Raw event for the application while no menu is open, waiting at
    /// most `timeout`. Shares the menu's queue so nothing read ahead by a
    /// closing menu is lost.
    pub fn next_idle_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        self.events.next(&self.conn, timeout)
    }

    fn translate(&mut self, event: Event) -> MenuEvent {
        match event {
            Event::MotionNotify(e) => MenuEvent::Motion {
                x: i32::from(e.root_x),
                y: i32::from(e.root_y),
            },
            Event::ButtonPress(e) => MenuEvent::ButtonPress {
                x: i32::from(e.root_x),
                y: i32::from(e.root_y),
                button: e.detail,
            },
            Event::ButtonRelease(e) => MenuEvent::ButtonRelease {
                x: i32::from(e.root_x),
                y: i32::from(e.root_y),
                button: e.detail,
            },
            Event::KeyPress(e) => match self.keys.menu_key(e.detail) {
                Some(key) => MenuEvent::Key(key),
                None => {
                    trace!("Ignoring key {} in menu", e.detail);
                    MenuEvent::Foreign
                }
            },
            Event::Expose(e) => {
                let more = e.count > 0
                    || matches!(self.events.peek(), Some(Event::Expose(next)) if next.window == e.window);
                if more {
                    MenuEvent::Foreign
                } else {
                    MenuEvent::Expose { surface: e.window }
                }
            }
            Event::KeyRelease(_) => MenuEvent::Foreign,
            other => {
                if let Some(hook) = self.foreign.as_mut() {
                    hook(&other);
                }
                MenuEvent::Foreign
            }
        }
    }
}

impl MenuBackend for X11MenuBackend {
    type TextRequest<'a> = Cookie<'a, RustConnection, QueryTextExtentsReply>;

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn font_height(&self) -> u16 {
        self.painter.font_height()
    }

    fn request_text_width<'a>(&'a self, text: &str) -> Result<Self::TextRequest<'a>> {
        let chars = draw::char2b(text);
        Ok(self.conn.as_ref().query_text_extents(self.painter.font, &chars)?)
    }

    fn resolve_text_width(&self, request: Self::TextRequest<'_>) -> Result<u16> {
        let reply = request.reply()?;
        Ok(reply.overall_width.clamp(0, i32::from(u16::MAX)) as u16)
    }

    fn create_surface(&mut self, geometry: Geometry) -> Result<SurfaceId> {
        if geometry.width > u32::from(u16::MAX) || geometry.height > u32::from(u16::MAX) {
            warn!(
                "Menu of {}x{} exceeds the X11 window size limit; clipping it",
                geometry.width, geometry.height
            );
        }
        let window = self.conn.generate_id()?;
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                self.root,
                draw::coord(geometry.x),
                draw::coord(geometry.y),
                draw::extent(geometry.width.max(1)),
                draw::extent(geometry.height.max(1)),
                0,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new()
                    .override_redirect(1)
                    .save_under(1)
                    .background_pixel(self.painter.background())
                    .event_mask(EventMask::EXPOSURE),
            )
            .context("Failed to create menu window")?;
        trace!("Created menu window {}", window);
        Ok(window)
    }

    fn set_surface_opacity(&mut self, surface: SurfaceId, opacity: f32) -> Result<()> {
        let value = (f64::from(opacity.clamp(0.0, 1.0)) * f64::from(u32::MAX)) as u32;
        self.conn.change_property32(
            PropMode::REPLACE,
            surface,
            self.opacity_atom,
            AtomEnum::CARDINAL,
            &[value],
        )?;
        Ok(())
    }

    fn show_surface(&mut self, surface: SurfaceId) -> Result<()> {
        self.conn.map_window(surface)?;
        self.conn.configure_window(
            surface,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn move_surface(&mut self, surface: SurfaceId, x: i32, y: i32) -> Result<()> {
        self.conn
            .configure_window(surface, &ConfigureWindowAux::new().x(x).y(y))?;
        Ok(())
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()> {
        self.conn.destroy_window(surface)?;
        self.conn.flush()?;
        trace!("Destroyed menu window {}", surface);
        Ok(())
    }

    fn draw_label(&mut self, surface: SurfaceId, area: Geometry, label: &Label<'_>) -> Result<()> {
        self.painter.draw_label(&self.conn, surface, area, label)
    }

    fn draw_separator(&mut self, surface: SurfaceId, area: Geometry) -> Result<()> {
        self.painter.draw_separator(&self.conn, surface, area)
    }

    fn draw_frame(&mut self, surface: SurfaceId, width: u32, height: u32) -> Result<()> {
        self.painter.draw_frame(&self.conn, surface, width, height)
    }

    fn grab_input(&mut self) -> Result<bool> {
        let pointer = self
            .conn
            .grab_pointer(
                false,
                self.root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                CURRENT_TIME,
            )?
            .reply()
            .context("Failed to grab pointer")?;
        if pointer.status != GrabStatus::SUCCESS {
            debug!("Pointer grab refused: {:?}", pointer.status);
            return Ok(false);
        }

        let keyboard = self
            .conn
            .grab_keyboard(false, self.root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()
            .context("Failed to grab keyboard")?;
        if keyboard.status != GrabStatus::SUCCESS {
            debug!("Keyboard grab refused: {:?}", keyboard.status);
            self.conn.ungrab_pointer(CURRENT_TIME)?;
            self.conn.flush()?;
            return Ok(false);
        }
        Ok(true)
    }

    fn release_input(&mut self) -> Result<()> {
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.conn
            .warp_pointer(NONE, self.root, 0, 0, 0, 0, draw::coord(x), draw::coord(y))?;
        Ok(())
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<MenuEvent>> {
        let event = self.events.next(&self.conn, timeout)?;
        Ok(event.map(|event| self.translate(event)))
    }

    fn run_timeouts(&mut self) {
        for hook in &mut self.timeouts {
            hook();
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
