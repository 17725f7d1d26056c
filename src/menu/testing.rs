//! Scripted backend for menu tests

use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use crate::menu::{
    CommandExecutor, Label, LabelStyle, MenuBackend, MenuCommand, MenuEvent, SurfaceId,
};
use crate::shared::Geometry;

/// Backend call, in the order made
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RequestText(String),
    ResolveText(String),
    Create(SurfaceId, Geometry),
    Opacity(SurfaceId),
    Show(SurfaceId),
    Move(SurfaceId, i32, i32),
    Destroy(SurfaceId),
    DrawLabel {
        surface: SurfaceId,
        style: LabelStyle,
        text: Option<String>,
        y: i32,
    },
    DrawSeparator(SurfaceId),
    DrawFrame(SurfaceId),
    Grab,
    Release,
    Warp(i32, i32),
}

pub struct MockBackend {
    pub screen: (u32, u32),
    pub grab_allowed: bool,
    /// Surface whose creation fails
    pub fail_create: Option<SurfaceId>,
    /// `None` entries stand for a poll timeout
    script: VecDeque<Option<MenuEvent>>,
    calls: RefCell<Vec<Call>>,
    next_surface: SurfaceId,
    exhausted: Cell<bool>,
    pub timeouts_run: usize,
}

impl MockBackend {
    pub const CHAR_WIDTH: u16 = 6;
    pub const FONT_HEIGHT: u16 = 10;

    pub fn new(script: Vec<Option<MenuEvent>>) -> Self {
        Self {
            screen: (1024, 768),
            grab_allowed: true,
            fail_create: None,
            script: script.into(),
            calls: RefCell::new(Vec::new()),
            next_surface: 1,
            exhausted: Cell::new(false),
            timeouts_run: 0,
        }
    }

    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = (width, height);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Whether the script ran dry before the menu closed
    pub fn exhausted(&self) -> bool {
        self.exhausted.get()
    }

    pub fn created_surfaces(&self) -> Vec<Geometry> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Create(_, geometry) => Some(*geometry),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.borrow().iter().filter(|call| *call == wanted).count()
    }

    /// Texts painted with the selected style, in order
    pub fn selected_texts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::DrawLabel {
                    style: LabelStyle::MenuActive,
                    text,
                    ..
                } => text.clone(),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl MenuBackend for MockBackend {
    type TextRequest<'a> = String;

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn font_height(&self) -> u16 {
        Self::FONT_HEIGHT
    }

    fn request_text_width<'a>(&'a self, text: &str) -> Result<String> {
        self.record(Call::RequestText(text.to_string()));
        Ok(text.to_string())
    }

    fn resolve_text_width(&self, request: String) -> Result<u16> {
        let width = request.chars().count() as u16 * Self::CHAR_WIDTH;
        self.record(Call::ResolveText(request));
        Ok(width)
    }

    fn create_surface(&mut self, geometry: Geometry) -> Result<SurfaceId> {
        let id = self.next_surface;
        self.next_surface += 1;
        if self.fail_create == Some(id) {
            anyhow::bail!("surface {} could not be created", id);
        }
        self.record(Call::Create(id, geometry));
        Ok(id)
    }

    fn set_surface_opacity(&mut self, surface: SurfaceId, _opacity: f32) -> Result<()> {
        self.record(Call::Opacity(surface));
        Ok(())
    }

    fn show_surface(&mut self, surface: SurfaceId) -> Result<()> {
        self.record(Call::Show(surface));
        Ok(())
    }

    fn move_surface(&mut self, surface: SurfaceId, x: i32, y: i32) -> Result<()> {
        self.record(Call::Move(surface, x, y));
        Ok(())
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<()> {
        self.record(Call::Destroy(surface));
        Ok(())
    }

    fn draw_label(&mut self, surface: SurfaceId, area: Geometry, label: &Label<'_>) -> Result<()> {
        self.record(Call::DrawLabel {
            surface,
            style: label.style,
            text: label.text.map(str::to_string),
            y: area.y,
        });
        Ok(())
    }

    fn draw_separator(&mut self, surface: SurfaceId, _area: Geometry) -> Result<()> {
        self.record(Call::DrawSeparator(surface));
        Ok(())
    }

    fn draw_frame(&mut self, surface: SurfaceId, _width: u32, _height: u32) -> Result<()> {
        self.record(Call::DrawFrame(surface));
        Ok(())
    }

    fn grab_input(&mut self) -> Result<bool> {
        if self.grab_allowed {
            self.record(Call::Grab);
        }
        Ok(self.grab_allowed)
    }

    fn release_input(&mut self) -> Result<()> {
        self.record(Call::Release);
        Ok(())
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.record(Call::Warp(x, y));
        Ok(())
    }

    fn next_event(&mut self, _timeout: Duration) -> Result<Option<MenuEvent>> {
        match self.script.pop_front() {
            Some(event) => Ok(event),
            None => {
                self.exhausted.set(true);
                Ok(None)
            }
        }
    }

    fn run_timeouts(&mut self) {
        self.timeouts_run += 1;
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn shutting_down(&self) -> bool {
        self.exhausted.get()
    }
}

/// Executor that remembers what it was asked to run
#[derive(Debug, Default)]
pub struct Recorder {
    pub executed: Vec<MenuCommand>,
}

impl CommandExecutor for Recorder {
    fn execute(&mut self, command: &MenuCommand) -> Result<()> {
        self.executed.push(command.clone());
        Ok(())
    }
}
