//! Menu layout
//!
//! Turns a [`Menu`] into a [`Runtime`]: item height, text offset, per-item
//! offsets and overall size. Text widths are measured with pipelined
//! requests so laying out a menu costs one round trip, not one per item.

use anyhow::{Context, Result};
use tracing::trace;

use crate::menu::{IconRef, Menu, MenuBackend, SurfaceId};
use crate::shared::Geometry;

/// Width of the raised frame around a menu
pub const MENU_BORDER: i32 = 2;
/// Height reserved for a separator
pub const SEPARATOR_HEIGHT: u16 = 6;
/// Space above and below the text/icon of an item
pub const ITEM_PADDING: u16 = 2;
/// Left margin before icon or text
pub const BASE_TEXT_OFFSET: u16 = 4;
/// Gap between icon and text
pub const ICON_SPACING: u16 = 4;
/// Space after the widest text
pub const INNER_MARGIN: u32 = 15;

/// Live, on-screen instance of a [`Menu`]
#[derive(Debug)]
pub struct Runtime<'a> {
    pub menu: &'a Menu,
    /// Menu this one was opened from
    pub parent: Option<&'a Runtime<'a>>,
    pub surface: Option<SurfaceId>,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub text_offset: u16,
    pub item_height: u16,
    pub label_height: u16,
    /// Top of each item, relative to the content area inside the frame
    pub offsets: Vec<i32>,
    /// Selected item; -1 means nothing selected
    pub current_index: i16,
    /// Item painted as selected last time
    pub last_index: i16,
}

impl<'a> Runtime<'a> {
    /// On-screen rectangle
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.x, self.y, self.width, self.height)
    }

    pub fn item_count(&self) -> usize {
        self.menu.items.len()
    }

    /// Height of one item (separators are shorter)
    pub fn item_extent(&self, index: usize) -> u16 {
        match self.menu.items.get(index) {
            Some(item) if item.is_separator() => SEPARATOR_HEIGHT,
            _ => self.item_height,
        }
    }

    /// Item box relative to the surface
    pub fn item_geometry(&self, index: usize) -> Geometry {
        Geometry::new(
            MENU_BORDER,
            MENU_BORDER + self.offsets[index],
            self.inner_width(),
            u32::from(self.item_extent(index)),
        )
    }

    /// Label box relative to the surface
    pub fn label_geometry(&self) -> Geometry {
        Geometry::new(
            MENU_BORDER,
            MENU_BORDER,
            self.inner_width(),
            u32::from(self.label_height),
        )
    }

    /// Top of an item in root coordinates
    pub fn item_top(&self, index: usize) -> i32 {
        self.y + MENU_BORDER + self.offsets[index]
    }

    fn inner_width(&self) -> u32 {
        self.width.saturating_sub(2 * MENU_BORDER as u32)
    }
}

/// Size an icon is drawn at inside an item of `item_height`.
///
/// Icons keep their natural size unless the item is too short, in which
/// case they are scaled down keeping the aspect ratio.
pub fn icon_size(icon: &IconRef, item_height: u16) -> (u16, u16) {
    let available = item_height.saturating_sub(2 * ITEM_PADDING).max(1);
    if icon.height <= available || icon.height == 0 {
        return (icon.width, icon.height);
    }
    let width = u32::from(icon.width) * u32::from(available) / u32::from(icon.height);
    (width as u16, available)
}

/// Lay out `menu`.
///
/// Every text-width request is issued before any reply is read; replies
/// are then drained in issue order. A menu with nothing selectable lays out
/// as a 1x1 surface, so callers check [`Menu::is_valid`] first.
pub fn prepare_runtime<'a, B: MenuBackend>(backend: &B, menu: &'a Menu) -> Result<Runtime<'a>> {
    let mut runtime = Runtime {
        menu,
        parent: None,
        surface: None,
        x: 0,
        y: 0,
        width: 1,
        height: 1,
        text_offset: BASE_TEXT_OFFSET,
        item_height: 0,
        label_height: 0,
        offsets: vec![0; menu.items.len()],
        current_index: -1,
        last_index: -1,
    };

    if !menu.is_valid() {
        trace!("Menu has no selectable items; degenerate layout");
        return Ok(runtime);
    }

    // Issue every measurement first.
    let label_request = match &menu.label {
        Some(label) => Some(backend.request_text_width(label)?),
        None => None,
    };
    let mut item_requests = Vec::with_capacity(menu.items.len());
    for item in &menu.items {
        let request = match &item.text {
            Some(text) => Some(backend.request_text_width(text)?),
            None => None,
        };
        item_requests.push(request);
    }

    // Item height and text offset from font and icons.
    let mut item_height = if menu.user_item_height > 0 {
        u16::from(menu.user_item_height)
    } else {
        backend.font_height() + 2 * ITEM_PADDING
    };
    if menu.user_item_height == 0 {
        for icon in menu.items.iter().filter_map(|item| item.icon.as_ref()) {
            item_height = item_height.max(icon.height.saturating_add(2 * ITEM_PADDING));
        }
    }
    let mut text_offset = BASE_TEXT_OFFSET;
    for icon in menu.items.iter().filter_map(|item| item.icon.as_ref()) {
        let (icon_width, _) = icon_size(icon, item_height);
        text_offset = text_offset.max(BASE_TEXT_OFFSET.saturating_add(icon_width).saturating_add(ICON_SPACING));
    }

    // Drain replies in issue order.
    let mut width = u32::from(text_offset) + INNER_MARGIN;
    if let Some(request) = label_request {
        let label_width = backend
            .resolve_text_width(request)
            .context("Failed to measure menu label")?;
        width = width.max(u32::from(label_width) + 2 * u32::from(BASE_TEXT_OFFSET));
    }
    for request in item_requests.into_iter().flatten() {
        let text_width = backend
            .resolve_text_width(request)
            .context("Failed to measure menu item")?;
        width = width.max(u32::from(text_offset) + u32::from(text_width) + INNER_MARGIN);
    }
    if menu.items.iter().any(|item| item.command.is_submenu()) {
        width += u32::from(item_height);
    }

    let label_height = if menu.label.is_some() { item_height } else { 0 };
    let mut y = i32::from(label_height);
    for (index, item) in menu.items.iter().enumerate() {
        runtime.offsets[index] = y;
        y += if item.is_separator() {
            i32::from(SEPARATOR_HEIGHT)
        } else {
            i32::from(item_height)
        };
    }

    runtime.item_height = item_height;
    runtime.label_height = label_height;
    runtime.text_offset = text_offset;
    runtime.width = width + 2 * MENU_BORDER as u32;
    runtime.height = y as u32 + 2 * MENU_BORDER as u32;

    trace!(
        "Menu layout: {}x{}, item height {}, text offset {}",
        runtime.width,
        runtime.height,
        item_height,
        text_offset
    );
    Ok(runtime)
}
