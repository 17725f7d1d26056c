//! Menu painting with core X11 drawing
//!
//! One graphics context per backend; every call sets the colors it needs.
//! Text uses a core font so widths can be measured with pipelined
//! QueryTextExtents requests.

use anyhow::{Context, Result};
use tracing::warn;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ChangeGCAux, Char2b, ConnectionExt, CoordMode, CreateGCAux, Font, Gcontext, Point,
    PolyShape, Rectangle, Segment, Window,
};
use x11rb::rust_connection::RustConnection;

use crate::config::MenuColors;
use crate::menu::layout::SEPARATOR_HEIGHT;
use crate::menu::{Label, LabelStyle};
use crate::shared::Geometry;

/// Font used when the configured one cannot be opened
const FALLBACK_FONT: &str = "fixed";
/// Longest string ImageText8 accepts
const MAX_TEXT8: usize = 255;
/// Half-height of the submenu arrow
const ARROW_SIZE: i16 = 4;

pub struct Painter {
    gc: Gcontext,
    pub font: Font,
    ascent: i16,
    descent: i16,
    colors: MenuColors,
}

impl Painter {
    pub fn new(conn: &RustConnection, root: Window, font_name: &str, colors: &MenuColors) -> Result<Self> {
        let font = open_font(conn, font_name)?;
        let metrics = conn
            .query_font(font)?
            .reply()
            .context("Failed to query menu font")?;

        let gc = conn.generate_id()?;
        conn.create_gc(
            gc,
            root,
            &CreateGCAux::new()
                .font(font)
                .foreground(colors.foreground)
                .background(colors.background)
                .graphics_exposures(0),
        )?;

        Ok(Self {
            gc,
            font,
            ascent: metrics.font_ascent,
            descent: metrics.font_descent,
            colors: colors.clone(),
        })
    }

    pub fn font_height(&self) -> u16 {
        (self.ascent + self.descent).max(1) as u16
    }

    pub fn background(&self) -> u32 {
        self.colors.background
    }

    fn style_colors(&self, style: LabelStyle) -> (u32, u32) {
        match style {
            LabelStyle::MenuLabel => (self.colors.label_foreground, self.colors.label_background),
            LabelStyle::MenuItem => (self.colors.foreground, self.colors.background),
            LabelStyle::MenuActive => (self.colors.active_foreground, self.colors.active_background),
        }
    }

    fn fill(&self, conn: &RustConnection, window: Window, color: u32, rects: &[Rectangle]) -> Result<()> {
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(color))?;
        conn.poly_fill_rectangle(window, self.gc, rects)?;
        Ok(())
    }

    /// Background, text and submenu arrow of one item or the menu label.
    ///
    /// Icons only reserve their space; pixels belong to the icon loader.
    pub fn draw_label(&self, conn: &RustConnection, window: Window, area: Geometry, label: &Label<'_>) -> Result<()> {
        let (foreground, background) = self.style_colors(label.style);
        self.fill(conn, window, background, &[rectangle(area)])?;

        if let Some(text) = label.text {
            conn.change_gc(
                self.gc,
                &ChangeGCAux::new().foreground(foreground).background(background),
            )?;
            let x = area.x + i32::from(label.text_offset);
            let y = text_baseline(area, self.ascent, self.font_height());
            conn.image_text8(window, self.gc, coord(x), coord(y), &latin1(text))?;
        }

        if label.submenu_arrow {
            let tip = coord(area.right() - i32::from(ARROW_SIZE) - 2);
            let middle = coord(area.y + area.height as i32 / 2);
            let points = [
                Point { x: tip - ARROW_SIZE, y: middle - ARROW_SIZE },
                Point { x: tip, y: middle },
                Point { x: tip - ARROW_SIZE, y: middle + ARROW_SIZE },
            ];
            conn.change_gc(self.gc, &ChangeGCAux::new().foreground(foreground))?;
            conn.fill_poly(window, self.gc, PolyShape::CONVEX, CoordMode::ORIGIN, &points)?;
        }
        Ok(())
    }

    /// Etched line across the middle of a separator slot
    pub fn draw_separator(&self, conn: &RustConnection, window: Window, area: Geometry) -> Result<()> {
        self.fill(conn, window, self.colors.background, &[rectangle(area)])?;

        let y = coord(area.y + i32::from(SEPARATOR_HEIGHT) / 2 - 1);
        let x1 = coord(area.x + 2);
        let x2 = coord(area.right() - 3);
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(self.colors.shadow))?;
        conn.poly_segment(window, self.gc, &[Segment { x1, y1: y, x2, y2: y }])?;
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(self.colors.highlight))?;
        conn.poly_segment(window, self.gc, &[Segment { x1, y1: y + 1, x2, y2: y + 1 }])?;
        Ok(())
    }

    /// 2px raised frame around the whole surface
    pub fn draw_frame(&self, conn: &RustConnection, window: Window, width: u32, height: u32) -> Result<()> {
        let (light, dark) = frame_rectangles(extent(width), extent(height));
        self.fill(conn, window, self.colors.highlight, &light)?;
        self.fill(conn, window, self.colors.shadow, &dark)?;
        Ok(())
    }
}

fn open_font(conn: &RustConnection, name: &str) -> Result<Font> {
    let font = conn.generate_id()?;
    if let Err(e) = conn.open_font(font, name.as_bytes())?.check() {
        warn!("Failed to open menu font {:?}: {:?}; falling back to {}", name, e, FALLBACK_FONT);
        conn.open_font(font, FALLBACK_FONT.as_bytes())?
            .check()
            .context("Failed to open fallback menu font")?;
    }
    Ok(font)
}

/// Clamp a root or window coordinate to the protocol's 16-bit range
pub(crate) fn coord(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Clamp a width or height to the protocol's 16-bit range
pub(crate) fn extent(value: u32) -> u16 {
    value.min(u32::from(u16::MAX)) as u16
}

fn rectangle(area: Geometry) -> Rectangle {
    Rectangle {
        x: coord(area.x),
        y: coord(area.y),
        width: extent(area.width),
        height: extent(area.height),
    }
}

/// Light (top, left) and dark (bottom, right) edges of a 2px frame
fn frame_rectangles(width: u16, height: u16) -> ([Rectangle; 2], [Rectangle; 2]) {
    let light = [
        Rectangle { x: 0, y: 0, width, height: 2 },
        Rectangle { x: 0, y: 0, width: 2, height },
    ];
    let dark = [
        Rectangle { x: 0, y: coord(i32::from(height) - 2), width, height: 2 },
        Rectangle { x: coord(i32::from(width) - 2), y: 0, width: 2, height },
    ];
    (light, dark)
}

/// Baseline that centers the font vertically in `area`
fn text_baseline(area: Geometry, ascent: i16, font_height: u16) -> i32 {
    let slack = (area.height as i32 - i32::from(font_height)).max(0);
    area.y + slack / 2 + i32::from(ascent)
}

/// Text for ImageText8: Latin-1, other characters as '?'
pub fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .take(MAX_TEXT8)
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Text for QueryTextExtents, matching what [`latin1`] draws
pub fn char2b(text: &str) -> Vec<Char2b> {
    latin1(text)
        .into_iter()
        .map(|byte| Char2b { byte1: 0, byte2: byte })
        .collect()
}
