//! Menu Module
//!
//! Root menus, window menus and generated submenus. A static [`Menu`] tree is
//! laid out into a [`Runtime`] right before it is shown, then driven by a
//! private modal loop until the user selects an item or backs out.

pub mod backend;
pub mod button;
pub mod command;
pub mod generate;
pub mod layout;
pub mod modal;
pub mod navigate;

#[cfg(test)]
pub(crate) mod testing;

use std::cell::Cell;
use std::rc::Rc;
use thiserror::Error;

use crate::config::MenuConfig;

pub use backend::{Label, LabelStyle, MenuBackend, MenuEvent, MenuKey, SurfaceId};
pub use button::{MenuButton, MAX_BUTTON};
pub use command::{CommandExecutor, DesktopAction, Generator, GeneratorContext, MenuCommand};

/// Failures a caller may want to tell apart from protocol errors
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("menu requested during shutdown")]
    ShuttingDown,
}

/// Terminal state of a shown menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuResult {
    Selected,
    Cancelled,
}

/// Icon reference; pixels are owned by the icon loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRef {
    pub name: String,
    pub width: u16,
    pub height: u16,
}

impl IconRef {
    pub fn new(name: impl Into<String>, width: u16, height: u16) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}

/// Single menu entry. No text and no icon makes it a separator.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub text: Option<String>,
    pub icon: Option<IconRef>,
    pub command: MenuCommand,
}

impl MenuItem {
    pub fn new(text: impl Into<String>, command: MenuCommand) -> Self {
        Self {
            text: Some(text.into()),
            icon: None,
            command,
        }
    }

    pub fn separator() -> Self {
        Self {
            text: None,
            icon: None,
            command: MenuCommand::None,
        }
    }

    pub fn with_icon(mut self, icon: IconRef) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn is_separator(&self) -> bool {
        self.text.is_none() && self.icon.is_none()
    }
}

/// User-authored (or generated) menu
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Menu {
    pub label: Option<String>,
    /// Fixed item height; 0 derives it from the font and icons
    pub user_item_height: u8,
    pub items: Vec<MenuItem>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_item_height(mut self, height: u8) -> Self {
        self.user_item_height = height;
        self
    }

    pub fn push(&mut self, item: MenuItem) {
        self.items.push(item);
    }

    /// Builder-style `push`
    pub fn item(mut self, item: MenuItem) -> Self {
        self.items.push(item);
        self
    }

    /// A menu is worth showing only if something in it can be selected
    pub fn is_valid(&self) -> bool {
        self.items.iter().any(|item| !item.is_separator())
    }

    pub fn is_selectable(&self, index: i16) -> bool {
        index >= 0
            && self
                .items
                .get(index as usize)
                .is_some_and(|item| !item.is_separator())
    }
}

/// Number of menu surfaces currently on screen.
///
/// Cloned handles share the count, so other subsystems (panel autohide)
/// can ask whether a menu is open.
#[derive(Debug, Clone, Default)]
pub struct OpenMenus(Rc<Cell<u32>>);

impl OpenMenus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.0.get()
    }

    pub fn any(&self) -> bool {
        self.0.get() > 0
    }

    pub(crate) fn enter(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub(crate) fn leave(&self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Everything one menu invocation needs, borrowed from the caller
pub struct MenuSession<'a, B: MenuBackend> {
    pub(crate) backend: &'a mut B,
    pub(crate) settings: &'a MenuConfig,
    pub(crate) context: GeneratorContext<'a>,
    pub(crate) open: &'a OpenMenus,
    /// Last known pointer position (root coordinates)
    pub(crate) pointer: (i32, i32),
}

impl<'a, B: MenuBackend> MenuSession<'a, B> {
    pub fn new(
        backend: &'a mut B,
        settings: &'a MenuConfig,
        context: GeneratorContext<'a>,
        open: &'a OpenMenus,
    ) -> Self {
        Self {
            backend,
            settings,
            context,
            open,
            pointer: (0, 0),
        }
    }
}
