//! Menu commands
//!
//! What an item does when chosen. Most commands are handed straight to a
//! [`CommandExecutor`]; submenu commands either own a static [`Menu`] or
//! carry a [`Generator`] that builds a fresh one each time it is shown.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::menu::{generate, Menu, MenuBackend, MenuSession};
use crate::wm::client::ClientSnapshot;
use crate::wm::client_flags::WindowLayer;
use crate::wm::workspace::DesktopState;

/// What a generated desktop list does with the chosen desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesktopAction {
    /// Switch to it
    Switch,
    /// Send the client there
    Send,
}

/// Source of a generated submenu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generator {
    Desktops(DesktopAction),
    Layers,
    Directory(PathBuf),
}

/// Current state generators read from
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub desktops: &'a DesktopState,
    /// Client a window menu was opened for
    pub client: Option<&'a ClientSnapshot>,
    /// Program used to open files from directory menus
    pub opener: &'a str,
}

/// Generator plus the menu it produced for the current display cycle.
///
/// The slot is only written by [`MenuCommand::prepare`] and
/// [`MenuCommand::cleanup`]; clones always start empty.
#[derive(Debug)]
pub struct GeneratedMenu {
    generator: Generator,
    menu: Option<Box<Menu>>,
}

impl GeneratedMenu {
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn is_prepared(&self) -> bool {
        self.menu.is_some()
    }
}

impl Clone for GeneratedMenu {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            menu: None,
        }
    }
}

impl PartialEq for GeneratedMenu {
    fn eq(&self, other: &Self) -> bool {
        self.generator == other.generator
    }
}

/// Action bound to a menu item or pointer button
#[derive(Debug, Clone, PartialEq)]
pub enum MenuCommand {
    None,
    Exec(String),
    Exit,
    Restart,
    SetDesktop(u32),
    NextDesktop,
    PreviousDesktop,
    SendToDesktop(u32),
    SetLayer(WindowLayer),
    ToggleSticky,
    ToggleMaximize,
    MaximizeHorizontal,
    MaximizeVertical,
    Minimize,
    Restore,
    ToggleShade,
    Move,
    Resize,
    Raise,
    Lower,
    Close,
    Kill,
    ShowPanel,
    HidePanel,
    Submenu(Box<Menu>),
    Generated(GeneratedMenu),
}

impl MenuCommand {
    pub fn generated(generator: Generator) -> Self {
        MenuCommand::Generated(GeneratedMenu {
            generator,
            menu: None,
        })
    }

    pub fn submenu(menu: Menu) -> Self {
        MenuCommand::Submenu(Box::new(menu))
    }

    /// Whether choosing this item opens a menu instead of running something
    pub fn is_submenu(&self) -> bool {
        matches!(self, MenuCommand::Submenu(_) | MenuCommand::Generated(_))
    }

    /// Menu to show for this command. Generated commands return `None`
    /// until prepared.
    pub fn menu(&self) -> Option<&Menu> {
        match self {
            MenuCommand::Submenu(menu) => Some(menu.as_ref()),
            MenuCommand::Generated(generated) => generated.menu.as_deref(),
            _ => None,
        }
    }

    /// Build the generated menu for this display cycle. Any menu left from
    /// an earlier cycle is replaced, never reused.
    pub fn prepare(&mut self, context: &GeneratorContext<'_>) {
        if let MenuCommand::Generated(generated) = self {
            if generated.menu.is_some() {
                warn!("Generated menu prepared twice without cleanup; rebuilding");
            }
            let menu = match &generated.generator {
                Generator::Desktops(action) => generate::desktop_menu(context, *action),
                Generator::Layers => generate::layer_menu(context),
                Generator::Directory(path) => generate::directory_menu(path, context.opener),
            };
            debug!("Generated {:?} menu with {} items", generated.generator, menu.items.len());
            generated.menu = Some(Box::new(menu));
        }
    }

    /// Drop the generated menu
    pub fn cleanup(&mut self) {
        if let MenuCommand::Generated(generated) = self {
            generated.menu = None;
        }
    }
}

/// Carries out commands the menu engine itself does not handle
pub trait CommandExecutor {
    fn execute(&mut self, command: &MenuCommand) -> Result<()>;
}

impl<'a, B: MenuBackend> MenuSession<'a, B> {
    /// Run a command, opening its menu at (x, y) if it has one.
    ///
    /// Generated commands must already be prepared.
    pub fn execute_command(
        &mut self,
        command: &MenuCommand,
        x: i32,
        y: i32,
        executor: &mut dyn CommandExecutor,
    ) -> Result<()> {
        match command {
            MenuCommand::Submenu(_) | MenuCommand::Generated(_) => {
                let Some(menu) = command.menu() else {
                    debug_assert!(false, "generated command executed without prepare()");
                    warn!("Generated menu executed without prepare(); ignoring");
                    return Ok(());
                };
                let mut result = Ok(());
                self.show_menu(menu, x, y, |selected| {
                    result = executor.execute(&selected);
                })?;
                result
            }
            MenuCommand::None => Ok(()),
            _ => executor.execute(command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client_flags::ClientState;

    fn context<'a>(desktops: &'a DesktopState, client: Option<&'a ClientSnapshot>) -> GeneratorContext<'a> {
        GeneratorContext {
            desktops,
            client,
            opener: "xdg-open",
        }
    }

    #[test]
    fn test_prepare_cleanup_twice_leaves_slot_empty() {
        let desktops = DesktopState::new(3);
        let ctx = context(&desktops, None);
        let mut command = MenuCommand::generated(Generator::Desktops(DesktopAction::Switch));

        for _ in 0..2 {
            command.prepare(&ctx);
            assert_eq!(command.menu().map(|m| m.items.len()), Some(3));
            command.cleanup();
            assert!(command.menu().is_none());
        }
    }

    #[test]
    fn test_prepare_reflects_current_state() {
        let mut desktops = DesktopState::new(2);
        let mut command = MenuCommand::generated(Generator::Desktops(DesktopAction::Switch));

        command.prepare(&context(&desktops, None));
        let first = command.menu().cloned();
        command.cleanup();

        desktops.current = 1;
        command.prepare(&context(&desktops, None));
        assert_ne!(command.menu().cloned(), first);
        command.cleanup();
    }

    #[test]
    fn test_clone_never_carries_generated_menu() {
        let desktops = DesktopState::new(2);
        let mut command = MenuCommand::generated(Generator::Layers);
        let client = ClientSnapshot {
            state: ClientState::ABOVE,
            ..ClientSnapshot::new(7)
        };
        command.prepare(&context(&desktops, Some(&client)));
        let copy = command.clone();
        assert!(copy.menu().is_none());
        assert!(command.menu().is_some());
        command.cleanup();
    }

    #[test]
    fn test_prepare_ignores_immediate_and_static() {
        let desktops = DesktopState::new(1);
        let ctx = context(&desktops, None);

        let mut exec = MenuCommand::Exec("xterm".into());
        exec.prepare(&ctx);
        exec.cleanup();
        assert_eq!(exec, MenuCommand::Exec("xterm".into()));

        let inner = Menu::new().item(crate::menu::MenuItem::new("Exit", MenuCommand::Exit));
        let mut submenu = MenuCommand::submenu(inner.clone());
        submenu.cleanup();
        assert_eq!(submenu.menu(), Some(&inner));
        assert!(submenu.is_submenu());
        assert!(!exec.is_submenu());
    }
}
