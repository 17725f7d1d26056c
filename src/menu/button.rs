//! Pointer-button bindings
//!
//! Maps buttons 1..=16 to commands for the root window and panels. Only
//! bound buttons take storage: the command for a button sits at the index
//! given by the number of bound buttons below it.

use anyhow::Result;
use tracing::{debug, trace, warn};

use crate::menu::{CommandExecutor, MenuBackend, MenuCommand, MenuSession};

/// Highest button index a binding may use
pub const MAX_BUTTON: u8 = 16;

/// Sparse button → command table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuButton {
    bound_buttons: u32,
    commands: Vec<MenuCommand>,
}

fn slot(bound_buttons: u32, bit: u32) -> usize {
    (bound_buttons & ((1u32 << bit) - 1)).count_ones() as usize
}

impl MenuButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound_buttons(&self) -> u32 {
        self.bound_buttons
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Bind `button`, replacing any existing binding.
    ///
    /// Returns `false` (and binds nothing) for buttons outside 1..=16.
    pub fn bind(&mut self, button: u8, command: MenuCommand) -> bool {
        if button == 0 || button > MAX_BUTTON {
            warn!("Ignoring menu binding for button {} (allowed: 1-{})", button, MAX_BUTTON);
            return false;
        }

        let bit = u32::from(button - 1);
        let index = slot(self.bound_buttons, bit);
        if self.bound_buttons & (1 << bit) != 0 {
            self.commands[index] = command;
        } else {
            self.bound_buttons |= 1 << bit;
            self.commands.insert(index, command);
        }
        debug_assert_eq!(self.commands.len(), self.bound_buttons.count_ones() as usize);
        true
    }

    /// Command bound to `button`, if any
    pub fn command(&self, button: u8) -> Option<&MenuCommand> {
        if button == 0 || button > MAX_BUTTON {
            return None;
        }
        let bit = u32::from(button - 1);
        if self.bound_buttons & (1 << bit) == 0 {
            return None;
        }
        self.commands.get(slot(self.bound_buttons, bit))
    }
}

impl<'a, B: MenuBackend> MenuSession<'a, B> {
    /// Run whatever `button` is bound to, using (x, y) as the hot-spot for
    /// any menu the command opens.
    pub fn execute_button(
        &mut self,
        table: &MenuButton,
        button: u8,
        x: i32,
        y: i32,
        executor: &mut dyn CommandExecutor,
    ) -> Result<()> {
        if button > MAX_BUTTON {
            debug!("Button {} is above the binding limit; ignoring", button);
            return Ok(());
        }
        let Some(command) = table.command(button) else {
            trace!("No menu command bound to button {}", button);
            return Ok(());
        };

        let mut command = command.clone();
        command.prepare(&self.context);
        let result = self.execute_command(&command, x, y, executor);
        command.cleanup();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MenuConfig;
    use crate::menu::testing::{Call, MockBackend, Recorder};
    use crate::menu::{
        DesktopAction, Generator, GeneratorContext, Menu, MenuEvent, MenuItem, MenuKey, OpenMenus,
    };
    use crate::wm::workspace::DesktopState;

    #[test]
    fn test_slot_matches_popcount_below_bit() {
        for mask in [0u32, 1, 0b1010, 0b1111_0000_1010_0101, 0xFFFF, 0x8001] {
            let mut table = MenuButton::new();
            for bit in 0..16u32 {
                if mask & (1 << bit) != 0 {
                    assert!(table.bind(bit as u8 + 1, MenuCommand::SetDesktop(bit)));
                }
            }
            assert_eq!(table.bound_buttons(), mask);
            assert_eq!(table.commands.len(), mask.count_ones() as usize);

            for bit in 0..16u32 {
                let command = table.command(bit as u8 + 1);
                if mask & (1 << bit) != 0 {
                    let index = (mask & ((1 << bit) - 1)).count_ones() as usize;
                    assert_eq!(command, Some(&table.commands[index]));
                    assert_eq!(command, Some(&MenuCommand::SetDesktop(bit)));
                } else {
                    assert_eq!(command, None);
                }
            }
        }
    }

    #[test]
    fn test_bind_out_of_order_and_replace() {
        let mut table = MenuButton::new();
        table.bind(3, MenuCommand::Exec("three".into()));
        table.bind(1, MenuCommand::Exec("one".into()));
        table.bind(2, MenuCommand::Exec("two".into()));
        table.bind(1, MenuCommand::Exit);

        assert_eq!(table.command(1), Some(&MenuCommand::Exit));
        assert_eq!(table.command(2), Some(&MenuCommand::Exec("two".into())));
        assert_eq!(table.command(3), Some(&MenuCommand::Exec("three".into())));
        assert_eq!(table.commands.len(), 3);
    }

    #[test]
    fn test_rejects_buttons_out_of_range() {
        let mut table = MenuButton::new();
        assert!(!table.bind(0, MenuCommand::Exit));
        assert!(!table.bind(17, MenuCommand::Exit));
        assert!(table.bind(16, MenuCommand::Exit));
        assert!(!table.is_empty());
        assert_eq!(table.command(17), None);
        assert_eq!(table.command(0), None);
    }

    #[test]
    fn test_execute_button_17_is_noop() {
        let mut backend = MockBackend::new(vec![]);
        let settings = MenuConfig::default();
        let desktops = DesktopState::new(2);
        let open = OpenMenus::new();
        let mut table = MenuButton::new();
        table.bind(16, MenuCommand::Exit);
        let mut recorder = Recorder::default();

        let mut session = MenuSession::new(
            &mut backend,
            &settings,
            GeneratorContext {
                desktops: &desktops,
                client: None,
                opener: "xdg-open",
            },
            &open,
        );
        session.execute_button(&table, 17, 5, 5, &mut recorder).unwrap();
        session.execute_button(&table, 200, 5, 5, &mut recorder).unwrap();
        session.execute_button(&table, 2, 5, 5, &mut recorder).unwrap();

        assert!(recorder.executed.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_execute_button_runs_immediate_command() {
        let mut backend = MockBackend::new(vec![]);
        let settings = MenuConfig::default();
        let desktops = DesktopState::new(2);
        let open = OpenMenus::new();
        let mut table = MenuButton::new();
        table.bind(2, MenuCommand::NextDesktop);
        let mut recorder = Recorder::default();

        let mut session = MenuSession::new(
            &mut backend,
            &settings,
            GeneratorContext {
                desktops: &desktops,
                client: None,
                opener: "xdg-open",
            },
            &open,
        );
        session.execute_button(&table, 2, 0, 0, &mut recorder).unwrap();

        assert_eq!(recorder.executed, vec![MenuCommand::NextDesktop]);
        assert!(!backend.calls().contains(&Call::Grab));
    }

    #[test]
    fn test_execute_button_opens_generated_menu_at_hot_spot() {
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::Key(MenuKey::Down)),
            Some(MenuEvent::Key(MenuKey::Down)),
            Some(MenuEvent::Key(MenuKey::Enter)),
        ]);
        let settings = MenuConfig::default();
        let desktops = DesktopState::new(3);
        let open = OpenMenus::new();
        let mut table = MenuButton::new();
        table.bind(
            3,
            MenuCommand::generated(Generator::Desktops(DesktopAction::Switch)),
        );
        let mut recorder = Recorder::default();

        let mut session = MenuSession::new(
            &mut backend,
            &settings,
            GeneratorContext {
                desktops: &desktops,
                client: None,
                opener: "xdg-open",
            },
            &open,
        );
        session.execute_button(&table, 3, 40, 30, &mut recorder).unwrap();

        assert_eq!(recorder.executed, vec![MenuCommand::SetDesktop(1)]);
        let created = backend.created_surfaces();
        assert_eq!(created.len(), 1);
        assert_eq!((created[0].x, created[0].y), (40, 30));
        // The bound command in the table never holds a generated menu.
        assert!(table.command(3).and_then(MenuCommand::menu).is_none());
    }

    #[test]
    fn test_execute_button_static_submenu() {
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::Key(MenuKey::Up)),
            Some(MenuEvent::Key(MenuKey::Enter)),
        ]);
        let settings = MenuConfig::default();
        let desktops = DesktopState::new(1);
        let open = OpenMenus::new();
        let mut table = MenuButton::new();
        let root = Menu::new()
            .item(MenuItem::new("Terminal", MenuCommand::Exec("xterm".into())))
            .item(MenuItem::new("Exit", MenuCommand::Exit));
        table.bind(1, MenuCommand::submenu(root));
        let mut recorder = Recorder::default();

        let mut session = MenuSession::new(
            &mut backend,
            &settings,
            GeneratorContext {
                desktops: &desktops,
                client: None,
                opener: "xdg-open",
            },
            &open,
        );
        session.execute_button(&table, 1, 0, 0, &mut recorder).unwrap();
        assert_eq!(recorder.executed, vec![MenuCommand::Exit]);
    }
}
