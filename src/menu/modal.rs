//! Modal execution
//!
//! Shows a laid-out [`Runtime`] and runs its private event loop. The
//! outermost menu takes the pointer/keyboard grab once for the whole stack
//! of nested submenus; every level creates and destroys its own surface.

use anyhow::Result;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::menu::layout::{prepare_runtime, Runtime};
use crate::menu::navigate::{first_selectable, Step};
use crate::menu::{
    Label, LabelStyle, Menu, MenuBackend, MenuCommand, MenuError, MenuEvent, MenuResult,
    MenuSession,
};

/// How one level of the menu stack ended
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LevelOutcome {
    /// An item was chosen somewhere in the stack
    Selected(MenuCommand),
    /// This level was closed (Escape); the parent carries on
    Cancelled,
    /// The whole stack is closing without a selection
    Dismissed,
    /// The pointer moved onto an ancestor at (x, y)
    Leave { x: i32, y: i32 },
    /// Keyboard asked to go back to the parent
    Ascend,
    /// Key the parent should handle on its own cursor
    Retarget(crate::menu::MenuKey),
}

/// Pointer and keyboard grab, released when dropped
struct InputGrab<'s, 'a, B: MenuBackend> {
    session: &'s mut MenuSession<'a, B>,
}

impl<'s, 'a, B: MenuBackend> InputGrab<'s, 'a, B> {
    /// `None` if the grab was refused
    fn acquire(session: &'s mut MenuSession<'a, B>) -> Result<Option<Self>> {
        if !session.backend.grab_input()? {
            warn!("Menu grab was not granted; menu not shown");
            return Ok(None);
        }
        trace!("Menu grab acquired");
        Ok(Some(Self { session }))
    }
}

impl<'s, 'a, B: MenuBackend> Deref for InputGrab<'s, 'a, B> {
    type Target = MenuSession<'a, B>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<'s, 'a, B: MenuBackend> DerefMut for InputGrab<'s, 'a, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<'s, 'a, B: MenuBackend> Drop for InputGrab<'s, 'a, B> {
    fn drop(&mut self) {
        if let Err(e) = self.session.backend.release_input() {
            warn!("Failed to release menu grab: {}", e);
        }
        trace!("Menu grab released");
    }
}

impl<'a, B: MenuBackend> MenuSession<'a, B> {
    /// Show `menu` with its top-left corner at (x, y) and run it until the
    /// user chooses an item or backs out.
    ///
    /// On selection the chosen command is passed to `on_selected` after the
    /// grab has been released and every menu surface destroyed. A menu with
    /// nothing selectable is not shown, and neither is one whose grab is
    /// refused; both end as [`MenuResult::Cancelled`].
    pub fn show_menu(
        &mut self,
        menu: &Menu,
        x: i32,
        y: i32,
        on_selected: impl FnOnce(MenuCommand),
    ) -> Result<MenuResult> {
        self.show(menu, x, y, false, on_selected)
    }

    /// Like [`show_menu`](Self::show_menu), with the first item selected
    pub fn show_menu_from_keyboard(
        &mut self,
        menu: &Menu,
        x: i32,
        y: i32,
        on_selected: impl FnOnce(MenuCommand),
    ) -> Result<MenuResult> {
        self.show(menu, x, y, true, on_selected)
    }

    fn show(
        &mut self,
        menu: &Menu,
        x: i32,
        y: i32,
        keyboard: bool,
        on_selected: impl FnOnce(MenuCommand),
    ) -> Result<MenuResult> {
        if !menu.is_valid() {
            debug!("Refusing to show a menu with nothing selectable");
            return Ok(MenuResult::Cancelled);
        }
        if self.backend.shutting_down() {
            return Err(MenuError::ShuttingDown.into());
        }

        self.pointer = (x, y);
        let outcome = if self.open.any() {
            // Already inside a menu: the grab is held by the outermost caller.
            self.run_top(menu, x, y, keyboard)?
        } else {
            let Some(mut grab) = InputGrab::acquire(self)? else {
                return Ok(MenuResult::Cancelled);
            };
            grab.run_top(menu, x, y, keyboard)?
        };

        match outcome {
            LevelOutcome::Selected(command) => {
                info!("Menu selection: {:?}", command);
                on_selected(command);
                Ok(MenuResult::Selected)
            }
            other => {
                debug!("Menu closed without selection ({:?})", other);
                Ok(MenuResult::Cancelled)
            }
        }
    }

    fn run_top(&mut self, menu: &Menu, x: i32, y: i32, keyboard: bool) -> Result<LevelOutcome> {
        let mut runtime = prepare_runtime(&*self.backend, menu)?;
        if keyboard {
            runtime.current_index = first_selectable(menu).unwrap_or(-1);
        }
        self.execute(&mut runtime, x, y)
    }

    /// Place, map and paint `runtime`, then run its loop. The surface is
    /// destroyed before returning, whatever the outcome.
    pub(crate) fn execute(&mut self, runtime: &mut Runtime<'_>, x: i32, y: i32) -> Result<LevelOutcome> {
        let (x, y) = self.place(runtime, x, y);
        runtime.x = x;
        runtime.y = y;

        let surface = self.backend.create_surface(runtime.geometry())?;
        runtime.surface = Some(surface);
        self.open.enter();
        debug!(
            "Menu shown at {},{} ({}x{}), depth {}",
            x,
            y,
            runtime.width,
            runtime.height,
            self.open.count()
        );

        let outcome = self.map_and_run(runtime);

        self.open.leave();
        runtime.surface = None;
        let destroyed = self.backend.destroy_surface(surface);
        let outcome = outcome?;
        destroyed?;
        Ok(outcome)
    }

    /// Keep the menu on screen. A submenu that would run off the right edge
    /// opens on the other side of its parent instead.
    fn place(&self, runtime: &Runtime<'_>, x: i32, y: i32) -> (i32, i32) {
        let (screen_width, screen_height) = self.backend.screen_size();
        let (screen_width, screen_height) = (screen_width as i32, screen_height as i32);
        let (width, height) = (runtime.width as i32, runtime.height as i32);

        let mut x = x;
        let mut y = y;
        if x + width > screen_width {
            x = match runtime.parent {
                Some(parent) => parent.x - width,
                None => screen_width - width,
            };
        }
        if y + height > screen_height {
            y = screen_height - height;
        }
        (x.max(0), y.max(0))
    }

    fn map_and_run(&mut self, runtime: &mut Runtime<'_>) -> Result<LevelOutcome> {
        let Some(surface) = runtime.surface else {
            return Ok(LevelOutcome::Dismissed);
        };
        if let Some(opacity) = self.settings.opacity {
            self.backend.set_surface_opacity(surface, opacity)?;
        }
        self.backend.show_surface(surface)?;
        self.paint(runtime)?;
        self.backend.flush()?;
        self.run_loop(runtime)
    }

    /// The level's private event loop
    fn run_loop(&mut self, runtime: &mut Runtime<'_>) -> Result<LevelOutcome> {
        let interval = Duration::from_millis(self.settings.poll_interval_ms.max(1));
        let start = self.pointer;
        let mut had_motion = false;
        let mut last_tick = Instant::now();

        loop {
            if self.backend.shutting_down() {
                debug!("Shutdown requested while a menu is open");
                return Ok(LevelOutcome::Dismissed);
            }

            let event = self.backend.next_event(interval)?;
            if last_tick.elapsed() >= interval || event.is_none() {
                self.backend.run_timeouts();
                last_tick = Instant::now();
            }
            let Some(event) = event else {
                continue;
            };

            let step = match event {
                MenuEvent::Motion { x, y } => {
                    had_motion = true;
                    self.pointer = (x, y);
                    self.on_motion(runtime, x, y)?
                }
                MenuEvent::ButtonPress { x, y, button } => self.on_button_press(runtime, x, y, button)?,
                MenuEvent::ButtonRelease { x, y, button } => {
                    self.on_button_release(runtime, x, y, button, had_motion, start)?
                }
                MenuEvent::Key(key) => self.on_key(runtime, key)?,
                MenuEvent::Expose { surface } if runtime.surface == Some(surface) => {
                    self.paint(runtime)?;
                    Step::Continue
                }
                MenuEvent::Expose { .. } | MenuEvent::Foreign => Step::Continue,
            };

            if let Step::Finish(outcome) = step {
                return Ok(outcome);
            }
            self.backend.flush()?;
        }
    }

    /// Paint label, every item and the frame
    pub(crate) fn paint(&mut self, runtime: &mut Runtime<'_>) -> Result<()> {
        let Some(surface) = runtime.surface else {
            return Ok(());
        };

        if let Some(text) = runtime.menu.label.as_deref() {
            let label = Label {
                style: LabelStyle::MenuLabel,
                text: Some(text),
                icon: None,
                text_offset: crate::menu::layout::BASE_TEXT_OFFSET,
                submenu_arrow: false,
            };
            self.backend.draw_label(surface, runtime.label_geometry(), &label)?;
        }
        for index in 0..runtime.item_count() {
            self.paint_item(runtime, index, index as i16 == runtime.current_index)?;
        }
        self.backend.draw_frame(surface, runtime.width, runtime.height)?;
        runtime.last_index = runtime.current_index;
        Ok(())
    }

    fn paint_item(&mut self, runtime: &Runtime<'_>, index: usize, selected: bool) -> Result<()> {
        let Some(surface) = runtime.surface else {
            return Ok(());
        };
        let item = &runtime.menu.items[index];
        let area = runtime.item_geometry(index);
        if item.is_separator() {
            return self.backend.draw_separator(surface, area);
        }

        let label = Label {
            style: if selected {
                LabelStyle::MenuActive
            } else {
                LabelStyle::MenuItem
            },
            text: item.text.as_deref(),
            icon: item.icon.as_ref(),
            text_offset: runtime.text_offset,
            submenu_arrow: item.command.is_submenu(),
        };
        self.backend.draw_label(surface, area, &label)
    }

    /// Repaint only the items whose selection state changed
    pub(crate) fn update_selection(&mut self, runtime: &mut Runtime<'_>) -> Result<()> {
        if runtime.last_index == runtime.current_index {
            return Ok(());
        }
        if runtime.last_index >= 0 && (runtime.last_index as usize) < runtime.item_count() {
            self.paint_item(runtime, runtime.last_index as usize, false)?;
        }
        if runtime.current_index >= 0 && (runtime.current_index as usize) < runtime.item_count() {
            self.paint_item(runtime, runtime.current_index as usize, true)?;
        }
        runtime.last_index = runtime.current_index;
        Ok(())
    }
}
