//! Navigation
//!
//! Cursor stepping, pointer hit-testing and the per-event handlers of the
//! modal loop. Submenus are opened from here; the call stack holds every
//! suspended ancestor while a child runs.

use anyhow::Result;
use tracing::{debug, trace, warn};

use crate::menu::layout::{prepare_runtime, Runtime, MENU_BORDER};
use crate::menu::modal::LevelOutcome;
use crate::menu::{Menu, MenuBackend, MenuCommand, MenuKey, MenuSession};

/// Pixels right of the menu edge the pointer is warped to
const WARP_INSET: i32 = 6;

/// Wheel buttons
const BUTTON_WHEEL_UP: u8 = 4;
const BUTTON_WHEEL_DOWN: u8 = 5;

/// Result of handling one event
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Continue,
    Finish(LevelOutcome),
}

/// What to do after the cursor moved
#[derive(Debug)]
enum Next {
    Stay,
    /// Open the submenu under the cursor
    Open { select_first: bool },
    Finish(LevelOutcome),
}

/// Where a pointer position falls relative to the menu stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Inside this menu; -1 for the label, a separator or the frame
    Item(i16),
    /// Over the parent, level with the item this menu was opened from
    ParentBand,
    /// Over the parent elsewhere, or over any further ancestor
    Ancestor,
    Outside,
}

pub fn first_selectable(menu: &Menu) -> Option<i16> {
    (0..menu.items.len() as i16).find(|&index| menu.is_selectable(index))
}

/// Next selectable item after `current`, wrapping. From -1 this is the
/// first selectable item.
pub fn next_index(menu: &Menu, current: i16) -> i16 {
    let count = menu.items.len() as i16;
    let start = current.max(-1);
    (1..=count)
        .map(|step| (start + step).rem_euclid(count))
        .find(|&index| menu.is_selectable(index))
        .unwrap_or(current)
}

/// Previous selectable item before `current`, wrapping. From -1 this is
/// the last selectable item.
pub fn previous_index(menu: &Menu, current: i16) -> i16 {
    let count = menu.items.len() as i16;
    let start = if current < 0 { count } else { current };
    (1..=count)
        .map(|step| (start - step).rem_euclid(count))
        .find(|&index| menu.is_selectable(index))
        .unwrap_or(current)
}

fn next_without_wrap(menu: &Menu, current: i16) -> Option<i16> {
    (current + 1..menu.items.len() as i16).find(|&index| menu.is_selectable(index))
}

fn previous_without_wrap(menu: &Menu, current: i16) -> Option<i16> {
    (0..current).rev().find(|&index| menu.is_selectable(index))
}

/// Item at root y coordinate `y`, or -1
pub fn index_at(runtime: &Runtime<'_>, y: i32) -> i16 {
    let offset = y - runtime.y - MENU_BORDER;
    if offset < i32::from(runtime.label_height) {
        return -1;
    }
    for (index, top) in runtime.offsets.iter().enumerate() {
        let bottom = top + i32::from(runtime.item_extent(index));
        if offset >= *top && offset < bottom {
            return if runtime.menu.items[index].is_separator() {
                -1
            } else {
                index as i16
            };
        }
    }
    -1
}

/// Hit-test (x, y) against `runtime` and its ancestors.
///
/// `tolerance` widens the parent band above and below the spawning row.
pub fn locate(runtime: &Runtime<'_>, x: i32, y: i32, tolerance: i32) -> PointerTarget {
    if runtime.geometry().contains(x, y) {
        return PointerTarget::Item(index_at(runtime, y));
    }
    let Some(parent) = runtime.parent else {
        return PointerTarget::Outside;
    };

    if parent.geometry().contains(x, y) {
        if parent.menu.is_selectable(parent.current_index) {
            let top = parent.item_top(parent.current_index as usize) - tolerance;
            let bottom = top + i32::from(parent.item_height) + 2 * tolerance;
            if y >= top && y < bottom {
                return PointerTarget::ParentBand;
            }
        }
        return PointerTarget::Ancestor;
    }

    let mut ancestor = parent.parent;
    while let Some(menu) = ancestor {
        if menu.geometry().contains(x, y) {
            return PointerTarget::Ancestor;
        }
        ancestor = menu.parent;
    }
    PointerTarget::Outside
}

/// Whether (x, y) misses every menu in the stack
pub fn outside_all(runtime: &Runtime<'_>, x: i32, y: i32) -> bool {
    let mut level = Some(runtime);
    while let Some(menu) = level {
        if menu.geometry().contains(x, y) {
            return false;
        }
        level = menu.parent;
    }
    true
}

fn opens_submenu(runtime: &Runtime<'_>, index: i16) -> bool {
    runtime.menu.is_selectable(index) && runtime.menu.items[index as usize].command.is_submenu()
}

impl<'a, B: MenuBackend> MenuSession<'a, B> {
    pub(crate) fn on_motion(&mut self, runtime: &mut Runtime<'_>, x: i32, y: i32) -> Result<Step> {
        let next = self.track_motion(runtime, x, y)?;
        self.follow(runtime, next)
    }

    pub(crate) fn on_key(&mut self, runtime: &mut Runtime<'_>, key: MenuKey) -> Result<Step> {
        let next = self.track_key(runtime, key)?;
        self.follow(runtime, next)
    }

    pub(crate) fn on_button_press(
        &mut self,
        runtime: &mut Runtime<'_>,
        x: i32,
        y: i32,
        button: u8,
    ) -> Result<Step> {
        let key = match button {
            BUTTON_WHEEL_UP => MenuKey::Up,
            BUTTON_WHEEL_DOWN => MenuKey::Down,
            _ if outside_all(runtime, x, y) => {
                debug!("Button {} pressed outside the menus; closing", button);
                return Ok(Step::Finish(LevelOutcome::Dismissed));
            }
            _ => return Ok(Step::Continue),
        };

        if runtime.current_index < 0 && runtime.parent.is_some() {
            return Ok(Step::Finish(LevelOutcome::Retarget(key)));
        }
        let index = if key == MenuKey::Up {
            previous_index(runtime.menu, runtime.current_index)
        } else {
            next_index(runtime.menu, runtime.current_index)
        };
        let next = self.step_cursor(runtime, index)?;
        self.follow(runtime, next)
    }

    /// A release selects a leaf item, unless it ends the press that opened
    /// the menu (no motion yet, or within the move threshold).
    pub(crate) fn on_button_release(
        &mut self,
        runtime: &mut Runtime<'_>,
        x: i32,
        y: i32,
        button: u8,
        had_motion: bool,
        start: (i32, i32),
    ) -> Result<Step> {
        if button == BUTTON_WHEEL_UP || button == BUTTON_WHEEL_DOWN || !had_motion {
            return Ok(Step::Continue);
        }
        let threshold = i32::from(self.settings.move_threshold);
        if (x - start.0).abs() <= threshold && (y - start.1).abs() <= threshold {
            trace!("Release within move threshold; ignoring");
            return Ok(Step::Continue);
        }

        let tolerance = i32::from(self.settings.parent_band_tolerance);
        match locate(runtime, x, y, tolerance) {
            PointerTarget::Item(index) if runtime.menu.is_selectable(index) => {
                let command = &runtime.menu.items[index as usize].command;
                if command.is_submenu() {
                    Ok(Step::Continue)
                } else {
                    Ok(Step::Finish(LevelOutcome::Selected(command.clone())))
                }
            }
            _ if outside_all(runtime, x, y) => Ok(Step::Finish(LevelOutcome::Dismissed)),
            _ => Ok(Step::Continue),
        }
    }

    fn track_motion(&mut self, runtime: &mut Runtime<'_>, x: i32, y: i32) -> Result<Next> {
        if let Some(next) = self.scroll(runtime, y)? {
            return Ok(next);
        }

        let tolerance = i32::from(self.settings.parent_band_tolerance);
        match locate(runtime, x, y, tolerance) {
            PointerTarget::Item(index) => {
                let changed = index != runtime.current_index;
                runtime.current_index = index;
                self.update_selection(runtime)?;
                if changed && opens_submenu(runtime, index) {
                    Ok(Next::Open { select_first: false })
                } else {
                    Ok(Next::Stay)
                }
            }
            PointerTarget::ParentBand | PointerTarget::Outside => {
                runtime.current_index = -1;
                self.update_selection(runtime)?;
                Ok(Next::Stay)
            }
            PointerTarget::Ancestor => Ok(Next::Finish(LevelOutcome::Leave { x, y })),
        }
    }

    /// Menus taller than the screen scroll when the pointer reaches the
    /// top or bottom edge.
    fn scroll(&mut self, runtime: &mut Runtime<'_>, y: i32) -> Result<Option<Next>> {
        let (_, screen_height) = self.backend.screen_size();
        let screen_height = screen_height as i32;
        if runtime.height as i32 <= screen_height || runtime.current_index < 0 {
            return Ok(None);
        }

        let half = i32::from(runtime.item_height) / 2;
        let target = if y <= 0 {
            previous_without_wrap(runtime.menu, runtime.current_index)
        } else if y + half >= screen_height {
            next_without_wrap(runtime.menu, runtime.current_index)
        } else {
            None
        };
        match target {
            Some(index) => Ok(Some(self.step_cursor(runtime, index)?)),
            None => Ok(None),
        }
    }

    fn track_key(&mut self, runtime: &mut Runtime<'_>, key: MenuKey) -> Result<Next> {
        let current = runtime.current_index;
        match key {
            MenuKey::Up | MenuKey::Down => {
                if current < 0 && runtime.parent.is_some() {
                    return Ok(Next::Finish(LevelOutcome::Retarget(key)));
                }
                let index = if key == MenuKey::Up {
                    previous_index(runtime.menu, current)
                } else {
                    next_index(runtime.menu, current)
                };
                self.step_cursor(runtime, index)
            }
            MenuKey::Right => {
                if current < 0 {
                    if let Some(first) = first_selectable(runtime.menu) {
                        runtime.current_index = first;
                        self.update_selection(runtime)?;
                    }
                    Ok(Next::Stay)
                } else if opens_submenu(runtime, current) {
                    Ok(Next::Open { select_first: true })
                } else {
                    Ok(Next::Stay)
                }
            }
            MenuKey::Left if runtime.parent.is_some() => Ok(Next::Finish(LevelOutcome::Ascend)),
            MenuKey::Left => Ok(Next::Stay),
            MenuKey::Escape => Ok(Next::Finish(LevelOutcome::Cancelled)),
            MenuKey::Enter => {
                if !runtime.menu.is_selectable(current) {
                    Ok(Next::Stay)
                } else if opens_submenu(runtime, current) {
                    Ok(Next::Open { select_first: true })
                } else {
                    let command = runtime.menu.items[current as usize].command.clone();
                    Ok(Next::Finish(LevelOutcome::Selected(command)))
                }
            }
        }
    }

    /// Move the cursor to `index`, keeping it on screen and under the pointer
    fn step_cursor(&mut self, runtime: &mut Runtime<'_>, index: i16) -> Result<Next> {
        runtime.current_index = index;
        if runtime.menu.is_selectable(index) {
            self.set_position(runtime, index as usize)?;
        }
        self.update_selection(runtime)?;
        if opens_submenu(runtime, index) {
            Ok(Next::Open { select_first: false })
        } else {
            Ok(Next::Stay)
        }
    }

    /// Scroll an oversized menu until item `index` is visible, then warp
    /// the pointer onto it.
    pub(crate) fn set_position(&mut self, runtime: &mut Runtime<'_>, index: usize) -> Result<()> {
        let item_height = i32::from(runtime.item_height);
        let center = runtime.offsets[index] + MENU_BORDER + item_height / 2;
        let (_, screen_height) = self.backend.screen_size();
        let screen_height = screen_height as i32;

        if runtime.height as i32 > screen_height && item_height > 0 {
            let mut y = runtime.y;
            while y + center < item_height / 2 {
                y += item_height;
            }
            while y + center >= screen_height {
                y -= item_height;
            }
            if y != runtime.y {
                runtime.y = y;
                if let Some(surface) = runtime.surface {
                    self.backend.move_surface(surface, runtime.x, y)?;
                }
            }
        }

        let target = (runtime.x + WARP_INSET, runtime.y + center);
        self.backend.warp_pointer(target.0, target.1)?;
        self.pointer = target;
        Ok(())
    }

    fn follow(&mut self, runtime: &mut Runtime<'_>, next: Next) -> Result<Step> {
        match next {
            Next::Stay => Ok(Step::Continue),
            Next::Finish(outcome) => Ok(Step::Finish(outcome)),
            Next::Open { select_first } => self.descend(runtime, select_first),
        }
    }

    /// Run the submenu under the cursor and act on how it ended. A child
    /// that hands control back (pointer left onto this menu, or a key meant
    /// for it) may lead straight into the next submenu.
    fn descend(&mut self, runtime: &mut Runtime<'_>, select_first: bool) -> Result<Step> {
        let mut select_first = select_first;
        loop {
            let outcome = self.open_current(runtime, select_first)?;
            let next = match outcome {
                LevelOutcome::Selected(command) => {
                    return Ok(Step::Finish(LevelOutcome::Selected(command)));
                }
                LevelOutcome::Dismissed => return Ok(Step::Finish(LevelOutcome::Dismissed)),
                LevelOutcome::Cancelled | LevelOutcome::Ascend => {
                    self.paint(runtime)?;
                    return Ok(Step::Continue);
                }
                LevelOutcome::Leave { x, y } => {
                    self.paint(runtime)?;
                    self.pointer = (x, y);
                    self.track_motion(runtime, x, y)?
                }
                LevelOutcome::Retarget(key) => {
                    self.paint(runtime)?;
                    self.track_key(runtime, key)?
                }
            };
            match next {
                Next::Stay => return Ok(Step::Continue),
                Next::Finish(outcome) => return Ok(Step::Finish(outcome)),
                Next::Open { select_first: first } => select_first = first,
            }
        }
    }

    fn open_current(&mut self, runtime: &mut Runtime<'_>, select_first: bool) -> Result<LevelOutcome> {
        if !runtime.menu.is_selectable(runtime.current_index) {
            return Ok(LevelOutcome::Cancelled);
        }
        let index = runtime.current_index as usize;
        let menu = runtime.menu;
        let command = &menu.items[index].command;

        if let MenuCommand::Generated(_) = command {
            let mut generated = command.clone();
            generated.prepare(&self.context);
            let outcome = match generated.menu() {
                Some(submenu) => self.spawn_child(runtime, index, submenu, select_first),
                None => Ok(LevelOutcome::Cancelled),
            };
            generated.cleanup();
            return outcome;
        }
        match command.menu() {
            Some(submenu) => self.spawn_child(runtime, index, submenu, select_first),
            None => Ok(LevelOutcome::Cancelled),
        }
    }

    /// Open `menu` beside item `index` and run it to completion
    fn spawn_child(
        &mut self,
        runtime: &mut Runtime<'_>,
        index: usize,
        menu: &Menu,
        select_first: bool,
    ) -> Result<LevelOutcome> {
        if !menu.is_valid() {
            debug!("Submenu has nothing selectable; not opening it");
            return Ok(LevelOutcome::Cancelled);
        }

        let x = runtime.x + runtime.width as i32;
        let y = runtime.item_top(index) - MENU_BORDER;
        let mut child = match prepare_runtime(&*self.backend, menu) {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to lay out submenu of item {}: {:#}", index, e);
                return Ok(LevelOutcome::Cancelled);
            }
        };
        if select_first {
            child.current_index = first_selectable(menu).unwrap_or(-1);
        }
        child.parent = Some(&*runtime);

        trace!("Opening submenu of item {} at {},{}", index, x, y);
        // A broken submenu closes on its own; the parent stays open.
        match self.execute(&mut child, x, y) {
            Ok(outcome) => {
                trace!("Submenu of item {} closed: {:?}", index, outcome);
                Ok(outcome)
            }
            Err(e) => {
                warn!("Submenu of item {} failed: {:#}", index, e);
                Ok(LevelOutcome::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MenuConfig;
    use crate::menu::testing::{Call, MockBackend};
    use crate::menu::{
        DesktopAction, Generator, GeneratorContext, MenuEvent, MenuItem, MenuResult, OpenMenus,
    };
    use crate::wm::workspace::DesktopState;

    fn exec(text: &str) -> MenuItem {
        MenuItem::new(text, MenuCommand::Exec(text.into()))
    }

    fn key(key: MenuKey) -> Option<MenuEvent> {
        Some(MenuEvent::Key(key))
    }

    fn nested() -> Menu {
        let sub = Menu::new().item(exec("x")).item(exec("y"));
        Menu::new()
            .item(exec("a"))
            .item(MenuItem::new("sub", MenuCommand::submenu(sub)))
            .item(exec("b"))
    }

    fn run_with(
        backend: &mut MockBackend,
        settings: &MenuConfig,
        menu: &Menu,
    ) -> (MenuResult, Option<MenuCommand>) {
        let desktops = DesktopState::new(3);
        let open = OpenMenus::new();
        let mut selected = None;
        let result = MenuSession::new(
            backend,
            settings,
            GeneratorContext {
                desktops: &desktops,
                client: None,
                opener: "xdg-open",
            },
            &open,
        )
        .show_menu(menu, 0, 0, |command| selected = Some(command))
        .unwrap();
        assert_eq!(open.count(), 0);
        (result, selected)
    }

    fn run(backend: &mut MockBackend, menu: &Menu) -> (MenuResult, Option<MenuCommand>) {
        run_with(backend, &MenuConfig::default(), menu)
    }

    #[test]
    fn test_down_from_nothing_skips_separator() {
        let menu = Menu::new().item(MenuItem::separator()).item(exec("A")).item(exec("B"));
        assert_eq!(next_index(&menu, -1), 1);
        assert_eq!(next_index(&menu, 1), 2);
        assert_eq!(next_index(&menu, 2), 1);
        assert_eq!(previous_index(&menu, -1), 2);
        assert_eq!(previous_index(&menu, 1), 2);
        assert_eq!(first_selectable(&menu), Some(1));
    }

    #[test]
    fn test_stepping_without_wrap() {
        let menu = Menu::new().item(exec("A")).item(MenuItem::separator()).item(exec("B"));
        assert_eq!(next_without_wrap(&menu, 0), Some(2));
        assert_eq!(next_without_wrap(&menu, 2), None);
        assert_eq!(previous_without_wrap(&menu, 2), Some(0));
        assert_eq!(previous_without_wrap(&menu, 0), None);
    }

    #[test]
    fn test_index_at_label_items_and_separator() {
        let backend = MockBackend::new(vec![]);
        let menu = Menu::new()
            .with_label("L")
            .item(exec("a"))
            .item(MenuItem::separator())
            .item(exec("b"));
        let mut rt = prepare_runtime(&backend, &menu).unwrap();
        rt.y = 100;
        let top = 100 + MENU_BORDER;
        assert_eq!(index_at(&rt, top + 3), -1);
        assert_eq!(index_at(&rt, top + 14), 0);
        assert_eq!(index_at(&rt, top + 28), -1);
        assert_eq!(index_at(&rt, top + 34), 2);
        assert_eq!(index_at(&rt, top + 48), -1);
    }

    #[test]
    fn test_locate_parent_band_and_ancestors() {
        let backend = MockBackend::new(vec![]);
        let menu = nested();
        let mut root = prepare_runtime(&backend, &menu).unwrap();
        root.current_index = 1;
        let root_right = root.geometry().right();
        let band_top = root.item_top(1);

        let sub = menu.items[1].command.menu().unwrap();
        let mut child = prepare_runtime(&backend, sub).unwrap();
        child.parent = Some(&root);
        child.x = root_right;
        child.y = band_top - MENU_BORDER;

        assert_eq!(locate(&child, root_right + 5, band_top + 3, 0), PointerTarget::Item(0));
        assert_eq!(locate(&child, 10, band_top + 3, 0), PointerTarget::ParentBand);
        assert_eq!(locate(&child, 10, band_top - 1, 0), PointerTarget::Ancestor);
        assert_eq!(locate(&child, 10, band_top - 1, 2), PointerTarget::ParentBand);
        assert_eq!(locate(&child, 900, 700, 0), PointerTarget::Outside);
        assert!(outside_all(&child, 900, 700));
        assert!(!outside_all(&child, 10, 10));
    }

    #[test]
    fn test_escape_unwinds_one_level() {
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Escape),
            key(MenuKey::Up),
            key(MenuKey::Enter),
        ]);
        let (result, selected) = run(&mut backend, &nested());

        assert_eq!(result, MenuResult::Selected);
        assert_eq!(selected, Some(MenuCommand::Exec("a".into())));
        assert_eq!(backend.created_surfaces().len(), 2);
        assert_eq!(backend.count(&Call::Destroy(2)), 1);
        assert_eq!(backend.count(&Call::Grab), 1);
        assert_eq!(backend.count(&Call::Release), 1);
    }

    #[test]
    fn test_child_opens_beside_item() {
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Escape),
            key(MenuKey::Escape),
        ]);
        let (result, _) = run(&mut backend, &nested());
        assert_eq!(result, MenuResult::Cancelled);
        assert!(!backend.exhausted());

        let surfaces = backend.created_surfaces();
        assert_eq!(surfaces[1].x, surfaces[0].right());
        assert_eq!(surfaces[1].y, 14);
    }

    #[test]
    fn test_keys_in_unselected_child_move_parent() {
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Enter),
        ]);
        let (_, selected) = run(&mut backend, &nested());
        assert_eq!(selected, Some(MenuCommand::Exec("b".into())));
        assert_eq!(backend.count(&Call::Destroy(2)), 1);
    }

    #[test]
    fn test_right_enters_child_and_left_returns() {
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Right),
            key(MenuKey::Down),
            key(MenuKey::Enter),
        ]);
        let (_, selected) = run(&mut backend, &nested());
        assert_eq!(selected, Some(MenuCommand::Exec("y".into())));

        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Right),
            key(MenuKey::Left),
            key(MenuKey::Down),
            key(MenuKey::Enter),
        ]);
        let (_, selected) = run(&mut backend, &nested());
        assert_eq!(selected, Some(MenuCommand::Exec("b".into())));
    }

    #[test]
    fn test_enter_on_submenu_selects_its_first_item() {
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Escape),
            key(MenuKey::Enter),
            key(MenuKey::Enter),
        ]);
        let (_, selected) = run(&mut backend, &nested());
        assert_eq!(selected, Some(MenuCommand::Exec("x".into())));
        assert_eq!(backend.created_surfaces().len(), 3);
    }

    #[test]
    fn test_generated_submenu_is_fresh_and_selectable() {
        let menu = Menu::new().item(MenuItem::new(
            "Desktops",
            MenuCommand::generated(Generator::Desktops(DesktopAction::Switch)),
        ));
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Right),
            key(MenuKey::Down),
            key(MenuKey::Enter),
        ]);
        let (_, selected) = run(&mut backend, &menu);
        assert_eq!(selected, Some(MenuCommand::SetDesktop(1)));
        assert!(matches!(&menu.items[0].command, MenuCommand::Generated(g) if !g.is_prepared()));
    }

    #[test]
    fn test_pointer_click_selects() {
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::Motion { x: 10, y: 5 }),
            Some(MenuEvent::ButtonPress { x: 10, y: 5, button: 1 }),
            Some(MenuEvent::ButtonRelease { x: 10, y: 5, button: 1 }),
        ]);
        let (_, selected) = run(&mut backend, &nested());
        assert_eq!(selected, Some(MenuCommand::Exec("a".into())));
    }

    #[test]
    fn test_release_without_motion_is_ignored() {
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::ButtonRelease { x: 10, y: 5, button: 1 }),
            key(MenuKey::Escape),
        ]);
        let (result, selected) = run(&mut backend, &nested());
        assert_eq!(result, MenuResult::Cancelled);
        assert!(selected.is_none());
        assert!(!backend.exhausted());
    }

    #[test]
    fn test_release_within_threshold_is_ignored() {
        let settings = MenuConfig {
            move_threshold: 20,
            ..MenuConfig::default()
        };
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::Motion { x: 10, y: 5 }),
            Some(MenuEvent::ButtonRelease { x: 10, y: 5, button: 1 }),
            key(MenuKey::Escape),
        ]);
        let (result, _) = run_with(&mut backend, &settings, &nested());
        assert_eq!(result, MenuResult::Cancelled);
        assert!(!backend.exhausted());
    }

    #[test]
    fn test_press_outside_dismisses_whole_stack() {
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            Some(MenuEvent::ButtonPress { x: 900, y: 700, button: 1 }),
        ]);
        let (result, _) = run(&mut backend, &nested());
        assert_eq!(result, MenuResult::Cancelled);
        assert!(!backend.exhausted());
        assert_eq!(backend.count(&Call::Destroy(1)), 1);
        assert_eq!(backend.count(&Call::Destroy(2)), 1);
    }

    #[test]
    fn test_hover_opens_submenu_and_leave_returns_to_parent() {
        let menu = Menu::new()
            .item(MenuItem::new("sub1", MenuCommand::submenu(Menu::new().item(exec("x")))))
            .item(exec("a"));
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::Motion { x: 10, y: 5 }),
            Some(MenuEvent::Motion { x: 10, y: 19 }),
            Some(MenuEvent::ButtonRelease { x: 10, y: 19, button: 1 }),
        ]);
        let (_, selected) = run(&mut backend, &menu);

        assert_eq!(selected, Some(MenuCommand::Exec("a".into())));
        assert_eq!(backend.created_surfaces().len(), 2);
        assert_eq!(backend.count(&Call::Destroy(2)), 1);
    }

    #[test]
    fn test_parent_band_keeps_child_open() {
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::Motion { x: 10, y: 19 }),
            Some(MenuEvent::Motion { x: 12, y: 20 }),
            key(MenuKey::Right),
            key(MenuKey::Enter),
        ]);
        let (_, selected) = run(&mut backend, &nested());
        assert_eq!(selected, Some(MenuCommand::Exec("x".into())));
        assert_eq!(backend.created_surfaces().len(), 2);
    }

    #[test]
    fn test_wheel_moves_cursor_without_selecting() {
        let mut backend = MockBackend::new(vec![
            Some(MenuEvent::ButtonPress { x: 10, y: 5, button: 5 }),
            Some(MenuEvent::ButtonRelease { x: 10, y: 5, button: 5 }),
            Some(MenuEvent::ButtonPress { x: 10, y: 5, button: 4 }),
            key(MenuKey::Enter),
        ]);
        let (_, selected) = run(&mut backend, &nested());
        assert_eq!(selected, Some(MenuCommand::Exec("b".into())));
    }

    #[test]
    fn test_oversized_menu_scrolls_into_view() {
        let mut menu = Menu::new();
        for n in 0..10 {
            menu.push(exec(&format!("item{}", n)));
        }
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Down),
            Some(MenuEvent::Motion { x: 10, y: 49 }),
            key(MenuKey::Escape),
        ])
        .with_screen(400, 50);
        run(&mut backend, &menu);

        assert_eq!(backend.created_surfaces()[0].y, 0);
        assert_eq!(backend.count(&Call::Warp(6, 9)), 1);
        assert_eq!(backend.count(&Call::Move(1, 0, -14)), 1);
        assert_eq!(backend.count(&Call::Move(1, 0, -28)), 1);
        assert_eq!(backend.count(&Call::Warp(6, 37)), 3);
        assert_eq!(backend.selected_texts().last(), Some(&"item4".to_string()));
    }

    #[test]
    fn test_oversized_menu_scrolls_back_at_top_edge() {
        let mut menu = Menu::new();
        for n in 0..10 {
            menu.push(exec(&format!("item{}", n)));
        }
        let top = Some(MenuEvent::Motion { x: 10, y: 0 });
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Down),
            Some(MenuEvent::Motion { x: 10, y: 49 }),
            top.clone(),
            top.clone(),
            top.clone(),
            top,
            key(MenuKey::Escape),
        ])
        .with_screen(400, 50);
        run(&mut backend, &menu);

        assert_eq!(backend.count(&Call::Move(1, 0, -28)), 1);
        assert_eq!(backend.count(&Call::Move(1, 0, -14)), 2);
        assert_eq!(backend.count(&Call::Move(1, 0, 0)), 1);
        let warps: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Warp(..)))
            .collect();
        assert_eq!(warps.last(), Some(&Call::Warp(6, 9)));
        assert_eq!(backend.selected_texts().last(), Some(&"item0".to_string()));
    }

    #[test]
    fn test_failed_submenu_leaves_parent_open() {
        let mut backend = MockBackend::new(vec![
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Down),
            key(MenuKey::Enter),
        ]);
        backend.fail_create = Some(2);
        let (result, selected) = run(&mut backend, &nested());

        assert_eq!(result, MenuResult::Selected);
        assert_eq!(selected, Some(MenuCommand::Exec("b".into())));
        assert_eq!(backend.created_surfaces().len(), 1);
        assert_eq!(backend.count(&Call::Destroy(2)), 0);
        assert_eq!(backend.count(&Call::Destroy(1)), 1);
        assert_eq!(backend.count(&Call::Release), 1);
        assert_eq!(backend.calls().last(), Some(&Call::Release));
    }
}
