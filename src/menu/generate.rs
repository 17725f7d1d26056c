//! Generated menus
//!
//! Desktop lists, layer lists and directory listings are rebuilt from
//! current state every time they are shown. The window context menu is
//! also assembled here from the client's state.

use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::menu::{DesktopAction, Generator, GeneratorContext, Menu, MenuCommand, MenuItem};
use crate::wm::client::ClientSnapshot;
use crate::wm::client_flags::{ClientState, WindowLayer};

/// Placeholder shown for unreadable or empty directories
pub const EMPTY_DIRECTORY_TEXT: &str = "empty or can't read";

/// Entries listed per directory; the rest are left out so the menu stays
/// within X11's 16-bit window height.
pub const MAX_DIRECTORY_ENTRIES: usize = 1000;

fn mark(text: &str, current: bool) -> String {
    if current {
        format!("[{}]", text)
    } else {
        text.to_string()
    }
}

/// One entry per desktop; the "current" one is bracketed.
///
/// With a client in context, current means the client's desktop, and a
/// sticky client has none. Without a client it is the active desktop.
pub fn desktop_menu(context: &GeneratorContext<'_>, action: DesktopAction) -> Menu {
    let current = match context.client {
        Some(client) => client.current_desktop(),
        None => Some(context.desktops.current),
    };

    let mut menu = Menu::new();
    for desktop in 0..context.desktops.count() {
        let name = context.desktops.name(desktop);
        let command = match action {
            DesktopAction::Switch => MenuCommand::SetDesktop(desktop),
            DesktopAction::Send => MenuCommand::SendToDesktop(desktop),
        };
        menu.push(MenuItem::new(mark(&name, current == Some(desktop)), command));
    }
    menu
}

/// Above / Normal / Below with the client's layer bracketed
pub fn layer_menu(context: &GeneratorContext<'_>) -> Menu {
    let current = context
        .client
        .map(ClientSnapshot::layer)
        .unwrap_or(WindowLayer::Normal);

    let mut menu = Menu::new();
    for layer in WindowLayer::ALL {
        menu.push(MenuItem::new(
            mark(layer.name(), layer == current),
            MenuCommand::SetLayer(layer),
        ));
    }
    menu
}

/// Listing of `path`: subdirectories first (as nested generated menus),
/// then files (opened with `opener`). Hidden entries are skipped.
pub fn directory_menu(path: &Path, opener: &str) -> Menu {
    list_directory(path, opener, MAX_DIRECTORY_ENTRIES)
}

fn list_directory(path: &Path, opener: &str, limit: usize) -> Menu {
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut menu = Menu::new().with_label(label);

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read menu directory {:?}: {}", path, e);
            menu.push(MenuItem::new(EMPTY_DIRECTORY_TEXT, MenuCommand::None));
            return menu;
        }
    };

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            dirs.push((name, entry.path()));
        } else {
            files.push((name, entry.path()));
        }
    }
    dirs.sort();
    files.sort();

    let total = dirs.len() + files.len();
    if total > limit {
        warn!("Menu directory {:?} has {} entries; listing the first {}", path, total, limit);
        dirs.truncate(limit);
        files.truncate(limit - dirs.len());
    }

    for (name, dir) in dirs {
        menu.push(MenuItem::new(name, MenuCommand::generated(Generator::Directory(dir))));
    }
    for (name, file) in files {
        let command = format!("{} {}", opener, shell_quote(&file.to_string_lossy()));
        menu.push(MenuItem::new(name, MenuCommand::Exec(command)));
    }

    if menu.items.is_empty() {
        debug!("Menu directory {:?} is empty", path);
        menu.push(MenuItem::new(EMPTY_DIRECTORY_TEXT, MenuCommand::None));
    }
    menu
}

/// Single-quote for `sh -c`
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Context menu for a client window
pub fn window_menu(client: &ClientSnapshot) -> Menu {
    let state = client.state;
    let mut menu = Menu::new();

    menu.push(MenuItem::new(
        "Send To",
        MenuCommand::generated(Generator::Desktops(DesktopAction::Send)),
    ));
    menu.push(MenuItem::new(
        if client.is_sticky() { "Unstick" } else { "Stick" },
        MenuCommand::ToggleSticky,
    ));

    if state.is_maximized() {
        menu.push(MenuItem::new("Unmaximize", MenuCommand::ToggleMaximize));
    } else {
        menu.push(MenuItem::new("Maximize", MenuCommand::ToggleMaximize));
        menu.push(MenuItem::new("Maximize-y", MenuCommand::MaximizeVertical));
        menu.push(MenuItem::new("Maximize-x", MenuCommand::MaximizeHorizontal));
    }

    if state.contains(ClientState::HIDDEN) {
        menu.push(MenuItem::new("Restore", MenuCommand::Restore));
    } else {
        menu.push(MenuItem::new("Minimize", MenuCommand::Minimize));
    }

    menu.push(MenuItem::new(
        if state.contains(ClientState::SHADED) { "Unshade" } else { "Shade" },
        MenuCommand::ToggleShade,
    ));
    menu.push(MenuItem::new("Layer", MenuCommand::generated(Generator::Layers)));

    menu.push(MenuItem::separator());
    menu.push(MenuItem::new("Move", MenuCommand::Move));
    menu.push(MenuItem::new("Resize", MenuCommand::Resize));
    menu.push(MenuItem::new("Raise", MenuCommand::Raise));
    menu.push(MenuItem::new("Lower", MenuCommand::Lower));

    menu.push(MenuItem::separator());
    menu.push(MenuItem::new("Close", MenuCommand::Close));
    menu.push(MenuItem::new("Kill", MenuCommand::Kill));

    menu
}
