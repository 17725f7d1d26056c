//! Configuration for the Area menu daemon
//!
//! Loads configuration from TOML file at `~/.config/area/menu.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::menu::{
    DesktopAction, Generator, IconRef, Menu, MenuButton, MenuCommand, MenuItem,
};
use crate::wm::client_flags::WindowLayer;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program used to open files from directory menus
    pub opener: String,
    pub menu: MenuConfig,
    pub desktops: DesktopsConfig,
    pub root_menus: Vec<RootMenuConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opener: "xdg-open".to_string(),
            menu: MenuConfig::default(),
            desktops: DesktopsConfig::default(),
            root_menus: vec![RootMenuConfig::default()],
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("menu.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    /// Button table for the root window, one static menu per entry
    pub fn root_buttons(&self) -> MenuButton {
        let mut table = MenuButton::new();
        for root in &self.root_menus {
            let mut menu = root.to_menu();
            if menu.user_item_height == 0 {
                menu.user_item_height = self.menu.item_height;
            }
            if !menu.is_valid() {
                warn!("Root menu for buttons {:?} has nothing selectable; skipping", root.buttons);
                continue;
            }
            for &button in &root.buttons {
                if table.bind(button, MenuCommand::submenu(menu.clone())) {
                    debug!("Root menu bound to button {}", button);
                }
            }
        }
        table
    }
}

/// Menu appearance and behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Core X font name
    pub font: String,
    /// Surface opacity 0.0-1.0, unset for opaque
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    /// Item height in pixels; 0 derives it from the font and icons
    pub item_height: u8,
    /// Pointer travel (pixels) before a release counts as a click
    pub move_threshold: u16,
    /// Extra pixels around the spawning row that keep a submenu open
    pub parent_band_tolerance: u16,
    /// Modal loop wake-up interval
    pub poll_interval_ms: u64,
    pub colors: MenuColors,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            font: "fixed".to_string(),
            opacity: None,
            item_height: 0,
            move_threshold: 2,
            parent_band_tolerance: 0,
            poll_interval_ms: 50,
            colors: MenuColors::default(),
        }
    }
}

/// Menu colors (hex: 0xRRGGBB)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuColors {
    pub foreground: u32,
    pub background: u32,
    pub active_foreground: u32,
    pub active_background: u32,
    pub label_foreground: u32,
    pub label_background: u32,
    /// Light edge of the raised frame
    pub highlight: u32,
    /// Dark edge of the raised frame
    pub shadow: u32,
}

impl Default for MenuColors {
    fn default() -> Self {
        // Nord
        Self {
            foreground: 0xd8dee9,
            background: 0x3b4252,
            active_foreground: 0xeceff4,
            active_background: 0x5e81ac,
            label_foreground: 0x88c0d0,
            label_background: 0x2e3440,
            highlight: 0x4c566a,
            shadow: 0x242933,
        }
    }
}

/// Fallback desktop names, used when the window manager publishes none
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopsConfig {
    pub names: Vec<String>,
}

impl Default for DesktopsConfig {
    fn default() -> Self {
        Self {
            names: (1..=4).map(|n| format!("Desktop {}", n)).collect(),
        }
    }
}

/// Menu opened by clicking the root window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootMenuConfig {
    pub buttons: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_height: Option<u8>,
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

impl Default for RootMenuConfig {
    fn default() -> Self {
        Self {
            buttons: vec![1, 3],
            label: Some("Area".to_string()),
            item_height: None,
            items: vec![
                ItemConfig::action("Terminal", ActionConfig::Exec("xterm".to_string())),
                ItemConfig::action("Files", ActionConfig::Directory("~".to_string())),
                ItemConfig::separator(),
                ItemConfig::action("Desktops", ActionConfig::Desktops),
                ItemConfig::separator(),
                ItemConfig::action("Restart", ActionConfig::Restart),
                ItemConfig::action("Exit", ActionConfig::Exit),
            ],
        }
    }
}

impl RootMenuConfig {
    pub fn to_menu(&self) -> Menu {
        let mut menu = build_menu(self.label.as_deref(), &self.items);
        if let Some(height) = self.item_height {
            menu = menu.with_item_height(height);
        }
        menu
    }
}

/// Icon reference as written in the config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconConfig {
    pub name: String,
    pub width: u16,
    pub height: u16,
}

/// One menu entry.
///
/// `items` makes it a submenu, `action` a command; neither text nor icon
/// makes it a separator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Label of the submenu, when `items` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemConfig>>,
}

impl ItemConfig {
    fn action(text: &str, action: ActionConfig) -> Self {
        Self {
            text: Some(text.to_string()),
            action: Some(action),
            ..Self::default()
        }
    }

    fn separator() -> Self {
        Self::default()
    }

    pub fn to_item(&self) -> MenuItem {
        let command = match (&self.items, &self.action) {
            (Some(items), action) => {
                if action.is_some() {
                    warn!("Menu item {:?} has both items and an action; using items", self.text);
                }
                MenuCommand::submenu(build_menu(self.label.as_deref(), items))
            }
            (None, Some(action)) => action.to_command(),
            (None, None) => MenuCommand::None,
        };

        let mut item = match &self.text {
            Some(text) => MenuItem::new(text.clone(), command),
            None => MenuItem {
                command,
                ..MenuItem::separator()
            },
        };
        if let Some(icon) = &self.icon {
            item = item.with_icon(IconRef::new(icon.name.clone(), icon.width, icon.height));
        }
        item
    }
}

fn build_menu(label: Option<&str>, items: &[ItemConfig]) -> Menu {
    let mut menu = Menu::new();
    if let Some(label) = label {
        menu = menu.with_label(label);
    }
    for item in items {
        menu.push(item.to_item());
    }
    menu
}

/// Action of a menu item.
///
/// Written as a bare string (`"exit"`) or a one-key table
/// (`{ exec = "xterm" }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionConfig {
    Exec(String),
    Exit,
    Restart,
    /// Switch to a desktop (0-based)
    Desktop(u32),
    NextDesktop,
    PreviousDesktop,
    /// Generated list of desktops to switch to
    Desktops,
    /// Generated list of desktops to send the client to
    SendTo,
    /// Generated layer list
    Layers,
    Layer(WindowLayer),
    /// Generated listing of a directory; `~` is expanded
    Directory(String),
    Stick,
    Maximize,
    MaximizeHorizontal,
    MaximizeVertical,
    Minimize,
    Restore,
    Shade,
    Move,
    Resize,
    Raise,
    Lower,
    Close,
    Kill,
    ShowPanel,
    HidePanel,
}

impl ActionConfig {
    pub fn to_command(&self) -> MenuCommand {
        match self {
            ActionConfig::Exec(command) => MenuCommand::Exec(command.clone()),
            ActionConfig::Exit => MenuCommand::Exit,
            ActionConfig::Restart => MenuCommand::Restart,
            ActionConfig::Desktop(desktop) => MenuCommand::SetDesktop(*desktop),
            ActionConfig::NextDesktop => MenuCommand::NextDesktop,
            ActionConfig::PreviousDesktop => MenuCommand::PreviousDesktop,
            ActionConfig::Desktops => {
                MenuCommand::generated(Generator::Desktops(DesktopAction::Switch))
            }
            ActionConfig::SendTo => MenuCommand::generated(Generator::Desktops(DesktopAction::Send)),
            ActionConfig::Layers => MenuCommand::generated(Generator::Layers),
            ActionConfig::Layer(layer) => MenuCommand::SetLayer(*layer),
            ActionConfig::Directory(path) => {
                MenuCommand::generated(Generator::Directory(expand_home(path)))
            }
            ActionConfig::Stick => MenuCommand::ToggleSticky,
            ActionConfig::Maximize => MenuCommand::ToggleMaximize,
            ActionConfig::MaximizeHorizontal => MenuCommand::MaximizeHorizontal,
            ActionConfig::MaximizeVertical => MenuCommand::MaximizeVertical,
            ActionConfig::Minimize => MenuCommand::Minimize,
            ActionConfig::Restore => MenuCommand::Restore,
            ActionConfig::Shade => MenuCommand::ToggleShade,
            ActionConfig::Move => MenuCommand::Move,
            ActionConfig::Resize => MenuCommand::Resize,
            ActionConfig::Raise => MenuCommand::Raise,
            ActionConfig::Lower => MenuCommand::Lower,
            ActionConfig::Close => MenuCommand::Close,
            ActionConfig::Kill => MenuCommand::Kill,
            ActionConfig::ShowPanel => MenuCommand::ShowPanel,
            ActionConfig::HidePanel => MenuCommand::HidePanel,
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => {
            warn!("No home directory; using {:?} literally", path);
            PathBuf::from(path)
        }
    }
}
