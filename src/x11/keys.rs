//! Keyboard mapping for menu navigation

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, Keycode, Keysym};
use x11rb::rust_connection::RustConnection;

use crate::menu::MenuKey;

const XK_RETURN: Keysym = 0xff0d;
const XK_ESCAPE: Keysym = 0xff1b;
const XK_LEFT: Keysym = 0xff51;
const XK_UP: Keysym = 0xff52;
const XK_RIGHT: Keysym = 0xff53;
const XK_DOWN: Keysym = 0xff54;
const XK_KP_ENTER: Keysym = 0xff8d;
const XK_KP_LEFT: Keysym = 0xff96;
const XK_KP_UP: Keysym = 0xff97;
const XK_KP_RIGHT: Keysym = 0xff98;
const XK_KP_DOWN: Keysym = 0xff99;

/// Menu key for a keysym, if it is one the menu reacts to
pub fn menu_key(keysym: Keysym) -> Option<MenuKey> {
    match keysym {
        XK_UP | XK_KP_UP => Some(MenuKey::Up),
        XK_DOWN | XK_KP_DOWN => Some(MenuKey::Down),
        XK_LEFT | XK_KP_LEFT => Some(MenuKey::Left),
        XK_RIGHT | XK_KP_RIGHT => Some(MenuKey::Right),
        XK_ESCAPE => Some(MenuKey::Escape),
        XK_RETURN | XK_KP_ENTER => Some(MenuKey::Enter),
        _ => None,
    }
}

/// Keycode → keysym table fetched once from the server
#[derive(Debug)]
pub struct KeyMap {
    min_keycode: Keycode,
    per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyMap {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;
        let reply = conn
            .get_keyboard_mapping(min_keycode, count)?
            .reply()
            .context("Failed to read keyboard mapping")?;

        Ok(Self {
            min_keycode,
            per_keycode: usize::from(reply.keysyms_per_keycode),
            keysyms: reply.keysyms,
        })
    }

    /// Unshifted keysym of `keycode`
    pub fn keysym(&self, keycode: Keycode) -> Option<Keysym> {
        if keycode < self.min_keycode || self.per_keycode == 0 {
            return None;
        }
        let index = usize::from(keycode - self.min_keycode) * self.per_keycode;
        self.keysyms.get(index).copied()
    }

    pub fn menu_key(&self, keycode: Keycode) -> Option<MenuKey> {
        self.keysym(keycode).and_then(menu_key)
    }
}
