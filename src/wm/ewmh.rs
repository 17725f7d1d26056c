//! EWMH (Extended Window Manager Hints) client side
//!
//! Reads desktop and window state published by the running window manager
//! and sends it the client messages that menu commands translate to.

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ClientMessageEvent, *};

use crate::wm::client::ClientSnapshot;
use crate::wm::client_flags::ClientState;
use crate::wm::workspace::DesktopState;

/// _NET_WM_STATE action values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove = 0,
    Add = 1,
    Toggle = 2,
}

/// Source indication for client messages: pager/taskbar style tool
pub const SOURCE_PAGER: u32 = 2;

/// Holds all interned EWMH atoms
#[derive(Debug)]
pub struct Atoms {
    pub net_number_of_desktops: Atom,
    pub net_current_desktop: Atom,
    pub net_desktop_names: Atom,
    pub net_active_window: Atom,
    pub net_close_window: Atom,
    pub net_wm_moveresize: Atom,
    pub net_wm_name: Atom,
    pub net_wm_desktop: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_shaded: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub wm_change_state: Atom,
    pub utf8_string: Atom,
    pub gtk_show_window_menu: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        // Send every InternAtom request before waiting on any reply
        let names: [&[u8]; 20] = [
            b"_NET_NUMBER_OF_DESKTOPS",
            b"_NET_CURRENT_DESKTOP",
            b"_NET_DESKTOP_NAMES",
            b"_NET_ACTIVE_WINDOW",
            b"_NET_CLOSE_WINDOW",
            b"_NET_WM_MOVERESIZE",
            b"_NET_WM_NAME",
            b"_NET_WM_DESKTOP",
            b"_NET_WM_STATE",
            b"_NET_WM_STATE_STICKY",
            b"_NET_WM_STATE_MAXIMIZED_VERT",
            b"_NET_WM_STATE_MAXIMIZED_HORZ",
            b"_NET_WM_STATE_SHADED",
            b"_NET_WM_STATE_HIDDEN",
            b"_NET_WM_STATE_ABOVE",
            b"_NET_WM_STATE_BELOW",
            b"_NET_WM_STATE_FULLSCREEN",
            b"WM_CHANGE_STATE",
            b"UTF8_STRING",
            b"GTK_SHOW_WINDOW_MENU",
        ];
        let cookies = names
            .iter()
            .map(|name| conn.intern_atom(false, name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut atoms = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            atoms.push(cookie.reply()?.atom);
        }

        Ok(Self {
            net_number_of_desktops: atoms[0],
            net_current_desktop: atoms[1],
            net_desktop_names: atoms[2],
            net_active_window: atoms[3],
            net_close_window: atoms[4],
            net_wm_moveresize: atoms[5],
            net_wm_name: atoms[6],
            net_wm_desktop: atoms[7],
            net_wm_state: atoms[8],
            net_wm_state_sticky: atoms[9],
            net_wm_state_maximized_vert: atoms[10],
            net_wm_state_maximized_horz: atoms[11],
            net_wm_state_shaded: atoms[12],
            net_wm_state_hidden: atoms[13],
            net_wm_state_above: atoms[14],
            net_wm_state_below: atoms[15],
            net_wm_state_fullscreen: atoms[16],
            wm_change_state: atoms[17],
            utf8_string: atoms[18],
            gtk_show_window_menu: atoms[19],
        })
    }

    /// Whether a root PropertyNotify changes the desktop list
    pub fn is_desktop_property(&self, atom: Atom) -> bool {
        atom == self.net_number_of_desktops
            || atom == self.net_current_desktop
            || atom == self.net_desktop_names
    }

    /// Map _NET_WM_STATE atoms to client state flags
    pub fn client_state(&self, states: &[Atom]) -> ClientState {
        let mut state = ClientState::empty();
        for &atom in states {
            let flag = if atom == self.net_wm_state_sticky {
                ClientState::STICKY
            } else if atom == self.net_wm_state_maximized_vert {
                ClientState::MAXIMIZED_VERT
            } else if atom == self.net_wm_state_maximized_horz {
                ClientState::MAXIMIZED_HORZ
            } else if atom == self.net_wm_state_shaded {
                ClientState::SHADED
            } else if atom == self.net_wm_state_hidden {
                ClientState::HIDDEN
            } else if atom == self.net_wm_state_above {
                ClientState::ABOVE
            } else if atom == self.net_wm_state_below {
                ClientState::BELOW
            } else if atom == self.net_wm_state_fullscreen {
                ClientState::FULLSCREEN
            } else {
                continue;
            };
            state |= flag;
        }
        state
    }

    fn cardinal<C: Connection>(&self, conn: &C, window: Window, property: Atom) -> Result<Option<u32>> {
        let reply = conn
            .get_property(false, window, property, AtomEnum::CARDINAL, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut values| values.next()))
    }

    /// Desktop count, current desktop and names from the root window.
    ///
    /// Missing names come from `fallback`, then "Desktop N".
    pub fn read_desktops<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        fallback: &[String],
    ) -> Result<DesktopState> {
        let count = self
            .cardinal(conn, root, self.net_number_of_desktops)?
            .unwrap_or(fallback.len() as u32);
        let current = self.cardinal(conn, root, self.net_current_desktop)?.unwrap_or(0);

        let reply = conn
            .get_property(false, root, self.net_desktop_names, self.utf8_string, 0, 4096)?
            .reply()?;
        let mut names = parse_names(&reply.value);
        for (index, name) in fallback.iter().enumerate() {
            if names.len() == index {
                names.push(name.clone());
            }
        }

        let mut desktops = DesktopState::with_names(names);
        desktops.resize(count);
        desktops.current = current.min(count.saturating_sub(1));
        debug!("Desktops: {} (current {})", desktops.count(), desktops.current);
        Ok(desktops)
    }

    /// Title, desktop and state of a client window
    pub fn read_client<C: Connection>(&self, conn: &C, window: Window) -> Result<ClientSnapshot> {
        let title = conn
            .get_property(false, window, self.net_wm_name, self.utf8_string, 0, 1024)?
            .reply()?;
        let states = conn
            .get_property(false, window, self.net_wm_state, AtomEnum::ATOM, 0, 1024)?
            .reply()?;

        let mut client = ClientSnapshot::new(window);
        client.title = String::from_utf8_lossy(&title.value).into_owned();
        client.desktop = self.cardinal(conn, window, self.net_wm_desktop)?.unwrap_or(0);
        if let Some(values) = states.value32() {
            let atoms: Vec<Atom> = values.collect();
            client.state = self.client_state(&atoms);
        }
        Ok(client)
    }

    /// Send a client message to the window manager through the root window
    pub fn send_message<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        window: Window,
        message_type: Atom,
        data: [u32; 5],
    ) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, message_type, data);
        conn.send_event(
            false,
            root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        Ok(())
    }
}

/// Split a NUL-separated UTF-8 name list
pub fn parse_names(bytes: &[u8]) -> Vec<String> {
    let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes
        .split(|&byte| byte == 0)
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

#[cfg(test)]
pub(crate) fn test_atoms() -> Atoms {
    Atoms {
        net_number_of_desktops: 100,
        net_current_desktop: 101,
        net_desktop_names: 102,
        net_active_window: 103,
        net_close_window: 104,
        net_wm_moveresize: 105,
        net_wm_name: 106,
        net_wm_desktop: 107,
        net_wm_state: 108,
        net_wm_state_sticky: 109,
        net_wm_state_maximized_vert: 110,
        net_wm_state_maximized_horz: 111,
        net_wm_state_shaded: 112,
        net_wm_state_hidden: 113,
        net_wm_state_above: 114,
        net_wm_state_below: 115,
        net_wm_state_fullscreen: 116,
        wm_change_state: 117,
        utf8_string: 118,
        gtk_show_window_menu: 119,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_names(b"one\0two\0"), vec!["one", "two"]);
        assert_eq!(parse_names(b"one\0two"), vec!["one", "two"]);
        assert_eq!(parse_names(b"a\0\0c\0"), vec!["a", "", "c"]);
        assert!(parse_names(b"").is_empty());
    }

    #[test]
    fn test_client_state_from_atoms() {
        let atoms = test_atoms();
        let state = atoms.client_state(&[
            atoms.net_wm_state_sticky,
            atoms.net_wm_state_below,
            atoms.net_wm_state_maximized_vert,
            atoms.net_wm_state_maximized_horz,
            9999,
        ]);
        assert_eq!(
            state,
            ClientState::STICKY | ClientState::BELOW | ClientState::maximized()
        );
        assert!(atoms.client_state(&[]).is_empty());
        assert!(atoms.is_desktop_property(atoms.net_desktop_names));
        assert!(!atoms.is_desktop_property(atoms.net_wm_state));
    }
}
