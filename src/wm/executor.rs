//! Command execution against the running window manager
//!
//! Menu commands are turned into EWMH client messages (or plain core
//! requests) and sent to the root window. Programs started from menus are
//! tracked so they can be reaped.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::process::{Child, Command};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConfigureWindowAux, ConnectionExt, StackMode, Window};
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;

use crate::menu::{CommandExecutor, MenuCommand};
use crate::wm::client::ClientSnapshot;
use crate::wm::client_flags::WindowLayer;
use crate::wm::ewmh::{Atoms, StateAction, SOURCE_PAGER};
use crate::wm::workspace::DesktopState;

/// WM_CHANGE_STATE value for iconifying
const ICONIC_STATE: u32 = 3;
/// _NET_WM_MOVERESIZE directions
const MOVERESIZE_SIZE_KEYBOARD: u32 = 9;
const MOVERESIZE_MOVE_KEYBOARD: u32 = 10;

/// Programs launched from menus that have not been reaped yet
#[derive(Debug, Clone, Default)]
pub struct Children(Rc<RefCell<Vec<Child>>>);

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, child: Child) {
        self.0.borrow_mut().push(child);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Wait on every child that has exited
    pub fn reap(&self) {
        self.0.borrow_mut().retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Child {} exited: {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Failed to wait on child {}: {}", child.id(), e);
                false
            }
        });
    }
}

/// What the application should do once the current command has run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Running,
    Exit,
    Restart,
}

/// One request a command turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmRequest {
    Spawn(String),
    Message {
        window: Window,
        message_type: Atom,
        data: [u32; 5],
    },
    Restack {
        window: Window,
        raise: bool,
    },
    KillClient(Window),
    Lifecycle(Lifecycle),
    Panel {
        visible: bool,
    },
}

fn state_message(atoms: &Atoms, window: Window, action: StateAction, first: Atom, second: Atom) -> WmRequest {
    WmRequest::Message {
        window,
        message_type: atoms.net_wm_state,
        data: [action as u32, first, second, SOURCE_PAGER, 0],
    }
}

fn switch_desktop(atoms: &Atoms, root: Window, desktops: &DesktopState, desktop: u32) -> Vec<WmRequest> {
    if desktop >= desktops.count() {
        warn!("Desktop {} does not exist ({} desktops)", desktop, desktops.count());
        return Vec::new();
    }
    vec![WmRequest::Message {
        window: root,
        message_type: atoms.net_current_desktop,
        data: [desktop, CURRENT_TIME, 0, 0, 0],
    }]
}

fn layer_requests(atoms: &Atoms, window: Window, layer: WindowLayer) -> Vec<WmRequest> {
    let (above, below) = (atoms.net_wm_state_above, atoms.net_wm_state_below);
    match layer {
        WindowLayer::Above => vec![
            state_message(atoms, window, StateAction::Remove, below, 0),
            state_message(atoms, window, StateAction::Add, above, 0),
        ],
        WindowLayer::Below => vec![
            state_message(atoms, window, StateAction::Remove, above, 0),
            state_message(atoms, window, StateAction::Add, below, 0),
        ],
        WindowLayer::Normal => vec![state_message(atoms, window, StateAction::Remove, above, below)],
    }
}

/// Requests that carry out `command`.
///
/// Client commands need `client`; without one they produce nothing.
pub fn plan(
    atoms: &Atoms,
    root: Window,
    command: &MenuCommand,
    desktops: &DesktopState,
    client: Option<&ClientSnapshot>,
) -> Vec<WmRequest> {
    match command {
        MenuCommand::None | MenuCommand::Submenu(_) | MenuCommand::Generated(_) => Vec::new(),
        MenuCommand::Exec(line) => vec![WmRequest::Spawn(line.clone())],
        MenuCommand::Exit => vec![WmRequest::Lifecycle(Lifecycle::Exit)],
        MenuCommand::Restart => vec![WmRequest::Lifecycle(Lifecycle::Restart)],
        MenuCommand::SetDesktop(desktop) => switch_desktop(atoms, root, desktops, *desktop),
        MenuCommand::NextDesktop => switch_desktop(atoms, root, desktops, desktops.next()),
        MenuCommand::PreviousDesktop => switch_desktop(atoms, root, desktops, desktops.previous()),
        MenuCommand::ShowPanel => vec![WmRequest::Panel { visible: true }],
        MenuCommand::HidePanel => vec![WmRequest::Panel { visible: false }],
        _ => {
            let Some(client) = client else {
                warn!("{:?} needs a client window; none selected", command);
                return Vec::new();
            };
            client_requests(atoms, command, client)
        }
    }
}

fn client_requests(atoms: &Atoms, command: &MenuCommand, client: &ClientSnapshot) -> Vec<WmRequest> {
    let window = client.window;
    let message = |message_type: Atom, data: [u32; 5]| WmRequest::Message {
        window,
        message_type,
        data,
    };
    let toggle = |first: Atom, second: Atom| state_message(atoms, window, StateAction::Toggle, first, second);

    match command {
        MenuCommand::SendToDesktop(desktop) => {
            vec![message(atoms.net_wm_desktop, [*desktop, SOURCE_PAGER, 0, 0, 0])]
        }
        MenuCommand::SetLayer(layer) => layer_requests(atoms, window, *layer),
        MenuCommand::ToggleSticky => vec![toggle(atoms.net_wm_state_sticky, 0)],
        MenuCommand::ToggleMaximize => vec![toggle(
            atoms.net_wm_state_maximized_vert,
            atoms.net_wm_state_maximized_horz,
        )],
        MenuCommand::MaximizeHorizontal => vec![toggle(atoms.net_wm_state_maximized_horz, 0)],
        MenuCommand::MaximizeVertical => vec![toggle(atoms.net_wm_state_maximized_vert, 0)],
        MenuCommand::ToggleShade => vec![toggle(atoms.net_wm_state_shaded, 0)],
        MenuCommand::Minimize => vec![message(atoms.wm_change_state, [ICONIC_STATE, 0, 0, 0, 0])],
        MenuCommand::Restore => {
            let mut requests = Vec::new();
            if client.state.is_maximized() {
                requests.push(state_message(
                    atoms,
                    window,
                    StateAction::Remove,
                    atoms.net_wm_state_maximized_vert,
                    atoms.net_wm_state_maximized_horz,
                ));
            }
            requests.push(message(atoms.net_active_window, [SOURCE_PAGER, CURRENT_TIME, 0, 0, 0]));
            requests
        }
        MenuCommand::Move => vec![message(
            atoms.net_wm_moveresize,
            [0, 0, MOVERESIZE_MOVE_KEYBOARD, 0, SOURCE_PAGER],
        )],
        MenuCommand::Resize => vec![message(
            atoms.net_wm_moveresize,
            [0, 0, MOVERESIZE_SIZE_KEYBOARD, 0, SOURCE_PAGER],
        )],
        MenuCommand::Raise => vec![WmRequest::Restack { window, raise: true }],
        MenuCommand::Lower => vec![WmRequest::Restack { window, raise: false }],
        MenuCommand::Close => vec![message(atoms.net_close_window, [CURRENT_TIME, SOURCE_PAGER, 0, 0, 0])],
        MenuCommand::Kill => vec![WmRequest::KillClient(window)],
        _ => Vec::new(),
    }
}

/// Shared handle to the window manager side of the display
pub struct WmLink {
    pub conn: Arc<RustConnection>,
    pub root: Window,
    pub atoms: Atoms,
    display: Option<String>,
    children: Children,
}

impl WmLink {
    pub fn new(conn: Arc<RustConnection>, root: Window, display: Option<String>) -> Result<Self> {
        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern EWMH atoms")?;
        Ok(Self {
            conn,
            root,
            atoms,
            display,
            children: Children::new(),
        })
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Run a shell command line detached from the menu
    pub fn spawn(&self, line: &str) -> Result<()> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        if let Some(display) = &self.display {
            cmd.env("DISPLAY", display);
        }
        if let Ok(xauth) = std::env::var("XAUTHORITY") {
            cmd.env("XAUTHORITY", xauth);
        }
        let child = cmd.spawn().with_context(|| format!("Failed to launch {:?}", line))?;
        debug!("Launched {:?} as pid {}", line, child.id());
        self.children.push(child);
        trace!("{} launched programs not yet reaped", self.children.len());
        Ok(())
    }

    fn send(&self, request: &WmRequest) -> Result<()> {
        match request {
            WmRequest::Spawn(line) => self.spawn(line)?,
            WmRequest::Message {
                window,
                message_type,
                data,
            } => self
                .atoms
                .send_message(self.conn.as_ref(), self.root, *window, *message_type, *data)?,
            WmRequest::Restack { window, raise } => {
                let mode = if *raise { StackMode::ABOVE } else { StackMode::BELOW };
                self.conn
                    .configure_window(*window, &ConfigureWindowAux::new().stack_mode(mode))?;
            }
            WmRequest::KillClient(window) => {
                self.conn.kill_client(*window)?;
            }
            WmRequest::Panel { visible } => {
                info!("Panel visibility request ({}) has no panel to act on", visible);
            }
            WmRequest::Lifecycle(_) => {}
        }
        Ok(())
    }
}

/// [`CommandExecutor`] for one menu invocation
pub struct X11Executor<'a> {
    link: &'a WmLink,
    desktops: &'a DesktopState,
    client: Option<&'a ClientSnapshot>,
    lifecycle: Lifecycle,
}

impl<'a> X11Executor<'a> {
    pub fn new(link: &'a WmLink, desktops: &'a DesktopState, client: Option<&'a ClientSnapshot>) -> Self {
        Self {
            link,
            desktops,
            client,
            lifecycle: Lifecycle::Running,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl CommandExecutor for X11Executor<'_> {
    fn execute(&mut self, command: &MenuCommand) -> Result<()> {
        let requests = plan(&self.link.atoms, self.link.root, command, self.desktops, self.client);
        debug!("Executing {:?} as {} request(s)", command, requests.len());
        for request in &requests {
            if let WmRequest::Lifecycle(lifecycle) = request {
                self.lifecycle = *lifecycle;
            }
            self.link.send(request)?;
        }
        self.link.conn.flush()?;
        Ok(())
    }
}
