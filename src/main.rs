//! Area menu daemon
//!
//! Root-window and window-context menus for the Area desktop. Listens for
//! root clicks and `GTK_SHOW_WINDOW_MENU` requests and runs the menu engine
//! against the running window manager.

mod config;
mod menu;
mod shared;
mod wm;
mod x11;

use anyhow::{bail, Context, Result};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ChangeWindowAttributesAux, ConnectionExt, EventMask, Window};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use config::Config;
use menu::{
    generate, GeneratorContext, MenuBackend, MenuButton, MenuCommand, MenuError, MenuSession, OpenMenus,
};
use wm::workspace::DesktopState;
use wm::{Lifecycle, WmLink, X11Executor};
use x11::X11MenuBackend;

/// Longest idle wait between shutdown checks and timeout hooks
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    /// Show the root menu bound to this button at the pointer, then exit
    show: Option<u8>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "-s" | "--show" => {
                    let button = args.next().context("--show needs a button number")?;
                    let button = button
                        .parse()
                        .with_context(|| format!("Invalid button number {:?}", button))?;
                    parsed.show = Some(button);
                }
                other => bail!("Unknown argument {:?}", other),
            }
        }
        Ok(parsed)
    }
}

/// Main application state
struct MenuApp {
    conn: Arc<RustConnection>,
    root: Window,
    config: Config,
    buttons: MenuButton,
    backend: X11MenuBackend,
    link: WmLink,
    open: OpenMenus,
    desktops: DesktopState,
    /// Set when the WM changes the desktop properties
    desktops_dirty: Rc<Cell<bool>>,
    shutdown: Arc<AtomicBool>,
}

impl MenuApp {
    fn new(config: Config, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let display_name = std::env::var("DISPLAY").ok();
        info!("Connected to X server (DISPLAY={:?})", display_name);

        let conn = Arc::new(conn);
        let root = conn.setup().roots[screen_num].root;

        let link = WmLink::new(conn.clone(), root, display_name)?;
        let mut backend = X11MenuBackend::new(conn.clone(), screen_num, &config.menu, shutdown.clone())?;

        let desktops_dirty = Rc::new(Cell::new(true));
        let dirty = desktops_dirty.clone();
        let watched = [
            link.atoms.net_number_of_desktops,
            link.atoms.net_current_desktop,
            link.atoms.net_desktop_names,
        ];
        backend.set_foreign_hook(Box::new(move |event| {
            if let Event::PropertyNotify(e) = event {
                if e.window == root && watched.contains(&e.atom) {
                    dirty.set(true);
                }
            }
        }));
        let children = link.children().clone();
        backend.add_timeout_hook(Box::new(move || children.reap()));

        select_root_events(&conn, root)?;

        let buttons = config.root_buttons();
        if buttons.is_empty() {
            warn!("No root menus configured");
        }
        let desktops = DesktopState::with_names(config.desktops.names.clone());

        Ok(Self {
            conn,
            root,
            config,
            buttons,
            backend,
            link,
            open: OpenMenus::new(),
            desktops,
            desktops_dirty,
            shutdown,
        })
    }

    fn refresh_desktops(&mut self) {
        if !self.desktops_dirty.replace(false) {
            return;
        }
        match self
            .link
            .atoms
            .read_desktops(self.conn.as_ref(), self.root, &self.config.desktops.names)
        {
            Ok(desktops) => self.desktops = desktops,
            Err(e) => warn!("Failed to read desktops, keeping last known: {}", e),
        }
    }

    /// Run the root menu bound to `button` with its hot-spot at (x, y)
    fn open_root_menu(&mut self, button: u8, x: i32, y: i32) -> Result<Lifecycle> {
        self.refresh_desktops();
        let context = GeneratorContext {
            desktops: &self.desktops,
            client: None,
            opener: &self.config.opener,
        };
        let mut session = MenuSession::new(&mut self.backend, &self.config.menu, context, &self.open);
        let mut executor = X11Executor::new(&self.link, &self.desktops, None);
        session.execute_button(&self.buttons, button, x, y, &mut executor)?;
        Ok(executor.lifecycle())
    }

    /// Run the window context menu for `window`
    fn open_window_menu(&mut self, window: Window, x: i32, y: i32) -> Result<Lifecycle> {
        self.refresh_desktops();
        let client = self
            .link
            .atoms
            .read_client(self.conn.as_ref(), window)
            .with_context(|| format!("Failed to read client {}", window))?;
        debug!("Window menu for {} ({:?})", window, client.title);

        let command = MenuCommand::submenu(generate::window_menu(&client));
        let context = GeneratorContext {
            desktops: &self.desktops,
            client: Some(&client),
            opener: &self.config.opener,
        };
        let mut session = MenuSession::new(&mut self.backend, &self.config.menu, context, &self.open);
        let mut executor = X11Executor::new(&self.link, &self.desktops, Some(&client));
        session.execute_command(&command, x, y, &mut executor)?;
        Ok(executor.lifecycle())
    }

    /// One-shot mode: show a root menu where the pointer is
    fn show_at_pointer(&mut self, button: u8) -> Result<Lifecycle> {
        let pointer = self
            .conn
            .query_pointer(self.root)?
            .reply()
            .context("Failed to query pointer")?;
        self.open_root_menu(button, i32::from(pointer.root_x), i32::from(pointer.root_y))
    }

    fn handle_event(&mut self, event: Event) -> Result<Lifecycle> {
        match event {
            Event::ButtonPress(e) if e.event == self.root && e.child == x11rb::NONE => {
                debug!("Root click: button {} at ({}, {})", e.detail, e.root_x, e.root_y);
                self.open_root_menu(e.detail, i32::from(e.root_x), i32::from(e.root_y))
            }
            Event::ClientMessage(e) if e.type_ == self.link.atoms.gtk_show_window_menu => {
                let data = e.data.as_data32();
                let (x, y) = (data[1] as i32, data[2] as i32);
                debug!("GTK_SHOW_WINDOW_MENU for {} at ({}, {})", e.window, x, y);
                self.open_window_menu(e.window, x, y)
            }
            Event::PropertyNotify(e) if e.window == self.root => {
                if self.link.atoms.is_desktop_property(e.atom) {
                    self.desktops_dirty.set(true);
                }
                Ok(Lifecycle::Running)
            }
            Event::Error(e) => {
                debug!("X11 error: {:?}", e);
                Ok(Lifecycle::Running)
            }
            other => {
                trace!("Ignoring event {:?}", other);
                Ok(Lifecycle::Running)
            }
        }
    }

    /// Main event loop
    async fn run(mut self) -> Result<Lifecycle> {
        info!("Starting main event loop");

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Exiting main loop");
                return Ok(Lifecycle::Exit);
            }

            // Menus run modally on this thread and share the backend's queue
            let event = tokio::task::block_in_place(|| self.backend.next_idle_event(IDLE_POLL))
                .context("X11 connection lost")?;
            let Some(event) = event else {
                self.backend.run_timeouts();
                continue;
            };
            match self.handle_event(event) {
                Ok(Lifecycle::Running) => {}
                Ok(lifecycle) => return Ok(lifecycle),
                Err(e) => match e.downcast_ref::<MenuError>() {
                    Some(reason) => debug!("Menu not shown: {}", reason),
                    None => warn!("Error handling event: {:#}", e),
                },
            }
        }
    }
}

/// Root events the daemon needs; button presses only if no one else has them
fn select_root_events(conn: &RustConnection, root: Window) -> Result<()> {
    let base = EventMask::PROPERTY_CHANGE | EventMask::SUBSTRUCTURE_NOTIFY;
    let with_buttons = ChangeWindowAttributesAux::new().event_mask(base | EventMask::BUTTON_PRESS);
    if let Err(e) = conn.change_window_attributes(root, &with_buttons)?.check() {
        warn!(
            "Root button presses are taken by another client ({:?}); root menus need --show",
            e
        );
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(base))?
            .check()
            .context("Failed to select root window events")?;
    }
    Ok(())
}

/// Replace this process with a fresh copy of itself
fn restart() -> Result<()> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe().context("Failed to find own executable")?;
    info!("Restarting {:?}", exe);
    let err = std::process::Command::new(&exe)
        .args(std::env::args().skip(1))
        .exec();
    Err(err).with_context(|| format!("Failed to restart {:?}", exe))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "area_menu=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Area menu");

    let args = Args::parse(std::env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Setup signal handlers for graceful shutdown; open menus see the flag
    let shutdown = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let flag = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
            flag.store(true, Ordering::Relaxed);
        });
    }

    let mut app = MenuApp::new(config, shutdown)?;
    let lifecycle = match args.show {
        Some(button) => app.show_at_pointer(button)?,
        None => match app.run().await {
            Ok(lifecycle) => lifecycle,
            Err(e) => {
                error!("Application error: {:#}", e);
                return Err(e);
            }
        },
    };

    if lifecycle == Lifecycle::Restart {
        restart()?;
    }
    info!("Area menu stopped");
    Ok(())
}
