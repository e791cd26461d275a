//! LifecycleWrangler - installs the bridge into the host and owns the driver+bridge pair
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized --activate--> Active --dispose--> Disposed
//!                               ^                    |
//!                               +-----activate-------+   (editor hosts only)
//! ```
//!
//! Layout registration and hook insertion happen once per wrangler, no matter
//! how often startup fires. The per-cycle hook stays installed across mode
//! cycling and is a no-op while no pair exists.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bridge::{DeviceStateBridge, StateEventSink};
use crate::drivers::Driver;
use crate::error::Result;
use crate::host::{
    DeviceLayout, DeviceMatcher, LayoutRegistry, PhaseScheduler, BRIDGE_INTERFACE, EARLY_UPDATE,
};
use crate::state::{DeviceId, DeviceRegistry};

/// Kind of host the bridge runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    /// Edit/run mode cycling with explicit enter/exit notifications
    Editor,
    /// Run-once host: startup only, no mode cycling
    #[default]
    Player,
}

/// Notifications the host sends to the wrangler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNotification {
    /// Process (or editor domain) startup
    Startup,
    /// Editor entered run mode
    EnterActiveMode,
    /// Editor is leaving run mode
    ExitActiveMode,
    /// Process shutdown
    Shutdown,
    /// A device became "current"
    DeviceSelected(DeviceId),
    /// A device was removed
    DeviceRemoved(DeviceId),
}

/// Wrangler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WranglerState {
    Uninitialized,
    Active,
    Disposed,
}

/// Builds the transport driver for each activation
pub trait DriverFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Driver>>;
}

impl<F> DriverFactory for F
where
    F: Fn() -> Result<Box<dyn Driver>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn Driver>> {
        self()
    }
}

struct Session {
    driver: Box<dyn Driver>,
    bridge: Arc<DeviceStateBridge>,
}

/// Host collaborators the wrangler talks to
pub struct HostServices {
    pub layouts: Arc<dyn LayoutRegistry>,
    pub scheduler: Arc<dyn PhaseScheduler>,
    pub devices: Arc<DeviceRegistry>,
    pub sink: Arc<dyn StateEventSink>,
}

/// Lifecycle controller for one driver+bridge pair
pub struct LifecycleWrangler {
    mode: HostMode,
    host: HostServices,
    factory: Box<dyn DriverFactory>,
    session: Arc<Mutex<Option<Session>>>,
    state: WranglerState,
    installed: bool,
    next_device: u32,
}

impl LifecycleWrangler {
    pub fn new(mode: HostMode, host: HostServices, factory: impl DriverFactory + 'static) -> Self {
        Self {
            mode,
            host,
            factory: Box::new(factory),
            session: Arc::new(Mutex::new(None)),
            state: WranglerState::Uninitialized,
            installed: false,
            next_device: 1,
        }
    }

    pub fn state(&self) -> WranglerState {
        self.state
    }

    pub fn mode(&self) -> HostMode {
        self.mode
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Bridge of the live pair, if any
    pub fn active_bridge(&self) -> Option<Arc<DeviceStateBridge>> {
        self.session.lock().as_ref().map(|s| Arc::clone(&s.bridge))
    }

    pub fn devices(&self) -> &Arc<DeviceRegistry> {
        &self.host.devices
    }

    /// Dispatch a host notification
    pub fn notify(&mut self, notification: HostNotification) -> Result<()> {
        debug!("Host notification: {:?} ({:?} host)", notification, self.mode);

        match (notification, self.mode) {
            (HostNotification::Startup, HostMode::Editor) => self.install(),
            (HostNotification::Startup, HostMode::Player) => {
                self.install();
                self.activate()?;
            }
            (HostNotification::EnterActiveMode, HostMode::Editor) => {
                self.install();
                self.activate()?;
            }
            (HostNotification::ExitActiveMode, HostMode::Editor) | (HostNotification::Shutdown, _) => {
                self.dispose();
            }
            (HostNotification::EnterActiveMode, HostMode::Player)
            | (HostNotification::ExitActiveMode, HostMode::Player) => {
                debug!("Mode change ignored by run-once host");
            }
            (HostNotification::DeviceSelected(id), _) => {
                self.host.devices.make_current(id);
            }
            (HostNotification::DeviceRemoved(id), _) => {
                if self.active_bridge().is_some_and(|bridge| bridge.id() == id) {
                    // Removing the live device releases the whole pair
                    self.dispose();
                } else {
                    self.host.devices.remove(id);
                }
            }
        }

        Ok(())
    }

    /// Register the layout and insert the per-cycle hook, once
    pub fn install(&mut self) {
        if self.installed {
            debug!("Bridge already installed");
            return;
        }

        self.host.layouts.register_layout(
            &DeviceLayout::midi_device(),
            &DeviceMatcher::with_interface(BRIDGE_INTERFACE),
        );

        let session = Arc::clone(&self.session);
        let hook = Arc::new(move || {
            if let Some(session) = session.lock().as_mut() {
                session.driver.pump(&session.bridge);
                session.bridge.flush();
            }
        });

        if !self.host.scheduler.insert_hook(EARLY_UPDATE, hook) {
            warn!("Host has no '{}' phase; bridge will never be pumped", EARLY_UPDATE);
        }

        self.installed = true;
        info!("Bridge installed at end of '{}'", EARLY_UPDATE);
    }

    /// Create the driver+bridge pair
    ///
    /// Returns Ok(false) when nothing was created: already active, or a
    /// run-once host asked to come back after disposal.
    pub fn activate(&mut self) -> Result<bool> {
        match self.state {
            WranglerState::Active => {
                debug!("Already active, ignoring duplicate initialization");
                return Ok(false);
            }
            WranglerState::Disposed if self.mode == HostMode::Player => {
                debug!("Run-once host already disposed, not re-creating");
                return Ok(false);
            }
            _ => {}
        }

        let driver = self.factory.create()?;
        let id = DeviceId(self.next_device);
        self.next_device += 1;

        let bridge = Arc::new(DeviceStateBridge::new(id, Arc::clone(&self.host.sink)));
        info!("Activating {} with '{}' driver", id, driver.name());

        self.host.devices.add(Arc::clone(&bridge));
        *self.session.lock() = Some(Session { driver, bridge });
        self.state = WranglerState::Active;
        Ok(true)
    }

    /// Release the driver+bridge pair
    ///
    /// Returns false when there was no pair to release.
    pub fn dispose(&mut self) -> bool {
        let Some(mut session) = self.session.lock().take() else {
            debug!("No active pair to dispose");
            return false;
        };

        session.driver.shutdown();
        self.host.devices.remove(session.bridge.id());
        self.state = WranglerState::Disposed;
        info!("Disposed {}", session.bridge.id());
        true
    }
}

impl Drop for LifecycleWrangler {
    fn drop(&mut self) {
        self.dispose();
    }
}
