use std::sync::Arc;

use domain::{
    DeviceError, DeviceIdentity, Result, SessionState, VendorBinding, VendorFamily,
};

use super::SessionRegistry;

/// Lifecycle messages go to info when the session is verbose, debug otherwise
macro_rules! lifecycle {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// Open/close lifecycle around one vendor binding.
///
/// Every device operation goes through [`DeviceSession::call`], which fails
/// with `NotInSession` before the binding is touched when the session is
/// closed. The identity is registered in the shared [`SessionRegistry`] for
/// as long as the session is open.
pub struct DeviceSession<B: ?Sized + VendorBinding> {
    identity: DeviceIdentity,
    state: SessionState,
    verbose: bool,
    registry: Arc<SessionRegistry>,
    binding: Box<B>,
}

impl<B: ?Sized + VendorBinding> DeviceSession<B> {
    pub fn new(identity: DeviceIdentity, binding: Box<B>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            identity,
            state: SessionState::default(),
            verbose: false,
            registry,
            binding,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Changes the device this session addresses; refused while open
    pub fn set_identity(&mut self, identity: DeviceIdentity) -> Result<()> {
        if self.state.is_open() {
            return Err(DeviceError::IdentityLocked(self.identity.to_string()));
        }
        self.identity = identity;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn family(&self) -> VendorFamily {
        self.binding.family()
    }

    pub fn open(&mut self) -> Result<()> {
        self.open_with(|_| Ok(()))
    }

    /// Connects, then runs `post_connect` on the fresh handle.
    ///
    /// When `post_connect` fails the handle is released again and the
    /// session stays closed.
    pub fn open_with(&mut self, post_connect: impl FnOnce(&mut B) -> Result<()>) -> Result<()> {
        let family = self.family();
        let opened = self.state.to_open().map_err(|reason| DeviceError::DeviceBusy {
            identity: self.identity.to_string(),
            reason: reason.to_string(),
        })?;
        self.registry.claim(family, &self.identity)?;

        lifecycle!(self.verbose, identity = %self.identity, family = %family, "Opening...");
        if let Err(e) = self.binding.connect(&self.identity) {
            self.registry.release(family, &self.identity);
            tracing::error!(identity = %self.identity, error = %e, "Failed to open device");
            return Err(e);
        }
        self.state = opened;

        if let Err(e) = post_connect(&mut *self.binding) {
            tracing::error!(identity = %self.identity, error = %e, "Device setup after open failed");
            if let Err(disconnect) = self.binding.disconnect() {
                tracing::warn!(identity = %self.identity, error = %disconnect, "Disconnect after failed setup also failed");
            }
            self.state = self.state.to_closed();
            self.registry.release(family, &self.identity);
            return Err(e);
        }

        lifecycle!(self.verbose, identity = %self.identity, "Opening done.");
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.close_with(|_| Ok(()))
    }

    /// Runs `release` then disconnects.
    ///
    /// No-op on a closed session. The session always ends closed; the first
    /// failure, if any, is returned after the state was reset.
    pub fn close_with(&mut self, release: impl FnOnce(&mut B) -> Result<()>) -> Result<()> {
        if !self.state.is_open() {
            return Ok(());
        }
        let family = self.family();
        lifecycle!(self.verbose, identity = %self.identity, family = %family, "Closing...");

        let released = release(&mut *self.binding);
        if let Err(e) = &released {
            tracing::warn!(identity = %self.identity, error = %e, "Releasing device resources failed");
        }
        let disconnected = self.binding.disconnect();
        if let Err(e) = &disconnected {
            tracing::warn!(identity = %self.identity, error = %e, "Vendor disconnect reported a failure");
        }

        self.state = self.state.to_closed();
        self.registry.release(family, &self.identity);
        lifecycle!(self.verbose, identity = %self.identity, "Closing done.");

        released.and(disconnected)
    }

    /// Runs `f` against the binding of an open session
    pub fn call<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut B) -> Result<T>,
    ) -> Result<T> {
        if !self.state.is_open() {
            return Err(DeviceError::NotInSession {
                identity: self.identity.to_string(),
                operation,
            });
        }
        lifecycle!(self.verbose, identity = %self.identity, operation, "Device operation");
        f(&mut *self.binding)
    }
}

impl<B: ?Sized + VendorBinding> Drop for DeviceSession<B> {
    fn drop(&mut self) {
        if self.state.is_open() {
            if let Err(e) = self.close() {
                tracing::warn!(identity = %self.identity, error = %e, "Close on drop failed");
            }
        }
    }
}
