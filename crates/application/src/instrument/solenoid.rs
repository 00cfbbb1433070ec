use std::sync::Arc;

use domain::binding::{OperatingMode, OperatingState, SolenoidBinding, SolenoidState};
use domain::parameter::CycleParameters;
use domain::{DeviceIdentity, Result};

use crate::device::{DeviceSession, Instrument, SessionRegistry};

/// KCube solenoid (shutter) controller
pub struct Solenoid {
    session: DeviceSession<dyn SolenoidBinding>,
}

impl Solenoid {
    pub fn new(
        identity: DeviceIdentity,
        binding: Box<dyn SolenoidBinding>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            session: DeviceSession::new(identity, binding, registry),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.session.set_verbose(verbose);
        self
    }

    pub fn session(&self) -> &DeviceSession<dyn SolenoidBinding> {
        &self.session
    }

    pub fn set_identity(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.session.set_identity(identity)
    }

    pub fn identify(&mut self) -> Result<()> {
        self.session.call("identify", |b| b.identify())
    }

    pub fn request_settings(&mut self) -> Result<()> {
        self.session.call("request_settings", |b| b.request_settings())
    }

    pub fn operating_mode(&mut self) -> Result<OperatingMode> {
        self.session.call("operating_mode", |b| b.operating_mode())
    }

    pub fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<()> {
        self.session
            .call("set_operating_mode", |b| b.set_operating_mode(mode))
    }

    /// Accepts Manual, Single, Auto or Triggered in any case
    pub fn set_operating_mode_named(&mut self, name: &str) -> Result<()> {
        self.set_operating_mode(name.parse()?)
    }

    pub fn operating_state(&mut self) -> Result<OperatingState> {
        self.session.call("operating_state", |b| b.operating_state())
    }

    pub fn set_operating_state(&mut self, state: OperatingState) -> Result<()> {
        self.session
            .call("set_operating_state", |b| b.set_operating_state(state))
    }

    pub fn set_operating_state_named(&mut self, name: &str) -> Result<()> {
        self.set_operating_state(name.parse()?)
    }

    pub fn solenoid_state(&mut self) -> Result<SolenoidState> {
        self.session.call("solenoid_state", |b| b.solenoid_state())
    }

    pub fn cycle_parameters(&mut self) -> Result<CycleParameters> {
        self.session.call("cycle_parameters", |b| b.cycle_parameters())
    }

    pub fn set_cycle_parameters(&mut self, params: &CycleParameters) -> Result<()> {
        self.session
            .call("set_cycle_parameters", |b| b.set_cycle_parameters(params))
    }
}

impl Instrument for Solenoid {
    fn open(&mut self) -> Result<()> {
        self.session.open_with(|b| {
            b.clear_message_queue()?;
            b.load_settings()
        })
    }

    fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    fn is_open(&self) -> bool {
        self.session.is_open()
    }

    fn identity(&self) -> &DeviceIdentity {
        self.session.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DeviceError;
    use infrastructure::simulated::SimulatedSolenoid;

    fn solenoid() -> Solenoid {
        Solenoid::new(
            DeviceIdentity::new("68000001").unwrap(),
            Box::new(SimulatedSolenoid::new()),
            Arc::new(SessionRegistry::new()),
        )
    }

    #[test]
    fn test_manual_active_opens_solenoid() {
        let mut solenoid = solenoid();
        solenoid.open().unwrap();

        solenoid.set_operating_mode_named("MANUAL").unwrap();
        solenoid.set_operating_state_named("active").unwrap();
        assert_eq!(solenoid.solenoid_state().unwrap(), SolenoidState::Open);

        solenoid.set_operating_state(OperatingState::Inactive).unwrap();
        assert_eq!(solenoid.solenoid_state().unwrap(), SolenoidState::Closed);
    }

    #[test]
    fn test_unknown_mode_name_is_rejected_before_the_device() {
        let mut solenoid = solenoid();
        solenoid.open().unwrap();
        let err = solenoid.set_operating_mode_named("pulse").unwrap_err();
        assert!(matches!(err, DeviceError::InvalidArgument(_)));
        assert_eq!(solenoid.operating_mode().unwrap(), OperatingMode::Manual);
    }
}
