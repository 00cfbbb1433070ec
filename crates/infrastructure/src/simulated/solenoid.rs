use domain::binding::{OperatingMode, OperatingState, SolenoidBinding, SolenoidState};
use domain::parameter::CycleParameters;
use domain::{Result, StatusTranslator, VendorFamily};

use super::{Simulated, SimulatedDevice};
use crate::vendors::kinesis::STATUS_TABLE;

/// KCube solenoid controller driving a shutter
#[derive(Debug, Clone)]
pub struct SolenoidControllerState {
    pub mode: OperatingMode,
    pub state: OperatingState,
    pub cycle: CycleParameters,
}

impl Default for SolenoidControllerState {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Manual,
            state: OperatingState::Inactive,
            cycle: CycleParameters {
                open_time: 100,
                closed_time: 100,
                num_cycles: 1,
            },
        }
    }
}

impl SimulatedDevice for SolenoidControllerState {
    const FAMILY: VendorFamily = VendorFamily::KCubeSolenoid;

    fn status_table() -> &'static StatusTranslator {
        &STATUS_TABLE
    }

    fn on_disconnect(&mut self) {
        self.state = OperatingState::Inactive;
    }
}

impl SolenoidBinding for Simulated<SolenoidControllerState> {
    fn identify(&mut self) -> Result<()> {
        self.call("identify")
    }

    fn clear_message_queue(&mut self) -> Result<()> {
        self.call("clear_message_queue")
    }

    fn load_settings(&mut self) -> Result<()> {
        self.call("load_settings")
    }

    fn request_settings(&mut self) -> Result<()> {
        self.call("request_settings")
    }

    fn operating_mode(&mut self) -> Result<OperatingMode> {
        self.with("operating_mode", |s| Ok(s.mode))
    }

    fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<()> {
        self.with("set_operating_mode", |s| {
            s.mode = mode;
            Ok(())
        })
    }

    fn operating_state(&mut self) -> Result<OperatingState> {
        self.with("operating_state", |s| Ok(s.state))
    }

    fn set_operating_state(&mut self, state: OperatingState) -> Result<()> {
        self.with("set_operating_state", |s| {
            s.state = state;
            Ok(())
        })
    }

    /// Open while active in manual mode
    fn solenoid_state(&mut self) -> Result<SolenoidState> {
        self.with("solenoid_state", |s| {
            Ok(match (s.mode, s.state) {
                (OperatingMode::Manual, OperatingState::Active) => SolenoidState::Open,
                _ => SolenoidState::Closed,
            })
        })
    }

    fn cycle_parameters(&mut self) -> Result<CycleParameters> {
        self.with("cycle_parameters", |s| Ok(s.cycle.clone()))
    }

    fn set_cycle_parameters(&mut self, params: &CycleParameters) -> Result<()> {
        self.with("set_cycle_parameters", |s| {
            s.cycle = params.clone();
            Ok(())
        })
    }
}
