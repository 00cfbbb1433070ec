//! Records exchanged with the Kinesis libraries (`#pragma pack(1)` in the headers)

use std::ffi::c_char;

use domain::parameter::{CycleParameters, DeviceInfo, HardwareInfo, HomingParameters, PidParameters};

use crate::ffi::fixed_str;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct TliDeviceInfo {
    pub type_id: u32,
    pub description: [c_char; 65],
    pub serial_no: [c_char; 9],
    pub pid: u32,
    pub is_known_type: bool,
    pub motor_type: i32,
    pub is_piezo_device: bool,
    pub is_laser: bool,
    pub is_custom_type: bool,
    pub is_rack: bool,
    pub max_channels: i16,
}

impl Default for TliDeviceInfo {
    fn default() -> Self {
        Self {
            type_id: 0,
            description: [0; 65],
            serial_no: [0; 9],
            pid: 0,
            is_known_type: false,
            motor_type: 0,
            is_piezo_device: false,
            is_laser: false,
            is_custom_type: false,
            is_rack: false,
            max_channels: 0,
        }
    }
}

impl From<TliDeviceInfo> for DeviceInfo {
    fn from(raw: TliDeviceInfo) -> Self {
        let description = raw.description;
        let serial_no = raw.serial_no;
        Self {
            type_id: raw.type_id,
            description: fixed_str(&description),
            serial_no: fixed_str(&serial_no),
            product_id: raw.pid,
            is_known_type: raw.is_known_type,
            motor_type: raw.motor_type,
            is_piezo_device: raw.is_piezo_device,
            is_laser: raw.is_laser,
            is_custom_type: raw.is_custom_type,
            is_rack: raw.is_rack,
            max_channels: raw.max_channels,
        }
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct TliHardwareInformation {
    pub serial_number: u32,
    pub model_number: [c_char; 8],
    pub device_type: u16,
    pub firmware_version: u32,
    pub notes: [c_char; 48],
    pub device_dependant_data: [u8; 12],
    pub hardware_version: u16,
    pub modification_state: u16,
    pub num_channels: i16,
}

impl Default for TliHardwareInformation {
    fn default() -> Self {
        Self {
            serial_number: 0,
            model_number: [0; 8],
            device_type: 0,
            firmware_version: 0,
            notes: [0; 48],
            device_dependant_data: [0; 12],
            hardware_version: 0,
            modification_state: 0,
            num_channels: 0,
        }
    }
}

impl From<TliHardwareInformation> for HardwareInfo {
    fn from(raw: TliHardwareInformation) -> Self {
        let model_number = raw.model_number;
        let notes = raw.notes;
        Self {
            serial_number: raw.serial_number,
            model_number: fixed_str(&model_number),
            device_type: raw.device_type,
            firmware_version: raw.firmware_version,
            notes: fixed_str(&notes),
            hardware_version: raw.hardware_version,
            modification_state: raw.modification_state,
            num_channels: raw.num_channels,
        }
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MotDcPidParameters {
    pub proportional_gain: i32,
    pub integral_gain: i32,
    pub differential_gain: i32,
    pub integral_limit: i32,
    pub parameter_filter: u16,
}

impl From<MotDcPidParameters> for PidParameters {
    fn from(raw: MotDcPidParameters) -> Self {
        Self {
            proportional_gain: raw.proportional_gain,
            integral_gain: raw.integral_gain,
            differential_gain: raw.differential_gain,
            integral_limit: raw.integral_limit,
            parameter_filter: raw.parameter_filter,
        }
    }
}

impl From<&PidParameters> for MotDcPidParameters {
    fn from(block: &PidParameters) -> Self {
        Self {
            proportional_gain: block.proportional_gain,
            integral_gain: block.integral_gain,
            differential_gain: block.differential_gain,
            integral_limit: block.integral_limit,
            parameter_filter: block.parameter_filter,
        }
    }
}

/// Direction and limit switch are `short` enums in the header
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MotHomingParameters {
    pub direction: u16,
    pub limit_switch: u16,
    pub velocity: u32,
    pub offset_distance: u32,
}

impl From<MotHomingParameters> for HomingParameters {
    fn from(raw: MotHomingParameters) -> Self {
        Self {
            direction: raw.direction,
            limit_switch: raw.limit_switch,
            velocity: raw.velocity,
            offset_distance: raw.offset_distance,
        }
    }
}

impl From<&HomingParameters> for MotHomingParameters {
    fn from(block: &HomingParameters) -> Self {
        Self {
            direction: block.direction,
            limit_switch: block.limit_switch,
            velocity: block.velocity,
            offset_distance: block.offset_distance,
        }
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScCycleParameters {
    pub open_time: u32,
    pub closed_time: u32,
    pub num_cycles: u32,
}

impl From<ScCycleParameters> for CycleParameters {
    fn from(raw: ScCycleParameters) -> Self {
        Self {
            open_time: raw.open_time,
            closed_time: raw.closed_time,
            num_cycles: raw.num_cycles,
        }
    }
}

impl From<&CycleParameters> for ScCycleParameters {
    fn from(block: &CycleParameters) -> Self {
        Self {
            open_time: block.open_time,
            closed_time: block.closed_time,
            num_cycles: block.num_cycles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn test_packed_record_sizes() {
        assert_eq!(size_of::<TliDeviceInfo>(), 4 + 65 + 9 + 4 + 1 + 4 + 4 + 2);
        assert_eq!(size_of::<TliHardwareInformation>(), 4 + 8 + 2 + 4 + 48 + 12 + 2 + 2 + 2);
        assert_eq!(size_of::<MotDcPidParameters>(), 18);
        assert_eq!(size_of::<MotHomingParameters>(), 12);
        assert_eq!(size_of::<ScCycleParameters>(), 12);
    }

    #[test]
    fn test_device_info_conversion() {
        let mut raw = TliDeviceInfo {
            type_id: 27,
            pid: 0xfaf0,
            is_known_type: true,
            max_channels: 1,
            ..Default::default()
        };
        for (dst, src) in raw.serial_no.iter_mut().zip(b"27000001".iter()) {
            *dst = *src as c_char;
        }
        let info = DeviceInfo::from(raw);
        assert_eq!(info.serial_no, "27000001");
        assert_eq!(info.type_id, 27);
        assert!(info.is_known_type);
    }

    #[test]
    fn test_pid_conversion_round_trip() {
        let block = PidParameters {
            proportional_gain: 450,
            integral_gain: 150,
            differential_gain: 1200,
            integral_limit: 50000,
            parameter_filter: 15,
        };
        let raw = MotDcPidParameters::from(&block);
        assert_eq!(PidParameters::from(raw), block);
    }
}
