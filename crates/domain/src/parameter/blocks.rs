parameter_block! {
    /// DC servo PID loop gains
    pub struct PidParameters("MOT_DC_PIDParameters") {
        proportional_gain: i32 => "proportionalGain",
        integral_gain: i32 => "integralGain",
        differential_gain: i32 => "differentialGain",
        integral_limit: i32 => "integralLimit",
        /// Bit mask selecting which of the gains above the device applies
        parameter_filter: u16 => "parameterFilter",
    }
}

parameter_block! {
    /// Homing sequence parameters in device units
    pub struct HomingParameters("MOT_HomingParameters") {
        direction: u16 => "direction",
        limit_switch: u16 => "limitSwitch",
        velocity: u32 => "velocity",
        offset_distance: u32 => "offsetDistance",
    }
}

parameter_block! {
    /// Stage mechanics used for real-unit conversion
    pub struct MotorParameters("MOT_MotorParamsExt") {
        steps_per_rev: f64 => "stepsPerRev",
        gear_box_ratio: f64 => "gearBoxRatio",
        pitch: f64 => "pitch",
    }
}

parameter_block! {
    pub struct TravelLimits("MOT_TravelLimits") {
        min_position: f64 => "minPosition",
        max_position: f64 => "maxPosition",
    }
}

parameter_block! {
    pub struct VelocityLimits("MOT_VelocityLimits") {
        max_velocity: f64 => "maxVelocity",
        max_acceleration: f64 => "maxAcceleration",
    }
}

parameter_block! {
    /// Move profile in device units
    pub struct VelocityParameters("MOT_VelocityParameters") {
        acceleration: i32 => "acceleration",
        max_velocity: i32 => "maxVelocity",
    }
}

parameter_block! {
    pub struct HardwareInfo("TLI_HardwareInformation") {
        serial_number: u32 => "serialNumber",
        model_number: String => "modelNumber",
        device_type: u16 => "type",
        firmware_version: u32 => "firmwareVersion",
        notes: String => "notes",
        hardware_version: u16 => "hardwareVersion",
        modification_state: u16 => "modificationState",
        num_channels: i16 => "numChannels",
    }
}

parameter_block! {
    pub struct DeviceInfo("TLI_DeviceInfo") {
        type_id: u32 => "typeID",
        description: String => "description",
        serial_no: String => "serialNo",
        product_id: u32 => "PID",
        is_known_type: bool => "isKnownType",
        motor_type: i32 => "motorType",
        is_piezo_device: bool => "isPiezoDevice",
        is_laser: bool => "isLaser",
        is_custom_type: bool => "isCustomType",
        is_rack: bool => "isRack",
        max_channels: i16 => "maxChannels",
    }
}

parameter_block! {
    /// Solenoid open/closed timing in milliseconds
    pub struct CycleParameters("SC_CycleParameters") {
        open_time: u32 => "openTime",
        closed_time: u32 => "closedTime",
        num_cycles: u32 => "numCycles",
    }
}

parameter_block! {
    pub struct SensorInfo("SENSORINFO") {
        sensor_id: u16 => "SensorID",
        sensor_name: String => "strSensorName",
        color_mode: u8 => "nColorMode",
        max_width: u32 => "nMaxWidth",
        max_height: u32 => "nMaxHeight",
        master_gain: bool => "bMasterGain",
        global_shutter: bool => "bGlobShutter",
        /// Pixel pitch in hundredths of a micrometre
        pixel_size: u16 => "wPixelSize",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use crate::parameter::ParameterBlock;
    use serde_json::{Map, Value, json};

    fn mapping(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn assert_round_trip<B: ParameterBlock + PartialEq>(block: B) {
        let original = block.to_mapping();
        let mut copy = B::default();
        copy.load_mapping(&original).unwrap();
        assert_eq!(copy.to_mapping(), original);
        assert_eq!(copy, block);
    }

    fn assert_rejects_unknown<B: ParameterBlock>() {
        let mut block = B::default();
        let err = block
            .load_mapping(&mapping(json!({"nonexistent_field": 1})))
            .unwrap_err();
        assert_eq!(
            err,
            DeviceError::SchemaMismatch {
                block: B::NAME,
                field: "nonexistent_field".to_string()
            }
        );
    }

    #[test]
    fn test_pid_round_trip() {
        assert_round_trip(PidParameters {
            proportional_gain: 450,
            integral_gain: 150,
            differential_gain: 1200,
            integral_limit: 50000,
            parameter_filter: 15,
        });
    }

    #[test]
    fn test_every_block_round_trips() {
        assert_round_trip(HomingParameters {
            direction: 2,
            limit_switch: 1,
            velocity: 21987,
            offset_distance: 24576,
        });
        assert_round_trip(MotorParameters {
            steps_per_rev: 512.0,
            gear_box_ratio: 67.49,
            pitch: 1.0,
        });
        assert_round_trip(TravelLimits {
            min_position: 0.0,
            max_position: 25.0,
        });
        assert_round_trip(VelocityLimits {
            max_velocity: 2.6,
            max_acceleration: 4.0,
        });
        assert_round_trip(VelocityParameters {
            acceleration: 1502,
            max_velocity: 3030385,
        });
        assert_round_trip(HardwareInfo {
            serial_number: 27000001,
            model_number: "KDC101".to_string(),
            device_type: 27,
            firmware_version: 65540,
            notes: "DC servo".to_string(),
            hardware_version: 1,
            modification_state: 0,
            num_channels: 1,
        });
        assert_round_trip(DeviceInfo {
            type_id: 27,
            description: "Brushed Motor Controller".to_string(),
            serial_no: "27000001".to_string(),
            product_id: 0xfaf0,
            is_known_type: true,
            motor_type: 1,
            ..Default::default()
        });
        assert_round_trip(CycleParameters {
            open_time: 500,
            closed_time: 1500,
            num_cycles: 3,
        });
        assert_round_trip(SensorInfo {
            sensor_id: 0x21,
            sensor_name: "UI164xLE-C".to_string(),
            color_mode: 2,
            max_width: 1280,
            max_height: 1024,
            master_gain: true,
            global_shutter: false,
            pixel_size: 360,
        });
    }

    #[test]
    fn test_every_block_rejects_unknown_field() {
        assert_rejects_unknown::<PidParameters>();
        assert_rejects_unknown::<HomingParameters>();
        assert_rejects_unknown::<MotorParameters>();
        assert_rejects_unknown::<TravelLimits>();
        assert_rejects_unknown::<VelocityLimits>();
        assert_rejects_unknown::<VelocityParameters>();
        assert_rejects_unknown::<HardwareInfo>();
        assert_rejects_unknown::<DeviceInfo>();
        assert_rejects_unknown::<CycleParameters>();
        assert_rejects_unknown::<SensorInfo>();
    }

    #[test]
    fn test_mapping_uses_vendor_keys() {
        let keys: Vec<String> = PidParameters::default().to_mapping().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        assert!(keys.contains(&"proportionalGain".to_string()));
        assert!(keys.contains(&"parameterFilter".to_string()));
    }

    #[test]
    fn test_load_coerces_values() {
        let block = PidParameters::from_mapping(&mapping(json!({
            "proportionalGain": 12.7,
            "integralGain": "8",
        })))
        .unwrap();
        assert_eq!(block.proportional_gain, 12);
        assert_eq!(block.integral_gain, 8);

        let limits = TravelLimits::from_mapping(&mapping(json!({"maxPosition": "12.5"}))).unwrap();
        assert_eq!(limits.max_position, 12.5);
    }

    #[test]
    fn test_partial_application_is_kept() {
        let mut block = HomingParameters::default();
        // "direction" sorts before the bad key, so it is applied first
        let result = block.load_mapping(&mapping(json!({
            "direction": 1,
            "unknownKey": 5,
        })));
        assert!(result.is_err());
        assert_eq!(block.direction, 1);
    }

    #[test]
    fn test_uncoercible_value() {
        let err = PidParameters::from_mapping(&mapping(json!({"parameterFilter": -1}))).unwrap_err();
        assert!(matches!(err, DeviceError::ValueCoercion { .. }));
    }

    #[test]
    fn test_serde_matches_mapping() {
        let block = VelocityLimits {
            max_velocity: 2.0,
            max_acceleration: 1.5,
        };
        let via_serde = serde_json::to_value(&block).unwrap();
        assert_eq!(via_serde, Value::Object(block.to_mapping()));
    }
}
