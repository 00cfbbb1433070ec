//! Parameter blocks exchanged with vendor drivers
//!
//! A block is a fixed set of typed fields that round-trips through a plain
//! key-value mapping. Keys use the vendor's field names so that settings
//! captured from one device can be stored in configuration files and pushed
//! to another.

use serde_json::{Map, Value};

use crate::error::Result;

mod field;

pub use field::{FieldKind, FieldValue};

/// Schema entry for one block field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Structured device configuration convertible to and from a mapping
pub trait ParameterBlock: Default + Clone + std::fmt::Debug {
    /// Vendor name of the record
    const NAME: &'static str;

    fn schema() -> &'static [FieldSpec];

    /// Current value of `name`, `None` when the block has no such field
    fn field(&self, name: &str) -> Option<Value>;

    /// Coerces and assigns a single field.
    ///
    /// Fails with `SchemaMismatch` for unknown names and `ValueCoercion`
    /// when the value cannot be represented by the field type.
    fn assign(&mut self, name: &str, value: &Value) -> Result<()>;

    /// Field name to current value, one entry per schema field
    fn to_mapping(&self) -> Map<String, Value> {
        Self::schema()
            .iter()
            .filter_map(|spec| self.field(spec.name).map(|v| (spec.name.to_string(), v)))
            .collect()
    }

    /// Applies every entry of `values`.
    ///
    /// Entries are applied in mapping order and there is no rollback: fields
    /// assigned before a failing entry keep their new values.
    fn load_mapping(&mut self, values: &Map<String, Value>) -> Result<()> {
        for (name, value) in values {
            self.assign(name, value)?;
        }
        Ok(())
    }

    /// Builds a block from defaults overlaid with `values`
    fn from_mapping(values: &Map<String, Value>) -> Result<Self> {
        let mut block = Self::default();
        block.load_mapping(values)?;
        Ok(block)
    }
}

/// Declares a parameter block struct together with its `ParameterBlock` impl.
macro_rules! parameter_block {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($block:literal) {
            $(
                $(#[$fmeta:meta])*
                $field:ident: $ty:ty => $key:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                #[serde(rename = $key)]
                pub $field: $ty,
            )+
        }

        impl $crate::parameter::ParameterBlock for $name {
            const NAME: &'static str = $block;

            fn schema() -> &'static [$crate::parameter::FieldSpec] {
                const SCHEMA: &[$crate::parameter::FieldSpec] = &[
                    $(
                        $crate::parameter::FieldSpec {
                            name: $key,
                            kind: <$ty as $crate::parameter::FieldValue>::KIND,
                        },
                    )+
                ];
                SCHEMA
            }

            fn field(&self, name: &str) -> Option<::serde_json::Value> {
                match name {
                    $( $key => Some($crate::parameter::FieldValue::to_value(&self.$field)), )+
                    _ => None,
                }
            }

            fn assign(
                &mut self,
                name: &str,
                value: &::serde_json::Value,
            ) -> $crate::error::Result<()> {
                match name {
                    $(
                        $key => {
                            self.$field = $crate::parameter::FieldValue::coerce(value).ok_or_else(|| {
                                $crate::error::DeviceError::ValueCoercion {
                                    block: $block,
                                    field: name.to_string(),
                                    value: value.to_string(),
                                }
                            })?;
                            Ok(())
                        }
                    )+
                    _ => Err($crate::error::DeviceError::SchemaMismatch {
                        block: $block,
                        field: name.to_string(),
                    }),
                }
            }
        }
    };
}

mod blocks;

pub use blocks::{
    CycleParameters, DeviceInfo, HardwareInfo, HomingParameters, MotorParameters, PidParameters,
    SensorInfo, TravelLimits, VelocityLimits, VelocityParameters,
};
