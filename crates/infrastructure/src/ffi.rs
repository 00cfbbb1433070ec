//! Helpers shared by the vendor function tables

use std::ffi::{CString, c_char};
use std::path::Path;
use std::sync::Arc;

use domain::{DeviceError, DeviceIdentity, Result};
use libloading::Library;

/// Declares a table of vendor entry points resolved from one library.
///
/// The table keeps the library alive, so its function pointers stay valid
/// for as long as the table exists.
macro_rules! vendor_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: extern $abi:tt {
            $(
                $field:ident = $symbol:literal: fn($($arg:ty),* $(,)?) $(-> $ret:ty)?;
            )+
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            _library: ::std::sync::Arc<::libloading::Library>,
            $( pub $field: unsafe extern $abi fn($($arg),*) $(-> $ret)?, )+
        }

        impl $name {
            pub fn load(library: ::std::sync::Arc<::libloading::Library>) -> ::domain::Result<Self> {
                // SAFETY: each symbol is declared with the signature published in the vendor header
                unsafe {
                    Ok(Self {
                        $(
                            $field: *library
                                .get::<unsafe extern $abi fn($($arg),*) $(-> $ret)?>(
                                    concat!($symbol, "\0").as_bytes(),
                                )
                                .map_err(|e| $crate::ffi::missing_symbol($symbol, e))?,
                        )+
                        _library: library,
                    })
                }
            }
        }
    };
}

pub(crate) use vendor_table;

pub(crate) fn missing_symbol(symbol: &str, error: libloading::Error) -> DeviceError {
    DeviceError::Library {
        library: symbol.to_string(),
        message: format!("entry point not found: {error}"),
    }
}

/// Loads a vendor library from `path`
pub fn load_library(path: &Path) -> Result<Arc<Library>> {
    tracing::debug!(path = %path.display(), "Loading vendor library");
    // SAFETY: vendor libraries have no initialisation routines with preconditions
    let library = unsafe { Library::new(path) }.map_err(|e| DeviceError::Library {
        library: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(library))
}

/// NUL-terminated copy of an identity for `char const*` parameters
pub(crate) fn c_identity(identity: &DeviceIdentity) -> Result<CString> {
    CString::new(identity.as_str())
        .map_err(|_| DeviceError::InvalidIdentity(identity.to_string()))
}

/// Reads a fixed-size, NUL-padded vendor string
pub(crate) fn fixed_str(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

/// Converts a vendor boolean (any non-zero integer) to `bool`
pub(crate) fn vendor_bool<T: Into<i64>>(value: T) -> bool {
    value.into() != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_str_stops_at_nul() {
        let mut raw = [0 as c_char; 16];
        for (dst, src) in raw.iter_mut().zip(b"KDC101 ".iter()) {
            *dst = *src as c_char;
        }
        assert_eq!(fixed_str(&raw), "KDC101");
    }

    #[test]
    fn test_fixed_str_without_terminator() {
        let raw = [b'A' as c_char; 4];
        assert_eq!(fixed_str(&raw), "AAAA");
    }

    #[test]
    fn test_c_identity() {
        let id = DeviceIdentity::new("27000001").unwrap();
        assert_eq!(c_identity(&id).unwrap().as_bytes(), b"27000001");
    }

    #[test]
    fn test_vendor_bool() {
        assert!(vendor_bool(1u16));
        assert!(!vendor_bool(0i32));
    }

    #[test]
    fn test_missing_library() {
        let err = load_library(Path::new("/nonexistent/vendor.dll")).unwrap_err();
        assert!(matches!(err, DeviceError::Library { .. }));
    }
}
