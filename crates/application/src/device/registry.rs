use dashmap::DashSet;
use domain::{DeviceError, DeviceIdentity, Result, VendorFamily};

/// Identities with an open session in this process.
///
/// Constructed explicitly and shared by every session that should exclude
/// the others; sessions built on separate registries do not see each other.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    open: DashSet<(VendorFamily, DeviceIdentity)>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `identity` as open, failing with `DeviceBusy` when it already is
    pub fn claim(&self, family: VendorFamily, identity: &DeviceIdentity) -> Result<()> {
        if !self.open.insert((family, identity.clone())) {
            return Err(DeviceError::DeviceBusy {
                identity: identity.to_string(),
                reason: format!("a {family} session is already open in this process"),
            });
        }
        Ok(())
    }

    pub fn release(&self, family: VendorFamily, identity: &DeviceIdentity) {
        self.open.remove(&(family, identity.clone()));
    }

    pub fn is_open(&self, family: VendorFamily, identity: &DeviceIdentity) -> bool {
        self.open.contains(&(family, identity.clone()))
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DeviceIdentity {
        DeviceIdentity::new(s).unwrap()
    }

    #[test]
    fn test_claim_twice_is_busy() {
        let registry = SessionRegistry::new();
        registry.claim(VendorFamily::Tlpm, &id("P1")).unwrap();
        let err = registry.claim(VendorFamily::Tlpm, &id("P1")).unwrap_err();
        assert!(matches!(err, DeviceError::DeviceBusy { .. }));
    }

    #[test]
    fn test_release_allows_reclaim() {
        let registry = SessionRegistry::new();
        registry.claim(VendorFamily::Ueye, &id("1")).unwrap();
        registry.release(VendorFamily::Ueye, &id("1"));
        assert!(registry.is_empty());
        registry.claim(VendorFamily::Ueye, &id("1")).unwrap();
    }

    #[test]
    fn test_same_identity_in_other_family() {
        let registry = SessionRegistry::new();
        registry.claim(VendorFamily::KCubeDcServo, &id("1")).unwrap();
        registry.claim(VendorFamily::Ueye, &id("1")).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
