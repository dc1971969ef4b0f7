use crate::unknown::unknown;

/// Maps numeric vendor/device/class ids to human-readable names.
///
/// Misses are not errors: every method answers the sentinel for what it
/// cannot name.
pub trait DeviceLookup: Send + Sync {
    /// `(vendor name, product name)`.
    fn lookup(&self, vendor_id: &str, product_id: &str) -> (String, String);

    /// `(class name, subclass name, programming interface name)`.
    fn class_names(&self, _class_id: &str, _subclass_id: &str, _prog_if_id: &str) -> (String, String, String) {
        (unknown(), unknown(), unknown())
    }
}

/// A lookup with no database behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownLookup;

impl DeviceLookup for UnknownLookup {
    fn lookup(&self, _vendor_id: &str, _product_id: &str) -> (String, String) {
        (unknown(), unknown())
    }
}
