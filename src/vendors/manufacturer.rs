//! Meter Manufacturer Database
//!
//! IEC 62056-21 identification messages start with the three-letter FLAG
//! Association code of the manufacturer. The last letter is lowercase when the
//! meter supports the 20 ms reaction time, so lookups here ignore case.
//!
//! ## Usage Example
//!
//! ```rust
//! use iec62056_rs::vendors::manufacturer::{get_manufacturer_info, manufacturer_name};
//!
//! assert_eq!(manufacturer_name("ISk"), Some("Iskraemeco"));
//! let info = get_manufacturer_info("LUN").unwrap();
//! assert!(info.has_profile_layout());
//! ```

use crate::payload::profile::ProfileLayout;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Information about a known meter manufacturer
#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturerInfo {
    /// 3-letter FLAG code, uppercase (e.g., "ISK")
    pub code: &'static str,
    pub name: &'static str,
    pub description: Option<&'static str>,
}

impl ManufacturerInfo {
    pub const fn new(code: &'static str, name: &'static str) -> Self {
        Self {
            code,
            name,
            description: None,
        }
    }

    pub const fn with_description(
        code: &'static str,
        name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            code,
            name,
            description: Some(description),
        }
    }

    /// A profile layout exists for this manufacturer's load-profile answers.
    pub fn has_profile_layout(&self) -> bool {
        ProfileLayout::for_manufacturer(self.code).is_ok()
    }
}

/// Known manufacturers keyed by uppercase FLAG code
pub static KNOWN_MANUFACTURERS: Lazy<HashMap<&'static str, ManufacturerInfo>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // ===== PROFILE LAYOUTS =====

    map.insert("LUN", ManufacturerInfo::with_description(
        "LUN", "Luna Elektrik",
        "Profile rows of 14 fields: date, time, energy with unit"
    ));
    map.insert("MSY", ManufacturerInfo::with_description(
        "MSY", "Makel Elektrik",
        "Profile rows of 9 fields: packed timestamp and 8 values"
    ));

    // ===== ELECTRICITY =====

    map.insert("ABB", ManufacturerInfo::new("ABB", "ABB"));
    map.insert("EMH", ManufacturerInfo::new("EMH", "EMH Energie-Messtechnik"));
    map.insert("ESY", ManufacturerInfo::new("ESY", "EasyMeter"));
    map.insert("HLY", ManufacturerInfo::new("HLY", "Holley Metering"));
    map.insert("ISK", ManufacturerInfo::new("ISK", "Iskraemeco"));
    map.insert("ITR", ManufacturerInfo::new("ITR", "Itron"));
    map.insert("KFM", ManufacturerInfo::new("KFM", "Kaifa"));
    map.insert("LGZ", ManufacturerInfo::new("LGZ", "Landis+Gyr"));
    map.insert("SLB", ManufacturerInfo::new("SLB", "Schlumberger"));
    map.insert("ZPA", ManufacturerInfo::new("ZPA", "ZPA Smart Energy"));

    // ===== GAS / VOLUME CONVERTERS =====

    map.insert("ELS", ManufacturerInfo::new("ELS", "Elster"));
    map.insert("DZG", ManufacturerInfo::new("DZG", "DZG Metering"));

    // ===== HEAT / MULTI-UTILITY =====

    map.insert("KAM", ManufacturerInfo::new("KAM", "Kamstrup"));
    map.insert("SIE", ManufacturerInfo::new("SIE", "Siemens"));

    map
});

/// Uppercases a FLAG code, or `None` when it is not three ASCII letters.
pub fn normalize_code(code: &str) -> Option<String> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

pub fn get_manufacturer_info(code: &str) -> Option<&'static ManufacturerInfo> {
    let code = normalize_code(code)?;
    KNOWN_MANUFACTURERS.get(code.as_str())
}

/// Display name for log context.
pub fn manufacturer_name(code: &str) -> Option<&'static str> {
    get_manufacturer_info(code).map(|info| info.name)
}
