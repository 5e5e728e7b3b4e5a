use std::path::PathBuf;
use std::time::Duration;

use crate::constants::*;

/// Runtime settings of the peripheral, defaults match a stock SMOK module
#[derive(Clone, Debug)]
pub struct Config {
    /// Adapter to serve on (e.g. hci0), the default adapter when None
    pub adapter: Option<String>,
    pub local_name: String,
    pub passkey: String,
    pub wpa_supplicant_path: PathBuf,
    pub thermal_zone_path: PathBuf,
    /// ISO 3166-1 country code written in the wpa_supplicant file
    pub country: String,
    pub notify_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapter: None,
            local_name: LOCAL_NAME.into(),
            passkey: DEFAULT_PASSKEY.into(),
            wpa_supplicant_path: WPA_SUPPLICANT_PATH.into(),
            thermal_zone_path: THERMAL_ZONE_PATH.into(),
            country: WPA_COUNTRY.into(),
            notify_period: NOTIFY_PERIOD,
        }
    }
}
