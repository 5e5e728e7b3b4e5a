use std::ops::RangeInclusive;
use std::time::Duration;

use log::Level;
use uuid::{uuid, Uuid};

pub const LOCAL_NAME: &str = "SMOK";
// TODO: Read the passkey from the provisioning environment once modules are flashed with one
pub const DEFAULT_PASSKEY: &str = "1234";

pub const NOTIFY_PERIOD: Duration = Duration::from_millis(4000);

pub const SMOK_SERVICE: Uuid = uuid!("00f25ec8-fd45-4828-a929-d658c9a86341");
pub const AUTHENTICATION: Uuid = uuid!("6a3139ba-da5e-433f-afb0-635b9d320f8f");
pub const WIFI_CONFIG: Uuid = uuid!("a5a51086-393a-410e-83ca-dd7ab1ed70ac");
pub const TEMPERATURE: Uuid = uuid!("00000002-710e-4a5b-8d75-3e5b444bc3cf");
pub const UNIT: Uuid = uuid!("00000003-710e-4a5b-8d75-3e5b444bc3cf");

// 16 bits descriptor ids expanded with the Bluetooth base UUID
pub const USER_DESCRIPTION: Uuid = uuid!("00002901-0000-1000-8000-00805f9b34fb");
pub const AUTHENTICATION_DESCRIPTION: Uuid = uuid!("00002137-0000-1000-8000-00805f9b34fb");
pub const WIFI_DESCRIPTION: Uuid = uuid!("00002138-0000-1000-8000-00805f9b34fb");

pub mod descriptions {
    pub const TEMPERATURE: &str = "CPU Temperature";
    pub const AUTHENTICATION: &str = "Authentication passkey";
    pub const WIFI_CONFIG: &str = "SSID and password, $ separated";
    pub const UNIT: &str = "Temperature Units (F or C)";
}

pub const AUTHENTICATED: &[u8] = b"1";
pub const UNAUTHENTICATED: &[u8] = b"0";

pub const WIFI_DELIMITER: char = '$';
/// Bytes accepted by wpa_supplicant for a quoted WPA passphrase
pub const PASSPHRASE_LENGTH: RangeInclusive<usize> = 8..=63;
pub const WPA_SUPPLICANT_PATH: &str = "/etc/wpa_supplicant/wpa_supplicant@wlan0.conf";
pub const WPA_COUNTRY: &str = "DE";

pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

pub const DAEMON_NAME: &str = "smok-daemon";
pub const LOG_PATH: &str = "/var/log/smok-daemon.log"; // Needs to be sudo bc /var/log is root owned
pub const LOG_LEVEL: Level = Level::Info;
