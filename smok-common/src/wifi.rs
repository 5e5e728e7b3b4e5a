use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::constants::{PASSPHRASE_LENGTH, WIFI_DELIMITER};

#[derive(Debug, thiserror::Error)]
pub enum WifiError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("payload has no '$' between SSID and password")]
    MissingDelimiter,
    #[error("SSID is empty")]
    EmptySsid,
    #[error("credentials contain a quote or line break")]
    ForbiddenCharacter,
    #[error("passphrase is {0} bytes long, WPA needs 8 to 63 (or none for an open network)")]
    InvalidPassphraseLength(usize),
    #[error("failed to write wpa_supplicant configuration: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl WifiCredentials {
    /// Splits `ssid$password` on the first delimiter, the password keeps any later one
    pub fn parse(payload: &[u8]) -> Result<Self, WifiError> {
        let payload = std::str::from_utf8(payload).map_err(|_| WifiError::InvalidUtf8)?;

        let Some((ssid, password)) = payload.split_once(WIFI_DELIMITER) else {
            return Err(WifiError::MissingDelimiter);
        };

        if ssid.is_empty() {
            return Err(WifiError::EmptySsid);
        }

        // Both values end up quoted in the config file
        if payload.contains(['"', '\n', '\r']) {
            return Err(WifiError::ForbiddenCharacter);
        }

        // wpa_supplicant drops the whole file over a single bad psk
        if !password.is_empty() && !PASSPHRASE_LENGTH.contains(&password.len()) {
            return Err(WifiError::InvalidPassphraseLength(password.len()));
        }

        Ok(Self {
            ssid: ssid.to_owned(),
            password: password.to_owned(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }

    /// An empty password renders an open network
    pub fn render(&self, country: &str) -> String {
        let security = if self.is_open() {
            "key_mgmt=NONE".to_owned()
        } else {
            format!(
                "psk=\"{}\"
    key_mgmt=WPA-PSK
    proto=RSN WPA",
                self.password
            )
        };

        format!(
            "ctrl_interface=DIR=/var/run/wpa_supplicant GROUP=netdev
update_config=1
country={country}

network={{
    ssid=\"{}\"
    {security}
}}
",
            self.ssid
        )
    }
}

/// Writes the wpa_supplicant file consumed by the OS network stack
#[derive(Clone, Debug)]
pub struct WifiConfigurator {
    path: PathBuf,
    country: String,
}

impl WifiConfigurator {
    pub fn new(path: impl Into<PathBuf>, country: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            country: country.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the file content changed
    pub async fn apply(&self, credentials: &WifiCredentials) -> Result<bool, WifiError> {
        let content = credentials.render(&self.country);

        Ok(write_if_different(&self.path, content.as_bytes()).await?)
    }
}

pub async fn write_if_different(path: &Path, content: &[u8]) -> io::Result<bool> {
    match fs::read(path).await {
        Ok(current) if current == content => return Ok(false),
        Ok(_) => (),
        Err(err) if err.kind() == io::ErrorKind::NotFound => (),
        Err(err) => return Err(err),
    }

    fs::write(path, content).await?;

    Ok(true)
}
