use std::sync::Arc;

use log::*;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::constants::{AUTHENTICATED, UNAUTHENTICATED};
use crate::sensor::{format_temperature, SensorError, TemperatureSensor, ThermalZone};
use crate::state::{ServiceState, Unit};
use crate::wifi::{WifiConfigurator, WifiCredentials, WifiError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WifiOutcome {
    /// Operations are not enabled yet, the payload was dropped
    Ignored,
    Unchanged,
    Written,
}

/// Handle on the SMOK service, cheap to clone into every characteristic callback.
///
/// All clones share the same [ServiceState].
pub struct SmokService<S> {
    state: Arc<Mutex<ServiceState>>,
    passkey: Arc<str>,
    sensor: Arc<S>,
    wifi: WifiConfigurator,
}

impl<S> Clone for SmokService<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            passkey: Arc::clone(&self.passkey),
            sensor: Arc::clone(&self.sensor),
            wifi: self.wifi.clone(),
        }
    }
}

impl SmokService<ThermalZone> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.passkey,
            ThermalZone::new(&config.thermal_zone_path),
            WifiConfigurator::new(&config.wpa_supplicant_path, &config.country),
        )
    }
}

impl<S: TemperatureSensor> SmokService<S> {
    pub fn new(passkey: &str, sensor: S, wifi: WifiConfigurator) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState::new())),
            passkey: passkey.into(),
            sensor: Arc::new(sensor),
            wifi,
        }
    }

    /// A wrong passkey leaves the state untouched, the client is not told either way
    pub async fn submit_passkey(&self, candidate: impl AsRef<[u8]>) -> bool {
        if candidate.as_ref() != self.passkey.as_bytes() {
            warn!("Rejected passkey attempt");
            return false;
        }

        let mut state = self.state.lock().await;
        if !state.are_operations_enabled() {
            info!("Passkey matched, operations enabled");
        }
        state.enable_operations();

        true
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.are_operations_enabled()
    }

    /// Wire value of the authentication characteristic
    pub async fn auth_value(&self) -> Vec<u8> {
        if self.is_authenticated().await {
            AUTHENTICATED.to_vec()
        } else {
            UNAUTHENTICATED.to_vec()
        }
    }

    pub async fn read_temperature(&self) -> Result<Option<String>, SensorError> {
        let unit = {
            let state = self.state.lock().await;
            if !state.are_operations_enabled() {
                return Ok(None);
            }
            state.unit()
        };

        let celsius = self.sensor.celsius().await?;
        debug!("Sampled CPU temperature: {celsius} C");

        Ok(Some(format_temperature(celsius, unit)))
    }

    /// Returns the unit now in use if the write was applied
    pub async fn write_unit(&self, value: &[u8]) -> Option<Unit> {
        let mut state = self.state.lock().await;
        if !state.are_operations_enabled() {
            return None;
        }

        let unit = value.first().copied().and_then(Unit::from_code)?;
        state.set_unit(unit);
        info!("Temperature unit set to {}", unit.code());

        Some(unit)
    }

    pub async fn read_unit(&self) -> Option<char> {
        let state = self.state.lock().await;

        state
            .are_operations_enabled()
            .then(|| state.unit().code())
    }

    pub async fn configure_wifi(&self, payload: &[u8]) -> Result<WifiOutcome, WifiError> {
        if !self.is_authenticated().await {
            return Ok(WifiOutcome::Ignored);
        }

        let credentials = WifiCredentials::parse(payload)?;
        info!("Configuring Wi-Fi network {:?}", credentials.ssid);

        if self.wifi.apply(&credentials).await? {
            info!("Wrote {}", self.wifi.path().display());
            Ok(WifiOutcome::Written)
        } else {
            debug!("{} already up to date", self.wifi.path().display());
            Ok(WifiOutcome::Unchanged)
        }
    }
}
