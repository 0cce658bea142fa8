//! NVS persistence for network settings with schema versioning.
//!
//! Compile-time defaults cover development builds. A provisioned device keeps
//! its Wi-Fi credentials and hub URL in the `satellite` NVS namespace; any key
//! present there overrides the default.
//!
//! # Version History
//!
//! - **v1** (current): `ssid`, `password`, `server_url`

use core::cmp::Ordering;

use thiserror::Error;

use super::NetworkSettings;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// Current NVS schema version for network settings
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// NVS namespace for satellite configuration
pub const NVS_NAMESPACE: &str = "satellite";

const VERSION_KEY: &str = "schema_ver";
const SSID_KEY: &str = "ssid";
const PASSWORD_KEY: &str = "password";
const URL_KEY: &str = "server_url";

/// Longest string value read back from NVS (URL is the largest).
#[cfg(target_os = "espidf")]
const MAX_VALUE_LEN: usize = 160;

/// Handle to the NVS partition.
#[cfg(target_os = "espidf")]
pub type Partition = EspDefaultNvsPartition;

/// No flash on host builds.
#[cfg(not(target_os = "espidf"))]
pub type Partition = ();

/// Outcome of loading settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResult {
    /// Nothing stored yet, defaults kept
    FreshInstall,
    /// Stored settings applied
    UpToDate,
}

/// NVS operation errors
#[derive(Debug, Error)]
pub enum NvsError {
    /// NVS initialization failed
    #[cfg(target_os = "espidf")]
    #[error("NVS init failed: {0}")]
    InitFailed(EspError),
    /// Schema version too new (downgrade not supported)
    #[error("stored schema v{stored_version} is newer than supported v{}", CURRENT_SCHEMA_VERSION)]
    TooNew { stored_version: u32 },
    /// NVS read/write error
    #[cfg(target_os = "espidf")]
    #[error("NVS I/O error: {0}")]
    IoError(EspError),
    /// Value does not fit the NVS string limits
    #[error("value for {key} is too long ({len} bytes)")]
    ValueTooLong { key: &'static str, len: usize },
    /// Feature not available on this platform
    #[cfg(not(target_os = "espidf"))]
    #[error("NVS is not available on this platform")]
    NotAvailable,
}

#[cfg(target_os = "espidf")]
impl From<EspError> for NvsError {
    fn from(e: EspError) -> Self {
        NvsError::IoError(e)
    }
}

/// Decide what to do with a stored schema version.
///
/// `0` means the key is absent. Only v1 exists, so anything older than
/// current but non-zero cannot occur yet and is treated as fresh.
pub fn check_schema(stored_version: u32) -> Result<LoadResult, NvsError> {
    match stored_version.cmp(&CURRENT_SCHEMA_VERSION) {
        Ordering::Equal => Ok(LoadResult::UpToDate),
        Ordering::Less => Ok(LoadResult::FreshInstall),
        Ordering::Greater => Err(NvsError::TooNew { stored_version }),
    }
}

/// Overlay stored values onto `settings`. Empty values are ignored.
pub fn apply_overrides(
    settings: &mut NetworkSettings,
    ssid: Option<&str>,
    password: Option<&str>,
    server_url: Option<&str>,
) {
    let pairs = [
        (&mut settings.wifi_ssid, ssid),
        (&mut settings.wifi_password, password),
        (&mut settings.server_url, server_url),
    ];
    for (slot, value) in pairs {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            *slot = v.to_string();
        }
    }
}

/// Load network settings from NVS on top of the compile-time defaults.
#[cfg(target_os = "espidf")]
pub fn load_network_settings(
    partition: Partition,
    settings: &mut NetworkSettings,
) -> Result<LoadResult, NvsError> {
    let storage = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)?;

    let stored_version = storage.get_u32(VERSION_KEY)?.unwrap_or(0);
    let result = check_schema(stored_version)?;
    if result == LoadResult::UpToDate {
        load_v1(&storage, settings)?;
    }
    Ok(result)
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn load_network_settings(
    _partition: Partition,
    _settings: &mut NetworkSettings,
) -> Result<LoadResult, NvsError> {
    Err(NvsError::NotAvailable)
}

/// Save network settings to NVS with version stamp
#[cfg(target_os = "espidf")]
pub fn save_network_settings(
    partition: Partition,
    settings: &NetworkSettings,
) -> Result<(), NvsError> {
    check_lengths(settings)?;

    let mut storage =
        EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)?;

    storage.set_u32(VERSION_KEY, CURRENT_SCHEMA_VERSION)?;
    storage.set_str(SSID_KEY, &settings.wifi_ssid)?;
    storage.set_str(PASSWORD_KEY, &settings.wifi_password)?;
    storage.set_str(URL_KEY, &settings.server_url)?;

    Ok(())
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn save_network_settings(
    _partition: Partition,
    settings: &NetworkSettings,
) -> Result<(), NvsError> {
    check_lengths(settings)?;
    Err(NvsError::NotAvailable)
}

/// Reject values the readers could not read back.
pub fn check_lengths(settings: &NetworkSettings) -> Result<(), NvsError> {
    // 802.11 limits, and the read buffer for the URL
    for (key, value, max) in [
        (SSID_KEY, &settings.wifi_ssid, 32),
        (PASSWORD_KEY, &settings.wifi_password, 64),
        (URL_KEY, &settings.server_url, 159),
    ] {
        if value.len() > max {
            return Err(NvsError::ValueTooLong { key, len: value.len() });
        }
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
fn load_v1(storage: &EspNvs<NvsDefault>, settings: &mut NetworkSettings) -> Result<(), NvsError> {
    let mut ssid_buf = [0u8; MAX_VALUE_LEN];
    let mut pass_buf = [0u8; MAX_VALUE_LEN];
    let mut url_buf = [0u8; MAX_VALUE_LEN];

    let ssid = storage.get_str(SSID_KEY, &mut ssid_buf)?;
    let password = storage.get_str(PASSWORD_KEY, &mut pass_buf)?;
    let url = storage.get_str(URL_KEY, &mut url_buf)?;

    apply_overrides(settings, ssid, password, url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_constant() {
        assert_eq!(CURRENT_SCHEMA_VERSION, 1);
    }

    #[test]
    fn test_nvs_namespace_fits_limit() {
        // NVS namespace names are limited to 15 characters
        assert!(NVS_NAMESPACE.len() <= 15);
    }

    #[test]
    fn test_check_schema() {
        assert_eq!(check_schema(0).unwrap(), LoadResult::FreshInstall);
        assert_eq!(check_schema(1).unwrap(), LoadResult::UpToDate);
        assert!(matches!(
            check_schema(7),
            Err(NvsError::TooNew { stored_version: 7 })
        ));
    }
}
