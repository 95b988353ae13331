//! Platform-specific read of a stable machine identifier.
//!
//! The vault's key derivation mixes this into the PBKDF2 input so that a
//! vault file copied to a different host cannot be decrypted even with the
//! right passphrase. This is a read-only lookup of an identifier the OS
//! already maintains; it is never written by this crate.

use crate::error::{VaultError, VaultResult};

/// Read the current machine's stable identifier.
///
/// On Linux, reads `/etc/machine-id`, falling back to
/// `/var/lib/dbus/machine-id`. On macOS, reads the `IOPlatformUUID` via
/// `ioreg`. Any other platform returns
/// [`VaultError::MachineIdUnavailable`].
///
/// # Errors
///
/// Returns [`VaultError::MachineIdUnavailable`] if no platform facility can
/// be read.
pub fn read_machine_id() -> VaultResult<String> {
    #[cfg(target_os = "linux")]
    {
        for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(contents) = std::fs::read_to_string(path) {
                let trimmed = contents.trim();
                if !trimmed.is_empty() {
                    return Ok(trimmed.to_owned());
                }
            }
        }
        Err(VaultError::MachineIdUnavailable(
            "neither /etc/machine-id nor /var/lib/dbus/machine-id is readable".to_owned(),
        ))
    }

    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .map_err(|e| VaultError::MachineIdUnavailable(e.to_string()))?;
        let text = String::from_utf8_lossy(&output.stdout);
        text.lines()
            .find_map(|line| line.split("IOPlatformUUID").nth(1))
            .and_then(|rest| rest.split('"').nth(1))
            .map(str::to_owned)
            .ok_or_else(|| {
                VaultError::MachineIdUnavailable("IOPlatformUUID not found in ioreg output".to_owned())
            })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Err(VaultError::MachineIdUnavailable(
            "no machine id facility is known for this platform".to_owned(),
        ))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn reads_a_nonempty_id_when_available() {
        if let Ok(id) = read_machine_id() {
            assert!(!id.is_empty());
        }
    }
}
