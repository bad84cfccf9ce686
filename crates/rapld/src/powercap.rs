use std::io::Write;
use std::path::Path;

use tracing::warn;

use joule_core::JouleError;

/// Base of the kernel's power-capping sysfs, see
/// https://www.kernel.org/doc/html/latest/power/powercap/powercap.html
pub const POWERCAP_DIR: &str = "/sys/class/powercap/";

const RAPL_PREFIX: &str = "intel-rapl";

// constraint_0 is the long window; constraint_1 would be the short one.
const MAX_POWER_FILE: &str = "constraint_0_max_power_uw";
const POWER_LIMIT_FILE: &str = "constraint_0_power_limit_uw";

/// Cap every RAPL power zone under `base` to `percentage` of its maximum.
///
/// Zones are directories of the form `intel-rapl:X`; sub-zones
/// (`intel-rapl:X:Y`) are left alone. A zone that cannot be read or written
/// is logged and skipped, the remaining zones are still capped.
pub fn cap_node(base: &Path, percentage: i64) -> Result<(), JouleError> {
    if percentage <= 0 || percentage > 100 {
        return Err(JouleError::InvalidPercentage(percentage));
    }

    for entry in std::fs::read_dir(base)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        let fields: Vec<&str> = name.split(':').collect();
        if fields.len() != 2 || fields[0] != RAPL_PREFIX {
            continue;
        }

        let max = match max_power(&entry.path().join(MAX_POWER_FILE)) {
            Ok(max) => max,
            Err(e) => {
                warn!("Unable to read max power for zone {}: {}", name, e);
                continue;
            }
        };

        // Floats sidestep an integer overflow on the multiply.
        let limit = (max as f64 * (percentage as f64 / 100.0)).ceil() as u64;
        if let Err(e) = cap_zone(&entry.path().join(POWER_LIMIT_FILE), limit) {
            warn!("Unable to write power limit for zone {}: {}", name, e);
        }
    }

    Ok(())
}

/// Maximum microwatts a power zone can draw over the long window.
fn max_power(max_file: &Path) -> Result<u64, JouleError> {
    let contents = std::fs::read_to_string(max_file)?;
    contents
        .trim()
        .parse::<u64>()
        .map_err(|e| JouleError::Rapl(format!("{}: {}", max_file.display(), e)))
}

/// Write the microwatt limit into an existing zone constraint file.
fn cap_zone(limit_file: &Path, microwatts: u64) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(limit_file)?;
    file.write_all(microwatts.to_string().as_bytes())
}
