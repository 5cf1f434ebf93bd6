use core::mem;

use defmt::info;

pub const DEFAULT_SAMPLE_INTERVAL_MS: u32 = 50;
pub const DEFAULT_BAUDRATE: u32 = 9600;

#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct DeviceConfig {
    pub sample_interval_ms: u32,
    pub baudrate: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            baudrate: DEFAULT_BAUDRATE,
        }
    }
}

const CONFIG_MAGIC: u32 = 0xADC0_CF61;
// Flash sector 7 on the F446RE, well clear of the firmware image.
// The offset is relative to the flash base, the address is where the
// sector is memory-mapped.
#[cfg(target_os = "none")]
const CONFIG_FLASH_OFFSET: u32 = 0x0006_0000;
#[cfg(target_os = "none")]
const CONFIG_SECTOR_END: u32 = 0x0008_0000;
const CONFIG_FLASH_ADDR: usize = 0x0806_0000;

#[repr(C)]
struct FlashConfig {
    magic: u32,
    sample_interval_ms: u32,
    baudrate: u32,
}

impl FlashConfig {
    fn from_config(config: &DeviceConfig) -> Self {
        Self {
            magic: CONFIG_MAGIC,
            sample_interval_ms: config.sample_interval_ms,
            baudrate: config.baudrate,
        }
    }

    fn to_bytes(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.sample_interval_ms.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.baudrate.to_le_bytes());
        bytes
    }

    fn to_config(&self) -> Option<DeviceConfig> {
        if self.magic != CONFIG_MAGIC {
            return None;
        }
        if self.sample_interval_ms == 0 || self.baudrate == 0 {
            return None;
        }
        Some(DeviceConfig {
            sample_interval_ms: self.sample_interval_ms,
            baudrate: self.baudrate,
        })
    }
}

const _: () = assert!(mem::size_of::<FlashConfig>() == 12);

pub struct ConfigStorage;

impl ConfigStorage {
    pub fn load() -> DeviceConfig {
        let flash_ptr = CONFIG_FLASH_ADDR as *const FlashConfig;
        let flash_config = unsafe { &*flash_ptr };

        if let Some(config) = flash_config.to_config() {
            info!(
                "Loaded config from flash: interval={}ms, baud={}",
                config.sample_interval_ms, config.baudrate
            );
            config
        } else {
            info!("No valid config in flash, using defaults");
            DeviceConfig::default()
        }
    }

    /// Erases the reserved sector and programs the config into it.
    #[cfg(target_os = "none")]
    pub fn save(
        flash: &mut embassy_stm32::flash::Flash<'_, embassy_stm32::flash::Blocking>,
        config: &DeviceConfig,
    ) -> Result<(), embassy_stm32::flash::Error> {
        let bytes = FlashConfig::from_config(config).to_bytes();

        flash.blocking_erase(CONFIG_FLASH_OFFSET, CONFIG_SECTOR_END)?;
        flash.blocking_write(CONFIG_FLASH_OFFSET, &bytes)?;

        info!(
            "Saved config to flash: interval={}ms, baud={}",
            config.sample_interval_ms, config.baudrate
        );
        Ok(())
    }
}
