#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_stm32::flash::Flash;

use adc_telemetry::config::{ConfigStorage, DeviceConfig};

fn halt() -> ! {
    loop {
        cortex_m::asm::wfe();
    }
}

// Erases the reserved sector, programs the default config, reads it back.
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Provisioning device config...");

    let p = embassy_stm32::init(Default::default());
    let mut flash = Flash::new_blocking(p.FLASH);

    let config = DeviceConfig::default();
    if let Err(e) = ConfigStorage::save(&mut flash, &config) {
        error!("Flash programming failed: {:?}", e);
        halt();
    }

    let loaded = ConfigStorage::load();
    if loaded.sample_interval_ms != config.sample_interval_ms
        || loaded.baudrate != config.baudrate
    {
        warn!("Read-back mismatch: {:?}", loaded);
    } else {
        info!("Provisioning complete: {:?}", loaded);
    }

    halt();
}
