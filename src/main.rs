#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_stm32::adc::{Adc, Resolution, SampleTime};
use embassy_stm32::usart::{self, UartTx};
use embassy_time::Timer;

use adc_telemetry::config::ConfigStorage;
use adc_telemetry::telemetry::render_sample;

fn uart_config(baudrate: u32) -> usart::Config {
    let mut config = usart::Config::default();
    config.baudrate = baudrate;
    config
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfe();
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("adc-telemetry starting...");

    let p = embassy_stm32::init(Default::default());
    adc_telemetry::init_heap();
    info!("Heap: {} bytes free", adc_telemetry::heap_free());

    let device_config = ConfigStorage::load();

    let mut adc = Adc::new(p.ADC1);
    adc.set_resolution(Resolution::BITS12);
    adc.set_sample_time(SampleTime::CYCLES3);
    let mut vin = p.PA0;

    let mut tx = match UartTx::new_blocking(
        p.USART2,
        p.PA2,
        uart_config(device_config.baudrate),
    ) {
        Ok(tx) => tx,
        Err(e) => {
            error!("USART2 init failed: {:?}", e);
            halt();
        }
    };

    loop {
        let raw = adc.blocking_read(&mut vin);
        let line = render_sample(raw as u32);
        if tx.blocking_write(line.as_bytes()).is_err() {
            warn!("UART transmit failed, dropping sample");
        }
        Timer::after_millis(device_config.sample_interval_ms as u64).await;
    }
}
