#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use defmt::info;
use embassy_executor::Spawner;
use embassy_stm32::adc::{Adc, Resolution, SampleTime};
use embassy_time::Timer;

// Bring-up helper: raw ADC readings over defmt only, no UART involved.
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("ADC raw dump starting...");

    let p = embassy_stm32::init(Default::default());

    let mut adc = Adc::new(p.ADC1);
    adc.set_resolution(Resolution::BITS12);
    adc.set_sample_time(SampleTime::CYCLES3);
    let mut vin = p.PA0;

    loop {
        let raw = adc.blocking_read(&mut vin);
        info!("raw: {=u16}", raw);
        Timer::after_millis(1000).await;
    }
}
