use core::fmt::Write;

use heapless::String;

/// Fits `"ADC: "` plus the ten digits of a full `u32` plus CRLF.
pub const LINE_CAPACITY: usize = 20;

/// Renders one sample as the serial line `ADC: <value>\r\n`.
pub fn render_sample(raw: u32) -> String<LINE_CAPACITY> {
    let mut line = String::new();
    let _ = write!(line, "ADC: {}\r\n", raw);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sample_line() {
        assert_eq!(render_sample(1234).as_str(), "ADC: 1234\r\n");
    }

    #[test]
    fn renders_zero_and_full_scale() {
        assert_eq!(render_sample(0).as_str(), "ADC: 0\r\n");
        assert_eq!(render_sample(4095).as_str(), "ADC: 4095\r\n");
    }

    #[test]
    fn widest_value_fits_the_buffer() {
        let line = render_sample(u32::MAX);
        assert_eq!(line.as_str(), "ADC: 4294967295\r\n");
        assert_eq!(line.len(), 17);
    }
}
