use embassy_stm32::usart;

/// Default UART baud rate of a hicomms link
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Adapter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Line baud rate. Both ends must agree.
    pub baudrate: u32,
}

impl Config {
    /// Builds the peripheral configuration for `BufferedUart::new`.
    ///
    /// The frame is 8N1 without flow control.
    pub fn usart_config(&self) -> usart::Config {
        let mut config = usart::Config::default();
        config.baudrate = self.baudrate;
        config.data_bits = usart::DataBits::DataBits8;
        config.parity = usart::Parity::ParityNone;
        config.stop_bits = usart::StopBits::STOP1;
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
        }
    }
}
