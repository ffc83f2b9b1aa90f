use embassy_stm32::usart::{self, BufferedUart, BufferedUartRx, BufferedUartTx};
use embedded_io_async::{Read, Write};
use hicomms_driver::link::{self, DeviceError};

// Chunk sizes only bound the copy granularity; the UART ring buffers absorb bursts
const RX_CHUNK_LEN: usize = 16;
const TX_CHUNK_LEN: usize = 16;

/// Connect the UART driver to the link.
///
/// Run the produced runners for proper operation. The UART must be configured beforehand, see
/// [`Config::usart_config`](crate::config::Config::usart_config).
pub fn bind<'a>(uart: BufferedUart<'a>, link: link::Link<'a>) -> (RxRunner<'a>, TxRunner<'a>) {
    let (uart_tx, uart_rx) = uart.split();
    let (link_rx, link_tx) = link.split();
    let rx_runner = RxRunner {
        uart: uart_rx,
        link: link_rx,
    };
    let tx_runner = TxRunner {
        uart: uart_tx,
        link: link_tx,
    };
    (rx_runner, tx_runner)
}

/// Byte receiving runner.
///
/// Run for proper driver operation.
pub struct RxRunner<'a> {
    uart: BufferedUartRx<'a>,
    link: link::Rx<'a>,
}

impl<'a> RxRunner<'a> {
    pub async fn run(&mut self) -> ! {
        let mut buf = [0u8; RX_CHUNK_LEN];
        loop {
            match self.uart.read(&mut buf).await {
                Ok(len) => self.link.push(&buf[..len]).await,
                Err(err) => {
                    let error = convert_error(err);
                    warn!("UART receive error: {:?}", error);
                    self.link.push_error(error);
                }
            }
        }
    }
}

/// Byte transmitting runner.
///
/// Run for proper driver operation.
pub struct TxRunner<'a> {
    uart: BufferedUartTx<'a>,
    link: link::Tx<'a>,
}

impl<'a> TxRunner<'a> {
    pub async fn run(&mut self) -> ! {
        let mut buf = [0u8; TX_CHUNK_LEN];
        loop {
            let len = self.link.pop(&mut buf).await;
            // The stack does not retransmit; a failed chunk is lost
            if let Err(err) = self.uart.write_all(&buf[..len]).await {
                warn!("UART transmit error: {:?}", convert_error(err));
            }
        }
    }
}

fn convert_error(error: usart::Error) -> DeviceError {
    match error {
        usart::Error::Overrun => DeviceError::Overrun,
        usart::Error::Framing => DeviceError::Framing,
        usart::Error::Parity => DeviceError::Parity,
        usart::Error::Noise => DeviceError::Noise,
        other => {
            // Bytes may have been lost; the session resyncs the same way as on an overrun
            warn!("unmapped UART error {:?}, reported as overrun", other);
            DeviceError::Overrun
        }
    }
}
