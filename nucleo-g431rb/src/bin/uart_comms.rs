//! LED control and button reporting over the ST-LINK virtual COM port.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::usart::{self, BufferedUart};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use hicomms::port::Port;
use hicomms::session::{Config, Session};
use hicomms_stm32_embassy as hicomms_stm32;
use nucleo_g431rb::board::{self, OnBoardLed, UserButton};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    LPUART1 => usart::BufferedInterruptHandler<peripherals::LPUART1>;
});

const UART_BUFFER_LEN: usize = 64;
const PORT_BUFFER_LEN: usize = 32;

type BoardPort = Port<ThreadModeRawMutex, PORT_BUFFER_LEN, PORT_BUFFER_LEN>;
type BoardSession = Session<'static, OnBoardLed<'static>, UserButton<'static>>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(board::make_peripheral_config());

    let uart = {
        static TX_BUF: StaticCell<[u8; UART_BUFFER_LEN]> = StaticCell::new();
        static RX_BUF: StaticCell<[u8; UART_BUFFER_LEN]> = StaticCell::new();
        let tx_buf = TX_BUF.init([0; UART_BUFFER_LEN]);
        let rx_buf = RX_BUF.init([0; UART_BUFFER_LEN]);
        unwrap!(BufferedUart::new(
            p.LPUART1,
            p.PA3,
            p.PA2,
            tx_buf,
            rx_buf,
            Irqs,
            board::make_uart_config().usart_config(),
        ))
    };

    let (link, streams, _control) = {
        static CELL: StaticCell<BoardPort> = StaticCell::new();
        CELL.init(Port::new()).split()
    };

    let (rx, tx) = hicomms_stm32::bind(uart, link);
    unwrap!(spawner.spawn(driver_rx_runner(rx)));
    unwrap!(spawner.spawn(driver_tx_runner(tx)));

    let led = OnBoardLed::new(p.PA5);
    let button = board::make_user_button(p.PC13, p.EXTI13);
    let session = Session::new(streams, led, button, Config::default());
    unwrap!(spawner.spawn(session_runner(session)));

    info!("hicomms session started");
}

#[embassy_executor::task]
async fn session_runner(mut session: BoardSession) {
    session.run().await
}

#[embassy_executor::task]
async fn driver_rx_runner(mut runner: hicomms_stm32::RxRunner<'static>) {
    runner.run().await
}

#[embassy_executor::task]
async fn driver_tx_runner(mut runner: hicomms_stm32::TxRunner<'static>) {
    runner.run().await
}
