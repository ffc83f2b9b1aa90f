use embassy_stm32::Peri;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::peripherals::{EXTI13, PA5, PC13};
use embassy_time::Duration;
use hicomms::component::{ButtonInput, Debounced, Led};
use hicomms::message::LedState;

const DEBOUNCE_DELAY: Duration = Duration::from_millis(20);

pub fn make_peripheral_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc;
    use embassy_stm32::time::Hertz;

    let mut config = embassy_stm32::Config::default();
    config.rcc.hsi = false;
    config.rcc.hse = Some(rcc::Hse {
        freq: Hertz::mhz(24),
        mode: rcc::HseMode::Oscillator,
    });
    config.rcc.pll = Some(rcc::Pll {
        source: rcc::PllSource::HSE,
        prediv: rcc::PllPreDiv::DIV6,
        mul: rcc::PllMul::MUL85, // 340 MHz
        divp: None,
        divq: None,
        divr: Some(rcc::PllRDiv::DIV2), // 170 MHz sysclock
    });
    config.rcc.sys = rcc::Sysclk::PLL1_R;
    config.rcc.boost = true; // Required for freq > 150MHz
    config
}

pub fn make_uart_config() -> hicomms_stm32_embassy::config::Config {
    hicomms_stm32_embassy::config::Config::default()
}

/// User LED LD2 (PA5, active high)
pub struct OnBoardLed<'d> {
    output: Output<'d>,
}

impl<'d> OnBoardLed<'d> {
    pub fn new(pin: Peri<'d, PA5>) -> Self {
        Self {
            output: Output::new(pin, Level::Low, Speed::Low),
        }
    }
}

impl Led for OnBoardLed<'_> {
    fn on(&mut self) {
        self.output.set_high();
    }

    fn off(&mut self) {
        self.output.set_low();
    }

    fn state(&self) -> LedState {
        if self.output.is_set_high() {
            LedState::On
        } else {
            LedState::Off
        }
    }
}

/// Contact of the user button B1 (PC13, high while pressed)
pub struct UserButtonInput<'d> {
    input: ExtiInput<'d>,
}

impl ButtonInput for UserButtonInput<'_> {
    fn is_pressed(&self) -> bool {
        self.input.is_high()
    }

    async fn wait_for_edge(&mut self) {
        self.input.wait_for_any_edge().await
    }
}

/// Debounced user button B1
pub type UserButton<'d> = Debounced<UserButtonInput<'d>>;

pub fn make_user_button<'d>(pin: Peri<'d, PC13>, channel: Peri<'d, EXTI13>) -> UserButton<'d> {
    let input = ExtiInput::new(pin, channel, Pull::Down);
    Debounced::new(UserButtonInput { input }, DEBOUNCE_DELAY)
}
