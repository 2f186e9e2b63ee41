// /src/hardware.rs
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::mode::Async;
use embassy_stm32::peripherals;
use embassy_stm32::rcc::{Hse, HseMode, Pll, PllMul, PllPreDiv, PllSource, Sysclk};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{Config as UartConfig, Uart, UartRx, UartTx};
use embassy_stm32::{bind_interrupts, usart, Config};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_time::{Duration, Timer};
use defmt::{info, warn};

use smsgate::Transport;

bind_interrupts!(pub struct Irqs {
    USART2 => usart::InterruptHandler<peripherals::USART2>;
});

pub const SIM800_RX_BUFFER_SIZE: usize = 256;

pub type Sim800Tx = UartTx<'static, Async>;
pub type Sim800Rx = UartRx<'static, Async>;

/// Bytes moved out of the DMA ring by the RX pump, waiting for the next tick.
pub type RxPipe = Pipe<CriticalSectionRawMutex, SIM800_RX_BUFFER_SIZE>;

pub struct Sim800Control {
    pub sim800_enable: Output<'static>,
    pub sim800_ttl: Output<'static>,
    /// DTR line of the RS232 level shifter; a low pulse wakes the modem.
    pub dtr: Output<'static>,
}

impl Sim800Control {
    pub async fn wake(&mut self) {
        self.dtr.set_low();
        Timer::after(Duration::from_secs(2)).await;
        self.dtr.set_high();
    }
}

pub struct Board {
    pub sim800_tx: Sim800Tx,
    pub sim800_rx: Sim800Rx,
    pub sim800_control: Sim800Control,
}

pub fn init(baud_rate: u32) -> Board {
    // 1. Clock Configuration
    let mut config = Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz::mhz(8),
        mode: HseMode::Bypass,
    });
    config.rcc.pll = Some(Pll {
        src: PllSource::HSE,
        prediv: PllPreDiv::DIV1,
        mul: PllMul::MUL6,
    });
    config.rcc.sys = Sysclk::PLL1_P;

    let p = embassy_stm32::init(config);
    info!("Hardware initialized! Clocked at 48MHz");

    // 2. SIM800 power and level shifter control
    let sim800_enable = Output::new(p.PC6, Level::High, Speed::Low);
    let sim800_ttl = Output::new(p.PC7, Level::Low, Speed::Low);
    let dtr = Output::new(p.PB0, Level::High, Speed::Low);

    // 3. USART2 to the modem
    let mut config_u2 = UartConfig::default();
    config_u2.baudrate = baud_rate;
    let uart2 = Uart::new(
        p.USART2,
        p.PA3, p.PA2,
        Irqs,
        p.DMA1_CH4, p.DMA1_CH5,
        config_u2,
    ).unwrap();
    let (sim800_tx, sim800_rx) = uart2.split();

    Board {
        sim800_tx,
        sim800_rx,
        sim800_control: Sim800Control {
            sim800_enable,
            sim800_ttl,
            dtr,
        },
    }
}

/// Non-blocking modem link: writes go straight to the UART, reads come out
/// of the pipe filled by the RX pump task.
pub struct UartTransport {
    tx: Sim800Tx,
    rx: &'static RxPipe,
}

impl UartTransport {
    pub fn new(tx: Sim800Tx, rx: &'static RxPipe) -> Self {
        Self { tx, rx }
    }
}

impl Transport for UartTransport {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.rx.try_read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.tx.blocking_write(bytes).is_err() {
            warn!("UART write failed");
        }
    }
}
