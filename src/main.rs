// /src/main.rs
#![no_std]
#![no_main]

use defmt::{info, warn};
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::Read;

use smsgate::{Modem, ModemConfig, SmsOutcome};

mod gateway;
mod hardware;
mod rtc;

use crate::gateway::{CommandChannel, EventChannel, GatewayCommand, GatewayEvent, GatewayPorts};
use crate::hardware::{RxPipe, Sim800Control, Sim800Rx, UartTransport, SIM800_RX_BUFFER_SIZE};
use crate::rtc::RtcControl;

const TICK_PERIOD: Duration = Duration::from_millis(10);

// --- Global Signals/Channels ---
static CMD_CHANNEL: CommandChannel = CommandChannel::new();
static EVENT_CHANNEL: EventChannel = EventChannel::new();
static RX_PIPE: RxPipe = RxPipe::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let config = ModemConfig::default();
    let board = hardware::init(config.baud_rate);
    let rtc = RtcControl::init();

    info!("Starting smsgate...");

    spawner.spawn(rx_pump_task(board.sim800_rx)).unwrap();
    spawner
        .spawn(modem_task(board.sim800_tx, board.sim800_control, rtc, config))
        .unwrap();
}

/// Moves bytes from the UART DMA ring into the pipe the driver drains.
#[embassy_executor::task]
async fn rx_pump_task(rx: Sim800Rx) {
    let dma_buf = cortex_m::singleton!(: [u8; SIM800_RX_BUFFER_SIZE] = [0; SIM800_RX_BUFFER_SIZE]).unwrap();
    let mut ring = rx.into_ring_buffered(dma_buf);
    let mut chunk = [0u8; 32];

    loop {
        match ring.read(&mut chunk).await {
            Ok(n) => RX_PIPE.write_all(&chunk[..n]).await,
            Err(_) => warn!("UART RX overrun"),
        }
    }
}

#[embassy_executor::task]
async fn modem_task(
    tx: hardware::Sim800Tx,
    mut control: Sim800Control,
    rtc: RtcControl,
    config: ModemConfig,
) {
    control.wake().await;

    let ports = GatewayPorts::new(&EVENT_CHANNEL, rtc);
    let mut modem = Modem::new(UartTransport::new(tx, &RX_PIPE), config, ports);

    // Bring-up uses the blocking helpers; the queue stays locked until done.
    if let Err(e) = modem.initialize() {
        warn!("Modem init incomplete: {}", e);
    }
    if let Some(time) = modem.commands().ok().and_then(|mut session| session.network_time()) {
        info!("Network time: {}", time);
        modem.ports_mut().rtc_mut().set_time(time);
    }

    loop {
        match select(CMD_CHANNEL.receive(), Timer::after(TICK_PERIOD)).await {
            Either::First(command) => handle_command(&mut modem, command),
            Either::Second(()) => {}
        }

        match modem.tick(Instant::now()) {
            Ok(Some(outcome)) => report_outcome(&modem, outcome),
            Ok(None) => {}
            Err(e) => warn!("Tick skipped: {}", e),
        }
    }
}

type GatewayModem = Modem<UartTransport, GatewayPorts>;

fn handle_command(modem: &mut GatewayModem, command: GatewayCommand) {
    match command {
        GatewayCommand::SendSms(task) => {
            let accepted = modem.enqueue(&task.recipients, &task.message);
            let queued = modem.queue_size();
            modem.ports().publish(GatewayEvent::SmsQueued { accepted, queued });
        }
        GatewayCommand::SetRingThreshold(rings) => {
            if let Err(e) = modem.set_ring_threshold(rings) {
                warn!("Ring threshold {} refused: {}", rings, e);
            }
            let current = modem.ring_threshold();
            modem.ports().publish(GatewayEvent::RingThreshold(current));
        }
        GatewayCommand::ReportStatus => {
            match modem.commands().map(|mut session| session.status()) {
                Ok(status) => modem.ports().publish(GatewayEvent::Status(status)),
                Err(e) => warn!("Status query skipped: {}", e),
            }
        }
        GatewayCommand::DumpSettings => match modem.commands() {
            Ok(mut session) => session.dump_settings(),
            Err(e) => warn!("Settings dump skipped: {}", e),
        },
    }
}

fn report_outcome(modem: &GatewayModem, outcome: SmsOutcome) {
    modem.ports().publish(GatewayEvent::SmsFinished {
        recipients: outcome.task.recipients,
        ok: outcome.result.is_ok(),
    });
}
