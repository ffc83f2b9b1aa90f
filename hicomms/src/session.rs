//! Message session over one serial port
//!
//! The session decodes incoming frames, dispatches them to the handler methods, reports button
//! edges and emits periodic heartbeats. Everything runs in a single task: `Session::run` waits
//! for the next event and handles it to completion before waiting again.
//!
//! ## Input
//!
//! The read state machine waits for as many bytes as the next decode attempt needs:
//! * `AwaitingSync`: the shortest possible frame;
//! * `AwaitingFrame(n)`: the frame length known from a partial decode;
//! * `Stopped`: reception was aborted; the session waits for an explicit restart.
//!
//! Bytes that do not start a valid frame are dropped one at a time until the stream
//! resynchronizes.
//!
//! ## Output
//!
//! A message is encoded directly into the output buffer once the driver has drained the
//! previous frame. Messages sent in the meantime wait in a short queue; the queue drops new
//! messages when full.

use embassy_futures::select::{Either4, select4};
use heapless::Deque;
use hicomms_encoding::{ReadCursor, WriteCursor};

use crate::buffer::{InStream, OutStream, StreamError};
use crate::component::{Button, Led};
use crate::core::SyncPrefix;
use crate::dispatch::MsgHandler;
use crate::message::{
    ButtonState, ButtonStateChange, Heartbeat, LedStateChange, LedStateCtrl, Message,
};
use crate::port::Streams;
use crate::protocol::{ProtocolLayer, ProtocolStack, ReadError, WriteError, WriteStatus};
use crate::time::{Duration, Instant};
use crate::timer::{Timer, WaitError};

/// Number of messages that may wait for the output buffer
pub const PENDING_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct Config {
    pub heartbeat_period: Duration,
    pub sync_prefix: SyncPrefix,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_period: Duration::from_millis(2000),
            sync_prefix: SyncPrefix::DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadState {
    /// Waiting for the shortest possible frame
    AwaitingSync,
    /// Waiting until the given number of bytes is buffered
    AwaitingFrame(usize),
    /// Reception is aborted
    Stopped,
}

/// Session counters, wrapping on overflow
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    pub frames_received: u32,
    pub frames_sent: u32,
    /// Input bytes skipped while resynchronizing
    pub bytes_dropped: u32,
    /// Outgoing messages lost to a full queue, a busy buffer or an encoding failure
    pub messages_dropped: u32,
}

enum InputEvent {
    Data(Result<(), StreamError>),
    Restarted,
}

enum HeartbeatEvent {
    Tick(Result<(), WaitError>),
    Restarted,
}

pub struct Session<'a, L: Led, B: Button> {
    stack: ProtocolStack,
    rx: InStream<'a>,
    tx: OutStream<'a>,
    timer: Timer<'a>,
    read_state: ReadState,
    heartbeat_period: Duration,
    heartbeat_deadline: Option<Instant>,
    seq_num: u16,
    pending: Deque<Message, PENDING_DEPTH>,
    stats: Stats,
    led: L,
    button: B,
}

impl<'a, L: Led, B: Button> Session<'a, L, B> {
    /// Creates a session and arms the first heartbeat one period from now.
    ///
    /// Panics if a port buffer cannot hold the longest frame.
    pub fn new(streams: Streams<'a>, led: L, button: B, config: Config) -> Self {
        let stack = ProtocolStack::new(config.sync_prefix);
        assert!(streams.rx.full_capacity() >= stack.max_length());
        assert!(streams.tx.full_capacity() >= stack.max_length());

        Self {
            stack,
            rx: streams.rx,
            tx: streams.tx,
            timer: streams.timer,
            read_state: ReadState::AwaitingSync,
            heartbeat_period: config.heartbeat_period,
            heartbeat_deadline: Some(Instant::now() + config.heartbeat_period),
            seq_num: 0,
            pending: Deque::new(),
            stats: Stats::default(),
            led,
            button,
        }
    }

    pub fn read_state(&self) -> ReadState {
        self.read_state
    }

    /// Sequence number of the next heartbeat
    pub fn heartbeat_seq_num(&self) -> u16 {
        self.seq_num
    }

    /// Number of messages waiting for the output buffer
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Runs the session event loop.
    pub async fn run(&mut self) -> ! {
        info!("session started");
        loop {
            let event = {
                let input = wait_input(self.rx, self.read_state, self.stack.length());
                let heartbeat = wait_heartbeat(self.timer, self.heartbeat_deadline);
                let button = self.button.wait_for_change();
                let drain = wait_drain(self.tx, !self.pending.is_empty());
                select4(input, heartbeat, button, drain).await
            };

            match event {
                Either4::First(event) => self.on_input(event),
                Either4::Second(event) => self.on_heartbeat(event),
                Either4::Third(state) => self.on_button(state),
                Either4::Fourth(()) => self.drain_pending(),
            }
        }
    }

    fn on_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Data(Ok(())) => self.process_input(),
            InputEvent::Data(Err(StreamError::Aborted)) => {
                info!("reception stopped");
                self.read_state = ReadState::Stopped;
            }
            InputEvent::Data(Err(StreamError::Device(error))) => {
                debug!("device error {:?}, resynchronizing", error);
                self.read_state = ReadState::AwaitingSync;
            }
            InputEvent::Restarted => {
                info!("reception restarted");
                self.read_state = ReadState::AwaitingSync;
            }
        }
    }

    fn on_heartbeat(&mut self, event: HeartbeatEvent) {
        match event {
            HeartbeatEvent::Tick(Ok(())) => {
                let msg = Heartbeat {
                    seq_num: self.seq_num,
                };
                self.seq_num = self.seq_num.wrapping_add(1);
                self.send(msg.into());
                self.heartbeat_deadline = Some(Instant::now() + self.heartbeat_period);
            }
            HeartbeatEvent::Tick(Err(WaitError::Aborted)) => {
                info!("heartbeat stopped");
                self.heartbeat_deadline = None;
            }
            HeartbeatEvent::Restarted => {
                info!("heartbeat restarted");
                self.heartbeat_deadline = Some(Instant::now() + self.heartbeat_period);
            }
        }
    }

    fn on_button(&mut self, state: ButtonState) {
        debug!("button {:?}", state);
        self.send(ButtonStateChange { state }.into());
    }

    /// Decodes and dispatches all complete frames from the input buffer.
    ///
    /// Leaves the read state at the number of bytes the next attempt needs.
    pub fn process_input(&mut self) {
        loop {
            if self.rx.is_empty() {
                self.read_state = ReadState::AwaitingSync;
                return;
            }

            let stack = &mut self.stack;
            let (result, consumed) = self.rx.read(|bytes| {
                let mut cursor = ReadCursor::new(bytes);
                let result = stack.read(&mut cursor).map(|msg| *msg);
                (result, cursor.position())
            });

            match result {
                Ok(msg) => {
                    self.rx.consume(consumed);
                    self.stats.frames_received = self.stats.frames_received.wrapping_add(1);
                    trace!("received {:?}", msg);
                    msg.dispatch(self);
                }
                Err(ReadError::NotEnoughData(missing)) => {
                    // A frame at the buffer start never exceeds `max_length`, checked in `new`
                    let len = self.rx.size() + missing;
                    debug_assert!(len <= self.rx.full_capacity());
                    self.read_state = ReadState::AwaitingFrame(len);
                    return;
                }
                Err(error) => {
                    trace!("dropping a byte: {:?}", error);
                    self.drop_input_byte();
                }
            }
        }
    }

    fn drop_input_byte(&mut self) {
        self.rx.consume(1);
        self.stats.bytes_dropped = self.stats.bytes_dropped.wrapping_add(1);
    }

    /// Sends `msg` now or queues it until the output buffer is drained.
    ///
    /// Drops the message if the queue is full.
    pub fn send(&mut self, msg: Message) {
        if self.pending.is_empty() && self.tx.is_empty() {
            self.send_message(&msg);
            return;
        }
        if self.pending.push_back(msg).is_err() {
            warn!("output queue full, dropping {:?}", msg.id());
            self.count_dropped_message();
        }
    }

    /// Encodes `msg` into the output buffer and publishes it to the driver.
    ///
    /// The output buffer must be empty. A busy buffer or an encoding failure drops the message.
    pub fn send_message(&mut self, msg: &Message) {
        debug_assert!(self.tx.is_empty(), "output buffer is busy");
        if !self.tx.is_empty() {
            warn!("output buffer busy, dropping {:?}", msg.id());
            self.count_dropped_message();
            return;
        }

        let stack = &self.stack;
        let mut outcome = Ok(());
        self.tx.stage(|buf| match encode_frame(stack, msg, buf) {
            Ok(len) => len,
            Err(error) => {
                outcome = Err(error);
                0
            }
        });

        match outcome {
            Ok(()) => {
                self.tx.flush();
                self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
                trace!("sent {:?}", msg);
            }
            Err(error) => {
                self.tx.clear();
                debug!("dropping {:?}: {:?}", msg.id(), error);
                self.count_dropped_message();
            }
        }
    }

    fn count_dropped_message(&mut self) {
        self.stats.messages_dropped = self.stats.messages_dropped.wrapping_add(1);
    }

    fn drain_pending(&mut self) {
        if let Some(msg) = self.pending.pop_front() {
            self.send_message(&msg);
        }
    }
}

impl<L: Led, B: Button> MsgHandler for Session<'_, L, B> {
    fn handle_led_state_ctrl(&mut self, msg: &LedStateCtrl) {
        self.led.set(msg.state);
        let state = self.led.state();
        if state == msg.state {
            self.send(LedStateChange { state }.into());
        } else {
            warn!("LED did not follow {:?}", msg.state);
        }
    }

    fn handle_unhandled(&mut self, msg: &Message) {
        trace!("ignoring {:?}", msg.id());
    }
}

fn encode_frame(
    stack: &ProtocolStack,
    msg: &Message,
    buf: &mut [u8],
) -> Result<usize, WriteError> {
    let mut cursor = WriteCursor::new(buf);
    let status = stack.write(msg, &mut cursor)?;
    let len = cursor.position();
    if status == WriteStatus::UpdateRequired {
        stack.update(&mut buf[..len])?;
    }
    Ok(len)
}

async fn wait_input(rx: InStream<'_>, state: ReadState, sync_len: usize) -> InputEvent {
    match state {
        ReadState::AwaitingSync => InputEvent::Data(rx.wait_data_available(sync_len).await),
        ReadState::AwaitingFrame(len) => InputEvent::Data(rx.wait_data_available(len).await),
        ReadState::Stopped => {
            rx.wait_restarted().await;
            InputEvent::Restarted
        }
    }
}

async fn wait_heartbeat(timer: Timer<'_>, deadline: Option<Instant>) -> HeartbeatEvent {
    match deadline {
        Some(deadline) => HeartbeatEvent::Tick(timer.wait_until(deadline).await),
        None => {
            timer.wait_restarted().await;
            HeartbeatEvent::Restarted
        }
    }
}

async fn wait_drain(tx: OutStream<'_>, has_pending: bool) {
    if has_pending {
        tx.wait_empty().await
    } else {
        core::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use core::cell::Cell;
    use core::pin::pin;
    use core::task::Poll;
    use std::vec::Vec;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use futures_test::task::noop_context;

    use super::*;
    use crate::component::NoButton;
    use crate::link;
    use crate::message::LedState;
    use crate::port::Port;

    type TestPort = Port<CriticalSectionRawMutex, 16, 16>;

    const LED_ON_FRAME: [u8; 7] = [0x48, 0x69, 0x04, 0x03, 0x01, 0x00, 0x08];
    const LED_CHANGE_ON_FRAME: [u8; 7] = [0x48, 0x69, 0x04, 0x02, 0x01, 0x00, 0x07];
    const HEARTBEAT_FRAME: [u8; 8] = [0x48, 0x69, 0x05, 0x00, 0x01, 0x02, 0x00, 0x08];

    struct FakeLed<'a> {
        state: &'a Cell<LedState>,
        stuck: bool,
    }

    impl Led for FakeLed<'_> {
        fn on(&mut self) {
            if !self.stuck {
                self.state.set(LedState::On);
            }
        }

        fn off(&mut self) {
            if !self.stuck {
                self.state.set(LedState::Off);
            }
        }

        fn state(&self) -> LedState {
            self.state.get()
        }
    }

    struct Fixture<'a> {
        session: Session<'a, FakeLed<'a>, NoButton>,
        rx: link::Rx<'a>,
        tx: link::Tx<'a>,
    }

    fn fixture<'a, const RX: usize, const TX: usize>(
        port: &'a mut Port<CriticalSectionRawMutex, RX, TX>,
        led: &'a Cell<LedState>,
        stuck: bool,
    ) -> Fixture<'a> {
        let (link, streams, _) = port.split();
        let (rx, tx) = link.split();
        let led = FakeLed { state: led, stuck };
        let session = Session::new(streams, led, NoButton, Config::default());
        Fixture { session, rx, tx }
    }

    fn push(rx: &mut link::Rx<'_>, bytes: &[u8]) {
        let mut push = pin!(rx.push(bytes));
        assert_eq!(push.as_mut().poll(&mut noop_context()), Poll::Ready(()));
    }

    fn pop(tx: &mut link::Tx<'_>) -> Vec<u8> {
        let mut buf = [0u8; 32];
        let len = {
            let mut pop = pin!(tx.pop(&mut buf));
            match pop.as_mut().poll(&mut noop_context()) {
                Poll::Ready(len) => len,
                Poll::Pending => 0,
            }
        };
        buf[..len].to_vec()
    }

    #[test]
    fn test_led_ctrl_byte_by_byte() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut rx,
            mut tx,
        } = fixture(&mut port, &led, false);

        let (last, head) = LED_ON_FRAME.split_last().unwrap();
        for byte in head {
            push(&mut rx, &[*byte]);
            session.process_input();
            assert!(matches!(session.read_state(), ReadState::AwaitingFrame(_)));
            assert_eq!(led.get(), LedState::Off);
        }
        // Size field known: the exact frame length is awaited
        assert_eq!(session.read_state(), ReadState::AwaitingFrame(7));

        push(&mut rx, &[*last]);
        session.process_input();
        assert_eq!(session.read_state(), ReadState::AwaitingSync);
        assert_eq!(led.get(), LedState::On);
        assert_eq!(pop(&mut tx), LED_CHANGE_ON_FRAME);
        assert!(pop(&mut tx).is_empty());
        assert_eq!(session.stats().frames_received, 1);
        assert_eq!(session.stats().bytes_dropped, 0);
    }

    #[test]
    fn test_stuck_led_not_reported() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut rx,
            mut tx,
        } = fixture(&mut port, &led, true);

        push(&mut rx, &LED_ON_FRAME);
        session.process_input();
        assert_eq!(led.get(), LedState::Off);
        assert!(pop(&mut tx).is_empty());
    }

    #[test]
    fn test_garbage_before_frame() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut rx,
            ..
        } = fixture(&mut port, &led, false);

        push(&mut rx, &[0xff, 0xff]);
        push(&mut rx, &HEARTBEAT_FRAME);
        session.process_input();

        assert_eq!(session.stats().bytes_dropped, 2);
        assert_eq!(session.stats().frames_received, 1);
        assert_eq!(session.read_state(), ReadState::AwaitingSync);
    }

    #[test]
    fn test_resync_after_corrupted_frame() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut rx,
            mut tx,
        } = fixture(&mut port, &led, false);

        let mut corrupted = LED_ON_FRAME;
        corrupted[4] ^= 0x01;
        push(&mut rx, &corrupted);
        push(&mut rx, &HEARTBEAT_FRAME);
        session.process_input();

        assert_eq!(session.stats().bytes_dropped, LED_ON_FRAME.len() as u32);
        assert_eq!(session.stats().frames_received, 1);
        assert_eq!(led.get(), LedState::Off);
        assert!(pop(&mut tx).is_empty());
    }

    #[test]
    fn test_partial_frame_after_complete_one() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut rx,
            ..
        } = fixture(&mut port, &led, false);

        push(&mut rx, &HEARTBEAT_FRAME);
        push(&mut rx, &HEARTBEAT_FRAME[..3]);
        session.process_input();

        assert_eq!(session.stats().frames_received, 1);
        assert_eq!(session.read_state(), ReadState::AwaitingFrame(8));
    }

    #[test]
    fn test_longest_frame_fits_minimal_buffer() {
        let mut port = Port::<CriticalSectionRawMutex, 8, 8>::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut rx,
            ..
        } = fixture(&mut port, &led, false);

        // Garbage ahead of the frame keeps the buffer full while the frame is incomplete
        push(&mut rx, &[0xff]);
        push(&mut rx, &HEARTBEAT_FRAME[..7]);
        session.process_input();
        assert_eq!(session.stats().bytes_dropped, 1);
        assert_eq!(session.read_state(), ReadState::AwaitingFrame(8));

        push(&mut rx, &HEARTBEAT_FRAME[7..]);
        session.process_input();
        assert_eq!(session.stats().frames_received, 1);
        assert_eq!(session.read_state(), ReadState::AwaitingSync);
    }

    #[test]
    fn test_busy_output_queues() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut tx,
            ..
        } = fixture(&mut port, &led, false);

        session.send(Heartbeat { seq_num: 0x0102 }.into());
        for _ in 0..PENDING_DEPTH {
            session.send(
                LedStateChange {
                    state: LedState::On,
                }
                .into(),
            );
        }
        assert_eq!(session.pending(), PENDING_DEPTH);
        session.send(Heartbeat { seq_num: 0 }.into());
        assert_eq!(session.stats().messages_dropped, 1);

        // The frame in flight is intact
        assert_eq!(pop(&mut tx), HEARTBEAT_FRAME);
        for _ in 0..PENDING_DEPTH {
            session.drain_pending();
            assert_eq!(pop(&mut tx), LED_CHANGE_ON_FRAME);
        }
        assert_eq!(session.pending(), 0);
        assert_eq!(session.stats().frames_sent, 1 + PENDING_DEPTH as u32);
    }

    #[test]
    fn test_heartbeat_seq_num_wraps() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture {
            mut session,
            mut tx,
            ..
        } = fixture(&mut port, &led, false);

        session.seq_num = 0xffff;
        session.on_heartbeat(HeartbeatEvent::Tick(Ok(())));
        assert_eq!(
            pop(&mut tx),
            [0x48, 0x69, 0x05, 0x00, 0xff, 0xff, 0x02, 0x03]
        );
        assert_eq!(session.heartbeat_seq_num(), 0);
        assert!(session.heartbeat_deadline.is_some());

        session.on_heartbeat(HeartbeatEvent::Tick(Ok(())));
        assert_eq!(pop(&mut tx), [0x48, 0x69, 0x05, 0x00, 0x00, 0x00, 0x00, 0x05]);
        assert_eq!(session.heartbeat_seq_num(), 1);
    }

    #[test]
    fn test_cancelled_heartbeat_disarms() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture { mut session, .. } = fixture(&mut port, &led, false);

        session.on_heartbeat(HeartbeatEvent::Tick(Err(WaitError::Aborted)));
        assert_eq!(session.heartbeat_deadline, None);
        session.on_heartbeat(HeartbeatEvent::Restarted);
        assert!(session.heartbeat_deadline.is_some());
    }

    #[test]
    fn test_input_abort_and_restart() {
        let mut port = TestPort::new();
        let led = Cell::new(LedState::Off);
        let Fixture { mut session, .. } = fixture(&mut port, &led, false);

        session.on_input(InputEvent::Data(Err(StreamError::Aborted)));
        assert_eq!(session.read_state(), ReadState::Stopped);
        session.on_input(InputEvent::Restarted);
        assert_eq!(session.read_state(), ReadState::AwaitingSync);

        session.read_state = ReadState::AwaitingFrame(5);
        session.on_input(InputEvent::Data(Err(StreamError::Device(
            link::DeviceError::Noise,
        ))));
        assert_eq!(session.read_state(), ReadState::AwaitingSync);
    }
}
