use std::time::Duration;
use log::{debug, info};
use crate::error::BroadcastError;
use crate::feeder::{Feeder, FrameCounter};
use crate::framebuffer::{Canvas, Framebuffer, Half};
use crate::output::OutputPeripheral;
use crate::signal::{SignalPolicy, VideoStandard};

/// The periodic software timer that paces frame notifications. It calls back into
/// [`Station::on_frame_timer`] from the main line, never from the interrupt.
pub trait FrameTimer {
    fn arm(&mut self, period: Duration);
    fn disarm(&mut self);
}

/// Settings fixed at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastConfig {
    /// Transmission buffers in the circular chain. The depth beyond one is the only slack the
    /// interrupt handler has.
    pub pool_depth: usize,
    pub policy: SignalPolicy,
    /// Zero the back half before handing it to the draw callback.
    pub clear_back_buffer: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            pool_depth: 3,
            policy: SignalPolicy::default(),
            clear_back_buffer: true,
        }
    }
}

/// Called once per completed frame with the half that is now safe to draw into.
pub type DrawCallback = Box<dyn FnMut(&mut Canvas) + Send>;

/// The main-line side of a broadcast: the framebuffer, the frame counter the feeder advances, and
/// the frame timer. The [`Feeder`] handed out by [`Station::init`] belongs to the interrupt; the
/// two sides share only atomics.
pub struct Station<T: FrameTimer> {
    standard: VideoStandard,
    config: BroadcastConfig,
    framebuffer: Framebuffer,
    frame: FrameCounter,
    timer: T,
    broadcasting: bool,
    drawn: Option<Half>,
    on_frame: DrawCallback,
}

impl<T: FrameTimer> Station<T> {
    /// Allocate everything, enable the completion interrupt and arm the frame timer. Nothing is
    /// enabled if an allocation fails.
    ///
    /// Install the returned feeder as the completion interrupt handler.
    pub fn init<P, F>(
        standard: VideoStandard,
        config: BroadcastConfig,
        output: P,
        timer: T,
        on_frame: F,
    ) -> Result<(Self, Feeder<P>), BroadcastError>
    where
        P: OutputPeripheral,
        F: FnMut(&mut Canvas) + Send + 'static,
    {
        let framebuffer = Framebuffer::new(standard)?;
        let frame = FrameCounter::default();
        let mut feeder = Feeder::new(
            standard,
            config.policy,
            config.pool_depth,
            output,
            framebuffer.clone(),
            frame.clone(),
        )?;
        feeder.enable();

        info!(
            "Broadcasting {:?}: {}x{} framebuffer ({} bytes), {} buffers of {} samples",
            standard,
            framebuffer.width(),
            framebuffer.height(),
            framebuffer.storage_bytes(),
            feeder.pool().depth(),
            feeder.pool().line_len(),
        );

        let mut station = Self {
            standard,
            config,
            framebuffer,
            frame,
            timer,
            broadcasting: false,
            drawn: None,
            on_frame: Box::new(on_frame),
        };
        station.start_broadcast();
        Ok((station, feeder))
    }

    /// Disarm the timer, disable the interrupt and free the transmission pool, then the
    /// framebuffer.
    pub fn deinit<P: OutputPeripheral>(mut self, mut feeder: Feeder<P>) {
        info!("Shutting down {:?} broadcast after {} frames", self.standard, self.frame.get());
        self.stop_broadcast();
        feeder.disable();
        drop(feeder);
        drop(self);
    }

    /// Arm the frame timer. Does nothing if it is already armed.
    pub fn start_broadcast(&mut self) {
        if self.broadcasting {
            return;
        }
        let period = self.standard.frame_period();
        info!("Frame notifications every {}ms", period.as_millis());
        self.timer.arm(period);
        self.broadcasting = true;
    }

    /// Disarm the frame timer. Does nothing if it is already disarmed. The signal itself keeps
    /// going, showing whatever was last drawn.
    pub fn stop_broadcast(&mut self) {
        if !self.broadcasting {
            return;
        }
        info!("Frame notifications stopped");
        self.timer.disarm();
        self.broadcasting = false;
    }

    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting
    }

    /// Timer handler. If the feeder moved on to a new frame since the last call, hand the
    /// now-free half to the draw callback. Returns whether the callback ran.
    pub fn on_frame_timer(&mut self) -> bool {
        if !self.broadcasting {
            return false;
        }
        let back = self.frame.back();
        if self.drawn == Some(back) {
            return false;
        }
        self.drawn = Some(back);

        debug!("Frame {} on air, drawing into half {:?}", self.frame.get(), back);
        let mut canvas = Canvas::new(self.framebuffer.clone(), back);
        if self.config.clear_back_buffer {
            canvas.clear();
        }
        (self.on_frame)(&mut canvas);
        true
    }

    pub fn standard(&self) -> VideoStandard {
        self.standard
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    pub fn frame_number(&self) -> u32 {
        self.frame.get()
    }

    pub fn width(&self) -> usize {
        self.framebuffer.width()
    }

    pub fn height(&self) -> usize {
        self.framebuffer.height()
    }

    /// The half that may be drawn into right now.
    pub fn back_half(&self) -> Half {
        self.frame.back()
    }

    /// A canvas on the current back half, for drawing outside the callback.
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.framebuffer.clone(), self.frame.back())
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

impl<T: FrameTimer> Drop for Station<T> {
    fn drop(&mut self) {
        // The framebuffer is shared with the feeder and outlives us while it runs; the pool is
        // the feeder's own and goes with it.
        self.stop_broadcast();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use crate::framebuffer::Color;
    use crate::output::LoopbackOutput;
    use crate::signal::{Level, WaveformTable, TABLE_ENTRIES};
    use crate::types::Sample;

    #[derive(Default)]
    struct CountingTimer {
        armed: Rc<Cell<bool>>,
        arms: Cell<u32>,
        disarms: Cell<u32>,
        period: Option<Duration>,
    }

    impl FrameTimer for CountingTimer {
        fn arm(&mut self, period: Duration) {
            self.armed.set(true);
            self.arms.set(self.arms.get() + 1);
            self.period = Some(period);
        }

        fn disarm(&mut self) {
            self.armed.set(false);
            self.disarms.set(self.disarms.get() + 1);
        }
    }

    type TestStation = Station<CountingTimer>;
    type TestFeeder = Feeder<LoopbackOutput>;

    fn station<F>(standard: VideoStandard, draw: F) -> (TestStation, TestFeeder)
    where
        F: FnMut(&mut Canvas) + Send + 'static,
    {
        let output = LoopbackOutput::new();
        Station::init(standard, BroadcastConfig::default(), output, CountingTimer::default(), draw)
            .unwrap()
    }

    fn run_frame(feeder: &mut TestFeeder) -> Vec<Vec<Sample>> {
        let start = feeder.frame_number();
        while feeder.frame_number() == start {
            assert!(feeder.on_buffer_complete());
        }
        feeder.output_mut().take_lines()
    }

    #[test]
    fn init_arms_timer_and_interrupt() {
        let (station, feeder) = station(VideoStandard::Pal, |_| {});
        assert!(station.is_broadcasting());
        assert!(feeder.output().notifications_enabled());
        assert_eq!(station.timer().period, Some(Duration::from_millis(20)));
        assert_eq!(station.width(), 232);
        assert_eq!(station.height(), 264);
    }

    #[test]
    fn shallow_pool_is_rejected() {
        let config = BroadcastConfig { pool_depth: 1, ..Default::default() };
        let output = LoopbackOutput::new();
        let timer = CountingTimer::default();
        let result = Station::init(VideoStandard::Ntsc, config, output, timer, |_| {});
        assert_eq!(result.err(), Some(BroadcastError::PoolTooShallow(1)));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (mut station, _feeder) = station(VideoStandard::Ntsc, |_| {});
        assert_eq!(station.timer().arms.get(), 1);

        station.start_broadcast();
        assert_eq!(station.timer().arms.get(), 1);

        station.stop_broadcast();
        station.stop_broadcast();
        assert_eq!(station.timer().disarms.get(), 1);
        assert!(!station.is_broadcasting());

        station.start_broadcast();
        station.start_broadcast();
        assert_eq!(station.timer().arms.get(), 2);
        assert!(station.is_broadcasting());
    }

    #[test]
    fn deinit_disarms_the_timer() {
        let armed = Rc::new(Cell::new(false));
        let timer = CountingTimer { armed: armed.clone(), ..Default::default() };
        let output = LoopbackOutput::new();
        let (station, feeder) =
            Station::init(VideoStandard::Ntsc, BroadcastConfig::default(), output, timer, |_| {})
                .unwrap();
        assert!(armed.get());
        station.deinit(feeder);
        assert!(!armed.get());
    }

    #[test]
    fn callback_once_per_frame() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let (mut station, mut feeder) = station(VideoStandard::Ntsc, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(station.on_frame_timer());
        assert!(!station.on_frame_timer());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        for frame in 1..=3 {
            run_frame(&mut feeder);
            assert!(station.on_frame_timer());
            assert!(!station.on_frame_timer());
            assert_eq!(calls.load(Ordering::SeqCst), frame + 1);
        }
    }

    #[test]
    fn callback_gets_the_back_half() {
        let halves = Arc::new(Mutex::new(Vec::new()));
        let seen = halves.clone();
        let (mut station, mut feeder) = station(VideoStandard::Pal, move |canvas| {
            seen.lock().unwrap().push(canvas.half());
        });
        for _ in 0..3 {
            station.on_frame_timer();
            run_frame(&mut feeder);
        }
        assert_eq!(*halves.lock().unwrap(), [Half::B, Half::A, Half::B]);
    }

    #[test]
    fn stopped_station_does_not_notify() {
        let (mut station, mut feeder) =
            station(VideoStandard::Ntsc, |_| panic!("no frames while stopped"));
        station.stop_broadcast();
        assert!(!station.on_frame_timer());
        // The signal keeps going.
        run_frame(&mut feeder);
        assert_eq!(station.frame_number(), 1);
    }

    #[test]
    fn back_half_is_cleared_before_drawing() {
        let (mut station, _feeder) = station(VideoStandard::Ntsc, |canvas| {
            assert_eq!(canvas.pixel(0, 0), Some(0));
        });
        station.canvas().tack_pixel(0, 0, 3);
        assert!(station.on_frame_timer());
    }

    #[test]
    fn feeder_runs_on_its_own_thread() {
        let (mut station, mut feeder) = station(VideoStandard::Ntsc, |canvas| {
            canvas.set(0, 0, Color::DdWhite);
        });

        let interrupt = thread::spawn(move || {
            for _ in 0..3 {
                run_frame(&mut feeder);
            }
            feeder
        });
        while !interrupt.is_finished() {
            station.on_frame_timer();
            thread::yield_now();
        }
        let feeder = interrupt.join().unwrap();

        assert_eq!(station.frame_number(), 3);
        assert_eq!(feeder.frame_number(), 3);
        assert_eq!(station.back_half(), Half::A);
        station.deinit(feeder);
    }

    #[test]
    fn single_white_pixel_end_to_end() {
        let (mut black, mut black_feeder) = station(VideoStandard::Ntsc, |_| {});
        let (mut white, mut white_feeder) =
            station(VideoStandard::Ntsc, |canvas| canvas.set(0, 0, Color::DdWhite));

        // Frame 0 shows half A for both; the callbacks fill half B for frame 1.
        assert!(black.on_frame_timer());
        assert!(white.on_frame_timer());
        run_frame(&mut black_feeder);
        run_frame(&mut white_feeder);

        let expected = run_frame(&mut black_feeder);
        let actual = run_frame(&mut white_feeder);
        assert_eq!(expected.len(), 525);
        assert_eq!(actual.len(), 525);

        let mut differences = Vec::new();
        for (line, (a, b)) in expected.iter().zip(&actual).enumerate() {
            for (offset, (x, y)) in a.iter().zip(b).enumerate() {
                if x != y {
                    differences.push((line, offset));
                }
            }
        }

        // Both fields repeat framebuffer row 0 on their first active line.
        let picture_start = 12 + 1 + 4 + 11;
        assert_eq!(differences, [(20, picture_start), (283, picture_start)]);

        let table = WaveformTable::shared();
        for (line, offset) in differences {
            let entry = ((525 + line) * 159 + offset) % TABLE_ENTRIES;
            assert_eq!(actual[line][offset], table.sample(entry, Level::Pixel(1)));
            assert_eq!(expected[line][offset], table.sample(entry, Level::Pixel(0)));
        }
    }
}
