use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use crate::error::BroadcastError;
use crate::framebuffer::{Framebuffer, Half};
use crate::output::{OutputPeripheral, TransmissionPool};
use crate::signal::{
    LineEvent, LineGenerator, LineType, Modulator, SignalPolicy, TableCursor, VerticalTimingMap,
    VideoStandard, WaveformTable,
};

/// Frames completed since init. Written only by the feeder; the main line reads it to find out
/// which framebuffer half it may draw into.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter(Arc<AtomicU32>);

impl FrameCounter {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// The half being transmitted.
    pub fn front(&self) -> Half {
        Half::front(self.get())
    }

    /// The half that is safe to draw into.
    pub fn back(&self) -> Half {
        Half::back(self.get())
    }

    fn advance(&self) {
        self.0.fetch_add(1, Ordering::Release);
    }
}

/// The interrupt side of the broadcast: refills each transmission buffer the moment the hardware
/// releases it.
pub struct Feeder<P: OutputPeripheral> {
    output: P,
    pool: TransmissionPool,
    map: VerticalTimingMap,
    generator: LineGenerator,
    table: &'static WaveformTable,
    cursor: TableCursor,
    framebuffer: Framebuffer,
    frame: FrameCounter,
    /// Position within the frame of the next line to generate.
    signal_line: i32,
}

impl<P: OutputPeripheral> Feeder<P> {
    /// Allocate the transmission pool and attach it to `output`. Notifications stay off until
    /// [`Feeder::enable`].
    pub fn new(
        standard: VideoStandard,
        policy: SignalPolicy,
        pool_depth: usize,
        mut output: P,
        framebuffer: Framebuffer,
        frame: FrameCounter,
    ) -> Result<Self, BroadcastError> {
        let timing = standard.timing();
        let pool = TransmissionPool::new(pool_depth, timing.line_len)?;
        output.attach(&pool);

        Ok(Self {
            output,
            pool,
            map: VerticalTimingMap::for_standard(standard),
            generator: LineGenerator::new(standard, policy),
            table: WaveformTable::shared(),
            cursor: TableCursor::default(),
            framebuffer,
            frame,
            signal_line: 0,
        })
    }

    pub fn enable(&mut self) {
        self.output.set_notifications(true);
    }

    pub fn disable(&mut self) {
        self.output.set_notifications(false);
    }

    /// Completion interrupt handler. Refills the buffer the hardware just released with the next
    /// line and returns whether there was one.
    pub fn on_buffer_complete(&mut self) -> bool {
        let Some(descriptor) = self.output.acquire() else {
            return false;
        };
        let Some(buffer) = self.pool.buffer_mut(descriptor) else {
            return false;
        };

        let kind = self.map.line_type(usize::try_from(self.signal_line).unwrap_or(0));
        let front = Half::front(self.frame.get());

        let mut modulator = Modulator::new(self.table, &mut self.cursor, &mut *buffer);
        let event = self.generator.emit(kind, &mut modulator, &self.framebuffer, front);
        debug_assert_eq!(modulator.emitted(), buffer_len(&self.generator), "{kind:?} misfilled");

        self.output.mark_ready(descriptor, buffer);

        if event == LineEvent::FrameComplete {
            self.signal_line = -1;
            self.frame.advance();
        }
        self.signal_line += 1;
        true
    }

    /// The line type the next completion will generate.
    pub fn next_line_type(&self) -> LineType {
        self.map.line_type(usize::try_from(self.signal_line).unwrap_or(0))
    }

    pub fn signal_line(&self) -> i32 {
        self.signal_line
    }

    pub fn frame_number(&self) -> u32 {
        self.frame.get()
    }

    pub fn cursor(&self) -> TableCursor {
        self.cursor
    }

    pub fn pool(&self) -> &TransmissionPool {
        &self.pool
    }

    pub fn output(&self) -> &P {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut P {
        &mut self.output
    }
}

fn buffer_len(generator: &LineGenerator) -> usize {
    generator.timing().line_len
}

impl<P: OutputPeripheral> Drop for Feeder<P> {
    fn drop(&mut self) {
        // The pool goes away with us; the hardware must not raise another completion for it.
        self.output.set_notifications(false);
    }
}
