use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::{dpi::PhysicalSize, window::WindowBuilder};
use channel3::framebuffer::SD_WIDTH;
use channel3::monitor::Monitor;
use channel3::picture::Picture;
use channel3::types::SignalFloat;
use channel3::{
    BroadcastConfig, Canvas, Color, FrameTimer, LoopbackOutput, SignalPolicy, Station,
    VideoStandard,
};

/// The output image width.
const OUTPUT_WIDTH: u32 = 640;

#[derive(Parser, Debug)]
#[command(name = "channel3")]
#[command(about = "Broadcast a framebuffer as analog TV and watch it on a software receiver")]
#[command(long_about = None)]
struct Args {
    /// Broadcast standard
    #[arg(short, long, value_enum, default_value_t = Standard::Ntsc)]
    standard: Standard,

    /// Image to show instead of the test pattern
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Transmission buffers in the DMA chain
    #[arg(long, default_value_t = 3)]
    pool_depth: usize,

    /// Keep the top margin black instead of gray
    #[arg(long)]
    no_gray_margin: bool,

    /// End NTSC frames on a black line instead of a white one
    #[arg(long)]
    no_white_tail: bool,

    /// Fraction of random noise mixed into the received signal
    #[arg(long, default_value_t = 0.05)]
    noise: SignalFloat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Standard {
    Ntsc,
    Pal,
}

impl From<Standard> for VideoStandard {
    fn from(standard: Standard) -> Self {
        match standard {
            Standard::Ntsc => VideoStandard::Ntsc,
            Standard::Pal => VideoStandard::Pal,
        }
    }
}

/// The frame timer, serviced by the event loop.
#[derive(Default)]
struct LoopTimer {
    period: Option<Duration>,
}

impl FrameTimer for LoopTimer {
    fn arm(&mut self, period: Duration) {
        self.period = Some(period);
    }

    fn disarm(&mut self) {
        self.period = None;
    }
}

/// Color bars on top, an animated double-density sweep underneath.
fn test_pattern() -> impl FnMut(&mut Canvas) + Send + 'static {
    let mut frame = 0usize;
    move |canvas| {
        let bars = canvas.height() / 2;
        for y in 0..bars {
            for x in 0..SD_WIDTH {
                canvas.tack_pixel(x, y, (x * 16 / SD_WIDTH) as u8);
            }
        }
        for y in bars..canvas.height() {
            for x in 0..canvas.width() {
                let lit = (x + y + frame) % 32 < 4;
                canvas.set(x, y, if lit { Color::DdWhite } else { Color::DdBlack });
            }
        }
        frame += 1;
    }
}

/// Test program.
fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging.
    env_logger::init();

    let args = Args::parse();
    let standard = VideoStandard::from(args.standard);
    let config = BroadcastConfig {
        pool_depth: args.pool_depth,
        policy: SignalPolicy {
            gray_top_margin: !args.no_gray_margin,
            ntsc_white_tail: !args.no_white_tail,
        },
        ..Default::default()
    };

    let draw: Box<dyn FnMut(&mut Canvas) + Send> = match &args.image {
        Some(path) => {
            let picture = Picture::open(path)?;
            if picture.width() > 232 {
                warn!(
                    "{} is {} pixels wide, it will be squeezed into 232",
                    path.display(),
                    picture.width()
                );
            }
            Box::new(move |canvas: &mut Canvas| picture.draw(canvas))
        }
        None => Box::new(test_pattern()),
    };

    let output = LoopbackOutput::new();
    let (mut station, mut feeder) =
        Station::init(standard, config, output, LoopTimer::default(), draw)?;
    let mut monitor = Monitor::new(standard);
    let output_height = standard.frame_lines() as u32;

    // Create event loop.
    let event_loop = EventLoop::new();

    // Create window.
    let window = {
        let size = PhysicalSize::new(1024.0, 768.0);

        WindowBuilder::new()
            .with_title("channel3")
            .with_inner_size(size)
            .with_min_inner_size(size)
            .build(&event_loop)?
    };
    window.set_resizable(false);

    // Create pixel buffer.
    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(OUTPUT_WIDTH, output_height, surface_texture)?
    };

    info!("Space toggles frame notifications, Escape quits");
    let mut next_frame = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::KeyboardInput {
                    input: KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(key),
                        ..
                    },
                    ..
                } => match key {
                    VirtualKeyCode::Escape => *control_flow = ControlFlow::Exit,
                    VirtualKeyCode::Space if station.is_broadcasting() => station.stop_broadcast(),
                    VirtualKeyCode::Space => station.start_broadcast(),
                    _ => {}
                },
                _ => {}
            },
            Event::RedrawRequested(_) => {
                let (width, height) = (OUTPUT_WIDTH as usize, output_height as usize);
                monitor.render(pixels.get_frame_mut(), width, height, args.noise);
                if let Err(err) = pixels.render() {
                    error!("Failed to render pixel buffer to screen: {err}");
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::MainEventsCleared => {
                let now = Instant::now();
                if now < next_frame {
                    *control_flow = ControlFlow::WaitUntil(next_frame);
                    return;
                }
                next_frame = now + station.timer().period.unwrap_or(standard.frame_period());

                // Play the DMA engine: one completion per line of the frame.
                for _ in 0..standard.frame_lines() {
                    feeder.on_buffer_complete();
                }
                for line in feeder.output_mut().take_lines() {
                    monitor.push_line(&line);
                }

                station.on_frame_timer();
                window.request_redraw();
                *control_flow = ControlFlow::WaitUntil(next_frame);
            }
            _ => {}
        }
    });
}
