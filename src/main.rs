mod capture;
mod controller;
mod grab;
mod preview;
mod session;
mod ui;

use anyhow::{Context, Result};
use capture::{CameraAccess, NokhwaAccess};
use clap::Parser;
use controller::{CaptureController, CapturePhase};
use preview::{LogSink, LoopbackSink, PreviewSink};
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use ui::Command;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// v4l2loopback device to mirror the live preview and captured still onto
    /// If not provided, preview frames are only logged
    #[arg(long)]
    preview_device: Option<String>,

    /// Preview refresh rate in frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // Logs go to stderr so stdout stays clean for prompts and data URLs
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("snapcam starting");
    tracing::info!("Preview refresh: {} fps", args.fps);

    let display: Box<dyn PreviewSink> = match &args.preview_device {
        Some(path) => Box::new(
            LoopbackSink::open(path).context("Failed to initialize v4l2loopback preview")?,
        ),
        None => {
            tracing::info!("No preview device given, preview frames are only logged");
            Box::new(LogSink::default())
        }
    };

    let mut controller = CaptureController::new(NokhwaAccess::new(), display);
    let commands = spawn_input_reader();

    run_event_loop(&mut controller, &commands, args.fps);

    // Dropping the controller releases a camera that is still previewing
    drop(controller);
    tracing::info!("snapcam stopped");

    Ok(())
}

/// Read commands from stdin on a helper thread. End of input counts as quit.
fn spawn_input_reader() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
        let _ = tx.send(Command::Quit);
    });
    rx
}

fn run_event_loop<A: CameraAccess>(
    controller: &mut CaptureController<A>,
    commands: &Receiver<Command>,
    target_fps: u32,
) {
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    render(controller);

    loop {
        let loop_start = Instant::now();

        // Only the live preview needs the loop to keep spinning between commands
        let next = if controller.phase() == CapturePhase::Previewing {
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        if let Some(command) = next {
            if !handle(controller, command) {
                break;
            }
            render(controller);
        }

        if controller.phase() == CapturePhase::Previewing {
            controller.tick();

            let elapsed = loop_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
    }
}

/// Apply one command. Returns false when the loop should stop.
fn handle<A: CameraAccess>(controller: &mut CaptureController<A>, command: Command) -> bool {
    tracing::debug!("Command {:?} while {}", command, controller.phase());
    match command {
        Command::OpenCamera => {
            controller.open_camera();
        }
        Command::TakePhoto => {
            controller.take_photo();
        }
        Command::Retake => {
            controller.retake();
        }
        Command::Show => match controller.captured_image() {
            Some(image) => println!("{}", image.data_url()),
            None => tracing::warn!("Nothing captured yet"),
        },
        Command::Quit => return false,
    }
    true
}

fn render<A: CameraAccess>(controller: &CaptureController<A>) {
    let phase = controller.phase();
    println!("({}) {}", phase, ui::prompt(phase));
}
