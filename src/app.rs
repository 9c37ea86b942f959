use std::time::{Duration, Instant};

use anyhow::Context;
use log::{info, warn};
use sdl2::{
    audio::AudioSpecDesired, event::Event, pixels::Color, rect::Rect, render::WindowCanvas,
};
use thiserror::Error;
use vip8::{Machine, TimerMode, DISPLAY_HEIGHT, DISPLAY_WIDTH};

use super::{
    beep::Beep,
    keymap::{Action, Keymap},
};

const TIMER_DELAY: u128 = 1_000_000 / 60;

// how much the speed changes on each up/down press
const SPEED_STEP: u32 = 60;

#[derive(Error, Debug)]
enum AppError {
    #[error("SDL error: {0}")]
    Sdl(String),
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Sdl(s)
    }
}

enum AppState {
    Running,
    Paused,
    Quit,
}

/// Driver settings taken from the command line
pub struct Settings {
    /// instructions per second
    pub speed: u32,
    /// screen pixels per chip-8 pixel
    pub zoom: usize,
}

fn cycle_delay(speed: u32) -> u128 {
    1_000_000 / speed as u128
}

fn title(speed: u32) -> String {
    format!("VIP8 - {} Hz", speed)
}

fn show_speed(canvas: &mut WindowCanvas, speed: u32) -> Result<(), anyhow::Error> {
    canvas
        .window_mut()
        .set_title(&title(speed))
        .context("error setting window title")?;
    info!("Speed set to {} instructions/s", speed);
    Ok(())
}

/// Main application loop
pub fn run(mut machine: Machine, rom: &[u8], settings: Settings) -> Result<(), anyhow::Error> {
    let Settings { mut speed, zoom } = settings;

    // initialize SDL context and subsystems
    let sdl_context = sdl2::init()
        .map_err(AppError::from)
        .context("failed to initialize SDL context")?;
    let sdl_video = sdl_context
        .video()
        .map_err(AppError::from)
        .context("failed to initialize video subsystem")?;
    let sdl_audio = sdl_context
        .audio()
        .map_err(AppError::from)
        .context("failed to initialize audio subsystem")?;

    // build the window
    let window = sdl_video
        .window(
            &title(speed),
            (DISPLAY_WIDTH * zoom) as u32,
            (DISPLAY_HEIGHT * zoom) as u32,
        )
        .position_centered()
        .build()
        .context("error creating window")?;

    // get the drawing canvas
    let mut canvas = window
        .into_canvas()
        .build()
        .context("error creating window canvas")?;

    // get the event pump
    let mut event_pump = sdl_context
        .event_pump()
        .map_err(AppError::from)
        .context("error obtaining the event pump")?;

    // desired audio spec
    let desired_spec = AudioSpecDesired {
        freq: Some(44100),
        channels: Some(1),
        samples: None,
    };

    // get sound device
    let audio_device = sdl_audio
        .open_playback(None, &desired_spec, Beep::from)
        .map_err(AppError::from)
        .context("error opening audio device")?;

    let mut state = AppState::Running;
    let keymap = Keymap::Qwerty;
    let mut previous = Instant::now();
    let mut timer_delta = 0;
    let mut cpu_delta = 0;
    let mut force_redraw = true;

    loop {
        let now = Instant::now();
        let elapsed = previous.elapsed().as_micros();
        previous = now;

        // process input events
        for event in event_pump.poll_iter() {
            match keymap.translate_action(&event) {
                Some(Action::KeypadState(key, pressed)) => machine.set_key(key, pressed),
                Some(Action::TogglePause) => {
                    state = match state {
                        AppState::Running => AppState::Paused,
                        AppState::Paused => AppState::Running,
                        AppState::Quit => AppState::Quit,
                    }
                }
                Some(Action::Reset) => {
                    machine.reset();
                    machine.load_program(rom).context("error reloading rom")?;
                    force_redraw = true;
                    info!("Machine reset");
                }
                Some(Action::SpeedUp) => {
                    speed = speed.saturating_add(SPEED_STEP);
                    show_speed(&mut canvas, speed)?;
                }
                Some(Action::SpeedDown) => {
                    speed = speed.saturating_sub(SPEED_STEP).max(SPEED_STEP);
                    show_speed(&mut canvas, speed)?;
                }
                Some(Action::Quit) => state = AppState::Quit,
                None => {
                    if let Event::Quit { .. } = event {
                        state = AppState::Quit
                    }
                }
            }
        }

        match state {
            // Only update the simulation when it is running
            AppState::Running => {
                timer_delta += elapsed;
                cpu_delta += elapsed;

                // run cpu
                let delay = cycle_delay(speed);
                while cpu_delta >= delay {
                    if let Err(err) = machine.step() {
                        warn!("Machine stopped: {}", err);
                        audio_device.pause();
                        return Err(err).context("error running rom");
                    }
                    cpu_delta -= delay;
                }

                // update timers, unless the machine does it on every step
                while timer_delta >= TIMER_DELAY {
                    if machine.timer_mode() == TimerMode::External {
                        machine.tick_timers();
                    }
                    timer_delta -= TIMER_DELAY;
                }

                if machine.sound_active() {
                    audio_device.resume()
                } else {
                    audio_device.pause()
                }
            }
            AppState::Paused => audio_device.pause(),
            // singnal to get out of the routine
            AppState::Quit => break,
        }

        // draw a frame, only when the display changed
        if machine.take_redraw() || force_redraw {
            force_redraw = false;
            canvas.set_draw_color(Color::RGB(0x00, 0x00, 0x00));
            canvas.clear();

            canvas.set_draw_color(Color::RGB(0xFF, 0xFF, 0xFF));
            for (y, row) in machine.frame_buffer().iter().enumerate() {
                for (x, _) in row.iter().enumerate().filter(|(_, on)| **on) {
                    let rect = Rect::new(
                        (x * zoom) as i32,
                        (y * zoom) as i32,
                        zoom as u32,
                        zoom as u32,
                    );
                    canvas
                        .fill_rect(rect)
                        .map_err(AppError::from)
                        .context("error drawing to canvas")?;
                }
            }
            canvas.present();
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    audio_device.pause();
    Ok(())
}
