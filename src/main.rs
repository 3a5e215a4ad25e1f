// Display layer demo - Main entry point
//
// Runs the display window with a producer thread generating a moving test
// pattern, standing in for the emulated GPU. The producer polls
// can_consume_frame and never blocks on the window.

use std::thread;
use std::time::Duration;

use emu_display::display::{BASE_HEIGHT, BASE_WIDTH};
use emu_display::{run_display, DisplayConfig, DisplayWindow, Frame};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = DisplayConfig::load_or_default();
    let target_fps = config.target_fps.max(1);

    let display = DisplayWindow::new(config);
    let presenter = display.presenter();

    // Stand-in renderer thread: produces frames gated by admission checks
    let producer = thread::spawn(move || {
        let frame_duration = Duration::from_micros(1_000_000 / u64::from(target_fps));
        let mut tick: u64 = 0;
        while !presenter.is_closing() {
            if presenter.can_consume_frame() {
                let frame = Frame::test_pattern(BASE_WIDTH, BASE_HEIGHT, tick);
                presenter.present_frame(frame.into_data(), BASE_WIDTH, BASE_HEIGHT, false);
                tick += 1;
                thread::sleep(frame_duration);
            } else {
                // Bounded polling interval; close() propagates within it
                thread::sleep(Duration::from_millis(1));
            }
        }
        log::info!("producer stopped after {} frames", tick);
    });

    run_display(display)?;

    producer
        .join()
        .map_err(|_| "producer thread panicked")?;

    Ok(())
}
