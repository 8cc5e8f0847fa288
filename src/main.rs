use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam_channel::bounded;
use garment_align::{
    AlignmentConfig, FrameSize, OverlayUpdate,
    pipeline::{DisplayClock, OverlayCanvas, SwayingFigure, start_session},
};

const DISPLAY_REFRESH_HZ: f64 = 60.0;

fn main() -> Result<()> {
    env_logger::init();

    // garment-align [seconds] [output.png] [config.toml]
    let mut args = std::env::args().skip(1);
    let seconds = args.next().and_then(|s| s.parse::<u64>().ok()).unwrap_or(3);
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("overlay.png"));
    let config = match args.next() {
        Some(path) => AlignmentConfig::load(path)?,
        None => AlignmentConfig::default(),
    };

    let frame_size = FrameSize::new(640, 480);
    let (canvas_tx, canvas_rx) = bounded(1);
    let mut canvas = OverlayCanvas::new(frame_size.width, frame_size.height);

    let source = SwayingFigure::new().occlude_legs_every(15).fail_every(40);
    let session = start_session(
        config,
        frame_size,
        source,
        DisplayClock::new(DISPLAY_REFRESH_HZ),
        move |update: &OverlayUpdate| {
            canvas.render(update);
            // Drop if the viewer is busy, the next tick brings a fresher frame.
            let _ = canvas_tx.try_send(canvas.clone());
        },
    )?;

    let run_for = Duration::from_secs(seconds.max(1));
    let started = Instant::now();
    let mut latest = None;
    let mut last_state = None;
    let mut lite_toggled = false;
    while started.elapsed() < run_for {
        // Exercise lite mode for a short stretch mid-run.
        if !lite_toggled && started.elapsed() >= run_for / 2 {
            session.set_lite_mode(true);
            std::thread::sleep(Duration::from_millis(200));
            session.set_lite_mode(false);
            lite_toggled = true;
        }
        if let Ok(frame) = canvas_rx.recv_timeout(Duration::from_millis(100)) {
            if last_state != Some(frame.last_state) {
                log::info!("tracking state: {}", frame.last_state.label());
                last_state = Some(frame.last_state);
            }
            latest = Some(frame);
        }
    }

    let stats = session.stop();
    while let Ok(frame) = canvas_rx.try_recv() {
        latest = Some(frame);
    }

    println!(
        "{} ticks, {} estimations ({} failed, {} throttled, {} skipped in lite mode)",
        stats.ticks, stats.estimations, stats.failures, stats.throttled, stats.lite_skipped
    );

    match latest {
        Some(frame) => save_frame(&frame, &output)?,
        None => log::warn!("no frame was composited"),
    }

    Ok(())
}

#[cfg(feature = "png-export")]
fn save_frame(frame: &OverlayCanvas, output: &std::path::Path) -> Result<()> {
    frame.save_png(output)?;
    println!("wrote {}", output.display());
    Ok(())
}

#[cfg(not(feature = "png-export"))]
fn save_frame(_frame: &OverlayCanvas, output: &std::path::Path) -> Result<()> {
    log::warn!(
        "built without png-export, not writing {}",
        output.display()
    );
    Ok(())
}
