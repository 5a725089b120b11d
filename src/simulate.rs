//! Stand-in emotion classifier.
//!
//! Listens on a local port and streams random `<label>:<score>` frames to
//! one client at a time, the same way the camera classifier does. Useful for
//! running a session without a webcam.

use anyhow::{Context, Result};
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::{ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// Labels the classifier can report.
pub const EMOTION_LABELS: [&str; 7] = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];

/// Produces random classifier frames.
#[derive(Debug, Clone)]
pub struct FrameGenerator<R: Rng> {
    rng: R,
    happy_bias: f64,
}

impl<R: Rng> FrameGenerator<R> {
    /// `happy_bias` is the probability, clamped to `[0, 1]`, that a frame
    /// reports `happy`. Other frames pick uniformly among all labels.
    pub fn new(rng: R, happy_bias: f64) -> Self {
        Self {
            rng,
            happy_bias: happy_bias.clamp(0.0, 1.0),
        }
    }

    /// Next frame, formatted as the classifier sends it.
    pub fn next_frame(&mut self) -> String {
        let label = if self.rng.gen_bool(self.happy_bias) {
            "happy"
        } else {
            EMOTION_LABELS.choose(&mut self.rng).copied().unwrap_or("neutral")
        };
        let score: f32 = self.rng.gen_range(25.0..=100.0);
        format!("{label}:{score:.1}")
    }
}

/// Binds `port` on localhost and serves clients one after another until the
/// process is stopped.
pub fn serve(port: u16, interval: Duration, happy_bias: f64) -> Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .with_context(|| format!("Failed to bind simulated classifier to port {port}"))?;
    info!("Simulated classifier listening on {}", listener.local_addr()?);

    let mut frames = FrameGenerator::new(rand::thread_rng(), happy_bias);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let peer = stream.peer_addr().map(|addr| addr.to_string()).unwrap_or_default();
                info!("Client connected: {peer}");
                stream_frames(stream, &mut frames, interval);
                info!("Client disconnected: {peer}");
            }
            Err(e) => warn!("Failed to accept connection: {e}"),
        }
    }
    Ok(())
}

fn stream_frames<R: Rng>(mut stream: TcpStream, frames: &mut FrameGenerator<R>, interval: Duration) {
    loop {
        let frame = frames.next_frame();
        println!("Detected Emotion: {frame}");
        if let Err(e) = stream.write_all(frame.as_bytes()) {
            if e.kind() != ErrorKind::BrokenPipe {
                warn!("Failed to send frame: {e}");
            }
            return;
        }
        thread::sleep(interval);
    }
}
