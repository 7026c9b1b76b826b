//! Concrete device bindings for `AudioCallbacks`.
//!
//! The core crate only defines the `OutputCallback`/`InputCallback` trait
//! boundary (it never talks to a sound card); this module is where that
//! boundary meets an actual device, kept in its own crate the same way
//! audio-backend glue is kept separate from protocol logic.

use std::sync::{Arc, Mutex};

use acoustic_core::{InputCallback, OutputCallback};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Opens the host's default input and output devices and wires them to
/// `callbacks`, returning the live streams. Dropping the returned value
/// stops the streams.
pub fn open_default_duplex_stream(
    callbacks: impl OutputCallback + InputCallback + 'static,
) -> Result<DuplexStream, cpal::BuildStreamError> {
    let host = cpal::default_host();
    let output_device = host.default_output_device();
    let input_device = host.default_input_device();

    let callbacks = Arc::new(Mutex::new(callbacks));

    let output_stream = match &output_device {
        Some(device) => {
            let config = device.default_output_config().map_err(|_| cpal::BuildStreamError::StreamConfigNotSupported)?;
            let callbacks = callbacks.clone();
            let stream = device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| callbacks.lock().unwrap().output(data),
                |err| log::error!("output stream error: {err}"),
                None,
            )?;
            stream.play().map_err(|_| cpal::BuildStreamError::DeviceNotAvailable)?;
            Some(stream)
        }
        None => {
            log::warn!("no default output device; sent packets will not be audible");
            None
        }
    };

    let input_stream = match &input_device {
        Some(device) => {
            let config = device.default_input_config().map_err(|_| cpal::BuildStreamError::StreamConfigNotSupported)?;
            let callbacks = callbacks.clone();
            let stream = device.build_input_stream(
                &config.into(),
                move |data: &[f32], _| callbacks.lock().unwrap().input(data),
                |err| log::error!("input stream error: {err}"),
                None,
            )?;
            stream.play().map_err(|_| cpal::BuildStreamError::DeviceNotAvailable)?;
            Some(stream)
        }
        None => {
            log::warn!("no default input device; nothing will be received");
            None
        }
    };

    Ok(DuplexStream { _output: output_stream, _input: input_stream })
}

/// Keeps a duplex pair of `cpal` streams alive; has no methods of its own,
/// it just needs to outlive the `PhysicalLayer` it feeds.
pub struct DuplexStream {
    _output: Option<cpal::Stream>,
    _input: Option<cpal::Stream>,
}

/// Stands in for a real device when none is available or wanted (CI, a
/// headless demo run, `--loopback`): repeatedly asks the output callback
/// for a buffer's worth of samples and feeds them straight back to the
/// input callback on a dedicated thread.
pub fn spawn_loopback_device(
    mut callbacks: impl OutputCallback + InputCallback + 'static,
) -> LoopbackHandle {
    let running = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let thread = {
        let running = running.clone();
        std::thread::Builder::new()
            .name("loopback-device".into())
            .spawn(move || {
                const CHUNK: usize = 256;
                let mut buf = vec![0.0f32; CHUNK];
                while running.load(std::sync::atomic::Ordering::Acquire) {
                    callbacks.output(&mut buf);
                    callbacks.input(&buf);
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
            })
            .expect("failed to spawn loopback device thread")
    };
    LoopbackHandle { running, thread: Some(thread) }
}

pub struct LoopbackHandle {
    running: Arc<std::sync::atomic::AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Drop for LoopbackHandle {
    fn drop(&mut self) {
        self.running.store(false, std::sync::atomic::Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
