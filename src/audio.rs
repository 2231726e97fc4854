//! Sound playback behind a small trait so gameplay code can run with
//! sounds that have not finished loading (or never will).

/// A loaded sound clip with transport controls
pub trait Sound {
    fn play(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn set_looping(&mut self, looping: bool);
}

/// A sound that may not be available yet
pub type SoundSlot = Option<Box<dyn Sound>>;

/// Restart from the beginning, stopping first if already playing
pub fn restart(slot: &mut SoundSlot) {
    if let Some(sound) = slot.as_mut() {
        if sound.is_playing() {
            sound.stop();
        }
        sound.play();
    }
}

/// The sounds the session plays
#[derive(Default)]
pub struct SoundBank {
    pub thunder: SoundSlot,
    pub footsteps: SoundSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    Thunder,
    Footsteps,
}

impl SoundBank {
    pub fn install(&mut self, kind: SoundKind, mut sound: Box<dyn Sound>, volume: f32) {
        sound.set_volume(volume);
        match kind {
            SoundKind::Thunder => {
                sound.set_looping(false);
                self.thunder = Some(sound);
            }
            SoundKind::Footsteps => {
                sound.set_looping(true);
                self.footsteps = Some(sound);
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub mod web {
    use super::*;
    use tracing::warn;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::HtmlAudioElement;

    /// Sound backed by an `<audio>` element
    pub struct WebSound {
        element: HtmlAudioElement,
    }

    impl Sound for WebSound {
        fn play(&mut self) {
            if let Err(e) = self.element.play() {
                warn!("audio play rejected: {:?}", e);
            }
        }

        fn stop(&mut self) {
            if let Err(e) = self.element.pause() {
                warn!("audio pause failed: {:?}", e);
            }
            self.element.set_current_time(0.0);
        }

        fn is_playing(&self) -> bool {
            !self.element.paused() && !self.element.ended()
        }

        fn set_volume(&mut self, volume: f32) {
            self.element.set_volume(volume.clamp(0.0, 1.0) as f64);
        }

        fn set_looping(&mut self, looping: bool) {
            self.element.set_loop(looping);
        }
    }

    /// Start loading `url`; `on_ready` runs once the clip can play through.
    pub fn load(url: &str, on_ready: impl FnOnce(WebSound) + 'static) -> Result<(), JsValue> {
        let element = HtmlAudioElement::new_with_src(url)?;
        element.set_preload("auto");

        let pending = Rc::new(RefCell::new(Some(on_ready)));
        let ready_el = element.clone();
        let ready = Closure::wrap(Box::new(move |_e: web_sys::Event| {
            if let Some(cb) = pending.borrow_mut().take() {
                cb(WebSound { element: ready_el.clone() });
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        element.add_event_listener_with_callback("canplaythrough", ready.as_ref().unchecked_ref())?;
        ready.forget();

        let url_for_error = url.to_string();
        let failed = Closure::wrap(Box::new(move |_e: web_sys::Event| {
            tracing::error!("failed to load sound {}", url_for_error);
        }) as Box<dyn FnMut(web_sys::Event)>);
        element.add_event_listener_with_callback("error", failed.as_ref().unchecked_ref())?;
        failed.forget();

        element.load();
        Ok(())
    }
}

#[cfg(all(not(target_arch = "wasm32"), feature = "native"))]
pub mod native {
    use super::*;
    use tracing::warn;
    use crate::error::AssetError;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use std::io::Cursor;

    /// Keeps the output device open; sounds stop when this is dropped
    pub struct AudioOutput {
        _stream: OutputStream,
        handle: OutputStreamHandle,
    }

    impl AudioOutput {
        pub fn new() -> Result<Self, AssetError> {
            let (stream, handle) = OutputStream::try_default().map_err(|e| AssetError::Audio {
                path: "<default output>".to_string(),
                message: e.to_string(),
            })?;
            Ok(Self { _stream: stream, handle })
        }

        pub fn load(&self, path: &str) -> Result<RodioSound, AssetError> {
            let bytes = std::fs::read(path).map_err(|source| AssetError::Io { path: path.to_string(), source })?;
            // validate once so a bad file fails at load time, not on first play
            Decoder::new(Cursor::new(bytes.clone()))
                .map_err(|e| AssetError::Audio { path: path.to_string(), message: e.to_string() })?;
            Ok(RodioSound {
                handle: self.handle.clone(),
                bytes,
                path: path.to_string(),
                sink: None,
                volume: 1.0,
                looping: false,
            })
        }
    }

    pub struct RodioSound {
        handle: OutputStreamHandle,
        bytes: Vec<u8>,
        path: String,
        sink: Option<Sink>,
        volume: f32,
        looping: bool,
    }

    impl Sound for RodioSound {
        fn play(&mut self) {
            let sink = match Sink::try_new(&self.handle) {
                Ok(sink) => sink,
                Err(e) => {
                    warn!("no sink for {}: {}", self.path, e);
                    return;
                }
            };
            let source = match Decoder::new(Cursor::new(self.bytes.clone())) {
                Ok(source) => source,
                Err(e) => {
                    warn!("decode failed for {}: {}", self.path, e);
                    return;
                }
            };
            sink.set_volume(self.volume);
            if self.looping {
                sink.append(source.repeat_infinite());
            } else {
                sink.append(source);
            }
            self.sink = Some(sink);
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn is_playing(&self) -> bool {
            self.sink.as_ref().map(|s| !s.empty()).unwrap_or(false)
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
            if let Some(sink) = &self.sink {
                sink.set_volume(self.volume);
            }
        }

        fn set_looping(&mut self, looping: bool) {
            self.looping = looping;
        }
    }
}
