//! SDL2 window for the live preview and the comparison view.

use std::time::Duration;

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

use facegate_core::pipeline::overlay::side_by_side;
use facegate_core::pipeline::session_display::{Command, SessionDisplay};
use facegate_core::shared::frame::Frame;

/// A hidden window that appears on the first rendered frame and follows
/// the frame size. `close` destroys the window and its SDL resources.
pub struct SdlDisplay {
    window: Option<SdlWindow>,
}

/// Texture built for one frame size, reused until the size changes.
struct SizedTexture {
    texture: Texture,
    size: (u32, u32),
}

struct SdlWindow {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    texture: Option<SizedTexture>,
    event_pump: EventPump,
    _sdl: sdl2::Sdl,
}

impl SdlDisplay {
    pub fn new(title: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let sdl = sdl2::init()?;
        let video = sdl.video()?;
        let window = video
            .window(title, 640, 480)
            .position_centered()
            .hidden()
            .build()?;
        let canvas = window.into_canvas().present_vsync().build()?;
        let texture_creator = canvas.texture_creator();
        let event_pump = sdl.event_pump()?;

        Ok(Self {
            window: Some(SdlWindow {
                canvas,
                texture_creator,
                texture: None,
                event_pump,
                _sdl: sdl,
            }),
        })
    }

    fn window(&mut self) -> Result<&mut SdlWindow, Box<dyn std::error::Error>> {
        self.window.as_mut().ok_or_else(|| "display is closed".into())
    }

    #[cfg(test)]
    fn texture_size(&self) -> Option<(u32, u32)> {
        self.window
            .as_ref()
            .and_then(|w| w.texture.as_ref())
            .map(|t| t.size)
    }
}

impl SdlWindow {
    fn present(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let size = (frame.width(), frame.height());
        if self.texture.as_ref().map(|t| t.size) != Some(size) {
            self.canvas.window_mut().set_size(size.0, size.1)?;
            self.canvas.window_mut().show();
            let texture = self.texture_creator.create_texture_streaming(
                PixelFormatEnum::RGB24,
                size.0,
                size.1,
            )?;
            self.replace_texture(Some(SizedTexture { texture, size }));
        }

        let Some(sized) = self.texture.as_mut() else {
            return Err("no texture for frame".into());
        };
        sized
            .texture
            .update(None, frame.data(), size.0 as usize * 3)?;

        self.canvas.clear();
        self.canvas.copy(&sized.texture, None, None)?;
        self.canvas.present();
        Ok(())
    }

    fn replace_texture(&mut self, next: Option<SizedTexture>) {
        if let Some(old) = std::mem::replace(&mut self.texture, next) {
            // SAFETY: the renderer that created the texture is still alive.
            unsafe { old.texture.destroy() };
        }
    }
}

impl Drop for SdlWindow {
    fn drop(&mut self) {
        self.replace_texture(None);
    }
}

fn command_for(event: &Event) -> Option<Command> {
    match event {
        Event::Quit { .. } => Some(Command::Quit),
        Event::KeyDown {
            keycode: Some(key), ..
        } if *key == Keycode::Q => Some(Command::Quit),
        Event::KeyDown {
            keycode: Some(key), ..
        } if *key == Keycode::S => Some(Command::Capture),
        _ => None,
    }
}

impl SessionDisplay for SdlDisplay {
    fn render(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.window()?.present(frame)
    }

    fn poll_command(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Command>, Box<dyn std::error::Error>> {
        let window = self.window()?;
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let mut events: Vec<Event> = window
            .event_pump
            .wait_event_timeout(timeout_ms)
            .into_iter()
            .collect();
        events.extend(window.event_pump.poll_iter());
        Ok(events.iter().find_map(command_for))
    }

    fn show_comparison(
        &mut self,
        reference: &Frame,
        candidate: &Frame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let window = self.window()?;
        window.canvas.window_mut().set_title("Reference | Capture")?;
        window.present(&side_by_side(reference, candidate))?;
        loop {
            match window.event_pump.wait_event() {
                Event::Quit { .. } | Event::KeyDown { .. } => return Ok(()),
                _ => {}
            }
        }
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            log::debug!("Display closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Headless window on SDL's dummy video driver, or `None` when SDL
    /// cannot start in this environment.
    fn headless_display() -> Option<SdlDisplay> {
        std::env::set_var("SDL_VIDEODRIVER", "dummy");
        SdlDisplay::new("test").ok()
    }

    #[test]
    fn test_keys_map_to_commands() {
        let key = |keycode| Event::KeyDown {
            timestamp: 0,
            window_id: 0,
            keycode: Some(keycode),
            scancode: None,
            keymod: sdl2::keyboard::Mod::NOMOD,
            repeat: false,
        };
        assert_eq!(command_for(&key(Keycode::S)), Some(Command::Capture));
        assert_eq!(command_for(&key(Keycode::Q)), Some(Command::Quit));
        assert_eq!(command_for(&key(Keycode::X)), None);
        assert_eq!(command_for(&Event::Quit { timestamp: 0 }), Some(Command::Quit));
    }

    #[test]
    fn test_texture_follows_frame_size_and_close_releases_window() {
        let Some(mut display) = headless_display() else {
            eprintln!("SDL video unavailable, skipping");
            return;
        };

        display.render(&Frame::filled(64, 48, [1, 2, 3], 0)).unwrap();
        display.render(&Frame::filled(64, 48, [4, 5, 6], 1)).unwrap();
        assert_eq!(display.texture_size(), Some((64, 48)));

        display.render(&Frame::filled(32, 32, [7, 8, 9], 2)).unwrap();
        assert_eq!(display.texture_size(), Some((32, 32)));

        display.close();
        display.close();
        assert!(display.window.is_none());
        assert!(display.render(&Frame::filled(8, 8, [0, 0, 0], 3)).is_err());
    }
}
