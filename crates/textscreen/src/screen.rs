#![forbid(unsafe_code)]

//! The engine context.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use textscreen_core::bitmap::Bitmap;
use textscreen_core::console::{Console, ConsoleSize};
use textscreen_core::drawing::Brush;
use textscreen_core::key::KeyCode;
use textscreen_core::key_decoder::KeyDecoder;
use textscreen_core::settings::{
    DEFAULT_LEFT_MARGIN, DEFAULT_TOP_MARGIN, RenderMethod, Settings,
};
use textscreen_render::Presenter;
use textscreen_tty::interrupt::{self, INTERRUPT_SIGNAL, InterruptGuard, InterruptState};
use textscreen_tty::native::CTRL_C;

use crate::{Error, Result};

/// Interrupt callback. Receives [`INTERRUPT_SIGNAL`] and runs on the thread
/// that polls [`TextScreen::get_key`] or sleeps in [`TextScreen::wait`].
pub type InterruptHandler = Box<dyn FnMut(i32) + Send>;

/// A console in raw mode plus everything needed to draw on it.
///
/// Created by [`TextScreen::init`]; [`TextScreen::end`] (or drop) puts the
/// console back the way it was.
pub struct TextScreen<C: Console> {
    console: C,
    settings: Settings,
    decoder: KeyDecoder,
    presenter: Presenter,
    interrupts: Arc<InterruptState>,
    handler: Option<InterruptHandler>,
    signal_guard: Option<InterruptGuard>,
    epoch: Instant,
    active: bool,
}

#[cfg(unix)]
impl TextScreen<textscreen_tty::TtyConsole<io::Stdout, textscreen_tty::TtyInput>> {
    /// Start on the controlling terminal.
    pub fn open_tty(settings: Option<Settings>) -> Result<Self> {
        Self::init(textscreen_tty::TtyConsole::open()?, settings)
    }
}

impl TextScreen<textscreen_tty::NativeConsole<io::Stdout, textscreen_tty::CrosstermEvents>> {
    /// Start on the process console through crossterm.
    pub fn open_native(settings: Option<Settings>) -> Result<Self> {
        Self::init(textscreen_tty::NativeConsole::open(), settings)
    }
}

impl<C: Console> TextScreen<C> {
    /// Take over `console`: apply settings, enter raw mode, install the
    /// interrupt bridge.
    ///
    /// Without `settings` the defaults for the live console size are used.
    pub fn init(mut console: C, settings: Option<Settings>) -> Result<Self> {
        let settings = match settings {
            Some(settings) => validated(settings)?,
            None => {
                let size = console.size();
                Settings::for_console(size.width, size.height)
            }
        };

        console.enter_raw_mode()?;
        let interrupts = InterruptState::new();
        let restore = console.emergency_restore();
        let signal_guard = match InterruptGuard::install(interrupts.clone(), restore) {
            Ok(guard) => guard,
            Err(err) => {
                let _ = console.restore_mode();
                return Err(err.into());
            }
        };

        textscreen_core::info!(
            width = settings.width,
            height = settings.height,
            method = settings.rendering.name(),
            "textscreen started"
        );

        Ok(Self {
            decoder: KeyDecoder::new(console.input_encoding()),
            console,
            settings,
            presenter: Presenter::new(),
            interrupts,
            handler: None,
            signal_guard: Some(signal_guard),
            epoch: Instant::now(),
            active: true,
        })
    }

    /// Restore the console: show the cursor, leave raw mode, drop the signal
    /// registration. Later calls do nothing.
    pub fn end(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.signal_guard = None;

        let shown = self
            .console
            .set_cursor_visible(true)
            .and_then(|()| self.console.flush());
        let restored = self.console.restore_mode();
        textscreen_core::info!("textscreen ended");
        shown?;
        restored?;
        Ok(())
    }

    /// Whether [`TextScreen::end`] has not run yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    // ── Settings ─────────────────────────────────────────────────────────

    /// Defaults for the current console size.
    #[must_use]
    pub fn default_settings(&self) -> Settings {
        let size = self.console.size();
        Settings::for_console(size.width, size.height)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings. The sample aspect ratio is clamped; negative
    /// dimensions are rejected.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        self.settings = validated(settings)?;
        Ok(())
    }

    pub fn set_space_char(&mut self, space: u8) {
        self.settings.space = space;
    }

    pub fn set_rendering_method(&mut self, method: RenderMethod) {
        self.settings.rendering = method;
    }

    /// Set the visible area. A zero dimension takes the console size minus
    /// the default margins.
    pub fn resize_screen(&mut self, width: i32, height: i32) -> Result<()> {
        if width < 0 || height < 0 {
            return Err(Error::InvalidSize { width, height });
        }
        let size = self.console.size();
        let width = if width == 0 {
            i32::from(size.width) - DEFAULT_LEFT_MARGIN * 2
        } else {
            width
        };
        let height = if height == 0 {
            i32::from(size.height) - DEFAULT_TOP_MARGIN * 2
        } else {
            height
        };
        if width < 1 || height < 1 {
            return Err(Error::InvalidSize { width, height });
        }
        self.settings.width = width;
        self.settings.height = height;
        textscreen_core::debug!(width, height, "screen resized");
        Ok(())
    }

    // ── Bitmaps ──────────────────────────────────────────────────────────

    /// New bitmap filled with the space character. A zero dimension takes
    /// the visible screen size.
    pub fn create_bitmap(&self, width: i32, height: i32) -> Result<Bitmap> {
        let resolved;
        let settings = if self.settings.has_screen_size() {
            &self.settings
        } else {
            resolved = self.settings_for_console();
            &resolved
        };
        Ok(Bitmap::create(width, height, settings)?)
    }

    /// Drawing parameters taken from the current settings.
    #[must_use]
    pub fn brush(&self) -> Brush {
        Brush::from(&self.settings)
    }

    /// Present `bitmap` with its origin shifted by `(dx, dy)`.
    pub fn show_bitmap(&mut self, bitmap: &Bitmap, dx: i32, dy: i32) -> Result<()> {
        self.presenter
            .show(&mut self.console, bitmap, &self.settings, dx, dy)?;
        Ok(())
    }

    fn settings_for_console(&self) -> Settings {
        let size = self.console.size();
        let mut settings = self.settings.clone();
        settings.width = i32::from(size.width) - settings.left_margin.max(0) * 2;
        settings.height = i32::from(size.height) - settings.top_margin.max(0) * 2;
        settings
    }

    // ── Input and timing ─────────────────────────────────────────────────

    /// Poll for one key without blocking. [`KeyCode::NONE`] when nothing
    /// complete is available.
    pub fn get_key(&mut self) -> KeyCode {
        self.dispatch_interrupts();
        let key = match self.decoder.decode(&mut self.console) {
            Ok(key) => key,
            Err(err) => {
                textscreen_core::warn!(error = %err, "key read failed");
                return KeyCode::NONE;
            }
        };
        if self.console.interrupts_via_input() && key == KeyCode::from_byte(CTRL_C) {
            self.interrupt_from_input();
            return KeyCode::NONE;
        }
        key
    }

    /// Sleep, then run any interrupt handler that became due.
    pub fn wait(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
        self.dispatch_interrupts();
    }

    /// Milliseconds since [`TextScreen::init`], wrapping at `u32::MAX`.
    #[must_use]
    pub fn tick_count(&self) -> u32 {
        // Truncation is the wrap.
        self.epoch.elapsed().as_millis() as u32
    }

    // ── Console passthroughs ─────────────────────────────────────────────

    #[must_use]
    pub fn console_size(&self) -> ConsoleSize {
        self.console.size()
    }

    pub fn set_cursor_pos(&mut self, x: i32, y: i32) -> Result<()> {
        self.console.set_cursor_pos(x, y)?;
        self.console.flush()?;
        Ok(())
    }

    pub fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        self.console.set_cursor_visible(visible)?;
        self.console.flush()?;
        Ok(())
    }

    pub fn clear_screen(&mut self) -> Result<()> {
        self.console.clear_screen()?;
        self.console.flush()?;
        Ok(())
    }

    // ── Interrupts ───────────────────────────────────────────────────────

    /// Register (or with `None`, remove) the interrupt callback. Without
    /// one, an interrupt restores the console and exits the process.
    pub fn set_interrupt_handler(&mut self, handler: Option<InterruptHandler>) {
        self.interrupts.set_handled(handler.is_some());
        self.handler = handler;
    }

    /// Whether an interrupt is waiting for the next poll.
    #[must_use]
    pub fn interrupt_pending(&self) -> bool {
        self.interrupts.is_pending()
    }

    fn dispatch_interrupts(&mut self) {
        if !self.interrupts.take() {
            return;
        }
        textscreen_core::debug!("dispatching interrupt");
        if let Some(handler) = self.handler.as_mut() {
            handler(INTERRUPT_SIGNAL);
        }
    }

    fn interrupt_from_input(&mut self) {
        if let Some(handler) = self.handler.as_mut() {
            handler(INTERRUPT_SIGNAL);
            return;
        }
        let _ = self.end();
        interrupt::terminate(None, INTERRUPT_SIGNAL);
    }
}

impl<C: Console> Drop for TextScreen<C> {
    fn drop(&mut self) {
        let _ = self.end();
    }
}

fn validated(mut settings: Settings) -> Result<Settings> {
    if settings.width < 0 || settings.height < 0 {
        return Err(Error::InvalidSize {
            width: settings.width,
            height: settings.height,
        });
    }
    let sar = settings.sar();
    settings.set_sar(sar);
    Ok(settings)
}
