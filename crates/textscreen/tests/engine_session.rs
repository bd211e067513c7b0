//! Whole sessions on headless consoles: init, draw, show, poll, end.

use textscreen::prelude::*;
use textscreen::{MemoryConsole, TranslateTable};
use textscreen_core::console::ScriptedInput;
use textscreen_render::ScreenModel;
use textscreen_tty::{NativeConsole, ScriptedEvents, SizeSource, TtyConsole};

fn model_of(output: &[u8], size: ConsoleSize) -> ScreenModel {
    let mut model = ScreenModel::new(usize::from(size.width), usize::from(size.height));
    model.process(output);
    model
}

#[test]
fn draw_and_show_on_a_memory_console() {
    let size = ConsoleSize::new(30, 10);
    let mut screen = TextScreen::init(MemoryConsole::new(size), None).unwrap();
    let brush = screen.brush();
    let mut b = screen.create_bitmap(0, 0).unwrap();
    b.draw_rect(Region::new(0, 0, b.width(), b.height()), b'+', FillMode::Outline, &brush);
    b.draw_text(2, 1, b"hello");
    screen.show_bitmap(&b, 0, 0).unwrap();

    let model = model_of(&screen.console().output(), size);
    assert_eq!(model.row_text(0), "");
    assert_eq!(model.row_text(1), format!("  {}", "+".repeat(26)));
    assert_eq!(model.row_text(2), format!("  + hello{}+", " ".repeat(18)));
    assert_eq!(model.row_text(8), format!("  {}", "+".repeat(26)));
    screen.end().unwrap();
}

#[test]
fn every_render_method_draws_the_same_session() {
    let size = ConsoleSize::new(24, 8);
    let mut screens = Vec::new();
    for method in RenderMethod::ALL {
        let mut screen = TextScreen::init(MemoryConsole::new(size), None).unwrap();
        screen.set_rendering_method(method);
        let brush = screen.brush();
        let mut b = screen.create_bitmap(0, 0).unwrap();
        b.draw_fill_circle(10, 3, 2, b'@', &brush).unwrap();
        b.draw_line(0, 5, 19, 0, b'.');
        screen.show_bitmap(&b, 1, 0).unwrap();
        screens.push(model_of(&screen.console().output(), size));
    }
    for model in &screens[1..] {
        assert_eq!(model.cells(), screens[0].cells());
        assert_eq!(model.cursor(), screens[0].cursor());
    }
}

#[test]
fn custom_settings_apply() {
    let size = ConsoleSize::new(20, 6);
    let mut settings = Settings::for_console(size.width, size.height);
    settings.top_margin = 0;
    settings.left_margin = 0;
    settings.width = 4;
    settings.height = 1;
    settings.space = b'.';
    let mut table = TranslateTable::printable();
    table.set(b'a', b'A');
    settings.translate = table;
    let mut screen = TextScreen::init(MemoryConsole::new(size), Some(settings.with_sar(50.0))).unwrap();
    assert_eq!(screen.settings().sar(), 10.0);

    let mut b = screen.create_bitmap(0, 0).unwrap();
    b.draw_text(1, 0, b"ab");
    screen.show_bitmap(&b, 0, 0).unwrap();
    assert_eq!(model_of(&screen.console().output(), size).row_text(0), ".Ab.");
}

#[test]
fn tty_session_decodes_keys_and_restores_the_cursor() {
    let console = TtyConsole::headless(
        Vec::new(),
        ScriptedInput::from(&b"\x1b[1;2A"[..]),
        SizeSource::Fixed(ConsoleSize::new(40, 12)),
    );
    let mut screen = TextScreen::init(console, None).unwrap();
    assert!(screen.console().is_raw());
    assert_eq!(screen.get_key(), KeyCode::UP.with(Modifiers::SHIFT));
    assert_eq!(screen.get_key(), KeyCode::NONE);
    screen.end().unwrap();
    assert!(!screen.console().is_raw());
    assert!(screen.console().get_ref().ends_with(b"\x1b[?25h"));
}

#[test]
fn native_session_sees_scan_codes() {
    use crossterm_events::*;
    let mut events = ScriptedEvents::new();
    events.press(Key::F(3), Mods::NONE);
    events.press(Key::Char('x'), Mods::CONTROL);
    let console = NativeConsole::headless(Vec::new(), events, Some(ConsoleSize::new(40, 12)));
    let mut screen = TextScreen::init(console, None).unwrap();
    assert_eq!(screen.console().size(), ConsoleSize::new(40, 12));
    assert_eq!(screen.get_key(), KeyCode::F3);
    assert_eq!(screen.get_key(), KeyCode::from_byte(0x18));
    assert_eq!(screen.get_key(), KeyCode::NONE);
}

#[test]
fn sizeless_console_uses_the_fallback_defaults() {
    let screen = TextScreen::init(MemoryConsole::without_size(), None).unwrap();
    assert!(screen.console_size().fallback);
    assert_eq!((screen.settings().width, screen.settings().height), (76, 23));
}

mod crossterm_events {
    pub use crossterm::event::{KeyCode as Key, KeyModifiers as Mods};
}

mod resize_rules {
    use proptest::prelude::*;
    use textscreen::prelude::*;
    use textscreen::MemoryConsole;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn resize_follows_console_for_zero_dimensions(
            cols in 1u16..200,
            rows in 1u16..80,
            width in -4i32..300,
            height in -4i32..100,
        ) {
            let mut screen =
                TextScreen::init(MemoryConsole::new(ConsoleSize::new(cols, rows)), None).unwrap();
            let before = (screen.settings().width, screen.settings().height);
            let want_w = if width == 0 { i32::from(cols) - 4 } else { width };
            let want_h = if height == 0 { i32::from(rows) - 2 } else { height };
            let ok = width >= 0 && height >= 0 && want_w >= 1 && want_h >= 1;

            let result = screen.resize_screen(width, height);
            prop_assert_eq!(result.is_ok(), ok);
            let after = (screen.settings().width, screen.settings().height);
            if ok {
                prop_assert_eq!(after, (want_w, want_h));
            } else {
                prop_assert_eq!(after, before);
            }
        }
    }
}
