use sdl2::{event::Event, keyboard::Keycode};

/// Makes dealing with SDL keymapping less verbose
macro_rules! map_keys {
    // entry point
    ($event:expr, $($input:tt)*) => {
        map_keys!(@inner $event, parsed=[], rest=[ $($input)* ])
    };

    // stop condition
    (@inner $event:expr, parsed = [$($parsed:tt)*], rest = [ ]) => {
        match $event {
            $($parsed)*
            _ => None
        }
    };

    // keypad key, reported on both press and release
    (
        @inner
        $event:expr,
        parsed = [$($parsed:tt)*],
        rest = [
            @keypad $keycode:pat => $key:expr,
            $($rest:tt)*
        ]
    ) => {
        map_keys!(
            @inner
            $event,
            parsed = [
                $($parsed)*
                Event::KeyDown {keycode: Some($keycode), .. } => Some(Action::KeypadState($key, true)),
                Event::KeyUp {keycode: Some($keycode), .. } => Some(Action::KeypadState($key, false)),
            ],
            rest = [
                $($rest)*
            ]
        )
    };

    // normal keydown
    (   @inner
        $event:expr,
        parsed = [$($parsed:tt)*],
        rest = [
            $keycode:pat => $action:expr,
            $($rest:tt)*
        ]
    ) => {
        map_keys!(
            @inner
            $event,
            parsed = [
                $($parsed)*
                Event::KeyDown {keycode: Some($keycode), repeat: false, .. } => Some($action),
            ],
            rest = [
                $($rest)*
            ]
        )
    };
}

/// Different key bindings for the driver
pub enum Keymap {
    /// The usual 1234/QWER/ASDF/ZXCV layout for the 4x4 hex keypad
    Qwerty,
}

/// Actions to be executed by the driver
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    KeypadState(u8, bool),
    TogglePause,
    Reset,
    SpeedUp,
    SpeedDown,
    Quit,
}

impl Keymap {
    /// Translate an SDL2 event into an action to be executed by the driver
    pub fn translate_action(&self, event: &Event) -> Option<Action> {
        match self {
            Keymap::Qwerty => map_keys!(event,
                @keypad Keycode::Num1 => 0x1,
                @keypad Keycode::Num2 => 0x2,
                @keypad Keycode::Num3 => 0x3,
                @keypad Keycode::Num4 => 0xC,
                @keypad Keycode::Q => 0x4,
                @keypad Keycode::W => 0x5,
                @keypad Keycode::E => 0x6,
                @keypad Keycode::R => 0xD,
                @keypad Keycode::A => 0x7,
                @keypad Keycode::S => 0x8,
                @keypad Keycode::D => 0x9,
                @keypad Keycode::F => 0xE,
                @keypad Keycode::Z => 0xA,
                @keypad Keycode::X => 0x0,
                @keypad Keycode::C => 0xB,
                @keypad Keycode::V => 0xF,
                Keycode::Space => Action::TogglePause,
                Keycode::Backspace => Action::Reset,
                Keycode::Up => Action::SpeedUp,
                Keycode::Down => Action::SpeedDown,
                Keycode::Escape => Action::Quit,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdl2::keyboard::Mod;

    fn key_event(keycode: Keycode, down: bool, repeat: bool) -> Event {
        if down {
            Event::KeyDown {
                timestamp: 0,
                window_id: 0,
                keycode: Some(keycode),
                scancode: None,
                keymod: Mod::NOMOD,
                repeat,
            }
        } else {
            Event::KeyUp {
                timestamp: 0,
                window_id: 0,
                keycode: Some(keycode),
                scancode: None,
                keymod: Mod::NOMOD,
                repeat,
            }
        }
    }

    #[test]
    fn test_keypad_press_and_release() {
        let keymap = Keymap::Qwerty;

        assert_eq!(
            keymap.translate_action(&key_event(Keycode::Num4, true, false)),
            Some(Action::KeypadState(0xC, true))
        );
        assert_eq!(
            keymap.translate_action(&key_event(Keycode::X, false, false)),
            Some(Action::KeypadState(0x0, false))
        );
        assert_eq!(
            keymap.translate_action(&key_event(Keycode::V, true, true)),
            Some(Action::KeypadState(0xF, true))
        );
    }

    #[test]
    fn test_driver_actions() {
        let keymap = Keymap::Qwerty;

        assert_eq!(
            keymap.translate_action(&key_event(Keycode::Escape, true, false)),
            Some(Action::Quit)
        );
        assert_eq!(
            keymap.translate_action(&key_event(Keycode::Up, true, false)),
            Some(Action::SpeedUp)
        );
        // held keys do not repeat driver actions
        assert_eq!(
            keymap.translate_action(&key_event(Keycode::Space, true, true)),
            None
        );
        assert_eq!(
            keymap.translate_action(&key_event(Keycode::Space, false, false)),
            None
        );
        assert_eq!(
            keymap.translate_action(&key_event(Keycode::P, true, false)),
            None
        );
    }
}
