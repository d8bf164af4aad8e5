use crossterm::event::KeyCode;

/// map of characters read from the keyboard to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a. the terminal reports the numeric keypad
/// as the same digit characters, so it needs no table of its own
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// translate a host key into a logical keypad code, or `None` if it isn't
/// one of the sixteen keypad keys
pub fn map_key(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Char(c) => {
            let c = c.to_ascii_lowercase();
            CHIP8_LITERAL_KEYMAP
                .iter()
                .find(|(key, _)| *key == c)
                .map(|(_, mapped)| *mapped)
        }
        _ => None,
    }
}

/// What a key press asks the front end to do. Keys that aren't studio
/// controls are handed on to the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Toggle,
    Step,
    Reset,
    Faster,
    Slower,
    Reassemble,
    Keypad(KeyCode),
}

/// how much `+`/`-` change the cpu frequency
pub const FREQUENCY_STEP: i64 = 50;

pub fn command_for(code: KeyCode) -> Command {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => Command::Quit,
        KeyCode::Char(' ') => Command::Toggle,
        KeyCode::Char('n') => Command::Step,
        KeyCode::Char('r') => Command::Reset,
        KeyCode::Char('+') | KeyCode::Char('=') => Command::Faster,
        KeyCode::Char('-') => Command::Slower,
        KeyCode::Char('m') => Command::Reassemble,
        other => Command::Keypad(other),
    }
}

/// The most recent key event, already mapped. There is no queue: each event
/// overwrites the last one, and an unmapped event leaves no key pressed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    pending: Option<u8>,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad::default()
    }

    pub fn press(&mut self, code: KeyCode) {
        self.pending = map_key(code);
        if let Some(key) = self.pending {
            log::trace!("keypad: {:#x} down", key);
        }
    }

    pub fn pending(&self) -> Option<u8> {
        self.pending
    }

    /// point query: is `code` the key last reported
    pub fn key(&self, code: u8) -> bool {
        self.pending == Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_map_to_themselves() {
        for (i, c) in ('0'..='9').enumerate() {
            assert_eq!(map_key(KeyCode::Char(c)), Some(i as u8));
        }
    }

    #[test]
    fn test_letters_map_to_hex_codes() {
        assert_eq!(map_key(KeyCode::Char('a')), Some(0xa));
        assert_eq!(map_key(KeyCode::Char('F')), Some(0xf));
        assert_eq!(map_key(KeyCode::Char('C')), Some(0xc));
    }

    #[test]
    fn test_other_keys_do_not_map() {
        assert_eq!(map_key(KeyCode::Char('g')), None);
        assert_eq!(map_key(KeyCode::Char(' ')), None);
        assert_eq!(map_key(KeyCode::Enter), None);
        assert_eq!(map_key(KeyCode::F(1)), None);
    }

    #[test]
    fn test_mapping_is_total_and_in_range() {
        let mapped = (0u32..0x250)
            .filter_map(char::from_u32)
            .filter_map(|c| map_key(KeyCode::Char(c)))
            .collect::<Vec<_>>();
        // 10 digits + 6 lowercase + 6 uppercase letters
        assert_eq!(mapped.len(), 22);
        assert!(mapped.iter().all(|k| *k <= 0xf));
    }

    #[test]
    fn test_key_is_true_for_at_most_one_code() {
        let mut keypad = Keypad::new();
        for c in (0u32..0x250).filter_map(char::from_u32) {
            keypad.press(KeyCode::Char(c));
            let down = (0..16).filter(|k| keypad.key(*k)).count();
            assert!(down <= 1, "{:?} reported {} keys", c, down);
        }
    }

    #[test]
    fn test_last_event_wins() {
        let mut keypad = Keypad::new();
        keypad.press(KeyCode::Char('3'));
        keypad.press(KeyCode::Char('b'));
        assert!(keypad.key(0xb));
        assert!(!keypad.key(0x3));
    }

    #[test]
    fn test_unmapped_event_clears_key() {
        let mut keypad = Keypad::new();
        keypad.press(KeyCode::Char('7'));
        keypad.press(KeyCode::Tab);
        assert_eq!(keypad.pending(), None);
        assert!((0..16).all(|k| !keypad.key(k)));
    }

    #[test]
    fn test_controls_never_shadow_keypad_keys() {
        for (c, _) in CHIP8_LITERAL_KEYMAP {
            assert_eq!(command_for(KeyCode::Char(c)), Command::Keypad(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(command_for(KeyCode::Esc), Command::Quit);
        assert_eq!(command_for(KeyCode::Char(' ')), Command::Toggle);
        assert_eq!(command_for(KeyCode::Char('n')), Command::Step);
        assert_eq!(command_for(KeyCode::Char('-')), Command::Slower);
        assert_eq!(command_for(KeyCode::Up), Command::Keypad(KeyCode::Up));
    }

    #[test]
    fn test_key_persists_until_overwritten() {
        let mut keypad = Keypad::new();
        keypad.press(KeyCode::Char('e'));
        assert!(keypad.key(0xe));
        assert!(keypad.key(0xe));
    }
}
