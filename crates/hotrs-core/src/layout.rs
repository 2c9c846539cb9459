// Hotrs Keyboard Layout
// Translation of (key, live key-state) into characters

use smallvec::{smallvec, SmallVec};

use crate::{Key, ModifierState};

/// Characters produced by one translation; almost always zero or one.
pub type Translation = SmallVec<[char; 2]>;

/// Keyboard-layout service used for character decoding.
///
/// Implementations must be pure with respect to their inputs: the same key
/// and state always yield the same characters.
pub trait KeyboardLayout: Send + Sync {
    fn translate(&self, key: Key, state: &ModifierState) -> Translation;
}

/// US QWERTY layout
#[derive(Debug, Clone, Copy, Default)]
pub struct UsLayout;

impl UsLayout {
    pub fn new() -> Self {
        Self
    }

    fn letter(code: u16) -> Option<char> {
        let c = match code {
            16 => 'q',
            17 => 'w',
            18 => 'e',
            19 => 'r',
            20 => 't',
            21 => 'y',
            22 => 'u',
            23 => 'i',
            24 => 'o',
            25 => 'p',
            30 => 'a',
            31 => 's',
            32 => 'd',
            33 => 'f',
            34 => 'g',
            35 => 'h',
            36 => 'j',
            37 => 'k',
            38 => 'l',
            44 => 'z',
            45 => 'x',
            46 => 'c',
            47 => 'v',
            48 => 'b',
            49 => 'n',
            50 => 'm',
            _ => return None,
        };
        Some(c)
    }

    /// (unshifted, shifted) pairs for the digit row and punctuation
    fn symbol(code: u16) -> Option<(char, char)> {
        let pair = match code {
            2 => ('1', '!'),
            3 => ('2', '@'),
            4 => ('3', '#'),
            5 => ('4', '$'),
            6 => ('5', '%'),
            7 => ('6', '^'),
            8 => ('7', '&'),
            9 => ('8', '*'),
            10 => ('9', '('),
            11 => ('0', ')'),
            12 => ('-', '_'),
            13 => ('=', '+'),
            26 => ('[', '{'),
            27 => (']', '}'),
            39 => (';', ':'),
            40 => ('\'', '"'),
            41 => ('`', '~'),
            43 => ('\\', '|'),
            51 => (',', '<'),
            52 => ('.', '>'),
            53 => ('/', '?'),
            86 => ('\\', '|'),
            _ => return None,
        };
        Some(pair)
    }

    /// Keys whose output ignores Shift
    fn fixed(code: u16) -> Option<char> {
        let c = match code {
            15 => '\t',
            28 | 96 => '\r',
            57 => ' ',
            55 => '*',
            74 => '-',
            78 => '+',
            98 => '/',
            117 => '=',
            71 => '7',
            72 => '8',
            73 => '9',
            75 => '4',
            76 => '5',
            77 => '6',
            79 => '1',
            80 => '2',
            81 => '3',
            82 => '0',
            83 => '.',
            121 => ',',
            _ => return None,
        };
        Some(c)
    }
}

impl KeyboardLayout for UsLayout {
    fn translate(&self, key: Key, state: &ModifierState) -> Translation {
        if state.alt() {
            return SmallVec::new();
        }
        let code = key.code();

        if let Some(lower) = Self::letter(code) {
            if state.ctrl() {
                // Ctrl+letter is the matching C0 control code
                let control = (lower as u8 - b'a' + 1) as char;
                return smallvec![control];
            }
            let upper = state.shift() != state.caps_lock();
            let c = if upper { lower.to_ascii_uppercase() } else { lower };
            return smallvec![c];
        }

        if state.ctrl() {
            return SmallVec::new();
        }

        if let Some((plain, shifted)) = Self::symbol(code) {
            return smallvec![if state.shift() { shifted } else { plain }];
        }

        match Self::fixed(code) {
            Some(c) => smallvec![c],
            None => SmallVec::new(),
        }
    }
}
