use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Linux input-event-codes.h names the engine refers to by constant.
/// Order follows the kernel header.
const NAMED_KEYS: &[(&str, u16)] = &[
    ("ESC", 1),
    ("BACKSPACE", 14),
    ("TAB", 15),
    ("ENTER", 28),
    ("LEFT_CTRL", 29),
    ("LEFT_SHIFT", 42),
    ("RIGHT_SHIFT", 54),
    ("LEFT_ALT", 56),
    ("SPACE", 57),
    ("CAPSLOCK", 58),
    ("KPENTER", 96),
    ("RIGHT_CTRL", 97),
    ("RIGHT_ALT", 100),
    ("HOME", 102),
    ("UP", 103),
    ("PAGE_UP", 104),
    ("LEFT", 105),
    ("RIGHT", 106),
    ("END", 107),
    ("DOWN", 108),
    ("PAGE_DOWN", 109),
    ("INSERT", 110),
    ("DELETE", 111),
    ("LEFT_META", 125),
    ("RIGHT_META", 126),
];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("key_codes.rs");
    let mut f = File::create(&dest_path).unwrap();

    writeln!(
        f,
        r#"
/// A single keyboard key code.
///
/// Newtype over u16; values match Linux input-event-codes.h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {{
    /// Raw numeric code
    pub const fn code(self) -> u16 {{
        self.0
    }}

    /// Slot in a 256-entry key-state table, if the code fits
    pub const fn slot(self) -> Option<usize> {{
        if self.0 < 256 {{
            Some(self.0 as usize)
        }} else {{
            None
        }}
    }}

    /// Name of this key
    pub fn name(self) -> &'static str {{
        key_name(self.0)
    }}
"#
    )
    .unwrap();

    for (name, code) in NAMED_KEYS {
        writeln!(f, "    pub const {}: Key = Key({});", name, code).unwrap();
    }

    writeln!(
        f,
        r#"}}

impl From<u16> for Key {{
    fn from(code: u16) -> Self {{
        Key(code)
    }}
}}

impl From<Key> for u16 {{
    fn from(key: Key) -> Self {{
        key.0
    }}
}}

impl fmt::Display for Key {{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{
        write!(f, "{{}}", self.name())
    }}
}}

impl FromStr for Key {{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {{
        key_from_name(s).ok_or_else(|| format!("Unknown key: {{}}", s))
    }}
}}
"#
    )
    .unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
