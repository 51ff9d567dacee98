use bitflags::bitflags;

/// Number of bytes in the alphabet, `0x00..=0x7E`.
pub const ALPHABET_SIZE: usize = 0x7F;

bitflags! {
    /// Line anchors recorded on the accepting node of a rule.
    pub struct Anchor: u8 {
        const NONE = 0;
        const BOL = 1 << 0;
        const EOL = 1 << 1;
        const BOTH = Self::BOL.bits | Self::EOL.bits;
    }
}

pub fn alphabet() -> impl Iterator<Item = u8> {
    (0..ALPHABET_SIZE).map(|byte| byte as u8)
}

/// Renders a byte the way the debug dumps do: control bytes as `^@`, `^A`,
/// ... and everything else verbatim.
pub fn caret_escape(byte: u8) -> String {
    if byte < b' ' {
        format!("^{}", (byte + b'@') as char)
    } else {
        (byte as char).to_string()
    }
}

/// Sequential display name of the `index`-th DFA state: `A`, `B`, ..., `Z`,
/// `AA`, `AB`, ...
pub fn state_name(index: usize) -> String {
    let mut name = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        name.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}
