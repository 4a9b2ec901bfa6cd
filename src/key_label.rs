/// Label used for the space bar.
pub const SPACE_LABEL: &str = "Space";

/// (unshifted, shifted) glyph pairs that share one physical key on a US layout.
const KEY_PAIRS: &[(char, char)] = &[
    ('`', '~'),
    ('1', '!'),
    ('2', '@'),
    ('3', '#'),
    ('4', '$'),
    ('5', '%'),
    ('6', '^'),
    ('7', '&'),
    ('8', '*'),
    ('9', '('),
    ('0', ')'),
    ('-', '_'),
    ('=', '+'),
    ('[', '{'),
    (']', '}'),
    ('\\', '|'),
    (';', ':'),
    ('\'', '"'),
    (',', '<'),
    ('.', '>'),
    ('/', '?'),
];

/// Keyboard rows as drawn on the mistake heat-map. Labels match [`key_label`].
pub const KEYBOARD_ROWS: &[&[&str]] = &[
    &["`", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "-", "=", "Bksp"],
    &["Tab", "Q", "W", "E", "R", "T", "Y", "U", "I", "O", "P", "[", "]", "\\"],
    &["Caps", "A", "S", "D", "F", "G", "H", "J", "K", "L", ";", "'", "Enter"],
    &["Shift", "Z", "X", "C", "V", "B", "N", "M", ",", ".", "/", "Shift"],
    &[SPACE_LABEL],
];

/// Canonical physical-key label for an expected character.
pub fn key_label(c: char) -> String {
    if c == ' ' {
        return SPACE_LABEL.to_string();
    }
    if c.is_alphabetic() {
        return c.to_uppercase().collect();
    }
    KEY_PAIRS
        .iter()
        .find(|(plain, shifted)| *plain == c || *shifted == c)
        .map(|(plain, _)| plain.to_string())
        .unwrap_or_else(|| c.to_string())
}

/// Turns a key label back into the character typed without shift.
///
/// The space bar has no useful practice character and yields `None`.
pub fn practice_char(label: &str) -> Option<char> {
    if label == SPACE_LABEL {
        return None;
    }
    let mut chars = label.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    c.to_lowercase().next()
}
