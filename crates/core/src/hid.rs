//! Input-command encoding.
//!
//! Every remote key maps to a fixed HID usage-page/usage pair and a
//! timing pattern: a tap emits down then up back to back, a hold
//! keeps the key down for a fixed dwell before releasing. The event
//! payload layout is bit-exact protocol magic; the appliance rejects
//! anything that deviates.

use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// How long a hold keeps the key down before releasing.
pub const HOLD_DWELL: Duration = Duration::from_millis(2000);

// Constant blocks of the HID event buffer. Captured from live
// traffic; never recomputed.
const TIME_HEADER: [u8; 8] = [0x43, 0x89, 0x22, 0xcf, 0x08, 0x02, 0x00, 0x00];
const STRUCT_BLOCK: [u8; 35] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x02, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];
const TRAILER: [u8; 11] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
];

/// Supported remote-control inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Menu,
    Play,
    Pause,
    Next,
    Previous,
    Suspend,
    Select,
    Tv,
    LongTv,
    TopMenu,
}

impl Key {
    /// The fixed usage-page/usage pair for this key.
    pub fn usage(&self) -> (u16, u16) {
        match self {
            Key::Up => (1, 0x8C),
            Key::Down => (1, 0x8D),
            Key::Left => (1, 0x8B),
            Key::Right => (1, 0x8A),
            Key::Menu => (1, 0x86),
            Key::Play => (12, 0xB0),
            Key::Pause => (12, 0xB1),
            Key::Next => (12, 0xB5),
            Key::Previous => (12, 0xB6),
            Key::Suspend => (1, 0x82),
            Key::Select => (1, 0x89),
            Key::Tv => (12, 0x60),
            Key::LongTv => (12, 0x60),
            Key::TopMenu => (1, 0x86),
        }
    }

    /// Whether this key uses the hold timing pattern.
    pub fn is_hold(&self) -> bool {
        matches!(self, Key::LongTv | Key::TopMenu)
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Error> {
        match name {
            "up" => Ok(Key::Up),
            "down" => Ok(Key::Down),
            "left" => Ok(Key::Left),
            "right" => Ok(Key::Right),
            "menu" => Ok(Key::Menu),
            "play" => Ok(Key::Play),
            "pause" => Ok(Key::Pause),
            "next" => Ok(Key::Next),
            "previous" => Ok(Key::Previous),
            "suspend" => Ok(Key::Suspend),
            "select" => Ok(Key::Select),
            "tv" => Ok(Key::Tv),
            "longtv" => Ok(Key::LongTv),
            "topmenu" => Ok(Key::TopMenu),
            other => Err(Error::UnknownKey(other.to_string())),
        }
    }
}

/// Encoded press: the down and up event buffers plus the dwell
/// between them, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCommand {
    pub down: Vec<u8>,
    pub up: Vec<u8>,
    pub dwell: Option<Duration>,
}

/// Encodes a key into its two event buffers and timing pattern.
pub fn encode_key(key: Key) -> KeyCommand {
    let (usage_page, usage) = key.usage();
    KeyCommand {
        down: hid_event_data(usage_page, usage, true),
        up: hid_event_data(usage_page, usage, false),
        dwell: key.is_hold().then_some(HOLD_DWELL),
    }
}

/// Builds one raw HID event buffer: header, structural block, the
/// three big-endian u16s (usage page, usage, state flag), trailer.
pub fn hid_event_data(usage_page: u16, usage: u16, down: bool) -> Vec<u8> {
    let state: u16 = if down { 1 } else { 0 };
    let mut data = Vec::with_capacity(TIME_HEADER.len() + STRUCT_BLOCK.len() + 6 + TRAILER.len());
    data.extend_from_slice(&TIME_HEADER);
    data.extend_from_slice(&STRUCT_BLOCK);
    data.extend_from_slice(&usage_page.to_be_bytes());
    data.extend_from_slice(&usage.to_be_bytes());
    data.extend_from_slice(&state.to_be_bytes());
    data.extend_from_slice(&TRAILER);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_table_matches_protocol() {
        assert_eq!(Key::Up.usage(), (1, 0x8C));
        assert_eq!(Key::Down.usage(), (1, 0x8D));
        assert_eq!(Key::Play.usage(), (12, 0xB0));
        assert_eq!(Key::Pause.usage(), (12, 0xB1));
        assert_eq!(Key::Select.usage(), (1, 0x89));
        assert_eq!(Key::Tv.usage(), (12, 0x60));
    }

    #[test]
    fn tap_has_no_dwell_and_hold_dwells_two_seconds() {
        assert_eq!(encode_key(Key::Play).dwell, None);
        assert_eq!(encode_key(Key::TopMenu).dwell, Some(HOLD_DWELL));
        assert_eq!(encode_key(Key::LongTv).dwell, Some(HOLD_DWELL));
    }

    #[test]
    fn long_tv_and_tv_share_usage() {
        assert_eq!(Key::Tv.usage(), Key::LongTv.usage());
        assert!(!Key::Tv.is_hold());
        assert!(Key::LongTv.is_hold());
    }

    #[test]
    fn event_layout_is_bit_exact() {
        let data = hid_event_data(1, 0x8C, true);
        assert_eq!(data.len(), 8 + 35 + 6 + 11);
        assert_eq!(&data[..8], &TIME_HEADER);
        assert_eq!(&data[8..43], &STRUCT_BLOCK);
        // usage page 1, usage 0x8C, state down, all big-endian
        assert_eq!(&data[43..49], &[0x00, 0x01, 0x00, 0x8C, 0x00, 0x01]);
        assert_eq!(&data[49..], &TRAILER);
    }

    #[test]
    fn up_event_differs_only_in_state_flag() {
        let down = hid_event_data(12, 0xB0, true);
        let up = hid_event_data(12, 0xB0, false);
        assert_eq!(down[..47], up[..47]);
        assert_eq!(down[47..49], [0x00, 0x01]);
        assert_eq!(up[47..49], [0x00, 0x00]);
    }

    #[test]
    fn key_names_parse() {
        assert_eq!("play".parse::<Key>().unwrap(), Key::Play);
        assert_eq!("topmenu".parse::<Key>().unwrap(), Key::TopMenu);
        assert!(matches!(
            "volumeup".parse::<Key>(),
            Err(Error::UnknownKey(_))
        ));
    }
}
