//! Attribute value parsers.
//!
//! Every parser returns `None` for text it does not recognise; the importer
//! turns that into [`SettingsError::InvalidValue`](crate::SettingsError).

use lpu237_protocol::{
    BUZZER_OFF, BUZZER_ON, EcmType, IButtonMode, Interface, Language, ParityType, ProtocolResult,
    ReadDirection, Tag, TagKind, Track,
};

/// Prefix selecting raw tag bytes instead of literal text.
pub const HEX_TAG_PREFIX: &str = "hex:";

/// Lowercase with separators removed, so `USB-HID`, `usb_hid` and `usbhid`
/// compare equal.
pub(crate) fn canonical(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-', '_'], "")
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match canonical(raw).as_str() {
        "enable" | "enabled" | "true" | "1" => Some(true),
        "disable" | "disabled" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
pub fn parse_u32(raw: &str) -> Option<u32> {
    let text = raw.trim();
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

pub fn parse_u8(raw: &str) -> Option<u8> {
    parse_u32(raw).and_then(|v| u8::try_from(v).ok())
}

pub fn parse_interface(raw: &str) -> Option<Interface> {
    match canonical(raw).as_str() {
        "usbkeyboard" | "usbkb" => Some(Interface::UsbKeyboard),
        "usbhid" | "usbmsr" => Some(Interface::UsbHid),
        "rs232" | "uart" => Some(Interface::Rs232),
        "ps2standalone" | "ps2" => Some(Interface::Ps2StandAlone),
        "ps2bypass" => Some(Interface::Ps2Bypass),
        "byhwsetting" | "byhw" => Some(Interface::ByHwSetting),
        _ => None,
    }
}

pub fn parse_language(raw: &str) -> Option<Language> {
    match canonical(raw).as_str() {
        "usaenglish" | "english" | "usa" => Some(Language::UsaEnglish),
        "spanish" => Some(Language::Spanish),
        "danish" => Some(Language::Danish),
        "french" => Some(Language::French),
        "german" => Some(Language::German),
        "italian" => Some(Language::Italian),
        "norwegian" => Some(Language::Norwegian),
        "swedish" => Some(Language::Swedish),
        "ukenglish" | "uk" => Some(Language::UkEnglish),
        "israel" | "hebrew" => Some(Language::Israel),
        "turkey" | "turkish" => Some(Language::Turkey),
        _ => None,
    }
}

pub fn parse_direction(raw: &str) -> Option<ReadDirection> {
    match canonical(raw).as_str() {
        "bidirectional" | "both" => Some(ReadDirection::Bidirectional),
        "forward" => Some(ReadDirection::Forward),
        "backward" => Some(ReadDirection::Backward),
        _ => None,
    }
}

pub fn parse_parity(raw: &str) -> Option<ParityType> {
    match canonical(raw).as_str() {
        "even" => Some(ParityType::Even),
        "odd" => Some(ParityType::Odd),
        _ => None,
    }
}

pub fn parse_ecm(raw: &str) -> Option<EcmType> {
    match canonical(raw).as_str() {
        "lrc" => Some(EcmType::Lrc),
        "invertedlrc" | "invlrc" => Some(EcmType::InvertedLrc),
        "crc" => Some(EcmType::Crc),
        _ => None,
    }
}

pub fn parse_ibutton_mode(raw: &str) -> Option<IButtonMode> {
    match canonical(raw).as_str() {
        "zeros" | "zero16" => Some(IButtonMode::Zeros),
        "f12" => Some(IButtonMode::F12),
        "zeros7" | "zero7" => Some(IButtonMode::Zeros7),
        "addmitcodestick" | "codestick" => Some(IButtonMode::AddmitCodeStick),
        "none" => Some(IButtonMode::None),
        _ => None,
    }
}

/// `on`/`off` map to the firmware's buzzer presets; anything else is a raw
/// count.
pub fn parse_buzzer(raw: &str) -> Option<u32> {
    match canonical(raw).as_str() {
        "on" | "enable" => Some(BUZZER_ON),
        "off" | "disable" => Some(BUZZER_OFF),
        _ => parse_u32(raw),
    }
}

/// `all` when every track must read cleanly before data is sent.
pub fn parse_send_condition(raw: &str) -> Option<bool> {
    match canonical(raw).as_str() {
        "all" | "and" => Some(true),
        "any" | "or" => Some(false),
        _ => parse_bool(raw),
    }
}

/// Three distinct 1-based track digits, e.g. `"312"` or `"3,1,2"`.
pub fn parse_track_order(raw: &str) -> Option<[Track; 3]> {
    let mut tracks = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | '-'))
        .map(|c| {
            c.to_digit(10)
                .and_then(|d| usize::try_from(d).ok())
                .and_then(|d| d.checked_sub(1))
                .and_then(Track::from_index)
        });
    let order = [tracks.next()??, tracks.next()??, tracks.next()??];
    let [a, b, c] = order;
    if tracks.next().is_some() || a == b || b == c || a == c {
        return None;
    }
    Some(order)
}

/// `hex:<bytes>` is a raw length-prefixed tag image; any other text is typed
/// literally.
pub fn parse_tag(kind: TagKind, raw: &str) -> ProtocolResult<Tag> {
    match raw.strip_prefix(HEX_TAG_PREFIX) {
        Some(hex) => Tag::from_hex(kind, hex.trim()),
        None => Tag::from_ascii(kind, raw),
    }
}
