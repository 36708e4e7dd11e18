//! XML settings import.
//!
//! ```xml
//! <lpu237>
//!   <common interface="usb_hid" language="german" buzzer="on"/>
//!   <global prefix="%" postfix="hex:01ff3f"/>
//!   <iso2 combination="1" max_size="40" direction="forward"/>
//! </lpu237>
//! ```
//!
//! The root element is ignored. Each attribute maps onto one setter of
//! [`DeviceConfig`], so every accepted value is change-tracked. Attributes
//! the connected firmware cannot store are skipped and listed in the
//! [`ImportReport`].

use crate::error::{SettingsError, SettingsResult};
use crate::values::{
    canonical, parse_bool, parse_buzzer, parse_direction, parse_ecm, parse_ibutton_mode,
    parse_interface, parse_language, parse_parity, parse_send_condition, parse_tag,
    parse_track_order, parse_u8, parse_u32,
};
use lpu237_protocol::{
    Combination, ComboValue, DeviceConfig, FeatureSet, Tag, TagKind, Track,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Largest value the MMD1100 reset interval nibble holds.
const MAX_RESET_INTERVAL: u8 = 0x0F;

/// Why an attribute was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownElement,
    UnknownAttribute,
    /// The firmware's feature set has no room for this value.
    Unsupported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnknownElement => "unknown element",
            Self::UnknownAttribute => "unknown attribute",
            Self::Unsupported => "not supported by this firmware",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAttribute {
    pub element: String,
    /// Empty when the whole element was skipped.
    pub attribute: String,
    pub reason: SkipReason,
}

/// What an import did to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Attributes accepted, changed or not.
    pub applied: usize,
    /// Attributes whose setter reported a change.
    pub changed: usize,
    pub skipped: Vec<SkippedAttribute>,
}

impl ImportReport {
    fn skip(&mut self, element: &str, attribute: &str, reason: SkipReason) {
        warn!("skipping {}.{}: {}", element, attribute, reason);
        self.skipped.push(SkippedAttribute {
            element: element.to_owned(),
            attribute: attribute.to_owned(),
            reason,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Common,
    Global,
    IButton,
    Uart,
    Iso(Track),
}

impl Section {
    fn from_name(name: &str) -> Option<Self> {
        match canonical(name).as_str() {
            "common" => Some(Self::Common),
            "global" => Some(Self::Global),
            "ibutton" => Some(Self::IButton),
            "uart" => Some(Self::Uart),
            "iso1" => Some(Self::Iso(Track::Iso1)),
            "iso2" => Some(Self::Iso(Track::Iso2)),
            "iso3" => Some(Self::Iso(Track::Iso3)),
            _ => None,
        }
    }
}

enum Outcome {
    Applied(bool),
    Unsupported,
    Unknown,
}

/// One attribute being applied, carried for error reporting.
struct Attr<'a> {
    element: &'a str,
    key: &'a str,
    value: &'a str,
}

impl Attr<'_> {
    fn invalid(&self) -> SettingsError {
        SettingsError::InvalidValue {
            element: self.element.to_owned(),
            attribute: self.key.to_owned(),
            value: self.value.to_owned(),
        }
    }

    fn parse<T>(&self, parser: impl Fn(&str) -> Option<T>) -> SettingsResult<T> {
        parser(self.value).ok_or_else(|| self.invalid())
    }

    fn tag(&self, kind: TagKind) -> SettingsResult<Tag> {
        parse_tag(kind, self.value).map_err(|source| SettingsError::InvalidTag {
            element: self.element.to_owned(),
            attribute: self.key.to_owned(),
            source,
        })
    }
}

/// Applies an XML settings document to `config`.
///
/// Nothing is changed when an error is returned.
pub fn import_xml(config: &mut DeviceConfig, xml: &str) -> SettingsResult<ImportReport> {
    let mut staged = config.clone();
    let features = *staged.features();
    let mut report = ImportReport::default();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element) => {
                if !seen_root {
                    seen_root = true;
                } else {
                    apply_element(&mut staged, &features, &element, &mut report)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    info!(
        "settings import: {} applied, {} changed, {} skipped",
        report.applied,
        report.changed,
        report.skipped.len()
    );
    *config = staged;
    Ok(report)
}

/// Reads and applies a settings file.
pub fn import_file<P: AsRef<Path>>(
    config: &mut DeviceConfig,
    path: P,
) -> SettingsResult<ImportReport> {
    let xml = fs::read_to_string(path.as_ref())?;
    debug!("importing settings from {:?}", path.as_ref());
    import_xml(config, &xml)
}

fn apply_element(
    config: &mut DeviceConfig,
    features: &FeatureSet,
    element: &BytesStart<'_>,
    report: &mut ImportReport,
) -> SettingsResult<()> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let Some(section) = Section::from_name(&name) else {
        report.skip(&name, "", SkipReason::UnknownElement);
        return Ok(());
    };

    let mut attributes = Vec::new();
    for attr in element.attributes().with_checks(false) {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    let mut combination = Combination::First;
    if let Some((key, value)) = attributes
        .iter()
        .find(|(key, _)| canonical(key) == "combination")
    {
        let attr = Attr {
            element: &name,
            key,
            value,
        };
        combination = attr.parse(|v| {
            parse_u32(v)
                .and_then(|i| usize::try_from(i).ok())
                .and_then(Combination::from_index)
        })?;
    }

    for (key, value) in &attributes {
        let canonical_key = canonical(key);
        if canonical_key == "combination" {
            continue;
        }
        let attr = Attr {
            element: &name,
            key,
            value,
        };
        let outcome = match section {
            Section::Common => apply_common(config, features, &canonical_key, &attr)?,
            Section::Global => apply_global(config, &canonical_key, &attr)?,
            Section::IButton => apply_ibutton(config, features, &canonical_key, &attr)?,
            Section::Uart => apply_uart(config, features, &canonical_key, &attr)?,
            Section::Iso(track) => {
                apply_track(config, features, track, combination, &canonical_key, &attr)?
            }
        };
        match outcome {
            Outcome::Applied(changed) => {
                report.applied += 1;
                if changed {
                    report.changed += 1;
                }
                debug!("{}.{} = {:?}", name, key, value);
            }
            Outcome::Unsupported => report.skip(&name, key, SkipReason::Unsupported),
            Outcome::Unknown => report.skip(&name, key, SkipReason::UnknownAttribute),
        }
    }
    Ok(())
}

fn apply_common(
    config: &mut DeviceConfig,
    features: &FeatureSet,
    key: &str,
    attr: &Attr<'_>,
) -> SettingsResult<Outcome> {
    let changed = match key {
        "interface" => config.set_interface(attr.parse(parse_interface)?),
        "language" => config.set_language(attr.parse(parse_language)?),
        "buzzer" => config.set_buzzer_count(attr.parse(parse_buzzer)?),
        "bootruntime" => config.set_boot_run_time(attr.parse(parse_u32)?),
        "sendcondition" => config.set_global_send_condition(attr.parse(parse_send_condition)?),
        "trackorder" => config.set_track_order(attr.parse(parse_track_order)?),
        "anytracksuccess" => {
            config.set_any_track_success_indicates_success(attr.parse(parse_bool)?)
        }
        "ignoreiso1" => config.set_ignore_duplicate_iso1(attr.parse(parse_bool)?),
        "ignoreiso3" => config.set_ignore_duplicate_iso3(attr.parse(parse_bool)?),
        "stripcolon" => config.set_strip_leading_colon(attr.parse(parse_bool)?),
        "ibuttonmode" => config.set_ibutton_mode(attr.parse(parse_ibutton_mode)?),
        "mmd1100resetinterval" => {
            if !features.mmd1100_reset_interval {
                return Ok(Outcome::Unsupported);
            }
            let interval = attr.parse(|v| parse_u8(v).filter(|i| *i <= MAX_RESET_INTERVAL))?;
            config.set_mmd1100_reset_interval(interval)
        }
        _ => return Ok(Outcome::Unknown),
    };
    Ok(Outcome::Applied(changed))
}

fn apply_global(config: &mut DeviceConfig, key: &str, attr: &Attr<'_>) -> SettingsResult<Outcome> {
    let changed = match key {
        "prefix" => config.set_global_prefix(attr.tag(TagKind::Normal)?),
        "postfix" => config.set_global_postfix(attr.tag(TagKind::Normal)?),
        _ => return Ok(Outcome::Unknown),
    };
    Ok(Outcome::Applied(changed))
}

fn apply_ibutton(
    config: &mut DeviceConfig,
    features: &FeatureSet,
    key: &str,
    attr: &Attr<'_>,
) -> SettingsResult<Outcome> {
    let (gate, changed) = match key {
        "prefix" | "postfix" if !features.ibutton_uart_tags => (false, false),
        "remove" | "removeprefix" | "removepostfix" if !features.ibutton_remove => (false, false),
        "prefix" => (true, config.set_ibutton_prefix(attr.tag(TagKind::Normal)?)),
        "postfix" => (true, config.set_ibutton_postfix(attr.tag(TagKind::Normal)?)),
        "remove" => (true, config.set_ibutton_remove(attr.tag(TagKind::IButtonRemove)?)),
        "removeprefix" => (true, config.set_ibutton_remove_prefix(attr.tag(TagKind::Normal)?)),
        "removepostfix" => (true, config.set_ibutton_remove_postfix(attr.tag(TagKind::Normal)?)),
        _ => return Ok(Outcome::Unknown),
    };
    Ok(if gate {
        Outcome::Applied(changed)
    } else {
        Outcome::Unsupported
    })
}

fn apply_uart(
    config: &mut DeviceConfig,
    features: &FeatureSet,
    key: &str,
    attr: &Attr<'_>,
) -> SettingsResult<Outcome> {
    if !matches!(key, "prefix" | "postfix") {
        return Ok(Outcome::Unknown);
    }
    if !features.ibutton_uart_tags {
        return Ok(Outcome::Unsupported);
    }
    let tag = attr.tag(TagKind::Normal)?;
    let changed = if key == "prefix" {
        config.set_uart_prefix(tag)
    } else {
        config.set_uart_postfix(tag)
    };
    Ok(Outcome::Applied(changed))
}

fn apply_track(
    config: &mut DeviceConfig,
    features: &FeatureSet,
    track: Track,
    combination: Combination,
    key: &str,
    attr: &Attr<'_>,
) -> SettingsResult<Outcome> {
    if key == "enable" {
        let changed = config.set_track_enabled(track, attr.parse(parse_bool)?);
        return Ok(Outcome::Applied(changed));
    }
    let value = match key {
        "direction" => ComboValue::ReadDirection(attr.parse(parse_direction)?),
        "maxsize" => ComboValue::MaxSize(attr.parse(parse_u8)?),
        "bitsize" => ComboValue::BitSize(attr.parse(parse_u8)?),
        "datamask" => ComboValue::DataMask(attr.parse(parse_u8)?),
        "useparity" => ComboValue::UseParity(attr.parse(parse_bool)?),
        "paritytype" => ComboValue::ParityType(attr.parse(parse_parity)?),
        "stx" => ComboValue::StxPattern(attr.parse(parse_u8)?),
        "etx" => ComboValue::EtxPattern(attr.parse(parse_u8)?),
        "useecm" => ComboValue::UseEcm(attr.parse(parse_bool)?),
        "ecmtype" => ComboValue::EcmType(attr.parse(parse_ecm)?),
        "addvalue" => ComboValue::AddValue(attr.parse(parse_u8)?),
        "prefix" => ComboValue::PrivatePrefix(attr.tag(TagKind::Normal)?),
        "postfix" => ComboValue::PrivatePostfix(attr.tag(TagKind::Normal)?),
        _ => return Ok(Outcome::Unknown),
    };
    if combination.index() >= features.combination_count() {
        return Ok(Outcome::Unsupported);
    }
    Ok(Outcome::Applied(config.set_combo(track, combination, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpu237_protocol::{Field, Interface, KeyPair, Language};

    #[test]
    fn test_common_attributes_mark_dirty() {
        let mut config = DeviceConfig::new();
        let report = import_xml(
            &mut config,
            r#"<lpu237><common interface="usb_hid" language="german" boot_run_time="0x10"/></lpu237>"#,
        )
        .expect("valid settings");
        assert_eq!(report.applied, 3);
        assert_eq!(report.changed, 3);
        assert!(report.skipped.is_empty());
        assert_eq!(config.interface(), Interface::UsbHid);
        assert_eq!(config.language(), Language::German);
        assert_eq!(config.boot_run_time(), 16);
        assert!(config.dirty().contains(Field::BootRunTime));
    }

    #[test]
    fn test_invalid_value_leaves_model_untouched() {
        let mut config = DeviceConfig::new();
        let err = import_xml(
            &mut config,
            r#"<lpu237><common language="german" interface="firewire"/></lpu237>"#,
        )
        .expect_err("unknown interface");
        assert!(matches!(err, SettingsError::InvalidValue { ref attribute, .. } if attribute == "interface"));
        assert_eq!(config.language(), Language::UsaEnglish);
        assert!(config.dirty().is_empty());
    }

    #[test]
    fn test_unknowns_are_reported() {
        let mut config = DeviceConfig::new();
        let report = import_xml(
            &mut config,
            r#"<lpu237><keymap a="1"/><common colour="blue"/></lpu237>"#,
        )
        .expect("unknowns are not fatal");
        assert_eq!(report.applied, 0);
        assert_eq!(
            report.skipped,
            vec![
                SkippedAttribute {
                    element: "keymap".to_owned(),
                    attribute: String::new(),
                    reason: SkipReason::UnknownElement,
                },
                SkippedAttribute {
                    element: "common".to_owned(),
                    attribute: "colour".to_owned(),
                    reason: SkipReason::UnknownAttribute,
                },
            ]
        );
    }

    #[test]
    fn test_gated_attributes_skipped_on_old_firmware() {
        let mut config = DeviceConfig::new();
        let report = import_xml(
            &mut config,
            r#"<lpu237>
                 <ibutton prefix="A" remove="B"/>
                 <uart postfix="C"/>
                 <iso1 combination="2" max_size="40"/>
               </lpu237>"#,
        )
        .expect("gated attributes are not fatal");
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped.len(), 4);
        assert!(
            report
                .skipped
                .iter()
                .all(|s| s.reason == SkipReason::Unsupported)
        );
        assert!(config.dirty().is_empty());
    }

    #[test]
    fn test_track_attributes_and_tags() {
        let mut config = DeviceConfig::new();
        import_xml(
            &mut config,
            r#"<lpu237>
                 <global prefix="%B" postfix="hex:01ff3f"/>
                 <iso2 enable="enable" max_size="40" parity_type="odd" prefix=";"/>
               </lpu237>"#,
        )
        .expect("valid settings");
        assert_eq!(
            config.global_prefix().keys(),
            [KeyPair::ascii(b'%'), KeyPair::ascii(b'B')]
        );
        assert_eq!(config.global_postfix().keys(), [KeyPair::ascii(b'?')]);
        assert!(config.track_enabled(Track::Iso2));
        let combo = config.combo(Track::Iso2, Combination::First);
        assert_eq!(combo.max_size, 40);
        assert_eq!(combo.private_prefix.keys(), [KeyPair::ascii(b';')]);
    }

    #[test]
    fn test_bad_combination_index() {
        let mut config = DeviceConfig::new();
        let err = import_xml(&mut config, r#"<x><iso1 combination="3" max_size="1"/></x>"#)
            .expect_err("only three combinations exist");
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_xml() {
        let mut config = DeviceConfig::new();
        let err = import_xml(&mut config, r#"<x><common interface="usb_hid"></x>"#)
            .expect_err("mismatched end tag");
        assert!(matches!(err, SettingsError::Xml(_)));
    }
}
