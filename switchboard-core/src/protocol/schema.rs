//! The fixed catalog of remote methods and events.
//!
//! Signatures use the compact D-Bus type notation: `i` int32, `u` uint32,
//! `b` bool, `s` string, `a(iiii)` list of four-int32 tuples. An empty
//! signature means the tuple is empty.

use std::fmt;
use std::str::FromStr;

use crate::error::SwitchError;

/// Name and argument/return signatures of one remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    pub method: Method,
    pub name: &'static str,
    pub input: &'static str,
    pub output: &'static str,
}

impl MethodSpec {
    const fn new(
        method: Method,
        name: &'static str,
        input: &'static str,
        output: &'static str,
    ) -> Self {
        Self {
            method,
            name,
            input,
            output,
        }
    }
}

/// Name and argument signature of one broadcast event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpec {
    pub name: &'static str,
    pub args: &'static str,
}

// ── Method ───────────────────────────────────────────────────────

/// Every method a controller answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetComposePort,
    GetEncodePort,
    GetAudioPort,
    GetPreviewPorts,
    SetCompositeMode,
    GetCompositeMode,
    NewRecord,
    AdjustPip,
    Switch,
    ClickVideo,
    MarkFace,
    MarkTracking,
}

pub const METHODS: &[MethodSpec] = &[
    MethodSpec::new(Method::GetComposePort, "get_compose_port", "", "i"),
    MethodSpec::new(Method::GetEncodePort, "get_encode_port", "", "i"),
    MethodSpec::new(Method::GetAudioPort, "get_audio_port", "", "i"),
    MethodSpec::new(Method::GetPreviewPorts, "get_preview_ports", "", "s"),
    MethodSpec::new(Method::SetCompositeMode, "set_composite_mode", "i", "b"),
    MethodSpec::new(Method::GetCompositeMode, "get_composite_mode", "", "i"),
    MethodSpec::new(Method::NewRecord, "new_record", "", "b"),
    MethodSpec::new(Method::AdjustPip, "adjust_pip", "iiii", "u"),
    MethodSpec::new(Method::Switch, "switch", "ii", "b"),
    MethodSpec::new(Method::ClickVideo, "click_video", "iiii", "b"),
    MethodSpec::new(Method::MarkFace, "mark_face", "a(iiii)", ""),
    MethodSpec::new(Method::MarkTracking, "mark_tracking", "a(iiii)", ""),
];

pub const EVENTS: &[EventSpec] = &[
    EventSpec { name: "preview_port_added", args: "iii" },
    EventSpec { name: "preview_port_removed", args: "iii" },
    EventSpec { name: "new_mode_online", args: "i" },
    EventSpec { name: "show_face_marker", args: "a(iiii)" },
    EventSpec { name: "show_track_marker", args: "a(iiii)" },
    EventSpec { name: "select_face", args: "ii" },
];

impl Method {
    pub fn signature(&self) -> &'static MethodSpec {
        // METHODS is declared in enum order.
        &METHODS[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.signature().name
    }

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Method> {
        METHODS.iter().find(|entry| entry.name == name).map(|entry| entry.method)
    }

    pub fn all() -> impl Iterator<Item = Method> {
        METHODS.iter().map(|entry| entry.method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::from_name(s).ok_or_else(|| SwitchError::UnknownMethod(s.to_string()))
    }
}

pub fn event_signature(name: &str) -> Option<&'static EventSpec> {
    EVENTS.iter().find(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_enum_order() {
        for (idx, entry) in METHODS.iter().enumerate() {
            assert_eq!(entry.method as usize, idx);
            assert_eq!(entry.method.signature().name, entry.name);
        }
    }

    #[test]
    fn lookup_is_exact() {
        assert_eq!(Method::from_name("switch"), Some(Method::Switch));
        assert_eq!(Method::from_name("Switch"), None);
        assert_eq!(Method::from_name("switch "), None);
        assert_eq!(Method::from_name("get_"), None);
        assert!("set_encode_mode".parse::<Method>().is_err());
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = METHODS.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), METHODS.len());
    }

    #[test]
    fn adjust_pip_signature() {
        let entry = Method::AdjustPip.signature();
        assert_eq!(entry.input, "iiii");
        assert_eq!(entry.output, "u");
    }

    #[test]
    fn events_are_known() {
        assert_eq!(EVENTS.len(), 6);
        assert_eq!(event_signature("select_face").unwrap().args, "ii");
        assert!(event_signature("connection_closed").is_none());
    }
}
