use huddle_core::TrackKind;
use std::fmt;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum DeviceKind {
    Camera,
    Microphone,
    Screen,
}

impl DeviceKind {
    pub fn track_kind(&self) -> TrackKind {
        match self {
            DeviceKind::Camera => TrackKind::Video,
            DeviceKind::Microphone => TrackKind::Audio,
            DeviceKind::Screen => TrackKind::Screen,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Camera => "camera",
            DeviceKind::Microphone => "microphone",
            DeviceKind::Screen => "screen",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opened capture device as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub id: String,
    pub kind: DeviceKind,
    pub label: String,
}
