//! Application allow-list
//!
//! Only notifications originating from applications in this table are ever
//! tracked. The table maps the peer's application identifier (a bundle id
//! such as `com.apple.MobileSMS`) to an [`Application`] category.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Known application categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Application {
    Sms,
    Phone,
    FaceTime,
    Messenger,
    Pinger,
    TextNow,
    Keybase,
    Signal,
    Honk,
    Ghrn,
    Towbook,
}

impl Application {
    /// Phone and FaceTime notifications go to the call slot.
    pub fn is_call(self) -> bool {
        matches!(self, Application::Phone | Application::FaceTime)
    }

    /// Short name shown in the header of a rendered notification
    pub fn display_name(self) -> &'static str {
        match self {
            Application::Sms => "iMessage",
            Application::Phone => "Call",
            Application::FaceTime => "Facetime",
            Application::Messenger => "Facebook",
            Application::Pinger => "Pinger",
            Application::TextNow => "TextNow",
            Application::Keybase => "Keybase",
            Application::Signal => "Signal",
            Application::Honk => "Honk",
            Application::Ghrn => "GHRN",
            Application::Towbook => "Towbook",
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

const BUILTIN_APPLICATIONS: &[(&str, Application)] = &[
    ("com.apple.MobileSMS", Application::Sms),
    ("com.apple.mobilephone", Application::Phone),
    ("com.apple.facetime", Application::FaceTime),
    ("com.facebook.Messenger", Application::Messenger),
    ("com.pinger.textfreeWithVoice", Application::Pinger),
    ("com.tinginteractive.usms", Application::TextNow),
    ("keybase.ios", Application::Keybase),
    ("org.whispersystems.signal", Application::Signal),
    ("com.honkforhelp.driver", Application::Honk),
    ("com.arity.rescuer", Application::Ghrn),
    ("com.towbook.mobile", Application::Towbook),
];

/// Static application-identifier to category table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    entries: HashMap<String, Application>,
}

impl AllowList {
    /// An allow-list that rejects everything
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Application)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(app_id, app)| (app_id.into(), app))
                .collect(),
        }
    }

    /// Resolve an application identifier. Matching is exact.
    pub fn resolve(&self, app_id: &str) -> Option<Application> {
        self.entries.get(app_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Application)> + '_ {
        self.entries.iter().map(|(app_id, app)| (app_id.as_str(), *app))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::from_entries(BUILTIN_APPLICATIONS.iter().copied())
    }
}
