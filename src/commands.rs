//! Phrase catalog and command resolution
//!
//! The catalog is a closed enumeration of recognized phrases mapped to
//! application destinations. Matching is an exact, case-insensitive table
//! lookup after whitespace normalization; near-miss phrasing fails closed
//! to the caller's fallback branch. The phrase lists are data so the
//! catalog can be tested independently of the dispatch mechanism.

use std::collections::HashMap;

/// Application screen a recognized phrase navigates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Appointment booking screen
    AppointmentBooking,
    /// Counselor details screen
    CounselorDetails,
    /// Counselor session screen
    CounselorSession,
    /// Daily wellness tips screen
    DailyTips,
    /// Fitness and nutrition screen
    FitnessNutrition,
    /// Password reset screen
    PasswordReset,
    /// Homepage
    Home,
    /// Login screen
    Login,
    /// Medication schedule screen
    MedicationSchedule,
    /// Mental health resources screen
    MentalHealth,
    /// News feed screen
    News,
    /// Notifications list screen
    Notifications,
    /// Notification settings screen
    NotificationSettings,
    /// Preferences screen
    Preferences,
    /// Privacy policy screen
    PrivacyPolicy,
    /// User profile screen
    Profile,
    /// Settings screen
    Settings,
    /// Sign-up screen
    SignUp,
    /// Symptom assessment screen
    SymptomAssessment,
}

impl Destination {
    /// Screen name passed to the navigation capability
    #[must_use]
    pub const fn screen_name(self) -> &'static str {
        match self {
            Self::AppointmentBooking => "AppointmentBooking",
            Self::CounselorDetails => "CounselorDetails",
            Self::CounselorSession => "CounselorSession",
            Self::DailyTips => "DailyTips",
            Self::FitnessNutrition => "FitnessNutrition",
            Self::PasswordReset => "PasswordReset",
            Self::Home => "Home",
            Self::Login => "Login",
            Self::MedicationSchedule => "MedicationSchedule",
            Self::MentalHealth => "MentalHealth",
            Self::News => "News",
            Self::Notifications => "Notifications",
            Self::NotificationSettings => "NotificationSettings",
            Self::Preferences => "Preferences",
            Self::PrivacyPolicy => "PrivacyPolicy",
            Self::Profile => "Profile",
            Self::Settings => "Settings",
            Self::SignUp => "SignUp",
            Self::SymptomAssessment => "SymptomAssessment",
        }
    }
}

/// Informational request that is recognized but not actionable
///
/// These phrases are part of the catalog so they don't fall through to the
/// generic fallback, but they deliberately perform no navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoTopic {
    /// "is my counselor available"
    CounselorAvailability,
    /// "what is the latest health tip"
    LatestHealthTip,
    /// "do i have any notifications"
    NotificationsSummary,
}

/// Action a recognized phrase resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Navigate to a screen
    Navigate(Destination),
    /// Recognized informational request; no navigation
    Informational(InfoTopic),
}

/// Normalized transcript: lower-cased, whitespace-collapsed, trailing
/// sentence punctuation stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptCommand(String);

impl TranscriptCommand {
    /// Normalize raw transcription output into a lookup key
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let collapsed = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self(collapsed.trim_end_matches(['.', '!', '?']).to_owned())
    }

    /// Empty command, returned when a cycle ends without a usable transcript
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// True when no usable transcript was produced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Normalized text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Static phrase catalog: every phrase set and the action it maps to
const PHRASES: &[(CommandAction, &[&str])] = &[
    (
        CommandAction::Navigate(Destination::AppointmentBooking),
        &[
            "book an appointment",
            "take me to appointment booking",
            "i want to book an appointment",
        ],
    ),
    (
        CommandAction::Navigate(Destination::CounselorDetails),
        &["show me my counselor", "take me to counselor details"],
    ),
    (
        CommandAction::Navigate(Destination::CounselorSession),
        &[
            "start a counselor session",
            "take me to my counseling session",
        ],
    ),
    (
        CommandAction::Navigate(Destination::DailyTips),
        &["show me daily tips", "take me to daily tips"],
    ),
    (
        CommandAction::Navigate(Destination::FitnessNutrition),
        &[
            "take me to fitness and nutrition",
            "show me fitness tips",
            "show me nutrition tips",
        ],
    ),
    (
        CommandAction::Navigate(Destination::PasswordReset),
        &["reset my password", "i forgot my password"],
    ),
    (
        CommandAction::Navigate(Destination::Home),
        &[
            "take me to the homepage",
            "go to the main page",
            "i want to go home",
        ],
    ),
    (
        CommandAction::Navigate(Destination::Login),
        &["take me to login", "i want to log in"],
    ),
    (
        CommandAction::Navigate(Destination::MedicationSchedule),
        &[
            "show my medication schedule",
            "take me to my medication schedule",
            "when do i take my medication",
        ],
    ),
    (
        CommandAction::Navigate(Destination::MentalHealth),
        &["take me to mental health", "show me mental health resources"],
    ),
    (
        CommandAction::Navigate(Destination::News),
        &["show me the news", "take me to the news"],
    ),
    (
        CommandAction::Navigate(Destination::Notifications),
        &["show my notifications", "take me to notifications"],
    ),
    (
        CommandAction::Navigate(Destination::NotificationSettings),
        &[
            "take me to notification settings",
            "change my notification settings",
        ],
    ),
    (
        CommandAction::Navigate(Destination::Preferences),
        &["take me to preferences", "open my preferences"],
    ),
    (
        CommandAction::Navigate(Destination::PrivacyPolicy),
        &["show me the privacy policy", "take me to privacy"],
    ),
    (
        CommandAction::Navigate(Destination::Profile),
        &["take me to my profile", "show my profile"],
    ),
    (
        CommandAction::Navigate(Destination::Settings),
        &["take me to settings", "open settings", "go to settings"],
    ),
    (
        CommandAction::Navigate(Destination::SignUp),
        &["take me to sign up", "i want to create an account"],
    ),
    (
        CommandAction::Navigate(Destination::SymptomAssessment),
        &[
            "start a symptom assessment",
            "take me to symptom assessment",
            "check my symptoms",
        ],
    ),
    (
        CommandAction::Informational(InfoTopic::CounselorAvailability),
        &["is my counselor available"],
    ),
    (
        CommandAction::Informational(InfoTopic::LatestHealthTip),
        &["what is the latest health tip"],
    ),
    (
        CommandAction::Informational(InfoTopic::NotificationsSummary),
        &["do i have any notifications"],
    ),
];

/// Phrase lookup table built once at startup
pub struct CommandCatalog {
    table: HashMap<&'static str, CommandAction>,
}

impl CommandCatalog {
    /// Build the lookup table from the static phrase data
    #[must_use]
    pub fn new() -> Self {
        let mut table = HashMap::new();
        for (action, phrases) in PHRASES {
            for phrase in *phrases {
                table.insert(*phrase, *action);
            }
        }
        Self { table }
    }

    /// Exact lookup of a normalized transcript; `None` on any miss
    #[must_use]
    pub fn resolve(&self, command: &TranscriptCommand) -> Option<CommandAction> {
        self.table.get(command.as_str()).copied()
    }

    /// A few example phrases for the spoken fallback message
    #[must_use]
    pub fn sample_phrases() -> &'static [&'static str] {
        &[
            "take me to settings",
            "book an appointment",
            "show my notifications",
        ]
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::new()
    }
}
