use std::fmt::Display;

/// Which instruction template a request is built from.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    GameConceptGenerator,
    LevelAndEnvironmentDesigner,
    NpcBehaviorDesigner,
    GameStrategyAssistant,
    DialogueAndStoryScripting,
    AvatarAndCharacterCreation,
    GameAnimationDesigner,
}

impl Capability {
    pub const ALL: [Self; 7] = [
        Self::GameConceptGenerator,
        Self::LevelAndEnvironmentDesigner,
        Self::NpcBehaviorDesigner,
        Self::GameStrategyAssistant,
        Self::DialogueAndStoryScripting,
        Self::AvatarAndCharacterCreation,
        Self::GameAnimationDesigner,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::GameConceptGenerator => "Game Concept Generator",
            Self::LevelAndEnvironmentDesigner => "Level & Environment Designer",
            Self::NpcBehaviorDesigner => "NPC Behavior Designer",
            Self::GameStrategyAssistant => "Game Strategy Assistant",
            Self::DialogueAndStoryScripting => "Dialogue & Story Scripting",
            Self::AvatarAndCharacterCreation => "Avatar & Character Creation",
            Self::GameAnimationDesigner => "Game Animation Designer",
        }
    }

    /// Name as it appears in output file names.
    pub fn slug(self) -> String {
        self.name().replace(' ', "_")
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Hindi,
    Marathi,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Bengali,
    Gujarati,
    Punjabi,
    Spanish,
    French,
    German,
    Japanese,
    Korean,
    Chinese,
}

impl Language {
    pub const ALL: [Self; 16] = [
        Self::English,
        Self::Hindi,
        Self::Marathi,
        Self::Tamil,
        Self::Telugu,
        Self::Kannada,
        Self::Malayalam,
        Self::Bengali,
        Self::Gujarati,
        Self::Punjabi,
        Self::Spanish,
        Self::French,
        Self::German,
        Self::Japanese,
        Self::Korean,
        Self::Chinese,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
            Self::Marathi => "Marathi",
            Self::Tamil => "Tamil",
            Self::Telugu => "Telugu",
            Self::Kannada => "Kannada",
            Self::Malayalam => "Malayalam",
            Self::Bengali => "Bengali",
            Self::Gujarati => "Gujarati",
            Self::Punjabi => "Punjabi",
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::German => "German",
            Self::Japanese => "Japanese",
            Self::Korean => "Korean",
            Self::Chinese => "Chinese",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
