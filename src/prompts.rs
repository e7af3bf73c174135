use crate::options::{Capability, Language};

pub const SYSTEM_INSTRUCTION: &str = "You are a professional game development AI agent.";

pub const NO_VISIBLE_OUTPUT: &str = "⚠️ Model returned no visible text output.";

fn preamble(language: Language) -> String {
    format!(
        "\nYou are GameMaster AI, a professional game designer and AI assistant.\n\
         Respond strictly in {language}. Ensure clarity, professional terminology, and structure.\n"
    )
}

pub const fn template(capability: Capability) -> &'static str {
    match capability {
        Capability::GameConceptGenerator =>
r#"
Generate a full game concept including:
- Genre
- Core gameplay loop
- Story theme
- Unique mechanics
- Target audience
"#,
        Capability::LevelAndEnvironmentDesigner =>
r#"
Design a detailed game level including:
- Environment & terrain
- Player challenges
- Enemy placement
- Rewards & progression
"#,
        Capability::NpcBehaviorDesigner =>
r#"
Create NPC behavior including:
- Role
- Decision rules
- Emotional states
- Behavior tree (pseudo-code)
"#,
        Capability::GameStrategyAssistant =>
r#"
Analyze and improve gameplay strategy:
- Balance fixes
- Player engagement
- Difficulty tuning
- Retention mechanics
"#,
        Capability::DialogueAndStoryScripting =>
r#"
Write immersive narrative:
- Characters
- Quests
- Branching dialogues
- Story arcs
"#,
        Capability::AvatarAndCharacterCreation =>
r#"
Design game avatar:
- Visual appearance
- Personality
- Outfit & accessories
- Animation notes
"#,
        Capability::GameAnimationDesigner =>
r#"
Design animations:
- Type (idle, walk, combat, emote)
- Keyframes & transitions
- Engine-ready animation notes
"#,
    }
}

/// Assemble the user message sent to the model. `input` is passed through untouched.
pub fn build_prompt(capability: Capability, language: Language, input: &str) -> String {
    format!(
        "{}\nTask:\n{}\nUser Input:\n{input}",
        preamble(language),
        template(capability)
    )
}
