//! Script and audio generation.

pub mod audio;
pub mod script;

pub use audio::{AudioArtifact, AudioRenderer, OpenAiSpeechEngine, SpeechEngine, Voice};
pub use script::{OpenAiScriptEngine, ScriptEngine, ScriptOutcome};
