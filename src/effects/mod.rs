pub mod preset;

pub use preset::{PresetManager, PresetParameters, RenderMode, ScopePreset};
