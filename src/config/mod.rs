//! Configuration loading.

mod settings;

pub use settings::{
    expand_env_vars, ModelSettings, SegmentationSettings, Settings, SettingsError, WorkerSettings,
};
