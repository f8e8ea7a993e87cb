//! Configuration: `encryptolock.toml` plus environment overrides.

pub mod settings;

pub use settings::{
    master_key_from, master_key_from_env, session_secret_from, session_secret_from_env, Settings,
    MASTER_KEY_VAR, SESSION_SECRET_VAR,
};
