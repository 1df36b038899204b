pub mod host;
pub mod plugin;
pub mod pool;
pub mod presentation;
pub mod reveal;
pub mod scheduler;
pub mod settings;
