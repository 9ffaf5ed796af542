/// Build label reported by `/health`, stamped by the build script.
pub const GIT_VERSION: &str = env!("GIT_VERSION");
