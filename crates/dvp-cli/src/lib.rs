// Library root for the `dvp` binary: output rendering lives here so it can be
// tested without spawning the executable.

pub mod render;
