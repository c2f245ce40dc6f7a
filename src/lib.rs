pub mod clause;
pub mod history;
pub mod literal;
pub mod notation;
pub mod relation;
pub mod render;
pub mod render_cache;
pub mod runner;
pub mod segmenter;
pub mod session;
pub mod settings;
pub mod term;

#[cfg(test)]
mod tests;
