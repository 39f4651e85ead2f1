pub mod opportunity;
pub mod preferences;
pub mod profile;
pub mod swipe;
