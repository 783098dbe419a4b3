mod app;
mod screens;
mod widgets;

pub use app::{FacilityApp, LaunchOptions, Message, run};
pub use screens::{
    Screen, ScreenMessage,
    facility::{FacilityParentMessage, FacilityScreen, FacilityScreenMessage},
};
