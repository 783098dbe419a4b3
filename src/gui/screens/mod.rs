pub mod facility;

use iced::{Element, Task};

#[derive(Debug)]
pub enum ScreenMessage<S: Screen> {
    ScreenMessage(S::Message),
    ParentMessage(S::ParentMessage),
}

impl<S: Screen> Clone for ScreenMessage<S>
where
    S::Message: Clone,
    S::ParentMessage: Clone,
{
    fn clone(&self) -> Self {
        match self {
            ScreenMessage::ScreenMessage(msg) => ScreenMessage::ScreenMessage(msg.clone()),
            ScreenMessage::ParentMessage(msg) => ScreenMessage::ParentMessage(msg.clone()),
        }
    }
}

pub trait Screen: Sized {
    type Message: std::fmt::Debug;
    type ParentMessage: std::fmt::Debug;
    fn view(&self) -> Element<'_, ScreenMessage<Self>>;
    fn update(&mut self, message: Self::Message) -> Task<ScreenMessage<Self>>;
}
