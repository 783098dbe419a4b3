use std::path::PathBuf;

use iced::{
    Element, Length, Task,
    widget::{container, text},
};
use tracing::{debug, error};

use crate::{
    config::FacilityConfig,
    core::{db::AnswerKey, db::SurveyDb, locate::PositionSource, tree::RTreeFacilityIndex},
    gui::screens::{
        Screen, ScreenMessage,
        facility::{FacilityParentMessage, FacilityScreen},
    },
    question::FacilityQuestion,
};

/// Everything needed to open one facility question.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub db: PathBuf,
    pub facilities: Option<PathBuf>,
    pub key: AnswerKey,
    pub config: FacilityConfig,
}

#[derive(Debug)]
pub enum Message<P> {
    Loaded(Result<FacilityScreen<P>, String>),
    Facility(ScreenMessage<FacilityScreen<P>>),
}

pub struct FacilityApp<P> {
    screen: Option<FacilityScreen<P>>,
    error: Option<String>,
}

async fn load<P: PositionSource>(options: LaunchOptions, source: P) -> anyhow::Result<FacilityScreen<P>> {
    let index = match &options.facilities {
        Some(path) => RTreeFacilityIndex::from_json_file(path)?,
        None => RTreeFacilityIndex::new(),
    };
    let db = SurveyDb::new(&options.db).await?;
    let question = FacilityQuestion::new(db, options.key, index, source, &options.config).await?;
    FacilityScreen::new(question).await
}

impl<P: PositionSource + std::fmt::Debug> FacilityApp<P> {
    fn boot(options: LaunchOptions, source: P) -> (Self, Task<Message<P>>) {
        (
            Self {
                screen: None,
                error: None,
            },
            Task::perform(load(options, source), |result| {
                Message::Loaded(result.map_err(|e| format!("{:#}", e)))
            }),
        )
    }

    fn update(&mut self, message: Message<P>) -> Task<Message<P>> {
        match message {
            Message::Loaded(Ok(screen)) => {
                self.screen = Some(screen);
                Task::none()
            }
            Message::Loaded(Err(e)) => {
                error!(error = %e, "Failed to open facility question");
                self.error = Some(e);
                Task::none()
            }
            Message::Facility(ScreenMessage::ScreenMessage(message)) => match &mut self.screen {
                Some(screen) => screen.update(message).map(Message::Facility),
                None => Task::none(),
            },
            Message::Facility(ScreenMessage::ParentMessage(FacilityParentMessage::AnswerChanged)) => {
                debug!("Answer saved");
                Task::none()
            }
        }
    }

    fn view(&self) -> Element<'_, Message<P>> {
        let status = match (&self.screen, &self.error) {
            (Some(screen), _) => return screen.view().map(Message::Facility),
            (None, Some(e)) => format!("Could not open the survey: {}", e),
            (None, None) => "Loading...".to_string(),
        };
        container(text(status))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }
}

/// Open the question in a window. Blocks until the window is closed.
pub fn run<P>(options: LaunchOptions, source: P) -> iced::Result
where
    P: PositionSource + Clone + std::fmt::Debug,
{
    iced::application(
        move || FacilityApp::boot(options.clone(), source.clone()),
        FacilityApp::update,
        FacilityApp::view,
    )
    .title("Facility picker")
    .run()
}
