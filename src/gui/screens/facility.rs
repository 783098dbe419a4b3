use std::sync::Arc;

use iced::{
    Element, Task,
    widget::{Column, button, radio, text, text_input},
};
use tokio::sync::Mutex;

use crate::{
    core::{db::SurveyDb, locate::PositionSource, sector::SECTOR_CHOICES, sector::SectorClass, tree::RTreeFacilityIndex},
    gui::{
        screens::{Screen, ScreenMessage},
        widgets::layout,
    },
    question::{AuthoringView, FacilityMessage, FacilityQuestion, FacilityView, InputQueue, Mode, SelectingView},
};

const OTHER_CHOICE: usize = SECTOR_CHOICES.len();

type SharedQuestion<P> = Arc<Mutex<FacilityQuestion<SurveyDb, RTreeFacilityIndex, P>>>;

pub struct FacilityScreen<P> {
    question: SharedQuestion<P>,
    view: FacilityView,
    /// Text as typed; the stored answer catches up through `inputs`.
    name: String,
    other_sector: String,
    /// "Other" picked in the sector list before anything was typed.
    other_chosen: bool,
    inputs: InputQueue,
    error: Option<String>,
}

impl<P> std::fmt::Debug for FacilityScreen<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityScreen")
            .field("view", &self.view)
            .field("name", &self.name)
            .field("other_sector", &self.other_sector)
            .field("inputs", &self.inputs)
            .field("error", &self.error)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum FacilityScreenMessage {
    Input(FacilityMessage),
    ChooseOtherSector,
    Refreshed(Result<FacilityView, String>),
}

#[derive(Debug, Clone)]
pub enum FacilityParentMessage {
    /// The stored answer was rewritten.
    AnswerChanged,
}

impl<P: PositionSource> FacilityScreen<P> {
    pub async fn new(question: FacilityQuestion<SurveyDb, RTreeFacilityIndex, P>) -> anyhow::Result<Self> {
        let view = question.view().await?;
        let mut screen = Self {
            question: Arc::new(Mutex::new(question)),
            view,
            name: String::new(),
            other_sector: String::new(),
            other_chosen: false,
            inputs: InputQueue::new(),
            error: None,
        };
        screen.sync_text();
        Ok(screen)
    }

    fn mode(&self) -> Mode {
        match self.view {
            FacilityView::Selecting(_) => Mode::Selecting,
            FacilityView::Authoring(_) => Mode::Authoring,
        }
    }

    /// Take the text fields from the stored draft.
    fn sync_text(&mut self) {
        if let FacilityView::Authoring(view) = &self.view {
            self.name = view.name.clone().unwrap_or_default();
            self.other_sector = match &view.sector {
                SectorClass::Other(value) => value.clone(),
                _ => String::new(),
            };
        }
    }

    fn locate(&self) -> Task<ScreenMessage<Self>> {
        let question = self.question.clone();
        Task::perform(
            async move {
                let handle = question.lock().await.locate();
                let request = handle.id();
                (request, handle.outcome().await)
            },
            |(request, outcome)| {
                ScreenMessage::ScreenMessage(FacilityScreenMessage::Input(FacilityMessage::Located(
                    request, outcome,
                )))
            },
        )
    }

    fn start_next(&mut self) -> Task<ScreenMessage<Self>> {
        match self.inputs.start_next() {
            Some(message) => self.apply(message),
            None => Task::none(),
        }
    }

    fn apply(&self, message: FacilityMessage) -> Task<ScreenMessage<Self>> {
        let changes_answer = matches!(
            message,
            FacilityMessage::SelectFacility(_)
                | FacilityMessage::NameInput(_)
                | FacilityMessage::SectorSelected(_)
                | FacilityMessage::OtherSectorInput(_)
        );
        let question = self.question.clone();
        let refresh = Task::perform(
            async move {
                let mut question = question.lock().await;
                question.update(message).await.map_err(|e| e.to_string())?;
                question.view().await.map_err(|e| e.to_string())
            },
            |result| ScreenMessage::ScreenMessage(FacilityScreenMessage::Refreshed(result)),
        );
        if changes_answer {
            refresh.chain(Task::done(ScreenMessage::ParentMessage(
                FacilityParentMessage::AnswerChanged,
            )))
        } else {
            refresh
        }
    }
}

fn selecting_view<P: PositionSource>(view: &SelectingView) -> Element<'_, ScreenMessage<FacilityScreen<P>>> {
    let selected = view
        .selected
        .as_ref()
        .and_then(|id| view.candidates.iter().position(|c| &c.uuid == id));

    let mut content = Column::new().spacing(10).push(
        button(text("Find my location and show nearby facilities")).on_press(
            ScreenMessage::ScreenMessage(FacilityScreenMessage::Input(FacilityMessage::Locate)),
        ),
    );
    if view.candidates.is_empty() {
        content = content.push(text("No facilities nearby."));
    }
    for (i, candidate) in view.candidates.iter().enumerate() {
        let id = candidate.uuid.clone();
        content = content.push(radio(candidate.name.clone(), i, selected, move |_| {
            ScreenMessage::ScreenMessage(FacilityScreenMessage::Input(FacilityMessage::SelectFacility(id.clone())))
        }));
    }
    if view.can_add_facility {
        content = content.push(button(text("Add new facility")).on_press(ScreenMessage::ScreenMessage(
            FacilityScreenMessage::Input(FacilityMessage::ToggleAddFacility),
        )));
    }
    content.into()
}

fn authoring_view<'a, P: PositionSource>(
    view: &'a AuthoringView,
    name: &'a str,
    other_sector: &'a str,
    other_chosen: bool,
) -> Element<'a, ScreenMessage<FacilityScreen<P>>> {
    let selected = match &view.sector {
        SectorClass::Fixed(sector) => SECTOR_CHOICES.iter().position(|s| s == sector),
        SectorClass::Other(_) => Some(OTHER_CHOICE),
        SectorClass::Unset if other_chosen => Some(OTHER_CHOICE),
        SectorClass::Unset => None,
    };
    let location = match view.location {
        Some(loc) => format!("{:.6}, {:.6}", loc.lat, loc.lng),
        None => "Location unknown".to_string(),
    };

    let mut content = Column::new()
        .spacing(10)
        .push(
            text_input("Facility name", name).on_input(|name| {
                ScreenMessage::ScreenMessage(FacilityScreenMessage::Input(FacilityMessage::NameInput(name)))
            }),
        )
        .push(text(location));

    for (i, sector) in SECTOR_CHOICES.iter().enumerate() {
        let value = sector.value().to_string();
        content = content.push(radio(sector.label(), i, selected, move |_| {
            ScreenMessage::ScreenMessage(FacilityScreenMessage::Input(FacilityMessage::SectorSelected(
                vec![value.clone()],
            )))
        }));
    }
    content = content.push(radio("Other", OTHER_CHOICE, selected, |_| {
        ScreenMessage::ScreenMessage(FacilityScreenMessage::ChooseOtherSector)
    }));
    if selected == Some(OTHER_CHOICE) {
        content = content.push(text_input("Other sector", other_sector).on_input(|value| {
            ScreenMessage::ScreenMessage(FacilityScreenMessage::Input(FacilityMessage::OtherSectorInput(value)))
        }));
    }

    content
        .push(button(text("Cancel")).on_press(ScreenMessage::ScreenMessage(
            FacilityScreenMessage::Input(FacilityMessage::ToggleAddFacility),
        )))
        .into()
}

impl<P: PositionSource> Screen for FacilityScreen<P> {
    type Message = FacilityScreenMessage;
    type ParentMessage = FacilityParentMessage;

    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        let body = match &self.view {
            FacilityView::Selecting(view) => selecting_view::<P>(view),
            FacilityView::Authoring(view) => {
                authoring_view::<P>(view, &self.name, &self.other_sector, self.other_chosen)
            }
        };
        let body = match &self.error {
            Some(error) => Column::new().spacing(10).push(body).push(text(error.as_str())).into(),
            None => body,
        };
        layout(body, self.mode())
    }

    fn update(&mut self, message: Self::Message) -> Task<ScreenMessage<Self>> {
        match message {
            FacilityScreenMessage::Input(FacilityMessage::Locate) => self.locate(),
            FacilityScreenMessage::Input(message) => {
                match &message {
                    FacilityMessage::NameInput(name) => self.name = name.clone(),
                    FacilityMessage::OtherSectorInput(value) => self.other_sector = value.clone(),
                    FacilityMessage::SectorSelected(_) => self.other_chosen = false,
                    _ => {}
                }
                self.inputs.push(message);
                self.start_next()
            }
            FacilityScreenMessage::ChooseOtherSector => {
                self.other_chosen = true;
                Task::none()
            }
            FacilityScreenMessage::Refreshed(result) => {
                self.inputs.finish();
                match result {
                    Ok(view) => {
                        self.view = view;
                        self.error = None;
                    }
                    Err(error) => self.error = Some(error),
                }
                // typed text is ahead of the store while inputs are queued
                if self.inputs.is_idle() {
                    self.sync_text();
                }
                self.start_next()
            }
        }
    }
}
