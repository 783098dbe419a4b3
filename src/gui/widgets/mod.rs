use iced::{
    Element, Length, Theme, border,
    widget::{column, container, container::Style, container::bordered_box, row, text},
};

use crate::question::Mode;

fn tab_style(active: bool) -> impl Fn(&Theme) -> Style {
    move |theme: &Theme| {
        let style = bordered_box(theme);
        if active {
            style.border(border::width(2).color(theme.palette().primary))
        } else {
            style
        }
    }
}

/// Two tabs naming the halves of the question above the active half's content.
pub fn layout<'a, Message>(content: impl Into<Element<'a, Message>>, mode: Mode) -> Element<'a, Message>
where
    Message: 'a,
{
    container(column![
        row![
            container(text("Nearby facilities"))
                .style(tab_style(mode == Mode::Selecting))
                .padding(10),
            container(text("New facility"))
                .style(tab_style(mode == Mode::Authoring))
                .padding(10),
        ]
        .spacing(5),
        container(content.into()).width(Length::Fill),
    ]
    .spacing(10))
    .padding(20)
    .width(Length::Fill)
    .into()
}
