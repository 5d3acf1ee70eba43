use iced::Font;
use iced::font::Weight;
use iced::widget::{container, text};
use iced::{Border, Theme};

pub const MONO: Font = Font::MONOSPACE;

pub const MONO_BOLD: Font = Font {
    weight: Weight::Bold,
    ..Font::MONOSPACE
};

pub fn quote_strip(theme: &Theme) -> container::Style {
    let palette = theme.extended_palette();

    container::Style {
        background: Some(palette.background.weak.color.into()),
        border: Border {
            radius: 4.0.into(),
            ..Border::default()
        },
        ..Default::default()
    }
}

pub fn error_box(theme: &Theme) -> container::Style {
    let palette = theme.extended_palette();

    container::Style {
        text_color: Some(palette.danger.base.text),
        background: Some(palette.danger.weak.color.into()),
        border: Border {
            color: palette.danger.strong.color,
            width: 1.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

pub fn muted_text(theme: &Theme) -> text::Style {
    text::Style {
        color: Some(theme.extended_palette().background.strong.color),
    }
}
