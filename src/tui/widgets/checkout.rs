//! Checkout Widget
//!
//! Shows where the current checkout stands and its outcome message.

use crate::checkout::{CheckoutPhase, CheckoutState};
use crate::tui::theme::{Icons, Theme};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the checkout status panel
pub fn render_checkout(
    frame: &mut Frame,
    area: Rect,
    state: &CheckoutState,
    has_items: bool,
    tick: usize,
) {
    let block = Block::default()
        .title(" Checkout ")
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from(build_stage_line(state.phase(), has_items))];

    match state.phase() {
        CheckoutPhase::Paying => lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", Icons::SPINNER[tick % Icons::SPINNER.len()]),
                Theme::active(),
            ),
            Span::styled("Processing payment...", Theme::active()),
        ])),
        CheckoutPhase::Success => {
            if let Some(message) = &state.success {
                lines.push(Line::from(Span::styled(message.clone(), Theme::success())));
            }
        }
        CheckoutPhase::Failure => {
            if let Some(message) = &state.error {
                lines.push(Line::from(Span::styled(message.clone(), Theme::error())));
            }
        }
        CheckoutPhase::Idle => {}
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

/// Build the stage line: Cart → Paying → Done
fn build_stage_line(phase: CheckoutPhase, has_items: bool) -> Vec<Span<'static>> {
    let stages = [
        ("Cart", StageState::cart(phase, has_items)),
        ("Paying", StageState::paying(phase)),
        ("Done", StageState::done(phase)),
    ];

    let mut spans = Vec::new();

    for (i, (name, state)) in stages.iter().enumerate() {
        let (icon, style) = match state {
            StageState::Complete => (Icons::COMPLETE, Theme::complete()),
            StageState::Active => (Icons::ACTIVE, Theme::active()),
            StageState::Pending => (Icons::PENDING, Theme::pending()),
            StageState::Error => (Icons::ERROR, Theme::error()),
        };

        spans.push(Span::styled(format!("{} ", icon), style));
        spans.push(Span::styled(name.to_string(), style));

        if i < stages.len() - 1 {
            spans.push(Span::styled(format!(" {} ", Icons::ARROW), Theme::text_dim()));
        }
    }

    spans
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StageState {
    Pending,
    Active,
    Complete,
    Error,
}

impl StageState {
    fn cart(phase: CheckoutPhase, has_items: bool) -> Self {
        match phase {
            CheckoutPhase::Paying | CheckoutPhase::Success => StageState::Complete,
            _ if has_items => StageState::Active,
            _ => StageState::Pending,
        }
    }

    fn paying(phase: CheckoutPhase) -> Self {
        match phase {
            CheckoutPhase::Idle => StageState::Pending,
            CheckoutPhase::Paying => StageState::Active,
            CheckoutPhase::Success => StageState::Complete,
            CheckoutPhase::Failure => StageState::Error,
        }
    }

    fn done(phase: CheckoutPhase) -> Self {
        match phase {
            CheckoutPhase::Success => StageState::Complete,
            _ => StageState::Pending,
        }
    }
}
