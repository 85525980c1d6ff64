//! Wallet Widget
//!
//! Modal for connecting, creating and logging out of the embedded wallet.

use crate::tui::app::App;
use crate::tui::theme::{Icons, Theme};
use crate::tui::ui::{centered_rect, format_usdc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Render the wallet modal
pub fn render_wallet(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Wallet ")
        .borders(Borders::ALL)
        .border_style(Theme::border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Instructions
            Constraint::Min(5),    // Session
            Constraint::Length(2), // Footer
        ])
        .split(inner);

    render_instructions(frame, chunks[0]);
    render_session(frame, chunks[1], app);
    render_footer(frame, chunks[2], app);
}

fn render_instructions(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Your shop wallet pays in USDC on Base Sepolia. Keys are encrypted locally.",
            Theme::text(),
        )),
        Line::from(vec![
            Span::styled("[e]", Theme::shortcut_key()),
            Span::styled(" Import key ", Theme::shortcut_desc()),
            Span::styled("[g]", Theme::shortcut_key()),
            Span::styled(" Create wallet ", Theme::shortcut_desc()),
            Span::styled("[l]", Theme::shortcut_key()),
            Span::styled(" Log out ", Theme::shortcut_desc()),
            Span::styled("[Esc]", Theme::shortcut_key()),
            Span::styled(" Close", Theme::shortcut_desc()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_session(frame: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();

    match app.shop.session().address() {
        Some(address) => {
            lines.push(Line::from(vec![
                Span::styled(format!("{} Connected  ", Icons::COMPLETE), Theme::success()),
                Span::styled(format!("{:?}", address), Theme::text()),
            ]));
            let balance = app
                .shop
                .balance()
                .map(|b| format!("{} USDC", format_usdc(b, 4)))
                .unwrap_or_else(|| "Loading...".to_string());
            lines.push(Line::from(vec![
                Span::styled("  Balance: ", Theme::text_secondary()),
                Span::styled(balance, Theme::price()),
            ]));
        }
        None => {
            lines.push(Line::from(Span::styled(
                format!("{} Not connected", Icons::PENDING),
                Theme::text_dim(),
            )));
        }
    }
    lines.push(Line::from(""));

    if app.wallet_show_input {
        let input_display = if app.wallet_input.is_empty() {
            "Paste private key...".to_string()
        } else {
            Icons::DOT.repeat(app.wallet_input.chars().count())
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("[{}]", input_display), Theme::warning()),
            Span::styled(" ", Theme::text()),
            Span::styled(Icons::CURSOR, Theme::active()),
        ]));
    }

    if let Some(notice) = &app.wallet_notice {
        lines.push(Line::from(Span::styled(notice.clone(), Theme::warning())));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.wallet_show_input {
        "Paste your private key, then press Enter to connect"
    } else if app.shop.session().is_connected() {
        "Press Esc to return to the shop"
    } else {
        "Press [e] to import a key or [g] to create a new wallet"
    };

    let line = Line::from(Span::styled(help_text, Theme::text_secondary()));
    frame.render_widget(Paragraph::new(line), area);
}
