//! UI Rendering
//!
//! Main storefront layout.

use crate::catalog::CATALOG;
use crate::tui::app::{App, Focus, View, GRID_COLUMNS};
use crate::tui::theme::{Icons, Theme};
use crate::tui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use rust_decimal::Decimal;

/// Height of one catalog cell
const CELL_HEIGHT: u16 = 4;

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Wallet
            Constraint::Min(10),   // Catalog + cart
            Constraint::Length(4), // Checkout
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[2]);

    render_header(frame, chunks[0], app);
    render_wallet_bar(frame, chunks[1], app);
    render_catalog(frame, body[0], app);
    render_cart(frame, body[1], app);
    widgets::render_checkout(
        frame,
        chunks[3],
        app.shop.state(),
        !app.shop.cart().is_empty(),
        app.tick,
    );
    render_status_bar(frame, chunks[4]);

    match app.view {
        View::Wallet => widgets::render_wallet(frame, app),
        View::Help => render_help(frame),
        View::Shop => {}
    }
}

/// Format a USDC amount to a fixed number of decimals
pub fn format_usdc(amount: Decimal, decimals: u32) -> String {
    format!("{:.*}", decimals as usize, amount.round_dp(decimals))
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let dot = if app.shop.session().is_connected() {
        Span::styled("●", Theme::success())
    } else {
        Span::styled("●", Theme::error())
    };

    let title = Line::from(vec![
        Span::raw("🛒 "),
        Span::styled("x402 Shop", Theme::title()),
        Span::styled(" pay-per-request on Base Sepolia", Theme::text_secondary()),
        Span::raw("  "),
        dot,
    ]);

    let paragraph = Paragraph::new(title)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(Theme::border()));

    frame.render_widget(paragraph, area);
}

fn render_wallet_bar(frame: &mut Frame, area: Rect, app: &App) {
    let line = match app.shop.session().short_address() {
        Some(address) => {
            let balance = app
                .shop
                .balance()
                .map(|b| format!("{} USDC", format_usdc(b, 4)))
                .unwrap_or_else(|| "Loading...".to_string());
            Line::from(vec![
                Span::styled("Wallet ", Theme::text_secondary()),
                Span::styled(address, Theme::text()),
                Span::styled("   Balance ", Theme::text_secondary()),
                Span::styled(balance, Theme::price()),
                Span::styled("   [r] Refresh [l] Log out", Theme::text_dim()),
            ])
        }
        None => Line::from(vec![
            Span::styled("No wallet connected. ", Theme::text_dim()),
            Span::styled("[c]", Theme::shortcut_key()),
            Span::styled(" Connect", Theme::shortcut_desc()),
        ]),
    };

    let paragraph = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).border_style(Theme::border()));
    frame.render_widget(paragraph, area);
}

fn render_catalog(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.view == View::Shop && app.focus == Focus::Catalog;
    let block = Block::default()
        .title(" Menu ")
        .borders(Borders::ALL)
        .border_style(if focused {
            Theme::border_focused()
        } else {
            Theme::border()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows: Vec<_> = CATALOG.chunks(GRID_COLUMNS).collect();
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            rows.iter()
                .map(|_| Constraint::Length(CELL_HEIGHT))
                .chain(std::iter::once(Constraint::Min(0)))
                .collect::<Vec<_>>(),
        )
        .split(inner);

    for (row_index, row) in rows.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, GRID_COLUMNS as u32); GRID_COLUMNS])
            .split(row_areas[row_index]);

        for (column, item) in row.iter().enumerate() {
            let selected = focused && row_index * GRID_COLUMNS + column == app.catalog_index;
            let lines = vec![
                Line::from(Span::raw(item.glyph)),
                Line::from(Span::styled(
                    item.name,
                    if selected { Theme::selected() } else { Theme::text() },
                )),
                Line::from(Span::styled(format!("${}", item.unit_price), Theme::price())),
            ];
            let cell = Paragraph::new(lines).alignment(Alignment::Center).block(
                Block::default().borders(Borders::ALL).border_style(if selected {
                    Theme::border_focused()
                } else {
                    Theme::border()
                }),
            );
            frame.render_widget(cell, cells[column]);
        }
    }
}

fn render_cart(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.view == View::Shop && app.focus == Focus::Cart;
    let cart = app.shop.cart();
    let block = Block::default()
        .title(format!(" Cart ({}) ", cart.len()))
        .borders(Borders::ALL)
        .border_style(if focused {
            Theme::border_focused()
        } else {
            Theme::border()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Entries
            Constraint::Length(1), // Total
            Constraint::Length(1), // Pay button
        ])
        .split(inner);

    let mut lines = Vec::new();
    if cart.is_empty() {
        lines.push(Line::from(Span::styled(
            "Your cart is empty. Pick something from the menu.",
            Theme::text_dim(),
        )));
    }

    // Keep the cursor in view
    let visible = chunks[0].height as usize;
    let skip = (app.cart_index + 1).saturating_sub(visible);
    for (index, item) in cart.entries().iter().enumerate().skip(skip).take(visible) {
        let selected = focused && index == app.cart_index;
        let prefix = if selected { Icons::SELECTED } else { " " };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} {} {:<10}", prefix, item.glyph, item.name),
                if selected { Theme::selected() } else { Theme::text() },
            ),
            Span::styled(format!(" ${}", item.unit_price), Theme::price()),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    let total = Line::from(vec![
        Span::styled("Total ", Theme::heading()),
        Span::styled(format!("${} USDC", format_usdc(cart.total(), 3)), Theme::price()),
    ]);
    frame.render_widget(Paragraph::new(total), chunks[1]);

    let (label, style) = if app.shop.state().is_paying {
        ("Processing...".to_string(), Theme::button_disabled())
    } else if app.shop.can_submit() {
        (
            format!("[p] Pay ${}", format_usdc(cart.total(), 3)),
            Theme::button(),
        )
    } else {
        ("[p] Pay".to_string(), Theme::button_disabled())
    };
    let button = Paragraph::new(Line::from(Span::styled(label, style))).alignment(Alignment::Center);
    frame.render_widget(button, chunks[2]);
}

fn render_status_bar(frame: &mut Frame, area: Rect) {
    let shortcuts = vec![
        Span::styled(" [Enter]", Theme::shortcut_key()),
        Span::styled(" Add/Remove ", Theme::shortcut_desc()),
        Span::styled("[Tab]", Theme::shortcut_key()),
        Span::styled(" Menu/Cart ", Theme::shortcut_desc()),
        Span::styled("[p]", Theme::shortcut_key()),
        Span::styled(" Pay ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+W]", Theme::shortcut_key()),
        Span::styled(" Wallet ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+Q]", Theme::shortcut_key()),
        Span::styled(" Quit ", Theme::shortcut_desc()),
        Span::styled("[F1]", Theme::shortcut_key()),
        Span::styled(" Help", Theme::shortcut_desc()),
    ];

    frame.render_widget(Paragraph::new(Line::from(shortcuts)), area);
}

/// Render the help modal
fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let shortcut = |key: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:<13}", key), Theme::shortcut_key()),
            Span::styled(desc, Theme::text()),
        ])
    };

    let help_lines = vec![
        Line::from(Span::styled("Keyboard Shortcuts", Theme::heading())),
        Line::from(""),
        shortcut("←/→/↑/↓", "Move through the menu or cart"),
        shortcut("Tab", "Switch between menu and cart"),
        shortcut("Enter", "Add item / remove cart entry"),
        shortcut("d / Del", "Remove cart entry"),
        shortcut("p", "Pay for the cart"),
        shortcut("r", "Refresh balance"),
        shortcut("c / Ctrl+W", "Wallet"),
        shortcut("l", "Log out"),
        shortcut("Ctrl+Q / q", "Quit"),
        shortcut("Esc", "Close modal / Cancel"),
        shortcut("F1 / ?", "Show this help"),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Theme::text_dim())),
    ];

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Theme::border_focused()),
    );

    frame.render_widget(paragraph, area);
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{CheckoutSettings, Shop};
    use crate::ledger::balance::tests::ScriptedLedger;
    use crate::payment::{Network, X402Connector};
    use crate::wallet::{KeyStorage, WalletSession};
    use ethers::types::U256;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_format_usdc() {
        assert_eq!(format_usdc(dec!(0.003), 3), "0.003");
        assert_eq!(format_usdc(dec!(0.005), 4), "0.0050");
        assert_eq!(format_usdc(dec!(1.23456), 4), "1.2346");
        assert_eq!(format_usdc(Decimal::ZERO, 3), "0.000");
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_render_shop() {
        let shop = Shop::new(
            WalletSession::disconnected(),
            Arc::new(ScriptedLedger::fixed(0)),
            Arc::new(X402Connector::new(Network::BaseSepolia, U256::from(100_000))),
            CheckoutSettings::new("http://shop.test"),
        );
        let mut app = App::new(shop, KeyStorage::with_path(std::env::temp_dir()));
        app.view = View::Shop;
        app.shop.add_item(crate::catalog::find(1).unwrap());

        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("x402 Shop"));
        assert!(text.contains("Cookie"));
        assert!(text.contains("Total"));
        assert!(text.contains("0.001"));
        assert!(text.contains("No wallet connected"));
    }
}
