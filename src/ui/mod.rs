use crate::app_state::{App, FocusArea, InputMode, Page, PageResult, PageSession};
use crate::format::{
    column_header, format_change_pct, format_currency, format_date, format_price,
    format_ratio_pct, format_score, NO_DATA,
};
use crate::normalize::{BacktestResult, SignalSet, Trend, WalkForwardRow};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Sparkline, Table},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Length(12), // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0], app);

    let middle_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);
}

fn panel(title: impl Into<String>, focused: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title.into())
        .style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        })
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let busy: Vec<String> = Page::ALL
        .iter()
        .filter(|p| app.session(**p).tracker.is_busy())
        .map(|p| match app.session(*p).tracker.pending() {
            1 => p.title().to_string(),
            n => format!("{}×{}", p.title(), n),
        })
        .collect();
    let status = if busy.is_empty() {
        Span::styled(" 空闲", Style::default().fg(Color::Green))
    } else {
        Span::styled(
            format!(" 请求中: {}", busy.join(", ")),
            Style::default().fg(Color::Yellow),
        )
    };

    let title_text = Line::from(vec![
        Span::styled(
            " AlphaDesk 策略面板 ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - Terminal TUI |"),
        status,
    ]);

    let paragraph = Paragraph::new(title_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        )
        .alignment(ratatui::layout::Alignment::Center);
    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = Page::ALL
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = *page == app.page;

            let style = if is_selected && app.focus_area == FocusArea::Menu {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Magenta)
                    .add_modifier(Modifier::BOLD)
            } else if is_selected {
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD)
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            let busy = if app.session(*page).tracker.is_busy() {
                " …"
            } else {
                ""
            };
            ListItem::new(format!("{}{}{}", prefix, page.title(), busy)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "页面 (Enter 确认)"
    } else {
        "页面 (← 切换)"
    };
    let menu = List::new(menu_items).block(panel(title, app.focus_area == FocusArea::Menu));
    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    let focused = app.focus_area == FocusArea::MainView;
    if app.page == Page::Strategies {
        render_strategies(f, area, app, focused);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(36)])
        .split(area);

    let session = app.session(app.page);
    let title = match (session.tracker.is_busy(), &session.last_error) {
        (true, _) => format!("{} (加载中...)", app.page.title()),
        (false, Some(_)) => format!("{} (上次请求失败，显示旧数据)", app.page.title()),
        _ => format!("{} (r 刷新, ↑↓ 滚动)", app.page.title()),
    };
    let block = panel(title, focused);

    match &session.result {
        PageResult::Empty => {
            let hint = match app.page {
                Page::Signals => "暂无信号，输入 `live` 或 `analyze [日期]` 加载",
                Page::Backtest => "暂无回测结果，输入 `backtest` 或 `equity` 运行",
                _ => "暂无数据，输入 `wf` 运行 walk-forward",
            };
            f.render_widget(Paragraph::new(hint).block(block), chunks[0]);
        }
        PageResult::Signals(set) => render_signals(f, chunks[0], set, block, app.scroll),
        PageResult::Backtest(result) => render_backtest(f, chunks[0], result, block, app.scroll),
        PageResult::WalkForward(rows) => {
            render_walkforward(f, chunks[0], rows, block, app.scroll)
        }
    }

    render_config(f, chunks[1], session, app.page);
}

fn trend_style(trend: Trend) -> (&'static str, Color) {
    match trend {
        Trend::Bullish => ("▲ 看多", Color::Green),
        Trend::Bearish => ("▼ 看空", Color::Red),
        Trend::Neutral => ("● 中性", Color::Yellow),
    }
}

fn change_color(value: Option<f64>) -> Color {
    match value {
        Some(v) if v > 0.0 => Color::Green,
        Some(v) if v < 0.0 => Color::Red,
        _ => Color::Gray,
    }
}

fn render_signals(f: &mut Frame, area: Rect, set: &SignalSet, block: Block, scroll: u16) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(block.inner(area));
    f.render_widget(block, area);

    let mut meta = vec![
        Span::styled("日期: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format_date(set.date.as_deref())),
    ];
    if let Some(mode) = &set.mode {
        meta.push(Span::raw(format!("  模式: {}", mode)));
    }
    if let Some(target) = &set.target_date {
        meta.push(Span::raw(format!("  请求日期: {}", format_date(Some(target)))));
    }
    if set.skipped > 0 {
        meta.push(Span::styled(
            format!("  跳过 {} 行", set.skipped),
            Style::default().fg(Color::Yellow),
        ));
    }
    let mut header_lines = vec![Line::from(meta)];
    if let Some(notice) = &set.notice {
        header_lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }
    f.render_widget(Paragraph::new(header_lines), chunks[0]);

    if set.is_empty() {
        f.render_widget(Paragraph::new("该日期没有信号"), chunks[1]);
        return;
    }

    let mut header: Vec<String> = vec!["#".into(), "代码".into(), "得分".into(), "趋势".into()];
    header.extend(set.price_columns.iter().map(|c| column_header(c)));
    if set.has_change_data {
        header.push("最大涨幅".into());
        header.push("最大跌幅".into());
    }

    let rows: Vec<Row> = set
        .rows
        .iter()
        .skip(scroll as usize)
        .map(|row| {
            let (label, color) = trend_style(row.trend());
            let mut cells = vec![
                Cell::from(row.rank.to_string()),
                Cell::from(row.symbol.clone()),
                Cell::from(format_score(row.final_score)),
                Cell::from(label).style(Style::default().fg(color)),
            ];
            cells.extend(
                set.price_columns
                    .iter()
                    .map(|c| Cell::from(format_price(row.price(c)))),
            );
            if set.has_change_data {
                cells.push(
                    Cell::from(format_change_pct(row.max_change_pct))
                        .style(Style::default().fg(change_color(row.max_change_pct))),
                );
                cells.push(
                    Cell::from(format_change_pct(row.min_change_pct))
                        .style(Style::default().fg(change_color(row.min_change_pct))),
                );
            }
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![
        Constraint::Length(4),
        Constraint::Length(12),
        Constraint::Length(9),
        Constraint::Length(8),
    ];
    widths.extend(set.price_columns.iter().map(|_| Constraint::Length(12)));
    if set.has_change_data {
        widths.push(Constraint::Length(10));
        widths.push(Constraint::Length(10));
    }

    let table = Table::new(rows, widths).header(
        Row::new(header).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    );
    f.render_widget(table, chunks[1]);
}

fn render_backtest(f: &mut Frame, area: Rect, result: &BacktestResult, block: Block, scroll: u16) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Min(0),
        ])
        .split(block.inner(area));
    f.render_widget(block, area);

    let metrics = vec![
        Line::from(vec![Span::styled(
            "--- 核心指标 ---",
            Style::default().fg(Color::Yellow),
        )]),
        Line::from(format!("交易次数: {:<10} 胜率: {}", result.trades, format_ratio_pct(Some(result.win_rate), 1))),
        Line::from(format!("平均收益: {}", format_ratio_pct(Some(result.avg_return), 2))),
        Line::from(format!("期末权益: {}", format_currency(Some(result.final_equity)))),
        Line::from(vec![
            Span::raw("最大回撤: "),
            Span::styled(
                format_ratio_pct(Some(result.max_drawdown), 2),
                Style::default().fg(Color::Red),
            ),
        ]),
    ];
    f.render_widget(Paragraph::new(metrics), chunks[0]);

    if result.equity_curve.is_empty() {
        f.render_widget(
            Paragraph::new("暂无权益曲线，输入 `equity` 加载"),
            chunks[1],
        );
        return;
    }

    let floor = result
        .equity_curve
        .iter()
        .map(|p| p.equity)
        .fold(f64::INFINITY, f64::min);
    let data: Vec<u64> = result
        .equity_curve
        .iter()
        .map(|p| (p.equity - floor).max(0.0).round() as u64)
        .collect();
    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::TOP).title("权益曲线"))
        .data(&data)
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(sparkline, chunks[1]);

    let rows: Vec<Row> = result
        .equity_curve
        .iter()
        .rev()
        .skip(scroll as usize)
        .map(|p| {
            Row::new(vec![
                Cell::from(format_date(Some(&p.date))),
                Cell::from(format_currency(Some(p.equity))),
                Cell::from(format_ratio_pct(Some(p.drawdown), 2))
                    .style(Style::default().fg(change_color(Some(p.drawdown)))),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(20),
            Constraint::Length(10),
        ],
    )
    .header(Row::new(vec!["日期", "权益", "回撤"]).style(Style::default().fg(Color::Yellow)));
    f.render_widget(table, chunks[2]);
}

fn render_walkforward(
    f: &mut Frame,
    area: Rect,
    rows: &[WalkForwardRow],
    block: Block,
    scroll: u16,
) {
    if rows.is_empty() {
        f.render_widget(Paragraph::new("没有 walk-forward 区间").block(block), area);
        return;
    }
    let table_rows: Vec<Row> = rows
        .iter()
        .skip(scroll as usize)
        .map(|r| {
            Row::new(vec![
                Cell::from(format_date(Some(&r.start))),
                Cell::from(format_date(Some(&r.end))),
                Cell::from(r.trades.to_string()),
                Cell::from(format_ratio_pct(Some(r.avg_return), 2))
                    .style(Style::default().fg(change_color(Some(r.avg_return)))),
                Cell::from(format_ratio_pct(Some(r.win_rate), 1)),
                Cell::from(format_currency(Some(r.final_equity))),
            ])
        })
        .collect();
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Min(16),
        ],
    )
    .header(
        Row::new(vec!["开始", "结束", "交易", "平均收益", "胜率", "期末权益"])
            .style(Style::default().fg(Color::Yellow)),
    )
    .block(block);
    f.render_widget(table, area);
}

fn render_config(f: &mut Frame, area: Rect, session: &PageSession, page: Page) {
    let mut lines = vec![Line::from(Span::styled(
        "--- Alphas ---",
        Style::default().fg(Color::Yellow),
    ))];
    for (key, entry) in session.alphas.iter() {
        let (mark, color) = if entry.enabled {
            ("●", Color::Green)
        } else {
            ("○", Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", mark), Style::default().fg(color)),
            Span::raw(format!("{:<16} {:.2}", key, entry.weight)),
        ]));
    }
    lines.push(Line::from(format!(
        "启用权重合计: {:.2}",
        session.alphas.total_enabled_weight()
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "--- 执行参数 ---",
        Style::default().fg(Color::Yellow),
    )));
    let p = &session.params;
    lines.push(Line::from(format!("top_k {}  hold_days {}", p.top_k, p.hold_days)));
    lines.push(Line::from(format!("notional {}", format_currency(Some(p.trade_notional)))));
    lines.push(Line::from(format!("cost {}", format_ratio_pct(Some(p.round_trip_cost), 2))));
    lines.push(Line::from(format!(
        "trend {}  vol {}",
        if p.use_trend_filter { "on" } else { "off" },
        if p.use_vol_filter { "on" } else { "off" }
    )));
    lines.push(Line::from(format!("lookback {}", p.no_trade_lookback)));

    if page == Page::Signals {
        let q = &session.query;
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "--- 信号查询 ---",
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(format!(
            "date {}",
            q.date.as_deref().unwrap_or("latest")
        )));
        lines.push(Line::from(format!("rows {}", q.top_k)));
        lines.push(Line::from(format!(
            "min_price {}  min_volume {}",
            format_price(Some(q.min_price)),
            q.min_volume
        )));
    }

    let issues = session.alphas.validate().len() + session.params.validate().len();
    if issues > 0 {
        lines.push(Line::from(Span::styled(
            format!("⚠ {} 项参数提示 (validate 查看)", issues),
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(err) = &session.last_error {
        lines.push(Line::from(Span::styled(
            format!("✗ {}", err),
            Style::default().fg(Color::Red),
        )));
    }

    f.render_widget(
        Paragraph::new(lines)
            .wrap(ratatui::widgets::Wrap { trim: true })
            .block(panel("配置", false)),
        area,
    );
}

fn render_strategies(f: &mut Frame, area: Rect, app: &mut App, focused: bool) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let items: Vec<ListItem> = app
        .strategies
        .iter()
        .map(|t| {
            let enabled: Vec<&str> = t.alphas.enabled().map(|(k, _)| k).collect();
            ListItem::new(vec![
                Line::from(Span::styled(
                    t.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("  {} | {}", t.id, enabled.join(", ")),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();
    let title = format!(
        "策略模板 (Enter 应用到 {}, r 重新加载)",
        app.last_config_page.title()
    );
    let list = List::new(items)
        .block(panel(title, focused))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    if app.strategies.is_empty() {
        f.render_widget(
            Paragraph::new("暂无策略模板，输入 `strategies` 加载").block(panel("策略模板", focused)),
            chunks[0],
        );
    } else {
        f.render_stateful_widget(list, chunks[0], &mut app.template_list_state);
    }

    let mut lines = Vec::new();
    for d in &app.alpha_catalog {
        let model = if d.requires_model { " [模型]" } else { "" };
        let name = if d.name.is_empty() { NO_DATA } else { d.name.as_str() };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<16}", d.key), Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}{}", name, model)),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("alpha 目录尚未加载"));
    }
    f.render_widget(
        Paragraph::new(lines).block(panel("Alpha 目录", false)),
        chunks[1],
    );
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        let cur = app.command_cursor.min(app.command_input.len());
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }

        vec![
            Line::from(spans),
            Line::from("Enter执行 Esc取消 Tab补全 ←→光标 Home/End ↑历史 ↓下一条"),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::styled("命令: ", Style::default().fg(Color::Yellow)),
                Span::raw("(按 / 进入命令模式)"),
            ]),
            Line::from("/命令 Tab切页 ←→焦点 ↑↓导航 Enter确认 r刷新 u撤销 q退出"),
        ]
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "命令输入模式"
            } else {
                "命令输入"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 最新的在顶部
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with("✓") {
                Style::default().fg(Color::Green)
            } else if msg.starts_with("✗") {
                Style::default().fg(Color::Red)
            } else if msg.starts_with("⚠") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
