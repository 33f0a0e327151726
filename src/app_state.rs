use crate::commands::app_command::parse_date_arg;
use crate::commands::{AlphaAction, AppCommand, HELP_TEXT};
use crate::normalize::{merge_equity_curve, BacktestResult, SignalSet, WalkForwardRow};
use crate::request::{build_request, Operation, SignalQuery};
use crate::session::ApiError;
use crate::strategy::{
    AlphaConfiguration, AlphaDescriptor, AlphaField, ConfigError, ParamField, StrategyParameters,
    StrategyTemplate,
};
use crate::worker::{EngineJob, EngineOutcome, ServiceCommand};
use crossterm::event::KeyCode;
use log::{info, warn};
use ratatui::widgets::ListState;
use std::collections::BTreeSet;
use std::str::FromStr;
use tokio::sync::mpsc;

const HISTORY_LIMIT: usize = 50;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Page {
    Signals,
    Backtest,
    WalkForward,
    Strategies,
}

impl Page {
    pub const ALL: [Page; 4] = [
        Page::Signals,
        Page::Backtest,
        Page::WalkForward,
        Page::Strategies,
    ];

    pub fn index(&self) -> usize {
        match self {
            Page::Signals => 0,
            Page::Backtest => 1,
            Page::WalkForward => 2,
            Page::Strategies => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Signals => "信号",
            Page::Backtest => "回测",
            Page::WalkForward => "Walk-Forward",
            Page::Strategies => "策略模板",
        }
    }

    pub fn parse(raw: &str) -> Option<Page> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "signals" | "signal" | "s" => Some(Page::Signals),
            "backtest" | "bt" | "b" => Some(Page::Backtest),
            "walkforward" | "wf" | "w" => Some(Page::WalkForward),
            "strategies" | "templates" | "t" => Some(Page::Strategies),
            _ => None,
        }
    }

    /// 该页面的默认刷新操作
    pub fn default_operation(&self) -> Option<Operation> {
        match self {
            Page::Signals => Some(Operation::LiveSignals),
            Page::Backtest => Some(Operation::RunBacktest),
            Page::WalkForward => Some(Operation::WalkForward),
            Page::Strategies => None,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(Debug)]
pub enum AppEvent {
    Message(String),
    Error(String),
    Loaded {
        page: Page,
        seq: u64,
        outcome: EngineOutcome,
    },
    Failed {
        page: Page,
        seq: u64,
        error: ApiError,
    },
    Catalog(EngineOutcome),
}

/// 响应覆盖页面结果的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSlot {
    /// 整体替换页面结果
    Whole,
    /// 只替换回测结果中的权益曲线
    Curve,
}

impl ResultSlot {
    pub fn of(outcome: &EngineOutcome) -> Self {
        match outcome {
            EngineOutcome::EquityCurve(_) => ResultSlot::Curve,
            _ => ResultSlot::Whole,
        }
    }
}

/// 单页请求序号与在途集合
///
/// 页面内序号单调递增。整体结果与权益曲线各自记录已应用序号：
/// 曲线只合并进已有结果，不会让较早的整体结果过期。在途集合非空即为忙碌。
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    next_seq: u64,
    applied_seq: u64,
    curve_seq: u64,
    in_flight: BTreeSet<u64>,
}

impl RequestTracker {
    pub fn begin(&mut self) -> u64 {
        self.next_seq += 1;
        self.in_flight.insert(self.next_seq);
        self.next_seq
    }

    /// 成功响应到达；返回 true 表示应当应用
    pub fn finish(&mut self, seq: u64, slot: ResultSlot) -> bool {
        if !self.in_flight.remove(&seq) {
            return false;
        }
        match slot {
            ResultSlot::Whole if seq > self.applied_seq => {
                self.applied_seq = seq;
                self.curve_seq = self.curve_seq.max(seq);
                true
            }
            ResultSlot::Curve if seq > self.curve_seq => {
                self.curve_seq = seq;
                true
            }
            _ => false,
        }
    }

    /// 失败响应到达；不推进已应用序号，返回 true 表示需要提示
    pub fn fail(&mut self, seq: u64) -> bool {
        self.in_flight.remove(&seq) && seq > self.applied_seq
    }

    /// 已显示的曲线是否来自比 `seq` 更新的请求
    pub fn has_newer_curve(&self, seq: u64) -> bool {
        self.curve_seq > seq
    }

    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    #[cfg(test)]
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PageResult {
    #[default]
    Empty,
    Signals(SignalSet),
    Backtest(BacktestResult),
    WalkForward(Vec<WalkForwardRow>),
}

/// 每个页面独立持有配置、结果与请求状态
#[derive(Debug, Clone)]
pub struct PageSession {
    pub alphas: AlphaConfiguration,
    pub params: StrategyParameters,
    pub query: SignalQuery,
    pub result: PageResult,
    pub tracker: RequestTracker,
    pub last_error: Option<String>,
    history: Vec<(AlphaConfiguration, StrategyParameters)>,
}

impl PageSession {
    pub fn new(alphas: AlphaConfiguration, signal_rows: i64) -> Self {
        Self {
            alphas,
            params: StrategyParameters::default(),
            query: SignalQuery {
                top_k: signal_rows,
                ..SignalQuery::default()
            },
            result: PageResult::Empty,
            tracker: RequestTracker::default(),
            last_error: None,
            history: Vec::new(),
        }
    }

    fn commit(&mut self, alphas: AlphaConfiguration, params: StrategyParameters) {
        if alphas == self.alphas && params == self.params {
            return;
        }
        let prev_alphas = std::mem::replace(&mut self.alphas, alphas);
        let prev_params = std::mem::replace(&mut self.params, params);
        self.history.push((prev_alphas, prev_params));
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
    }

    pub fn apply_alpha(&mut self, key: &str, action: &AlphaAction) -> Result<(), ConfigError> {
        let field = match action {
            AlphaAction::On => AlphaField::Enabled(true),
            AlphaAction::Off => AlphaField::Enabled(false),
            AlphaAction::Toggle => {
                let current = self
                    .alphas
                    .get(key)
                    .ok_or_else(|| ConfigError::UnknownAlpha(key.to_string()))?;
                AlphaField::Enabled(!current.enabled)
            }
            AlphaAction::Weight(w) => AlphaField::Weight(*w),
        };
        let next = self.alphas.update(key, field)?;
        self.commit(next, self.params.clone());
        Ok(())
    }

    /// 修改执行参数或信号查询参数，返回修改后的展示值
    pub fn set_field(&mut self, field: &str, raw: &str) -> Result<String, ConfigError> {
        if let Some(param) = ParamField::parse(field) {
            let next = self.params.set(param, raw)?;
            self.commit(self.alphas.clone(), next);
            return Ok(self.params.display(param));
        }

        let invalid = || ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
        };
        let raw = raw.trim();
        match field.trim().to_ascii_lowercase().as_str() {
            "rows" | "signal_rows" => {
                self.query.top_k = raw.parse().map_err(|_| invalid())?;
                Ok(self.query.top_k.to_string())
            }
            "min_price" => {
                self.query.min_price = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(invalid)?;
                Ok(self.query.min_price.to_string())
            }
            "min_volume" => {
                self.query.min_volume = raw.parse().map_err(|_| invalid())?;
                Ok(self.query.min_volume.to_string())
            }
            "date" => {
                if matches!(raw, "-" | "none" | "latest") {
                    self.query.date = None;
                    return Ok("latest".to_string());
                }
                let date = parse_date_arg(raw).ok_or_else(invalid)?;
                self.query.date = Some(date.clone());
                Ok(date)
            }
            _ => Err(ConfigError::UnknownField(field.to_string())),
        }
    }

    /// 模板整体替换 alpha 集合，执行预设叠加到当前参数
    pub fn apply_template(&mut self, template: &StrategyTemplate) {
        let alphas = if template.alphas.is_empty() {
            self.alphas.clone()
        } else {
            template.alphas.clone()
        };
        let params = template.apply_to(&self.params);
        self.commit(alphas, params);
    }

    /// alpha 目录（重新）加载后重建 key 集合；不进入撤销历史
    pub fn reload_catalog(&mut self, descriptors: &[AlphaDescriptor]) {
        self.alphas = AlphaConfiguration::from_catalog(descriptors, &self.alphas);
    }

    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some((alphas, params)) => {
                self.alphas = alphas;
                self.params = params;
                true
            }
            None => false,
        }
    }

    /// 序号检查通过则应用结果，返回是否已应用
    ///
    /// 较早的回测结果晚于较新的权益曲线到达时，保留当前曲线。
    pub fn complete(&mut self, seq: u64, outcome: EngineOutcome) -> bool {
        let newer_curve = self.tracker.has_newer_curve(seq);
        if !self.tracker.finish(seq, ResultSlot::of(&outcome)) {
            return false;
        }
        let outcome = match outcome {
            EngineOutcome::Backtest(mut result) if newer_curve => {
                if let PageResult::Backtest(current) = &self.result {
                    result.equity_curve = current.equity_curve.clone();
                }
                EngineOutcome::Backtest(result)
            }
            other => other,
        };
        self.accept(outcome);
        true
    }

    /// 应用一次已通过序号检查的结果
    pub fn accept(&mut self, outcome: EngineOutcome) {
        self.last_error = None;
        self.result = match outcome {
            EngineOutcome::Signals(set) => PageResult::Signals(set),
            EngineOutcome::Backtest(result) => PageResult::Backtest(result),
            EngineOutcome::EquityCurve(curve) => {
                let prior = match &self.result {
                    PageResult::Backtest(prev) => Some(prev),
                    _ => None,
                };
                PageResult::Backtest(merge_equity_curve(prior, curve))
            }
            EngineOutcome::WalkForward(rows) => PageResult::WalkForward(rows),
            EngineOutcome::Strategies(_) | EngineOutcome::Alphas(_) => return,
        };
    }
}

pub struct App {
    pub page: Page,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub sessions: Vec<PageSession>,
    /// 策略页上的编辑命令作用于最近一个配置页
    pub last_config_page: Page,
    pub strategies: Vec<StrategyTemplate>,
    pub alpha_catalog: Vec<AlphaDescriptor>,
    pub template_list_state: ListState,
    pub scroll: u16,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    pub should_quit: bool,
    pub svc_tx: mpsc::UnboundedSender<ServiceCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

impl App {
    pub fn new(
        startup_info: Vec<String>,
        signal_rows: i64,
        svc_tx: mpsc::UnboundedSender<ServiceCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(startup_info);

        let sessions = Page::ALL
            .iter()
            .map(|_| PageSession::new(AlphaConfiguration::default_set(), signal_rows))
            .collect();

        App {
            page: Page::Signals,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            sessions,
            last_config_page: Page::Signals,
            strategies: Vec::new(),
            alpha_catalog: Vec::new(),
            template_list_state: {
                let mut s = ListState::default();
                s.select(Some(0));
                s
            },
            scroll: 0,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            should_quit: false,
            svc_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn session(&self, page: Page) -> &PageSession {
        &self.sessions[page.index()]
    }

    pub fn session_mut(&mut self, page: Page) -> &mut PageSession {
        &mut self.sessions[page.index()]
    }

    /// 编辑命令的目标页
    pub fn edit_page(&self) -> Page {
        if self.page == Page::Strategies {
            self.last_config_page
        } else {
            self.page
        }
    }

    pub fn switch_page(&mut self, page: Page) {
        if page != Page::Strategies {
            self.last_config_page = page;
        }
        self.page = page;
        self.menu_selected_index = page.index();
        self.scroll = 0;
    }

    /// 组装请求并交给后台服务；校验问题只作提示
    pub fn dispatch(&mut self, page: Page, operation: Operation) {
        let session = &self.sessions[page.index()];
        let issues: Vec<String> = session
            .alphas
            .validate()
            .into_iter()
            .chain(session.params.validate())
            .map(|i| i.message)
            .collect();
        if !issues.is_empty() {
            self.add_log(format!("⚠ 参数提示: {}", issues.join("; ")));
        }

        let session = &mut self.sessions[page.index()];
        let request = build_request(operation, &session.alphas, &session.params, &session.query);
        let seq = session.tracker.begin();
        info!("[{:?}#{}] 提交 {:?}", page, seq, operation);
        if self
            .svc_tx
            .send(ServiceCommand::Run(EngineJob { page, seq, request }))
            .is_err()
        {
            session.tracker.fail(seq);
            self.add_log("✗ 后台服务不可用".to_string());
        }
    }

    pub fn execute(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::LiveSignals => {
                self.switch_page(Page::Signals);
                self.dispatch(Page::Signals, Operation::LiveSignals);
            }
            AppCommand::DatedSignals { date } => {
                if date.is_some() {
                    self.session_mut(Page::Signals).query.date = date;
                }
                self.switch_page(Page::Signals);
                self.dispatch(Page::Signals, Operation::DatedSignals);
            }
            AppCommand::RunBacktest => {
                self.switch_page(Page::Backtest);
                self.dispatch(Page::Backtest, Operation::RunBacktest);
            }
            AppCommand::EquityCurve => {
                self.switch_page(Page::Backtest);
                self.dispatch(Page::Backtest, Operation::EquityCurve);
            }
            AppCommand::WalkForward => {
                self.switch_page(Page::WalkForward);
                self.dispatch(Page::WalkForward, Operation::WalkForward);
            }
            AppCommand::Set { field, value } => {
                let page = self.edit_page();
                match self.session_mut(page).set_field(&field, &value) {
                    Ok(shown) => self.add_log(format!("✓ [{}] {} = {}", page.title(), field, shown)),
                    Err(e) => self.add_log(format!("✗ [{}] {}", page.title(), e)),
                }
            }
            AppCommand::Alpha { key, action } => {
                let page = self.edit_page();
                match self.session_mut(page).apply_alpha(&key, &action) {
                    Ok(()) => {
                        let session = self.session(page);
                        let shown = session
                            .alphas
                            .get(&key)
                            .map(|e| format!("{} w={}", if e.enabled { "on" } else { "off" }, e.weight))
                            .unwrap_or_default();
                        let total = session.alphas.total_enabled_weight();
                        self.add_log(format!(
                            "✓ [{}] alpha {}: {} (启用权重合计 {:.2})",
                            page.title(),
                            key,
                            shown,
                            total
                        ));
                    }
                    Err(e) => self.add_log(format!("✗ [{}] {}", page.title(), e)),
                }
            }
            AppCommand::ReloadCatalogs => {
                if self.svc_tx.send(ServiceCommand::LoadCatalogs).is_err() {
                    self.add_log("✗ 后台服务不可用".to_string());
                } else {
                    self.add_log("正在重新加载策略目录...".to_string());
                }
            }
            AppCommand::ApplyTemplate { id } => self.apply_template(&id),
            AppCommand::SwitchPage(page) => self.switch_page(page),
            AppCommand::Validate => {
                let page = self.edit_page();
                let session = self.session(page);
                let issues: Vec<String> = session
                    .alphas
                    .validate()
                    .into_iter()
                    .chain(session.params.validate())
                    .map(|i| format!("{}: {}", i.field, i.message))
                    .collect();
                if issues.is_empty() {
                    self.add_log(format!("✓ [{}] 参数检查通过", page.title()));
                } else {
                    for issue in issues {
                        self.add_log(format!("⚠ [{}] {}", page.title(), issue));
                    }
                }
            }
            AppCommand::Undo => {
                let page = self.edit_page();
                if self.session_mut(page).undo() {
                    self.add_log(format!("✓ [{}] 已撤销上一次修改", page.title()));
                } else {
                    self.add_log(format!("⚠ [{}] 没有可撤销的修改", page.title()));
                }
            }
            AppCommand::Help => self.add_log(HELP_TEXT.to_string()),
            AppCommand::Quit => self.should_quit = true,
            AppCommand::Unknown(msg) => {
                if !msg.is_empty() {
                    self.add_log(format!("✗ {}", msg));
                }
            }
        }
    }

    fn apply_template(&mut self, id: &str) {
        let Some(template) = self.strategies.iter().find(|t| t.id == id).cloned() else {
            self.add_log(format!("✗ 未找到策略模板: {}", id));
            return;
        };
        let page = self.edit_page();
        self.session_mut(page).apply_template(&template);
        self.add_log(format!("✓ [{}] 已应用模板: {}", page.title(), template.name));
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Message(msg) | AppEvent::Error(msg) => {
                self.log_messages.push(msg)
            }
            AppEvent::Loaded { page, seq, outcome } => {
                let summary = outcome.summary();
                let notice = match &outcome {
                    EngineOutcome::Signals(set) => set.notice.clone(),
                    _ => None,
                };
                if self.session_mut(page).complete(seq, outcome) {
                    self.add_log(format!("✓ [{}] {}", page.title(), summary));
                    if let Some(notice) = notice {
                        self.add_log(format!("⚠ [{}] {}", page.title(), notice));
                    }
                } else {
                    info!("[{:?}#{}] 丢弃过期响应", page, seq);
                }
            }
            AppEvent::Failed { page, seq, error } => {
                let session = self.session_mut(page);
                if session.tracker.fail(seq) {
                    session.last_error = Some(error.to_string());
                    self.add_log(format!("✗ [{}] 请求失败: {}", page.title(), error));
                } else {
                    info!("[{:?}#{}] 忽略过期失败: {}", page, seq, error);
                }
            }
            AppEvent::Catalog(outcome) => match outcome {
                EngineOutcome::Strategies(list) => {
                    self.add_log(format!("✓ 策略模板 {} 个", list.len()));
                    self.strategies = list;
                    self.template_list_state.select(Some(0));
                }
                EngineOutcome::Alphas(list) => {
                    if list.is_empty() {
                        warn!("alpha 目录为空，保留现有配置");
                        self.add_log("⚠ alpha 目录为空，保留现有配置".to_string());
                        return;
                    }
                    for session in self.sessions.iter_mut() {
                        session.reload_catalog(&list);
                    }
                    self.add_log(format!("✓ alpha 目录 {} 项", list.len()));
                    self.alpha_catalog = list;
                }
                other => warn!("忽略非目录结果: {}", other.summary()),
            },
        }
    }

    /// 获取当前的预测建议
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = [
            "live",
            "analyze",
            "set",
            "alpha",
            "backtest",
            "equity",
            "walkforward",
            "strategies",
            "template",
            "page",
            "validate",
            "undo",
            "help",
            "quit",
        ];
        let input = self.command_input.trim_start();
        if input.is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let completing_new_word = input.ends_with(' ');
        if parts.len() == 1 && !completing_new_word {
            return commands
                .iter()
                .find(|cmd| cmd.starts_with(parts[0]) && **cmd != parts[0])
                .map(|cmd| cmd[parts[0].len()..].to_string());
        }

        let cur = if completing_new_word {
            ""
        } else {
            parts.last().copied().unwrap_or("")
        };
        let arg_pos = if completing_new_word {
            parts.len()
        } else {
            parts.len() - 1
        };
        let candidates: Vec<String> = match (parts[0], arg_pos) {
            ("page", 1) => ["signals", "backtest", "wf", "strategies"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ("set", 1) => ParamField::ALL
                .iter()
                .map(|f| f.name().to_string())
                .chain(["rows", "min_price", "min_volume", "date"].map(String::from))
                .collect(),
            ("alpha", 1) => self
                .session(self.edit_page())
                .alphas
                .keys()
                .map(String::from)
                .collect(),
            ("alpha", 2) => ["on", "off", "toggle"].map(String::from).to_vec(),
            ("template", 1) => self.strategies.iter().map(|t| t.id.clone()).collect(),
            _ => Vec::new(),
        };
        if cur.is_empty() {
            return None;
        }
        candidates
            .iter()
            .find(|c| c.starts_with(cur) && c.as_str() != cur)
            .map(|c| c[cur.len()..].to_string())
    }

    fn submit_command_input(&mut self) {
        let cmd_owned = self.command_input.trim().to_string();
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
        if cmd_owned.is_empty() {
            return;
        }
        if let Ok(app_cmd) = AppCommand::from_str(&cmd_owned) {
            self.execute(app_cmd);
        }
        self.command_history.push(cmd_owned);
        self.command_history_index = None;
    }

    fn selected_template(&self) -> Option<usize> {
        self.template_list_state
            .selected()
            .filter(|i| *i < self.strategies.len())
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        if self.input_mode == InputMode::Command {
            match key {
                KeyCode::Enter => self.submit_command_input(),
                KeyCode::Esc => {
                    self.command_input.clear();
                    self.command_cursor = 0;
                    self.input_mode = InputMode::Normal;
                }
                KeyCode::Tab => {
                    if let Some(hint) = self.get_completion_hint() {
                        let insert = format!("{} ", hint);
                        self.command_input.insert_str(self.command_cursor, &insert);
                        self.command_cursor += insert.len();
                    }
                }
                KeyCode::Up => {
                    if self.command_history.is_empty() {
                        return self.should_quit;
                    }
                    let next = match self.command_history_index {
                        None => self.command_history.len().saturating_sub(1),
                        Some(i) => i.saturating_sub(1),
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                }
                KeyCode::Down => {
                    let Some(i) = self.command_history_index else {
                        return self.should_quit;
                    };
                    let n = i + 1;
                    if n >= self.command_history.len() {
                        self.command_history_index = None;
                        self.command_input.clear();
                        self.command_cursor = 0;
                    } else {
                        self.command_history_index = Some(n);
                        self.command_input = self.command_history[n].clone();
                        self.command_cursor = self.command_input.len();
                    }
                }
                KeyCode::Backspace => {
                    if self.command_cursor > 0 {
                        self.command_cursor -= 1;
                        self.command_input.remove(self.command_cursor);
                    }
                }
                KeyCode::Delete => {
                    if self.command_cursor < self.command_input.len() {
                        self.command_input.remove(self.command_cursor);
                    }
                }
                KeyCode::Left => self.command_cursor = self.command_cursor.saturating_sub(1),
                KeyCode::Right => {
                    if self.command_cursor < self.command_input.len() {
                        self.command_cursor += 1;
                    }
                }
                KeyCode::Home => self.command_cursor = 0,
                KeyCode::End => self.command_cursor = self.command_input.len(),
                KeyCode::Char(c) => {
                    // 命令仅支持 ASCII，光标按字节计
                    if c.is_ascii() {
                        self.command_input.insert(self.command_cursor, c);
                        self.command_cursor += 1;
                    }
                }
                _ => {}
            }
            return self.should_quit;
        }

        // 正常模式下的按键处理
        match key {
            KeyCode::Char('/') | KeyCode::Char(':') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
            }
            KeyCode::Char('q') => return true,
            KeyCode::Left => self.focus_area = FocusArea::Menu,
            KeyCode::Right => self.focus_area = FocusArea::MainView,
            KeyCode::Tab => {
                let next = Page::ALL[(self.page.index() + 1) % Page::ALL.len()];
                self.switch_page(next);
            }
            KeyCode::Up => {
                if self.focus_area == FocusArea::Menu {
                    self.menu_selected_index = self.menu_selected_index.saturating_sub(1);
                } else if self.page == Page::Strategies {
                    let i = self.selected_template().unwrap_or(0);
                    self.template_list_state.select(Some(i.saturating_sub(1)));
                } else {
                    self.scroll = self.scroll.saturating_sub(1);
                }
            }
            KeyCode::Down => {
                if self.focus_area == FocusArea::Menu {
                    if self.menu_selected_index < Page::ALL.len() - 1 {
                        self.menu_selected_index += 1;
                    }
                } else if self.page == Page::Strategies {
                    let i = self.selected_template().map(|i| i + 1).unwrap_or(0);
                    if i < self.strategies.len() {
                        self.template_list_state.select(Some(i));
                    }
                } else {
                    self.scroll = self.scroll.saturating_add(1);
                }
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    self.switch_page(Page::ALL[self.menu_selected_index]);
                    self.focus_area = FocusArea::MainView;
                } else if self.page == Page::Strategies {
                    if let Some(id) = self
                        .selected_template()
                        .map(|i| self.strategies[i].id.clone())
                    {
                        self.apply_template(&id);
                    }
                }
            }
            KeyCode::Char('r') => {
                if let Some(op) = self.page.default_operation() {
                    self.dispatch(self.page, op);
                } else {
                    self.execute(AppCommand::ReloadCatalogs);
                }
            }
            KeyCode::Char('u') => self.execute(AppCommand::Undo),
            _ => {}
        }
        self.should_quit
    }
}
