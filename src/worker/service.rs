use crate::app_state::AppEvent;
use crate::request::{catalog_request, EngineRequest, Operation};
use crate::session::{ApiError, EngineApi};
use crate::worker::model::{EngineJob, EngineOutcome};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 后台请求服务：每个任务独立 spawn，互不阻塞
pub struct EngineService {
    api: Arc<dyn EngineApi>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl EngineService {
    pub fn new(api: Arc<dyn EngineApi>, evt_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { api, evt_tx }
    }

    /// 发送请求并归一化，错误在任务内部分型
    pub async fn execute(
        api: &dyn EngineApi,
        request: &EngineRequest,
    ) -> Result<EngineOutcome, ApiError> {
        let response = api.send(request).await?;
        EngineOutcome::from_response(request.operation, &response)
    }

    pub fn submit(&self, job: EngineJob) -> JoinHandle<()> {
        let api = self.api.clone();
        let evt_tx = self.evt_tx.clone();
        tokio::spawn(async move {
            let EngineJob { page, seq, request } = job;
            info!("▶ [{:?}#{}] 发送 {:?}", page, seq, request.operation);
            match Self::execute(api.as_ref(), &request).await {
                Ok(outcome) => {
                    info!("✓ [{:?}#{}] {}", page, seq, outcome.summary());
                    let _ = evt_tx.send(AppEvent::Loaded { page, seq, outcome });
                }
                Err(error) => {
                    warn!(
                        "✗ [{:?}#{}] {:?} 失败 ({:?}): {}",
                        page,
                        seq,
                        request.operation,
                        error.kind(),
                        error
                    );
                    let _ = evt_tx.send(AppEvent::Failed { page, seq, error });
                }
            }
        })
    }

    /// 并发读取策略模板与 alpha 目录，两者互不影响
    pub fn load_catalogs(&self) -> JoinHandle<()> {
        let api = self.api.clone();
        let evt_tx = self.evt_tx.clone();
        tokio::spawn(async move {
            let strategies_req = catalog_request(Operation::StrategyCatalog);
            let alphas_req = catalog_request(Operation::AlphaCatalog);
            let (strategies, alphas) = futures::join!(
                Self::execute(api.as_ref(), &strategies_req),
                Self::execute(api.as_ref(), &alphas_req)
            );
            for result in [strategies, alphas] {
                match result {
                    Ok(outcome) => {
                        info!("✓ 目录加载: {}", outcome.summary());
                        let _ = evt_tx.send(AppEvent::Catalog(outcome));
                    }
                    Err(e) => {
                        warn!("目录加载失败: {}", e);
                        let _ = evt_tx.send(AppEvent::Error(format!("✗ 目录加载失败: {}", e)));
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::Page;
    use crate::request::{build_request, SignalQuery};
    use crate::session::engine_api::ApiErrorKind;
    use crate::strategy::{AlphaConfiguration, StrategyParameters};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// 按操作返回预设响应，可选延迟
    struct MockEngine {
        seen: Mutex<Vec<Operation>>,
        delay_ms: u64,
    }

    impl MockEngine {
        fn new(delay_ms: u64) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                delay_ms,
            }
        }
    }

    #[async_trait]
    impl EngineApi for MockEngine {
        async fn send(&self, request: &EngineRequest) -> Result<Value, ApiError> {
            self.seen.lock().unwrap().push(request.operation);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            match request.operation {
                Operation::RunBacktest => Ok(json!({
                    "trades": 3, "win_rate": 0.5, "avg_return": 0.01,
                    "final_equity": 101000.0, "max_drawdown": -0.02
                })),
                Operation::LiveSignals => Ok(json!({
                    "date": "2024-03-01",
                    "signals": [{"symbol": "TCS", "final_score": 0.7, "current_price": 3500.0}]
                })),
                Operation::StrategyCatalog => Ok(json!({"strategies": []})),
                Operation::AlphaCatalog => Ok(json!({
                    "alphas": [{"key": "ml", "name": "ML", "requires_model": true}]
                })),
                Operation::WalkForward => Err(ApiError::Status {
                    status: 500,
                    body: "Internal Server Error".into(),
                }),
                _ => Ok(json!({"detail": "unexpected"})),
            }
        }
    }

    fn job(page: Page, seq: u64, op: Operation) -> EngineJob {
        EngineJob {
            page,
            seq,
            request: build_request(
                op,
                &AlphaConfiguration::default_set(),
                &StrategyParameters::default(),
                &SignalQuery::default(),
            ),
        }
    }

    #[tokio::test]
    async fn successful_jobs_report_normalized_outcomes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = EngineService::new(Arc::new(MockEngine::new(0)), tx);
        service
            .submit(job(Page::Signals, 1, Operation::LiveSignals))
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            AppEvent::Loaded {
                page,
                seq,
                outcome: EngineOutcome::Signals(set),
            } => {
                assert_eq!(page, Page::Signals);
                assert_eq!(seq, 1);
                assert_eq!(set.rows[0].symbol, "TCS");
                assert_eq!(set.date.as_deref(), Some("2024-03-01"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn failures_carry_the_classified_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = EngineService::new(Arc::new(MockEngine::new(0)), tx);
        service
            .submit(job(Page::WalkForward, 4, Operation::WalkForward))
            .await
            .unwrap();
        service
            .submit(job(Page::Backtest, 5, Operation::EquityCurve))
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            AppEvent::Failed { page, seq, error } => {
                assert_eq!((page, seq), (Page::WalkForward, 4));
                assert_eq!(error.kind(), ApiErrorKind::Transport);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // 缺少 equity_curve 时仍是合法的空曲线
        match rx.recv().await.unwrap() {
            AppEvent::Loaded {
                outcome: EngineOutcome::EquityCurve(curve),
                ..
            } => assert!(curve.is_empty()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn jobs_run_concurrently() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = EngineService::new(Arc::new(MockEngine::new(200)), tx);
        let started = tokio::time::Instant::now();
        let a = service.submit(job(Page::Backtest, 1, Operation::RunBacktest));
        let b = service.submit(job(Page::Signals, 1, Operation::LiveSignals));
        let _ = futures::join!(a, b);
        assert!(started.elapsed() < Duration::from_millis(390));
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn catalogs_are_loaded_together() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::new(MockEngine::new(0));
        let service = EngineService::new(engine.clone(), tx);
        service.load_catalogs().await.unwrap();
        let mut got_alphas = false;
        for _ in 0..2 {
            if let Some(AppEvent::Catalog(EngineOutcome::Alphas(list))) = rx.recv().await {
                assert_eq!(list[0].key, "ml");
                got_alphas = true;
            }
        }
        assert!(got_alphas);
        assert_eq!(engine.seen.lock().unwrap().len(), 2);
    }
}
