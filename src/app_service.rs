use crate::app_state::AppEvent;
use crate::session::EngineApi;
use crate::worker::{EngineService, ServiceCommand};
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 后台单 actor：启动时加载目录，之后按指令派发请求
pub async fn run_service(
    api: Arc<dyn EngineApi>,
    mut cmd_rx: mpsc::UnboundedReceiver<ServiceCommand>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
) {
    let service = EngineService::new(api, evt_tx.clone());

    let _ = evt_tx.send(AppEvent::Message("正在加载策略模板与 alpha 目录...".to_string()));
    service.load_catalogs();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            ServiceCommand::Run(job) => {
                service.submit(job);
            }
            ServiceCommand::LoadCatalogs => {
                service.load_catalogs();
            }
        }
    }
    info!("指令通道已关闭，后台服务退出");
}
