/// 引擎 API 默认基础地址
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// 回测相关路径
pub const PATH_BACKTEST_RUN: &str = "/backtest/run";
pub const PATH_BACKTEST_EQUITY: &str = "/backtest/equity";

/// 信号相关路径
pub const PATH_SIGNALS_LIVE: &str = "/signals/live";
pub const PATH_SIGNALS_DATE: &str = "/signals/date";

/// Walk-forward 路径
pub const PATH_WALKFORWARD_RUN: &str = "/walkforward/run";

/// 目录路径
pub const PATH_STRATEGIES: &str = "/strategies";
pub const PATH_ALPHAS: &str = "/alphas";

/// 拼接基础地址与路径，避免出现重复或缺失的 `/`
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
