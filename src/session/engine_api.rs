use crate::normalize::ShapeError;
use crate::request::EngineRequest;
use async_trait::async_trait;
use serde_json::Value;

/// 错误分型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Transport, // 网络/超时/非 2xx 状态码
    Shape,     // 报文无法解析或结构不符
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Transport(_) | Self::Status { .. } => ApiErrorKind::Transport,
            Self::Decode(_) | Self::Shape(_) => ApiErrorKind::Shape,
        }
    }
}

/// 引擎传输接口，核心层只依赖这个 trait
#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn send(&self, request: &EngineRequest) -> Result<Value, ApiError>;
}
