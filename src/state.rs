use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::ProfileStore;
use crate::python::ProcessInvoker;
use crate::services::gemini_service::GenerativeModel;
use crate::utils::AppError;

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn ProfileStore>,
    pub invoker: ProcessInvoker,
    pub model: Option<Arc<dyn GenerativeModel>>,
}

impl AppState {
    pub fn model(&self) -> Result<&dyn GenerativeModel, AppError> {
        self.model
            .as_deref()
            .ok_or_else(|| AppError::Misconfigured("GOOGLE_API_KEY not set".into()))
    }
}
