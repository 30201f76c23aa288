use gloo::timers::callback::Timeout;

use crate::domain::{chart::ErrorNotifier, logging::LogComponent};
use crate::{log_error, log_warn};

pub const DEFAULT_CONTAINER_ID: &str = "error-notifications";

/// Shows errors as auto-dismissing banners inside a container element
#[derive(Debug, Clone)]
pub struct DomErrorNotifier {
    container_id: String,
    display_ms: u32,
}

impl DomErrorNotifier {
    pub fn new(container_id: impl Into<String>, display_ms: u32) -> Self {
        Self { container_id: container_id.into(), display_ms }
    }
}

impl ErrorNotifier for DomErrorNotifier {
    fn notify_error(&self, message: &str, error_type: &str) {
        log_error!(
            LogComponent::Infrastructure("UI"),
            "Showing error notification: [{}] {}",
            error_type,
            message
        );

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(container) = document.get_element_by_id(&self.container_id) else {
            log_warn!(
                LogComponent::Infrastructure("UI"),
                "Notification container '{}' not found in DOM",
                self.container_id
            );
            return;
        };
        let Ok(banner) = document.create_element("div") else {
            return;
        };

        banner.set_text_content(Some(&format!("[{}] {}", error_type, message)));
        let _ = banner.set_attribute("class", "chart-error");
        let _ = banner.set_attribute(
            "style",
            "padding: 10px; margin: 5px; background: #ffeeee; border: 1px solid #ff0000; border-radius: 5px;",
        );
        if container.append_child(&banner).is_err() {
            return;
        }

        Timeout::new(self.display_ms, move || banner.remove()).forget();
    }
}
