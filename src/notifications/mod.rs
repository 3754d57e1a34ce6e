//! Outbound alert notifications.
//!
//! Delivery is simulated: messages go to the structured log with the
//! configured destinations. Wiring in a real SMS or email provider
//! replaces the two `deliver_*` functions without touching callers.

use tracing::info;

use crate::alerts::AlertPayload;
use crate::config::NotificationConfig;

pub struct NotificationManager {
    enabled: bool,
    alert_email: String,
    alert_phone: String,
}

impl NotificationManager {
    pub fn new(cfg: &NotificationConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            alert_email: cfg.alert_email.clone(),
            alert_phone: cfg.alert_phone.clone(),
        }
    }

    /// Send the urgent notification for a confirmed leak. No-op when
    /// notifications are disabled.
    pub fn send_leak_alert(&self, alert: &AlertPayload) {
        if !self.enabled {
            return;
        }

        let message = format!(
            "URGENT: {} leak detected. Location: {}. {} Action: immediate inspection required.",
            alert.severity, alert.location, alert.analysis
        );

        self.deliver_sms(&message);
        self.deliver_email(&message);
    }

    fn deliver_sms(&self, message: &str) {
        info!(to = %self.alert_phone, message, "SMS notification (simulated)");
    }

    fn deliver_email(&self, message: &str) {
        info!(to = %self.alert_email, message, "Email notification (simulated)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use chrono::Utc;

    fn alert() -> AlertPayload {
        AlertPayload {
            timestamp: Utc::now(),
            severity: Severity::Critical,
            severity_score: 75.0,
            confidence: 0.9,
            location: "Tank-A".to_string(),
            analysis: "Significant pressure drop of 1.50 bar detected between Tank and A."
                .to_string(),
        }
    }

    #[test]
    fn test_disabled_manager_is_silent_noop() {
        let manager = NotificationManager::new(&NotificationConfig {
            enabled: false,
            alert_email: "ops@example.com".to_string(),
            alert_phone: "+10000000000".to_string(),
        });
        manager.send_leak_alert(&alert());
    }

    #[test]
    fn test_enabled_manager_sends() {
        let manager = NotificationManager::new(&NotificationConfig::default());
        manager.send_leak_alert(&alert());
    }
}
