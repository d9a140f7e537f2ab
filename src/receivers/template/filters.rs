//! This module provides custom filters for the minijinja templating engine

use minijinja::{
    Error, ErrorKind,
    value::{Value, ValueKind},
};

/// Selects the alerts whose status matches the given value.
fn filter_by_status(alerts: Value, status: &str) -> Result<Vec<Value>, Error> {
    if alerts.kind() != ValueKind::Seq {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "status filters can only be applied to a sequence of alerts.",
        ));
    }

    let mut selected = Vec::new();
    for alert in alerts.try_iter()? {
        let alert_status = alert.get_attr("status")?;
        if alert_status.as_str() == Some(status) {
            selected.push(alert);
        }
    }
    Ok(selected)
}

/// A minijinja filter that keeps only the firing alerts of a notification.
pub fn firing(alerts: Value) -> Result<Vec<Value>, Error> {
    filter_by_status(alerts, "firing")
}

/// A minijinja filter that keeps only the resolved alerts of a notification.
pub fn resolved(alerts: Value) -> Result<Vec<Value>, Error> {
    filter_by_status(alerts, "resolved")
}
