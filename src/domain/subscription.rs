use serde::Deserialize;

use super::{YesNo, fields};

/// A subscription contract (`sale.order`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    /// Record id.
    #[serde(default)]
    pub id: Option<i64>,

    /// The customer's own reference for the contract.
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub client_order_ref: Option<String>,
}

impl Subscription {
    /// The value shown in the "Sub" column.
    ///
    /// With `explicit` set, the customer reference itself is shown when there
    /// is one. Otherwise only `YES`/`NO`.
    #[must_use]
    pub fn display_value(&self, explicit: bool) -> String {
        match &self.client_order_ref {
            Some(reference) if explicit => reference.clone(),
            reference => YesNo(reference.is_some()).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_value_hides_reference_by_default() {
        let subscription = Subscription {
            id: Some(1),
            client_order_ref: Some("PO-991".to_string()),
        };
        assert_eq!(subscription.display_value(false), "YES");
        assert_eq!(subscription.display_value(true), "PO-991");
    }

    #[test]
    fn display_value_without_reference() {
        let subscription = Subscription::default();
        assert_eq!(subscription.display_value(false), "NO");
        assert_eq!(subscription.display_value(true), "NO");
    }
}
