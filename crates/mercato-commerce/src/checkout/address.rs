//! Address types.

use serde::{Deserialize, Serialize};

/// A postal address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    /// Recipient name.
    #[serde(default)]
    pub full_name: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Address line 1.
    #[serde(default)]
    pub line1: String,
    /// Address line 2 (apt, suite, etc.).
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    /// State/province.
    #[serde(default)]
    pub state: String,
    /// Postal/ZIP code.
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

impl Address {
    /// Create a new address.
    pub fn new(
        full_name: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            phone: None,
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.as_str()];
        if let Some(ref line2) = self.line2 {
            parts.push(line2);
        }
        parts.extend([
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]);
        parts
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Check if address is complete.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_creation() {
        let addr = Address::new("Jane Smith", "456 Oak Ave", "Los Angeles", "CA", "90001", "US");
        assert!(addr.is_complete());
        assert_eq!(addr.one_line(), "456 Oak Ave, Los Angeles, CA, 90001, US");
    }

    #[test]
    fn test_missing_fields() {
        let mut addr = Address::new("Jane Smith", "456 Oak Ave", "Los Angeles", "CA", "90001", "US");
        addr.city = "  ".into();
        addr.postal_code.clear();
        assert_eq!(addr.missing_fields(), vec!["city", "postal_code"]);
        assert!(!Address::default().is_complete());
    }
}
