/// Name of a published metric, derived from a register description
///
/// The description is lower-cased, every run of characters other than ASCII letters and digits
/// becomes a single `_`, separators at either end are dropped and the result is prefixed with
/// `deye_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricIdentity(String);

impl MetricIdentity {
    /// namespace token placed in front of every identity
    pub const NAMESPACE: &'static str = "deye";

    /// Derive the identity of a description
    ///
    /// Returns `None` if the description holds no letters or digits.
    pub fn from_description(description: &str) -> Option<Self> {
        let mut name = String::with_capacity(Self::NAMESPACE.len() + description.len() + 1);
        name.push_str(Self::NAMESPACE);

        let mut pending_separator = true;
        let mut empty = true;
        for c in description.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_separator {
                    name.push('_');
                    pending_separator = false;
                }
                name.push(c.to_ascii_lowercase());
                empty = false;
            } else if !empty {
                pending_separator = true;
            }
        }

        if empty {
            None
        } else {
            Some(Self(name))
        }
    }

    /// Identity as a metric name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the info-style metric that carries textual values
    pub fn info_name(&self) -> String {
        format!("{}_info", self.0)
    }
}

impl std::fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human readable label of a metric: title-cased description with the unit in parentheses
pub fn metric_label(description: &str, suffix: Option<&str>) -> String {
    let mut label = String::with_capacity(description.len() + 8);
    let mut previous_alphabetic = false;
    for c in description.trim().chars() {
        if previous_alphabetic {
            label.extend(c.to_lowercase());
        } else {
            label.extend(c.to_uppercase());
        }
        previous_alphabetic = c.is_alphabetic();
    }

    match suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) => format!("{label} ({suffix})"),
        None => label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(description: &str) -> String {
        MetricIdentity::from_description(description)
            .unwrap()
            .to_string()
    }

    #[test]
    fn derives_identity_from_description() {
        assert_eq!(
            identity("Battery state of charge"),
            "deye_battery_state_of_charge"
        );
        assert_eq!(identity("Battery voltage"), "deye_battery_voltage");
        assert_eq!(identity("PV1 power"), "deye_pv1_power");
    }

    #[test]
    fn normalization_ignores_case_whitespace_and_punctuation() {
        let expected = "deye_battery_voltage";
        assert_eq!(identity("BATTERY VOLTAGE"), expected);
        assert_eq!(identity("  battery   voltage  "), expected);
        assert_eq!(identity("Battery-voltage!"), expected);
        assert_eq!(identity("battery__(voltage)"), expected);
    }

    #[test]
    fn non_ascii_characters_become_separators() {
        assert_eq!(identity("Temperature °C"), "deye_temperature_c");
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(
            MetricIdentity::from_description("Grid power"),
            MetricIdentity::from_description("Grid power")
        );
    }

    #[test]
    fn description_without_alphanumerics_has_no_identity() {
        assert_eq!(MetricIdentity::from_description(""), None);
        assert_eq!(MetricIdentity::from_description(" - / "), None);
    }

    #[test]
    fn info_name_appends_suffix() {
        let id = MetricIdentity::from_description("Running state").unwrap();
        assert_eq!(id.info_name(), "deye_running_state_info");
    }

    #[test]
    fn label_is_title_cased_with_suffix() {
        assert_eq!(
            metric_label("battery state of charge", Some("%")),
            "Battery State Of Charge (%)"
        );
        assert_eq!(metric_label("PV1 power", Some("W")), "Pv1 Power (W)");
        assert_eq!(metric_label("Running state", None), "Running State");
        assert_eq!(metric_label("Running state", Some(" ")), "Running State");
    }
}
