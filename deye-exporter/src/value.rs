//! Decoded register values and their numeric/textual classification

/// Value of a register after decoding its raw words
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterValue {
    /// whole number, possibly after applying an offset
    Integer(i64),
    /// scaled number
    Float(f64),
    /// on/off flag
    Bool(bool),
    /// enumeration, string or formatted value
    Text(String),
}

impl std::fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterValue::Integer(x) => write!(f, "{x}"),
            RegisterValue::Float(x) => write!(f, "{x}"),
            RegisterValue::Bool(x) => write!(f, "{x}"),
            RegisterValue::Text(x) => f.write_str(x),
        }
    }
}

/// How a value is published
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// the value converts to `f64`
    Numeric(f64),
    /// non-blank text that is not a number
    Textual(String),
    /// blank text, nothing can be published
    Unclassifiable,
}

impl RegisterValue {
    /// Classify the value for publication
    ///
    /// Numbers and flags are numeric. Text is numeric when it parses as a float once trimmed,
    /// textual when it holds anything else.
    pub fn classify(&self) -> Classified {
        match self {
            RegisterValue::Integer(x) => Classified::Numeric(*x as f64),
            RegisterValue::Float(x) => Classified::Numeric(*x),
            RegisterValue::Bool(x) => Classified::Numeric(if *x { 1.0 } else { 0.0 }),
            RegisterValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Classified::Unclassifiable;
                }
                match trimmed.parse::<f64>() {
                    Ok(x) => Classified::Numeric(x),
                    Err(_) => Classified::Textual(text.clone()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> RegisterValue {
        RegisterValue::Text(value.to_string())
    }

    #[test]
    fn numbers_are_numeric() {
        assert_eq!(RegisterValue::Float(12.5).classify(), Classified::Numeric(12.5));
        assert_eq!(RegisterValue::Integer(-3).classify(), Classified::Numeric(-3.0));
        assert_eq!(RegisterValue::Bool(true).classify(), Classified::Numeric(1.0));
        assert_eq!(RegisterValue::Bool(false).classify(), Classified::Numeric(0.0));
    }

    #[test]
    fn numeric_text_is_numeric() {
        assert_eq!(text("12.5").classify(), Classified::Numeric(12.5));
        assert_eq!(text(" -3 ").classify(), Classified::Numeric(-3.0));
    }

    #[test]
    fn other_text_is_textual() {
        assert_eq!(
            text("Standby").classify(),
            Classified::Textual("Standby".to_string())
        );
        assert_eq!(
            text("0x1A fault").classify(),
            Classified::Textual("0x1A fault".to_string())
        );
    }

    #[test]
    fn blank_text_is_unclassifiable() {
        assert_eq!(text("").classify(), Classified::Unclassifiable);
        assert_eq!(text("  \t").classify(), Classified::Unclassifiable);
    }

    #[test]
    fn displays_plain_values() {
        assert_eq!(RegisterValue::Integer(87).to_string(), "87");
        assert_eq!(RegisterValue::Float(52.3).to_string(), "52.3");
        assert_eq!(text("Normal").to_string(), "Normal");
    }
}
