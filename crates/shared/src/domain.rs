use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionIdentity(pub String);

impl ConnectionIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    Meeting,
    General,
}

impl AnalysisType {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::General => "general",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Meeting => "Meeting Analysis",
            Self::General => "General Analysis",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "meeting" => Ok(Self::Meeting),
            "general" => Ok(Self::General),
            _ => Err(UnknownVariant::new("analysis type", raw)),
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Language the final report is written in. The service accepts the
/// language's English name verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputLanguage {
    #[default]
    Turkish,
    English,
}

impl OutputLanguage {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Turkish => "Turkish",
            Self::English => "English",
        }
    }
}

impl FromStr for OutputLanguage {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "turkish" => Ok(Self::Turkish),
            "english" => Ok(Self::English),
            _ => Err(UnknownVariant::new("output language", raw)),
        }
    }
}

impl fmt::Display for OutputLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_fields_parse_case_insensitively() {
        assert_eq!("Meeting".parse::<AnalysisType>().ok(), Some(AnalysisType::Meeting));
        assert_eq!(" general ".parse::<AnalysisType>().ok(), Some(AnalysisType::General));
        assert_eq!("english".parse::<OutputLanguage>().ok(), Some(OutputLanguage::English));
        assert!("german".parse::<OutputLanguage>().is_err());
    }

    #[test]
    fn output_language_serializes_as_display_name() {
        let json = serde_json::to_string(&OutputLanguage::Turkish).expect("json");
        assert_eq!(json, "\"Turkish\"");
    }
}
