//! sema_options: Analyzer options.
//!
//! A trimmed-down analogue of a tsconfig `compilerOptions` block covering
//! the switches the binder and relation engine consult. All fields are
//! optional in the serialized form; the `effective_*` accessors apply the
//! `strict` umbrella default.

use serde::{Deserialize, Serialize};

/// Options consulted by the analyzer, matching the tsconfig.json schema for
/// the strict-family switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerOptions {
    /// Umbrella switch: defaults every strict-family option that is not
    /// explicitly set.
    pub strict: Option<bool>,
    pub strict_null_checks: Option<bool>,
    pub no_implicit_any: Option<bool>,
    pub strict_function_types: Option<bool>,
    pub use_define_for_class_fields: Option<bool>,
}

impl AnalyzerOptions {
    /// Parse options from a JSON string (the `compilerOptions` shape).
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn strict_default(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    /// Whether `undefined`/`null` are kept out of every other type.
    pub fn effective_strict_null_checks(&self) -> bool {
        self.strict_null_checks.unwrap_or_else(|| self.strict_default())
    }

    pub fn effective_no_implicit_any(&self) -> bool {
        self.no_implicit_any.unwrap_or_else(|| self.strict_default())
    }

    pub fn effective_strict_function_types(&self) -> bool {
        self.strict_function_types
            .unwrap_or_else(|| self.strict_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_off() {
        let opts = AnalyzerOptions::default();
        assert!(!opts.effective_strict_null_checks());
        assert!(!opts.effective_no_implicit_any());
    }

    #[test]
    fn test_strict_umbrella() {
        let opts = AnalyzerOptions {
            strict: Some(true),
            ..Default::default()
        };
        assert!(opts.effective_strict_null_checks());
        assert!(opts.effective_strict_function_types());
    }

    #[test]
    fn test_explicit_overrides_umbrella() {
        let opts = AnalyzerOptions {
            strict: Some(true),
            strict_null_checks: Some(false),
            ..Default::default()
        };
        assert!(!opts.effective_strict_null_checks());
        assert!(opts.effective_no_implicit_any());
    }

    #[test]
    fn test_from_json() {
        let opts =
            AnalyzerOptions::from_json_str(r#"{ "strict": true, "strictNullChecks": false }"#)
                .unwrap();
        assert_eq!(opts.strict, Some(true));
        assert_eq!(opts.strict_null_checks, Some(false));
    }
}
