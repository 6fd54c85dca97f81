//! Prior encoding - a physical quantity as a known constant or a named distribution.
//!
//! On disk a parameter spec is a small mapping with a fixed key order:
//!
//! ```yaml
//! lines: [CO2_main_HN20_air_C25, CO2_UV]   # species only, omitted when absent
//! prior:                                   # omitted for (known)
//!   kind: log-uniform
//!   prior_specs:
//!     log_lower: -15.0
//!     log_upper: 0.0
//! truth: 0.004                             # omitted when absent
//! unit: Rearth                             # omitted when absent
//! ```

use retrieval_types::PriorKind;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::PriorError;

/// One retrievable or fixed quantity.
///
/// Invariants (enforced by every constructor, including deserialization):
/// - `(known)` carries a truth and no prior parameters
/// - any other kind carries exactly `kind.param_names().len()` values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParameterSpecRepr", into = "ParameterSpecRepr")]
pub struct ParameterSpec {
    kind: PriorKind,
    params: Vec<f64>,
    truth: Option<f64>,
    unit: Option<String>,
    lines: Option<Vec<String>>,
}

/// Build a parameter spec from loosely typed editor input.
///
/// `params` is ignored for `(known)`; `truth` is mandatory for it.
pub fn build_parameter_spec(
    kind: &str,
    params: Option<&[f64]>,
    truth: Option<f64>,
    lines: Option<Vec<String>>,
    unit: Option<String>,
) -> Result<ParameterSpec, PriorError> {
    let kind: PriorKind = kind.parse()?;
    ParameterSpec::new(kind, params, truth, lines, unit)
}

impl ParameterSpec {
    pub fn new(
        kind: PriorKind,
        params: Option<&[f64]>,
        truth: Option<f64>,
        lines: Option<Vec<String>>,
        unit: Option<String>,
    ) -> Result<Self, PriorError> {
        let params = if kind.is_known() {
            if truth.is_none() {
                return Err(PriorError::MissingTruth);
            }
            Vec::new()
        } else {
            let expected = kind.param_names();
            let values = params.ok_or(PriorError::MissingPriorParams { kind, expected })?;
            if values.len() != expected.len() {
                return Err(PriorError::PriorParamCount {
                    kind,
                    expected: expected.len(),
                    found: values.len(),
                });
            }
            values.to_vec()
        };

        Ok(Self {
            kind,
            params,
            truth,
            unit,
            lines,
        })
    }

    /// A fixed value with no distribution.
    pub fn known(truth: f64) -> Self {
        Self {
            kind: PriorKind::Known,
            params: Vec::new(),
            truth: Some(truth),
            unit: None,
            lines: None,
        }
    }

    /// A distribution with its two parameters and an optional reference value.
    pub fn distribution(
        kind: PriorKind,
        params: [f64; 2],
        truth: Option<f64>,
    ) -> Result<Self, PriorError> {
        Self::new(kind, Some(&params), truth, None, None)
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Same prior, truth and unit with a different line list (`None` drops the key).
    pub fn replace_lines(&self, lines: Option<Vec<String>>) -> Self {
        Self {
            lines,
            ..self.clone()
        }
    }

    pub fn kind(&self) -> PriorKind {
        self.kind
    }

    pub fn is_known(&self) -> bool {
        self.kind.is_known()
    }

    /// Prior parameters paired with their canonical names.
    pub fn prior_params(&self) -> Vec<(&'static str, f64)> {
        self.kind
            .param_names()
            .iter()
            .copied()
            .zip(self.params.iter().copied())
            .collect()
    }

    pub fn prior_param(&self, name: &str) -> Option<f64> {
        self.prior_params()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn truth(&self) -> Option<f64> {
        self.truth
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn lines(&self) -> Option<&[String]> {
        self.lines.as_deref()
    }

    /// Short form used in table views: `log-uniform(-15, 0)` or `(known)`.
    pub fn prior_summary(&self) -> String {
        if self.is_known() {
            return PriorKind::Known.as_str().to_string();
        }
        let values: Vec<String> = self.params.iter().map(|v| v.to_string()).collect();
        format!("{}({})", self.kind, values.join(", "))
    }
}

// ---------------------------------------------------------------------------
// On-disk representation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParameterSpecRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior: Option<PriorRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    truth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PriorRepr {
    kind: String,
    #[serde(default)]
    prior_specs: Mapping,
}

impl TryFrom<ParameterSpecRepr> for ParameterSpec {
    type Error = PriorError;

    fn try_from(repr: ParameterSpecRepr) -> Result<Self, Self::Error> {
        let Some(prior) = repr.prior else {
            return ParameterSpec::new(PriorKind::Known, None, repr.truth, repr.lines, repr.unit);
        };

        let kind: PriorKind = prior.kind.parse()?;
        let expected = kind.param_names();

        let mut found = Vec::with_capacity(prior.prior_specs.len());
        let mut values = Vec::with_capacity(prior.prior_specs.len());
        for (name, value) in &prior.prior_specs {
            let name = match name {
                Value::String(s) => s.clone(),
                other => serde_yaml::to_string(other)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
            };
            let value = value
                .as_f64()
                .ok_or_else(|| PriorError::NonNumericParam { name: name.clone() })?;
            found.push(name);
            values.push(value);
        }

        if found.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Err(PriorError::PriorParamNames {
                kind,
                expected,
                found,
            });
        }

        ParameterSpec::new(kind, Some(&values), repr.truth, repr.lines, repr.unit)
    }
}

impl From<ParameterSpec> for ParameterSpecRepr {
    fn from(spec: ParameterSpec) -> Self {
        let prior = (!spec.kind.is_known()).then(|| {
            let mut prior_specs = Mapping::new();
            for (name, value) in spec.prior_params() {
                prior_specs.insert(Value::from(name), Value::from(value));
            }
            PriorRepr {
                kind: spec.kind.as_str().to_string(),
                prior_specs,
            }
        });

        ParameterSpecRepr {
            lines: spec.lines,
            prior,
            truth: spec.truth,
            unit: spec.unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_distribution_gets_two_named_params() {
        for kind in PriorKind::ALL.iter().filter(|k| !k.is_known()) {
            let spec = build_parameter_spec(kind.as_str(), Some(&[1.0, 2.0]), None, None, None)
                .unwrap();
            let names: Vec<&str> = spec.prior_params().iter().map(|(n, _)| *n).collect();
            assert_eq!(names, kind.param_names());
            assert_eq!(spec.prior_params()[1].1, 2.0);
        }
    }

    #[test]
    fn test_known_has_no_prior_key() {
        let spec = build_parameter_spec("(known)", None, Some(10.0), None, None).unwrap();
        assert!(spec.prior_params().is_empty());

        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert_eq!(yaml, "truth: 10.0\n");
    }

    #[test]
    fn test_known_ignores_params() {
        let spec = build_parameter_spec("(known)", Some(&[1.0, 2.0]), Some(0.1), None, None)
            .unwrap();
        assert!(spec.prior_params().is_empty());
    }

    #[test]
    fn test_missing_truth_fails() {
        let err = build_parameter_spec("(known)", None, None, None, None).unwrap_err();
        assert_eq!(err, PriorError::MissingTruth);
    }

    #[test]
    fn test_unknown_kind_fails() {
        let err =
            build_parameter_spec("not-a-kind", Some(&[1.0, 2.0]), None, None, None).unwrap_err();
        assert_eq!(
            err,
            PriorError::UnknownPriorKind {
                kind: "not-a-kind".into()
            }
        );
    }

    #[test]
    fn test_missing_and_miscounted_params() {
        let err = build_parameter_spec("gaussian", None, Some(1.0), None, None).unwrap_err();
        assert!(matches!(err, PriorError::MissingPriorParams { .. }));

        let err = build_parameter_spec("uniform", Some(&[0.0]), None, None, None).unwrap_err();
        assert_eq!(
            err,
            PriorError::PriorParamCount {
                kind: PriorKind::Uniform,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_serialized_key_order() {
        let spec = build_parameter_spec(
            "gaussian",
            Some(&[1.0, 0.2]),
            Some(1.0),
            Some(vec!["H2O_UV".into()]),
            Some("Rearth".into()),
        )
        .unwrap();
        let yaml = serde_yaml::to_string(&spec).unwrap();
        let expected = "\
lines:
- H2O_UV
prior:
  kind: gaussian
  prior_specs:
    mean: 1.0
    sigma: 0.2
truth: 1.0
unit: Rearth
";
        assert_eq!(yaml, expected);
    }

    #[test]
    fn test_lines_key_omitted_when_none() {
        let spec = ParameterSpec::distribution(PriorKind::LogUniform, [-2.0, 0.0], Some(0.78))
            .unwrap();
        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert!(!yaml.contains("lines"));

        let empty = spec.clone().with_lines(Vec::new());
        let yaml = serde_yaml::to_string(&empty).unwrap();
        assert!(yaml.starts_with("lines: []"));
    }

    #[test]
    fn test_decode_accepts_integer_values() {
        let yaml = "prior:\n  kind: log-uniform\n  prior_specs:\n    log_lower: -2\n    log_upper: 2\ntruth: 1.0294\n";
        let spec: ParameterSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.prior_params(), vec![("log_lower", -2.0), ("log_upper", 2.0)]);
        assert_eq!(spec.truth(), Some(1.0294));
    }

    #[test]
    fn test_decode_rejects_wrong_param_names() {
        let yaml = "prior:\n  kind: uniform\n  prior_specs:\n    upper: 1.0\n    lower: 0.0\n";
        let err = serde_yaml::from_str::<ParameterSpec>(yaml).unwrap_err();
        assert!(err.to_string().contains("expects parameters"), "{}", err);
    }

    #[test]
    fn test_decode_known_without_truth_fails() {
        let err = serde_yaml::from_str::<ParameterSpec>("unit: m\n").unwrap_err();
        assert!(err.to_string().contains("truth value"), "{}", err);
    }

    #[test]
    fn test_prior_summary() {
        let spec = ParameterSpec::distribution(PriorKind::LogUniform, [-15.0, 0.0], None).unwrap();
        assert_eq!(spec.prior_summary(), "log-uniform(-15, 0)");
        assert_eq!(ParameterSpec::known(0.1).prior_summary(), "(known)");
    }
}
