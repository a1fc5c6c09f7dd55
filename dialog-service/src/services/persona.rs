//! Big Five persona data as delivered by the Persona Engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const TRAIT_MIN: f64 = 1.0;
pub const TRAIT_MAX: f64 = 5.0;
/// Score assumed for a trait that is missing or explicitly null.
pub const NEUTRAL_SCORE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    /// O, C, E, A, N: the order traits are rendered and reported in.
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Trait::Openness => "openness",
            Trait::Conscientiousness => "conscientiousness",
            Trait::Extraversion => "extraversion",
            Trait::Agreeableness => "agreeableness",
            Trait::Neuroticism => "neuroticism",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Trait::Openness => "Openness",
            Trait::Conscientiousness => "Conscientiousness",
            Trait::Extraversion => "Extraversion",
            Trait::Agreeableness => "Agreeableness",
            Trait::Neuroticism => "Neuroticism",
        }
    }

    /// Single-letter OCEAN code used by inventory files.
    pub fn code(&self) -> char {
        match self {
            Trait::Openness => 'O',
            Trait::Conscientiousness => 'C',
            Trait::Extraversion => 'E',
            Trait::Agreeableness => 'A',
            Trait::Neuroticism => 'N',
        }
    }

    pub fn from_name(name: &str) -> Option<Trait> {
        let name = name.trim().to_ascii_lowercase();
        Trait::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn from_code(code: &str) -> Option<Trait> {
        let code = code.trim();
        Trait::ALL
            .into_iter()
            .find(|t| code.len() == 1 && code.starts_with(t.code()))
    }
}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized trait scores. Only traits present in the engine's payload are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Persona {
    traits: BTreeMap<Trait, f64>,
}

impl Persona {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_scores(scores: impl IntoIterator<Item = (Trait, f64)>) -> Self {
        Self {
            traits: scores
                .into_iter()
                .map(|(t, v)| (t, v.clamp(TRAIT_MIN, TRAIT_MAX)))
                .collect(),
        }
    }

    /// Normalize an engine payload, bare or wrapped in `{"data": {...}}`.
    ///
    /// Keys are matched case-insensitively and anything that is not a Big Five
    /// trait is ignored. Values may be numbers, numeric strings, `null` or
    /// `{"value": n}`; every score ends up clamped into [1, 5].
    pub fn from_json(payload: &Value) -> Self {
        let body = match payload.get("data") {
            Some(inner @ Value::Object(_)) => inner,
            _ => payload,
        };

        let Some(fields) = body.as_object() else {
            return Self::empty();
        };

        Self::from_scores(
            fields
                .iter()
                .filter_map(|(key, value)| Trait::from_name(key).map(|t| (t, raw_score(value)))),
        )
    }

    pub fn get(&self, t: Trait) -> Option<f64> {
        self.traits.get(&t).copied()
    }

    /// Score used for behavioural rules; missing traits count as neutral.
    pub fn score(&self, t: Trait) -> f64 {
        self.get(t).unwrap_or(NEUTRAL_SCORE)
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// Present traits in O, C, E, A, N order.
    pub fn iter(&self) -> impl Iterator<Item = (Trait, f64)> + '_ {
        Trait::ALL
            .into_iter()
            .filter_map(|t| self.get(t).map(|v| (t, v)))
    }
}

fn raw_score(value: &Value) -> f64 {
    match value {
        Value::Object(obj) => match obj.get("value") {
            Some(inner @ (Value::Null | Value::Number(_) | Value::String(_))) => scalar_score(inner),
            _ => 0.0,
        },
        other => scalar_score(other),
    }
}

/// Numbers and numeric strings read as themselves, `null` as neutral.
fn scalar_score(value: &Value) -> f64 {
    match value {
        Value::Null => NEUTRAL_SCORE,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_mixed_value_shapes() {
        let persona = Persona::from_json(&json!({
            "Openness": 4.5,
            "conscientiousness": null,
            "extraversion": {"value": 2},
            "agreeableness": {"value": null},
            "neuroticism": {}
        }));

        assert_eq!(persona.get(Trait::Openness), Some(4.5));
        assert_eq!(persona.get(Trait::Conscientiousness), Some(3.0));
        assert_eq!(persona.get(Trait::Extraversion), Some(2.0));
        assert_eq!(persona.get(Trait::Agreeableness), Some(3.0));
        // {} reads as 0 and is clamped up
        assert_eq!(persona.get(Trait::Neuroticism), Some(1.0));
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let persona = Persona::from_json(&json!({"openness": 9, "neuroticism": -2}));
        assert_eq!(persona.get(Trait::Openness), Some(5.0));
        assert_eq!(persona.get(Trait::Neuroticism), Some(1.0));
    }

    #[test]
    fn unwraps_data_envelope_and_ignores_other_keys() {
        let persona = Persona::from_json(&json!({
            "data": {"user_id": "u1", "openness": 4, "created_at": "2024-01-01"}
        }));
        assert_eq!(persona.len(), 1);
        assert_eq!(persona.get(Trait::Openness), Some(4.0));
    }

    #[test]
    fn non_object_payload_is_empty() {
        assert!(Persona::from_json(&json!([1, 2, 3])).is_empty());
        assert!(Persona::from_json(&json!("nope")).is_empty());
    }

    #[test]
    fn string_value_reads_as_minimum() {
        let persona = Persona::from_json(&json!({"openness": "high", "neuroticism": {"value": "NaN"}}));
        assert_eq!(persona.get(Trait::Openness), Some(1.0));
        assert_eq!(persona.get(Trait::Neuroticism), Some(1.0));
    }

    #[test]
    fn numeric_strings_are_read_as_scores() {
        let persona = Persona::from_json(&json!({
            "openness": "4",
            "extraversion": {"value": " 2.5 "},
            "agreeableness": {"value": "7"}
        }));
        assert_eq!(persona.get(Trait::Openness), Some(4.0));
        assert_eq!(persona.get(Trait::Extraversion), Some(2.5));
        assert_eq!(persona.get(Trait::Agreeableness), Some(5.0));
    }

    #[test]
    fn missing_trait_scores_neutral() {
        let persona = Persona::empty();
        assert_eq!(persona.score(Trait::Agreeableness), NEUTRAL_SCORE);
    }

    #[test]
    fn trait_codes_round_trip() {
        for t in Trait::ALL {
            assert_eq!(Trait::from_code(&t.code().to_string()), Some(t));
            assert_eq!(Trait::from_name(t.title()), Some(t));
        }
        assert_eq!(Trait::from_code("X"), None);
        assert_eq!(Trait::from_code("OC"), None);
    }
}
