//! Persona seeding for experiment conditions.

use dialog_service::services::{Persona, PersonaClient, Trait};

use crate::error::AssessmentError;

/// Named experiment conditions, scores in O, C, E, A, N order.
pub const PRESETS: &[(&str, [f64; 5])] = &[
    ("NEUTRAL", [3.0, 3.0, 3.0, 3.0, 3.0]),
    ("E_HIGH", [3.0, 3.0, 4.5, 3.0, 3.0]),
    ("C_HIGH", [3.0, 4.5, 3.0, 3.0, 3.0]),
    ("N_LOW", [3.0, 3.0, 3.0, 3.0, 2.0]),
    ("E_20", [3.0, 3.0, 2.0, 3.0, 3.0]),
    ("E_30", [3.0, 3.0, 3.0, 3.0, 3.0]),
    ("E_40", [3.0, 3.0, 4.0, 3.0, 3.0]),
    ("E_50", [3.0, 3.0, 5.0, 3.0, 3.0]),
    ("TEST_USER", [3.0, 4.2, 4.5, 3.0, 2.1]),
];

pub fn preset(name: &str) -> Option<Persona> {
    PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
        .map(|(_, scores)| Persona::from_scores(Trait::ALL.into_iter().zip(scores.iter().copied())))
}

/// Parse `openness=4.5,E=2` style assignments. Traits may be named or given by code.
pub fn parse_assignments(raw: &str) -> Result<Vec<(Trait, f64)>, AssessmentError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                AssessmentError::InvalidInput(format!("expected trait=value, got '{}'", part))
            })?;
            let name = name.trim();
            let t = Trait::from_name(name)
                .or_else(|| Trait::from_code(name))
                .ok_or_else(|| AssessmentError::InvalidInput(format!("unknown trait '{}'", name)))?;
            let value: f64 = value.trim().parse().map_err(|_| {
                AssessmentError::InvalidInput(format!("invalid score for {}: '{}'", name, value))
            })?;
            Ok((t, value))
        })
        .collect()
}

/// Start from a preset (NEUTRAL when none is named) and apply overrides.
pub fn build_profile(
    preset_name: Option<&str>,
    overrides: &[(Trait, f64)],
) -> Result<Persona, AssessmentError> {
    let name = preset_name.unwrap_or("NEUTRAL");
    let base = preset(name)
        .ok_or_else(|| AssessmentError::InvalidInput(format!("unknown preset '{}'", name)))?;

    Ok(Persona::from_scores(Trait::ALL.into_iter().map(|t| {
        let score = overrides
            .iter()
            .rev()
            .find(|(o, _)| *o == t)
            .map(|(_, v)| *v)
            .unwrap_or_else(|| base.score(t));
        (t, score)
    })))
}

/// Create the persona if needed, write all five traits and read the result back.
pub async fn seed_persona(
    client: &PersonaClient,
    user_id: &str,
    profile: &Persona,
) -> Result<Persona, AssessmentError> {
    client.create_persona(user_id, None).await?;

    for t in Trait::ALL {
        let value = profile.score(t);
        client.update_trait(user_id, t, value, None).await?;
        tracing::debug!(user_id, trait_name = t.name(), value, "Trait updated");
    }

    let stored = client.get_persona(user_id, None).await?;
    tracing::info!(user_id, traits = stored.len(), "Persona seeded");
    Ok(stored)
}
