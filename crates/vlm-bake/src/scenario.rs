use crate::types::{LightCollection, LightingScenario, ScenarioKind};

/// Name of the always present world lighting scenario.
pub const ENVIRONMENT: &str = "Environment";

fn strip_prefix(name: &str) -> &str {
    name.strip_prefix("VLM.").unwrap_or(name)
}

/// Material names of a scenario, one per render group.
pub fn scenario_materials(scenario: &str, n_groups: usize) -> Vec<String> {
    (0..n_groups)
        .map(|g| format!("VLM.{}.RG{}", scenario, g))
        .collect()
}

/// Lighting scenarios to bake: the environment first, then the light
/// collections in order. Hidden and empty collections are skipped.
pub fn derive_scenarios(collections: &[LightCollection], n_groups: usize) -> Vec<LightingScenario> {
    let mut scenarios = vec![LightingScenario {
        name: ENVIRONMENT.to_string(),
        kind: ScenarioKind::Solid,
        light_collection: None,
        lights: Vec::new(),
        materials: scenario_materials(ENVIRONMENT, n_groups),
        aoi: None,
    }];

    for collection in collections {
        if collection.hidden || collection.lights.is_empty() {
            log::debug!("Skipping light collection {}", collection.name);
            continue;
        }
        let collection_name = strip_prefix(&collection.name);
        let lightmap = |name: String, lights: Vec<String>| LightingScenario {
            materials: scenario_materials(&name, n_groups),
            name,
            kind: ScenarioKind::Lightmap,
            light_collection: Some(collection.name.clone()),
            lights,
            aoi: collection.aoi,
        };
        if collection.group_mode {
            scenarios.push(lightmap(collection_name.to_string(), collection.lights.clone()));
        } else {
            for light in &collection.lights {
                let name = format!("{} - {}", collection_name, strip_prefix(light));
                scenarios.push(lightmap(name, vec![light.clone()]));
            }
        }
    }
    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(name: &str, lights: &[&str], group_mode: bool) -> LightCollection {
        LightCollection {
            name: name.to_string(),
            lights: lights.iter().map(|l| l.to_string()).collect(),
            group_mode,
            hidden: false,
            aoi: None,
        }
    }

    #[test]
    fn test_environment_first() {
        let scenarios = derive_scenarios(&[], 2);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "Environment");
        assert_eq!(scenarios[0].kind, ScenarioKind::Solid);
        assert_eq!(scenarios[0].materials, vec!["VLM.Environment.RG0", "VLM.Environment.RG1"]);
    }

    #[test]
    fn test_group_and_split_modes() {
        let scenarios = derive_scenarios(
            &[
                collection("VLM.GI", &["Lamp.1", "Lamp.2"], true),
                collection("Inserts", &["L1", "VLM.L2"], false),
            ],
            1,
        );
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Environment", "GI", "Inserts - L1", "Inserts - L2"]);
        assert!(scenarios[1].is_lightmap());
        assert_eq!(scenarios[1].lights.len(), 2);
        assert_eq!(scenarios[3].lights, vec!["VLM.L2".to_string()]);
        assert_eq!(scenarios[2].materials, vec!["VLM.Inserts - L1.RG0"]);
        assert_eq!(scenarios[2].light_collection.as_deref(), Some("Inserts"));
    }

    #[test]
    fn test_hidden_and_empty_skipped() {
        let mut hidden = collection("Flashers", &["F1"], true);
        hidden.hidden = true;
        let scenarios = derive_scenarios(&[hidden, collection("Empty", &[], true)], 1);
        assert_eq!(scenarios.len(), 1);
    }
}
