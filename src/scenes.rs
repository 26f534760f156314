//! Scene snapshots: the active effect (type + config) of each virtual,
//! captured at a point in time and replayable later.
//!
//! A scene stores setups, not generator state: replay re-instantiates
//! each generator from its recorded type and config through the normal
//! `set_effect` path.

use crate::effects::EffectSetup;
use crate::events::{EventTx, PipelineEvent};
use crate::virtuals::Virtual;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: String,
    /// `None` means the virtual had no active effect when captured;
    /// replaying clears its effect. Virtuals not listed at all are
    /// left untouched.
    pub virtual_effects: HashMap<String, Option<EffectSetup>>,
}

/// Record the current effect of each requested virtual. Ids that do
/// not exist in the registry are silently dropped from the snapshot.
pub fn capture(
    id: String,
    name: String,
    virtual_ids: &[String],
    virtuals: &BTreeMap<String, Virtual>,
) -> Scene {
    let virtual_effects = virtual_ids
        .iter()
        .filter_map(|virtual_id| {
            let virt = virtuals.get(virtual_id)?;
            Some((virtual_id.clone(), virt.effect_setup().cloned()))
        })
        .collect();
    Scene {
        id,
        name,
        virtual_effects,
    }
}

/// Restore a snapshot. Partial-failure semantics: a virtual that has
/// been deleted since capture, or an effect that no longer binds, is
/// skipped with a warning and the rest of the scene still applies.
pub fn replay(scene: &Scene, virtuals: &mut BTreeMap<String, Virtual>, events: &EventTx) {
    info!(scene_id = %scene.id, "activating scene");
    for (virtual_id, entry) in &scene.virtual_effects {
        let Some(virt) = virtuals.get_mut(virtual_id) else {
            warn!(scene_id = %scene.id, virtual_id = %virtual_id, "virtual missing, skipping");
            continue;
        };
        match entry {
            Some(setup) => {
                if let Err(e) = virt.set_effect(setup.clone()) {
                    warn!(
                        scene_id = %scene.id,
                        virtual_id = %virtual_id,
                        error = %e,
                        "scene effect failed to bind, skipping"
                    );
                    continue;
                }
            }
            None => virt.clear_effect(),
        }
        events.emit(PipelineEvent::EffectChanged {
            virtual_id: virtual_id.clone(),
        });
    }
    events.emit(PipelineEvent::SceneActivated {
        scene_id: scene.id.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::types::{Segment, VirtualConfig};
    use serde_json::json;

    fn strip(id: &str) -> Virtual {
        Virtual::from_config(VirtualConfig {
            id: id.into(),
            name: id.into(),
            segments: vec![Segment {
                device_id: "dev".into(),
                start: 0,
                end: 9,
                reversed: false,
            }],
            auto_generated: false,
        })
    }

    fn setup(color: &str) -> EffectSetup {
        EffectSetup {
            effect_type: "single_color".into(),
            config: json!({ "color": color }),
        }
    }

    #[test]
    fn capture_replay_round_trips_effects() {
        let mut virtuals = BTreeMap::new();
        virtuals.insert("v1".to_string(), strip("v1"));
        virtuals.insert("v2".to_string(), strip("v2"));
        virtuals.insert("v3".to_string(), strip("v3"));
        virtuals.get_mut("v1").unwrap().set_effect(setup("#ff0000")).unwrap();
        virtuals.get_mut("v2").unwrap().set_effect(setup("#00ff00")).unwrap();

        let ids: Vec<String> = ["v1", "v2", "v3"].iter().map(|s| s.to_string()).collect();
        let scene = capture("s1".into(), "party".into(), &ids, &virtuals);
        assert_eq!(scene.virtual_effects.len(), 3);
        assert_eq!(scene.virtual_effects["v3"], None);

        for virt in virtuals.values_mut() {
            virt.clear_effect();
        }

        let (events, _rx) = event_channel();
        replay(&scene, &mut virtuals, &events);
        assert_eq!(
            virtuals["v1"].effect_setup(),
            Some(&setup("#ff0000"))
        );
        assert_eq!(
            virtuals["v2"].effect_setup(),
            Some(&setup("#00ff00"))
        );
        assert_eq!(virtuals["v3"].effect_setup(), None);
    }

    #[test]
    fn replay_skips_deleted_virtuals() {
        let mut virtuals = BTreeMap::new();
        virtuals.insert("v1".to_string(), strip("v1"));
        virtuals.insert("gone".to_string(), strip("gone"));
        virtuals.get_mut("v1").unwrap().set_effect(setup("#0000ff")).unwrap();
        virtuals.get_mut("gone").unwrap().set_effect(setup("#123456")).unwrap();

        let ids: Vec<String> = ["v1", "gone"].iter().map(|s| s.to_string()).collect();
        let scene = capture("s1".into(), "partial".into(), &ids, &virtuals);

        virtuals.remove("gone");
        virtuals.get_mut("v1").unwrap().clear_effect();

        let (events, rx) = event_channel();
        replay(&scene, &mut virtuals, &events);
        assert_eq!(virtuals["v1"].effect_setup(), Some(&setup("#0000ff")));
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, PipelineEvent::SceneActivated { ref scene_id } if scene_id == "s1")));
    }

    #[test]
    fn capture_drops_unknown_virtual_ids() {
        let virtuals = BTreeMap::new();
        let scene = capture(
            "s".into(),
            "empty".into(),
            &["nope".to_string()],
            &virtuals,
        );
        assert!(scene.virtual_effects.is_empty());
    }

    #[test]
    fn scene_serializes_round_trip() {
        let mut virtual_effects = HashMap::new();
        virtual_effects.insert("v1".to_string(), Some(setup("#abcdef")));
        virtual_effects.insert("v2".to_string(), None);
        let scene = Scene {
            id: "s".into(),
            name: "n".into(),
            virtual_effects,
        };
        let text = serde_json::to_string(&scene).unwrap();
        let back: Scene = serde_json::from_str(&text).unwrap();
        assert_eq!(back, scene);
    }
}
