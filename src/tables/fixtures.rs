//! Synthetic dataset builder for unit tests.

use std::collections::BTreeMap;

use serde_json::{json, Map};

use super::records::{
    CalibratedSensor, EgoPose, Instance, Log, Sample, SampleAnnotation, SampleData, Scene, Sensor,
    VocabularyEntry,
};
use super::store::TableStore;
use super::table::{Table, TableKind};

/// Builds small, fully consistent datasets.
///
/// Every scene gets its own log; every sample gets a `LIDAR_TOP` and a
/// `CAM_FRONT` capture, each with its own ego pose sharing the sample's
/// position along the x axis. Two sensors and their calibrations are shared.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    scenes: Vec<(String, Vec<(i64, f64)>)>,
    annotations: bool,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scene whose samples are `(timestamp_us, x_position)` steps.
    pub fn scene(mut self, name: &str, steps: &[(i64, f64)]) -> Self {
        self.scenes.push((name.to_string(), steps.to_vec()));
        self
    }

    /// Adds `count` scenes of `samples` samples moving at `speed` m/s with
    /// one sample per second.
    pub fn uniform_scenes(mut self, prefix: &str, count: usize, samples: usize, speed: f64) -> Self {
        for scene_index in 0..count {
            let steps: Vec<(i64, f64)> = (0..samples)
                .map(|i| (i as i64 * 1_000_000, i as f64 * speed))
                .collect();
            self.scenes.push((format!("{prefix}-{scene_index}"), steps));
        }
        self
    }

    /// Gives every sample one annotation of a per-scene instance.
    pub fn with_annotations(mut self) -> Self {
        self.annotations = true;
        self
    }

    pub fn build(self) -> TableStore {
        let mut scenes = Vec::new();
        let mut samples = Vec::new();
        let mut sample_data = Vec::new();
        let mut ego_poses = Vec::new();
        let mut logs = Vec::new();
        let mut instances = Vec::new();
        let mut annotations = Vec::new();

        for (name, steps) in &self.scenes {
            let sample_token = |i: usize| format!("{name}-s{i}");
            let link = |i: Option<usize>| i.map(sample_token).unwrap_or_default();

            logs.push(Log {
                token: format!("{name}-log"),
                extra: object(json!({"location": "boston-seaport"})),
            });
            scenes.push(Scene {
                token: name.clone(),
                name: name.clone(),
                log_token: format!("{name}-log"),
                first_sample_token: if steps.is_empty() {
                    String::new()
                } else {
                    sample_token(0)
                },
                last_sample_token: steps
                    .len()
                    .checked_sub(1)
                    .map(sample_token)
                    .unwrap_or_default(),
                extra: object(json!({"nbr_samples": steps.len()})),
            });
            if self.annotations {
                instances.push(Instance {
                    token: format!("{name}-inst"),
                    extra: object(json!({"category_token": "cat-car"})),
                });
            }

            for (i, &(timestamp, x)) in steps.iter().enumerate() {
                let token = sample_token(i);
                let lidar = format!("{name}-sd{i}");
                let camera = format!("{name}-cam{i}");

                let mut data = BTreeMap::new();
                data.insert("LIDAR_TOP".to_string(), lidar.clone());
                data.insert("CAM_FRONT".to_string(), camera.clone());

                samples.push(Sample {
                    token: token.clone(),
                    timestamp,
                    scene_token: name.clone(),
                    next: link(if i + 1 < steps.len() { Some(i + 1) } else { None }),
                    prev: link(i.checked_sub(1)),
                    data,
                    extra: Map::new(),
                });

                for (capture, sensor, suffix) in [
                    (&lidar, "cs-lidar", "ep"),
                    (&camera, "cs-cam", "epc"),
                ] {
                    let pose = format!("{name}-{suffix}{i}");
                    ego_poses.push(EgoPose {
                        token: pose.clone(),
                        translation: [x, 0.0, 0.0],
                        rotation: [1.0, 0.0, 0.0, 0.0],
                        extra: object(json!({"timestamp": timestamp})),
                    });
                    sample_data.push(SampleData {
                        token: capture.clone(),
                        sample_token: token.clone(),
                        ego_pose_token: pose,
                        calibrated_sensor_token: sensor.to_string(),
                        filename: format!("samples/{sensor}/{capture}.bin"),
                        extra: object(json!({"is_key_frame": true})),
                    });
                }

                if self.annotations {
                    annotations.push(SampleAnnotation {
                        token: format!("{token}-ann"),
                        sample_token: token.clone(),
                        instance_token: format!("{name}-inst"),
                        extra: object(json!({"visibility_token": "vis-1"})),
                    });
                }
            }
        }

        let mut store = TableStore::empty();
        store.scene = Table::new(TableKind::Scene, scenes);
        store.sample = Table::new(TableKind::Sample, samples);
        store.sample_data = Table::new(TableKind::SampleData, sample_data);
        store.ego_pose = Table::new(TableKind::EgoPose, ego_poses);
        store.calibrated_sensor = Table::new(
            TableKind::CalibratedSensor,
            vec![
                CalibratedSensor {
                    token: "cs-lidar".to_string(),
                    sensor_token: "sensor-lidar".to_string(),
                    extra: Map::new(),
                },
                CalibratedSensor {
                    token: "cs-cam".to_string(),
                    sensor_token: "sensor-cam".to_string(),
                    extra: Map::new(),
                },
            ],
        );
        store.sensor = Table::new(
            TableKind::Sensor,
            vec![
                Sensor {
                    token: "sensor-lidar".to_string(),
                    extra: object(json!({"channel": "LIDAR_TOP", "modality": "lidar"})),
                },
                Sensor {
                    token: "sensor-cam".to_string(),
                    extra: object(json!({"channel": "CAM_FRONT", "modality": "camera"})),
                },
            ],
        );
        store.log = Table::new(TableKind::Log, logs);
        store.category = Table::new(TableKind::Category, vec![vocabulary("cat-car")]);
        store.attribute = Table::new(TableKind::Attribute, vec![vocabulary("attr-moving")]);
        store.visibility = Table::new(TableKind::Visibility, vec![vocabulary("vis-1")]);
        store.instance = Table::new(TableKind::Instance, instances);
        store.sample_annotation = Table::new(TableKind::SampleAnnotation, annotations);
        store.annotations_present = self.annotations;
        store
    }
}

fn vocabulary(token: &str) -> VocabularyEntry {
    VocabularyEntry {
        token: token.to_string(),
        extra: object(json!({"name": token})),
    }
}

fn object(value: serde_json::Value) -> Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Map::new(),
    }
}
