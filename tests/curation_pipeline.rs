//! End-to-end curation flow over tables written to disk.
//!
//! tables on disk -> motion analysis -> classification -> split artifact
//! round-trip -> sampling policies -> subset extraction -> closure check.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use scene_forge::extract::{dangling_references, SubsetExtractor, VersionWriter};
use scene_forge::motion::{MotionAnalyzer, VelocityThresholds};
use scene_forge::split::{
    classify, RedundancyCategory, RedundancyCuts, RedundancySplit, SplitGranularity, SplitIndex,
    SplitRatios,
};
use scene_forge::tables::{TableKind, TableStore};

/// Writes a dataset of `(scene_name, samples, speed_mps)` scenes, one sample
/// per second, with one lidar capture and one annotation per sample.
fn write_dataset(dir: &Path, scenes: &[(String, usize, f64)]) {
    let mut scene_rows = Vec::new();
    let mut sample_rows = Vec::new();
    let mut sample_data_rows = Vec::new();
    let mut ego_pose_rows = Vec::new();
    let mut log_rows = Vec::new();
    let mut instance_rows = Vec::new();
    let mut annotation_rows = Vec::new();

    for (name, samples, speed) in scenes {
        let token = |i: usize| format!("{name}-s{i}");
        let link = |i: Option<usize>| i.map(token).unwrap_or_default();

        log_rows.push(json!({"token": format!("{name}-log"), "location": "singapore-onenorth"}));
        instance_rows.push(json!({"token": format!("{name}-inst"), "category_token": "cat-car"}));
        scene_rows.push(json!({
            "token": name,
            "name": name,
            "log_token": format!("{name}-log"),
            "nbr_samples": samples,
            "first_sample_token": token(0),
            "last_sample_token": token(samples - 1),
        }));

        for i in 0..*samples {
            let timestamp = i as i64 * 1_000_000;
            sample_rows.push(json!({
                "token": token(i),
                "timestamp": timestamp,
                "scene_token": name,
                "next": link(if i + 1 < *samples { Some(i + 1) } else { None }),
                "prev": link(i.checked_sub(1)),
                "data": {"LIDAR_TOP": format!("{name}-sd{i}")},
            }));
            ego_pose_rows.push(json!({
                "token": format!("{name}-ep{i}"),
                "timestamp": timestamp,
                "translation": [i as f64 * speed, 0.0, 0.0],
                "rotation": [1.0, 0.0, 0.0, 0.0],
            }));
            sample_data_rows.push(json!({
                "token": format!("{name}-sd{i}"),
                "sample_token": token(i),
                "ego_pose_token": format!("{name}-ep{i}"),
                "calibrated_sensor_token": "cs-lidar",
                "filename": format!("samples/LIDAR_TOP/{name}-{i}.pcd.bin"),
                "is_key_frame": true,
            }));
            annotation_rows.push(json!({
                "token": format!("{name}-ann{i}"),
                "sample_token": token(i),
                "instance_token": format!("{name}-inst"),
                "visibility_token": "4",
            }));
        }
    }

    let tables: [(&str, Value); 12] = [
        ("scene", Value::Array(scene_rows)),
        ("sample", Value::Array(sample_rows)),
        ("sample_data", Value::Array(sample_data_rows)),
        ("ego_pose", Value::Array(ego_pose_rows)),
        (
            "calibrated_sensor",
            json!([{"token": "cs-lidar", "sensor_token": "sensor-lidar", "translation": [0.9, 0.0, 1.8]}]),
        ),
        (
            "sensor",
            json!([{"token": "sensor-lidar", "channel": "LIDAR_TOP", "modality": "lidar"}]),
        ),
        ("log", Value::Array(log_rows)),
        ("category", json!([{"token": "cat-car", "name": "vehicle.car"}])),
        ("attribute", json!([{"token": "attr-moving", "name": "vehicle.moving"}])),
        ("visibility", json!([{"token": "4", "level": "v80-100"}])),
        ("instance", Value::Array(instance_rows)),
        ("sample_annotation", Value::Array(annotation_rows)),
    ];

    fs::create_dir_all(dir).expect("create dataset dir");
    for (table, rows) in tables {
        let raw = serde_json::to_string_pretty(&rows).expect("serialize table");
        fs::write(dir.join(format!("{table}.json")), raw).expect("write table");
    }
}

fn scenes(prefix: &str, count: usize, samples: usize, speed: f64) -> Vec<(String, usize, f64)> {
    (0..count)
        .map(|i| (format!("{prefix}-{i:04}"), samples, speed))
        .collect()
}

fn analyze(dir: &Path) -> RedundancySplit {
    let store = TableStore::load_motion_tables(dir).expect("load motion tables");
    let summaries = MotionAnalyzer::new(&store, VelocityThresholds::default())
        .analyze_all()
        .expect("analysis succeeds");
    classify(summaries, &RedundancyCuts::default())
}

#[test]
fn test_fast_scenes_are_low_redundancy() {
    let data = tempfile::tempdir().expect("tempdir");
    write_dataset(data.path(), &scenes("fast", 10, 5, 10.0));

    let split = analyze(data.path());
    assert_eq!(split.scenes(RedundancyCategory::Low).len(), 10);
    assert!(split.scenes(RedundancyCategory::High).is_empty());
    assert!(split.scenes(RedundancyCategory::Medium).is_empty());
    for scene in split.scenes(RedundancyCategory::Low) {
        assert_eq!(scene.num_samples, 5);
        assert_eq!(scene.avg_redundancy, 0.0);
        assert!((scene.avg_velocity - 10.0).abs() < 1e-9);
    }
}

#[test]
fn test_midpoint_speed_is_medium_redundancy() {
    let data = tempfile::tempdir().expect("tempdir");
    write_dataset(data.path(), &scenes("cruise", 10, 5, 3.0));

    let split = analyze(data.path());
    assert_eq!(split.scenes(RedundancyCategory::Medium).len(), 10);
    for scene in split.scenes(RedundancyCategory::Medium) {
        assert!((scene.avg_redundancy - 0.5).abs() < 1e-9);
    }
}

#[test]
fn test_full_curation_flow() {
    let data = tempfile::tempdir().expect("tempdir");
    let mut all = scenes("parked", 4, 6, 0.2);
    all.extend(scenes("cruise", 5, 5, 3.0));
    all.extend(scenes("fast", 6, 4, 12.0));
    write_dataset(data.path(), &all);

    // Classification covers every scene exactly once.
    let split = analyze(data.path());
    assert_eq!(split.total_scenes(), 15);
    assert_eq!(split.scenes(RedundancyCategory::High).len(), 4);
    assert_eq!(split.scenes(RedundancyCategory::Medium).len(), 5);
    assert_eq!(split.scenes(RedundancyCategory::Low).len(), 6);

    // Both artifact forms load back to the same split.
    let out = tempfile::tempdir().expect("tempdir");
    let saved = split.save_all(out.path()).expect("save artifacts");
    assert_eq!(RedundancySplit::load(&saved.json).expect("load json"), split);
    assert_eq!(RedundancySplit::load(&saved.binary).expect("load bin"), split);
    let low_list = fs::read_to_string(out.path().join("low_redundancy_sample_tokens.txt"))
        .expect("token list");
    assert_eq!(low_list.lines().count(), 24);

    let index = SplitIndex::load(&saved.binary).expect("index");
    assert_eq!(index.sample_count(RedundancyCategory::High), 24);
    assert_eq!(index.sample_count(RedundancyCategory::Medium), 25);
    assert_eq!(index.balanced_subset(3).len(), 3 * 24);

    // Scene-level split never shares a scene across partitions.
    let partition = index
        .scene_train_val_test_split(&SplitRatios::default(), 11, SplitGranularity::Scene)
        .expect("valid ratios");
    assert_eq!(partition.total(), 73);
    let scene_of = |token: &String| token.rsplit_once("-s").map(|(scene, _)| scene.to_string());
    let train_scenes: HashSet<_> = partition.train.iter().filter_map(scene_of).collect();
    let val_scenes: HashSet<_> = partition.val.iter().filter_map(scene_of).collect();
    let test_scenes: HashSet<_> = partition.test.iter().filter_map(scene_of).collect();
    assert!(train_scenes.is_disjoint(&val_scenes));
    assert!(train_scenes.is_disjoint(&test_scenes));
    assert!(val_scenes.is_disjoint(&test_scenes));

    // Extracting the low category yields a closed version.
    let store = TableStore::load(data.path()).expect("load all tables");
    let extractor = SubsetExtractor::new(&store);
    let low = extractor.extract(&index.samples_in(RedundancyCategory::Low));
    assert!(dangling_references(&low.tables).is_empty());
    assert_eq!(low.tables.scene.len(), 6);
    assert_eq!(low.tables.log.len(), 6);
    assert_eq!(low.tables.sample_annotation.len(), 24);
    assert_eq!(low.tables.category.len(), 1);

    let versions = tempfile::tempdir().expect("tempdir");
    let low_statistics =
        index.selection_statistics(low.tables.sample.rows().iter().map(|s| s.token.as_str()));
    assert_eq!(low_statistics[2].category, RedundancyCategory::Low);
    assert_eq!(low_statistics[2].num_scenes, 6);
    assert_eq!(low_statistics[2].num_samples, 24);
    let written = VersionWriter::new(versions.path())
        .write("v1.0-low-redundancy", "categories [low_redundancy]", &low_statistics, &low)
        .expect("write version");
    let version_report = fs::read_to_string(&written.report_path).expect("version report");
    assert!(version_report.contains("mean velocity=12.00 m/s"));
    let reloaded = TableStore::load(&written.tables_dir).expect("reload version");
    assert!(dangling_references(&reloaded).is_empty());
    assert_eq!(reloaded.sample.rows(), low.tables.sample.rows());

    // The full sample set reproduces every table.
    let everything: Vec<String> = store.sample.rows().iter().map(|s| s.token.clone()).collect();
    let full = extractor.extract(&everything);
    assert_eq!(full.report.total_skipped(), 0);
    for kind in TableKind::ALL {
        assert_eq!(full.tables.row_count(kind), store.row_count(kind), "{kind}");
    }
    assert_eq!(full.tables.sample_data.rows(), store.sample_data.rows());
    assert_eq!(full.tables.ego_pose.rows(), store.ego_pose.rows());
}
