use keyrig_core::{
    data::QUAT_IDENTITY,
    exchange::parse_animation_json,
    generate_animation_json,
    keying::{set_keyframe, KeyingParams},
    remove_at_time, sample_bone, upsert, BoneInfo, BoneTransform, Config, EditorError, Keyframe,
    LivePose, Quat, Skeleton, TrackStore,
};
use std::f64::consts::FRAC_1_SQRT_2;

const TOL: f64 = 1e-4;

fn approx(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn approx_quat(a: Quat, b: Quat, eps: f64) {
    for i in 0..4 {
        approx(a[i], b[i], eps);
    }
}

fn about_y(angle: f64) -> Quat {
    [0.0, (angle * 0.5).sin(), 0.0, (angle * 0.5).cos()]
}

fn skeleton(names: &[&str]) -> Skeleton {
    Skeleton::new(
        names
            .iter()
            .map(|n| BoneInfo {
                name: n.to_string(),
                rest: BoneTransform::IDENTITY,
            })
            .collect(),
    )
}

#[test]
fn interpolation_holds_rest_then_slerps_then_holds_last() {
    let half_turn_y = [0.0, 1.0, 0.0, 0.0];
    let mut store = TrackStore::new();
    store.upsert("Arm", Keyframe::rotation(1.0, QUAT_IDENTITY), TOL);
    store.upsert("Arm", Keyframe::rotation(3.0, half_turn_y), TOL);

    // Rest pose tilted about X so "held rest" is distinguishable from "held first key".
    let s = (0.25f64).sin();
    let rest = BoneTransform::new([0.0, 2.0, 0.0], [s, 0.0, 0.0, (0.25f64).cos()]);

    let at0 = sample_bone(&store, "Arm", 0.0, rest);
    assert_eq!(at0.quaternion, rest.quaternion);
    assert_eq!(at0.position, rest.position);

    let at1 = sample_bone(&store, "Arm", 1.0, rest);
    assert_eq!(at1.quaternion, QUAT_IDENTITY);

    let at2 = sample_bone(&store, "Arm", 2.0, rest);
    approx_quat(at2.quaternion, [0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2], 1e-9);

    let at5 = sample_bone(&store, "Arm", 5.0, rest);
    assert_eq!(at5.quaternion, half_turn_y);
}

#[test]
fn upsert_is_idempotent_and_keeps_sort_invariant() {
    let ops: &[(f64, bool)] = &[
        (2.0, true),
        (0.0, true),
        (1.00004, true),
        (1.0, true),
        (3.5, true),
        (2.00001, false),
        (0.5, true),
        (0.0, false),
    ];
    let mut track: Vec<Keyframe> = Vec::new();
    for &(t, insert) in ops {
        track = if insert {
            upsert(&track, Keyframe::rotation(t, QUAT_IDENTITY), TOL)
        } else {
            remove_at_time(&track, t, TOL)
        };
        for pair in track.windows(2) {
            assert!(pair[1].time - pair[0].time >= TOL, "{track:?}");
        }
    }
    let times: Vec<f64> = track.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.5, 1.0, 3.5]);

    let kf = Keyframe::new(1.5, Some([1.0, 2.0, 3.0]), Some(about_y(0.3)));
    let once = upsert(&track, kf.clone(), TOL);
    let twice = upsert(&once, kf, TOL);
    assert_eq!(once, twice);
}

#[test]
fn upsert_merges_channels_within_tolerance() {
    let track = upsert(&[], Keyframe::position(1.0, [1.0, 1.0, 1.0]), TOL);
    let track = upsert(&track, Keyframe::rotation(1.00005, about_y(1.0)), TOL);
    assert_eq!(track.len(), 1);
    assert_eq!(track[0].position, Some([1.0, 1.0, 1.0]));
    assert_eq!(track[0].rotation, Some(about_y(1.0)));
}

#[test]
fn json_round_trip_preserves_store() {
    let sk = skeleton(&["Arm", "Leg", "mixamorig:Head"]);
    let mut store = TrackStore::new();
    store.upsert(
        "Arm",
        Keyframe::new(0.0, Some([0.1, 0.2, 0.3]), Some(QUAT_IDENTITY)),
        TOL,
    );
    store.upsert(
        "Arm",
        Keyframe::new(1.2345, Some([0.4, 0.5, 0.6]), Some(about_y(0.7))),
        TOL,
    );
    store.upsert(
        "mixamorig:Head",
        Keyframe::new(0.5, Some([0.0, 1.0, 0.0]), Some(about_y(-2.0))),
        TOL,
    );

    let json = generate_animation_json("Round", 2.5, &store).unwrap();
    let (back, report) = parse_animation_json(&json, &sk, &Config::default()).unwrap();
    assert_eq!(report.name, "Round");
    assert_eq!(report.duration, 2.5);
    assert!(report.warning().is_none());
    assert_eq!(back.bones(), store.bones());

    for (bone, keys) in store.iter() {
        let other = back.track(bone).unwrap();
        assert_eq!(keys.len(), other.len());
        for (a, b) in keys.iter().zip(other) {
            approx(a.time, b.time, 1e-4);
            for (x, y) in a.position.unwrap().iter().zip(b.position.unwrap()) {
                approx(*x, y, 1e-6);
            }
            approx_quat(a.rotation.unwrap(), b.rotation.unwrap(), 1e-6);
        }
    }
}

#[test]
fn companion_keyed_only_above_epsilon() {
    let sk = skeleton(&["A", "B"]);
    let params = KeyingParams::default();

    for (theta, expect_companion) in [(0.0011, true), (0.0009, false), (0.0, false)] {
        let mut live = LivePose::new();
        live.insert("A", BoneTransform::IDENTITY);
        live.insert("B", BoneTransform::new([0.0; 3], about_y(theta)));
        let (store, outcome) =
            set_keyframe("A", 1.0, [0.0; 3], &TrackStore::new(), &live, &sk, params);
        assert!(store.contains_bone("A"));
        assert_eq!(store.contains_bone("B"), expect_companion, "theta={theta}");
        assert_eq!(outcome.companions().len(), usize::from(expect_companion));
    }
}

#[test]
fn companion_compares_against_pre_update_curve() {
    let sk = skeleton(&["A", "B"]);
    let mut store = TrackStore::new();
    store.upsert("B", Keyframe::rotation(0.0, QUAT_IDENTITY), TOL);
    store.upsert("B", Keyframe::rotation(2.0, about_y(1.0)), TOL);

    // B's live pose sits exactly on its curve at t=1: no companion key.
    let mut live = LivePose::new();
    live.insert("A", BoneTransform::IDENTITY);
    live.insert("B", BoneTransform::new([0.0; 3], about_y(0.5)));
    let (next, outcome) = set_keyframe(
        "A",
        1.0,
        [0.0, 45.0, 0.0],
        &store,
        &live,
        &sk,
        KeyingParams::default(),
    );
    assert!(outcome.companions().is_empty());
    assert_eq!(next.keyframe_count("B"), 2);

    // Posed away from the curve: keyed with the live value.
    live.insert("B", BoneTransform::new([0.0, 3.0, 0.0], about_y(0.2)));
    let (next, outcome) = set_keyframe(
        "A",
        1.0,
        [0.0, 45.0, 0.0],
        &store,
        &live,
        &sk,
        KeyingParams::default(),
    );
    assert_eq!(outcome.keyed, vec!["A".to_string(), "B".to_string()]);
    let b = next.track("B").unwrap();
    assert_eq!(b.len(), 3);
    assert_eq!(b[1].time, 1.0);
    assert_eq!(b[1].position, Some([0.0, 3.0, 0.0]));
    assert_eq!(b[1].rotation, Some(about_y(0.2)));
}

#[test]
fn removing_only_key_prunes_bone() {
    let mut store = TrackStore::new();
    store.upsert("Arm", Keyframe::rotation(0.5, QUAT_IDENTITY), TOL);
    store.upsert("Leg", Keyframe::rotation(0.5, QUAT_IDENTITY), TOL);
    assert!(store.remove_at_time("Arm", 0.50005, TOL));
    assert!(!store.contains_bone("Arm"));
    assert_eq!(store.bones(), vec!["Leg"]);

    let json = serde_json::to_value(&store).unwrap();
    assert!(json.get("Arm").is_none());
}

#[test]
fn export_arm_scenario() {
    let mut store = TrackStore::new();
    store.upsert("Arm", Keyframe::rotation(0.0, QUAT_IDENTITY), TOL);
    store.upsert("Arm", Keyframe::rotation(2.0, [0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2]), TOL);

    let json = generate_animation_json("Arm Raise", 2.0, &store).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(doc["name"], "Arm Raise");
    assert_eq!(doc["duration"], 2.0);
    let tracks = doc["tracks"].as_array().unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0]["name"], "Arm.quaternion");
    assert_eq!(tracks[0]["type"], "quaternion");
    assert_eq!(tracks[0]["times"], serde_json::json!([0.0, 2.0]));
    let values: Vec<f64> = tracks[0]["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(values.len(), 8);
    assert_eq!(
        values,
        vec![0.0, 0.0, 0.0, 1.0, 0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2]
    );
}

#[test]
fn delete_miss_leaves_track_unchanged() {
    let mut store = TrackStore::new();
    store.upsert("Arm", Keyframe::rotation(0.0, QUAT_IDENTITY), TOL);
    store.upsert("Arm", Keyframe::rotation(2.0, about_y(1.0)), TOL);
    let before = store.clone();

    assert!(!store.remove_at_time("Arm", 1.0, TOL));
    assert!(!store.remove_at_time("Arm", 2.0 + 2.0 * TOL, TOL));
    assert_eq!(store, before);

    let track = before.track("Arm").unwrap();
    assert_eq!(remove_at_time(track, 1.0, TOL), track.to_vec());
}

#[test]
fn import_reports_are_distinct_from_errors() {
    let sk = skeleton(&["Arm"]);
    let err = parse_animation_json(
        r#"{ "name": "x", "duration": 1, "tracks": [
            { "name": "Ghost.quaternion", "type": "quaternion", "times": [0], "values": [0,0,0,1] },
            { "name": "Ghost2.position", "type": "vector", "times": [0], "values": [0,0,0] }
        ] }"#,
        &sk,
        &Config::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        EditorError::NoCompatibleTracks {
            skipped_bones: vec!["Ghost".into(), "Ghost2".into()]
        }
    );
    assert_eq!(err.category(), "validation");
}
