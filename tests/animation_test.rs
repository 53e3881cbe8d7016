use cgmath::{assert_abs_diff_eq, Deg, InnerSpace, Quaternion, Rotation3, Vector3};
use polysketch::{
    animation::{
        random_clip, random_pose, Animation, AnimationClip, AnimationError, Bone, Keyframes,
        Sample, Skeleton, SkinnedPoints, RANDOM_MAX_ANGLE, RANDOM_MAX_OFFSET,
    },
    data_structures::instance::Instance,
};

#[test]
fn should_require_parents_before_children() {
    let err = Skeleton::new(vec![
        Bone::new("root", None, Instance::new()),
        Bone::new("arm", Some(2), Instance::new()),
        Bone::new("hand", Some(1), Instance::new()),
    ])
    .unwrap_err();
    assert_eq!(err, AnimationError::InvalidParent { bone: 1, parent: 2 });

    let skeleton = Skeleton::new(vec![
        Bone::new("root", None, Instance::new()),
        Bone::new("arm", Some(0), Instance::from(Vector3::new(1.0, 0.0, 0.0))),
    ])
    .unwrap();
    assert_eq!(skeleton.len(), 2);
    assert_eq!(skeleton.find("arm"), Some(1));
    assert_eq!(skeleton.find("leg"), None);
}

#[test]
fn should_chain_world_transforms() {
    let skeleton = Skeleton::chain(3, 1.0);
    assert_eq!(skeleton.bones()[2].name, "bone2");
    let rest = skeleton.world_transforms(&skeleton.rest_pose()).unwrap();
    assert_abs_diff_eq!(rest[2].position, Vector3::new(0.0, 2.0, 0.0));

    let mut pose = skeleton.rest_pose();
    pose[0].rotation = Quaternion::from_angle_z(Deg(90.0));
    let world = skeleton.world_transforms(&pose).unwrap();
    assert_abs_diff_eq!(world[2].position, Vector3::new(-2.0, 0.0, 0.0), epsilon = 1e-5);

    assert_eq!(
        skeleton.world_transforms(&pose[..2]).unwrap_err(),
        AnimationError::PoseSize {
            expected: 3,
            got: 2
        }
    );
}

#[test]
fn should_validate_clip_keyframes() {
    assert_eq!(
        AnimationClip::new(
            "bad",
            vec![0.0, 1.0],
            Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0)])
        )
        .unwrap_err(),
        AnimationError::LengthMismatch {
            timestamps: 2,
            keyframes: 1
        }
    );
    assert_eq!(
        AnimationClip::new(
            "bad",
            vec![0.0, 2.0, 1.0],
            Keyframes::Scale(vec![Vector3::new(1.0, 1.0, 1.0); 3])
        )
        .unwrap_err(),
        AnimationError::UnsortedTimestamps(2)
    );
}

#[test]
fn should_sample_between_keyframes() {
    let clip = AnimationClip::new(
        "slide",
        vec![1.0, 2.0, 4.0],
        Keyframes::Translation(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(2.0, 4.0, 0.0),
        ]),
    )
    .unwrap();
    assert_eq!(clip.duration(), 3.0);
    let at = |t| match clip.sample(t) {
        Some(Sample::Translation(v)) => v,
        other => panic!("unexpected sample {other:?}"),
    };
    assert_abs_diff_eq!(at(0.0), Vector3::new(0.0, 0.0, 0.0));
    assert_abs_diff_eq!(at(1.5), Vector3::new(1.0, 0.0, 0.0));
    assert_abs_diff_eq!(at(3.0), Vector3::new(2.0, 2.0, 0.0));
    assert_abs_diff_eq!(at(9.0), Vector3::new(2.0, 4.0, 0.0));
    assert_abs_diff_eq!(at(f32::NAN), Vector3::new(0.0, 0.0, 0.0));
    assert_abs_diff_eq!(at(f32::NEG_INFINITY), Vector3::new(0.0, 0.0, 0.0));
    assert_abs_diff_eq!(at(f32::INFINITY), Vector3::new(2.0, 4.0, 0.0));

    let spin = AnimationClip::new(
        "spin",
        vec![0.0, 1.0],
        Keyframes::Rotation(vec![
            Quaternion::from_angle_y(Deg(0.0)),
            Quaternion::from_angle_y(Deg(90.0)),
        ]),
    )
    .unwrap();
    let Some(Sample::Rotation(q)) = spin.sample(0.5) else {
        panic!("expected a rotation");
    };
    let expected: Quaternion<f32> = Quaternion::from_angle_y(Deg(45.0));
    assert_abs_diff_eq!(q, expected, epsilon = 1e-5);

    let other = AnimationClip::new("weights", vec![0.0], Keyframes::Other).unwrap();
    assert_eq!(other.sample(0.0), None);
    let empty = AnimationClip::new("empty", vec![], Keyframes::Scale(vec![])).unwrap();
    assert_eq!(empty.sample(0.0), None);
    assert_eq!(empty.duration(), 0.0);
}

#[test]
fn should_pose_skeleton_from_channels() {
    let skeleton = Skeleton::chain(2, 1.0);
    let lift = AnimationClip::new(
        "lift",
        vec![0.0, 2.0],
        Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 2.0, 0.0)]),
    )
    .unwrap();
    let animation = Animation {
        name: "lift".to_string(),
        channels: vec![(0, lift.clone())],
    };
    assert_eq!(animation.duration(), 2.0);
    let pose = animation.pose_at(&skeleton, 1.0).unwrap();
    assert_abs_diff_eq!(pose[0].position, Vector3::new(0.0, 1.0, 0.0));
    // bones without a channel keep their rest transform
    assert_eq!(pose[1], skeleton.rest_pose()[1]);

    let broken = Animation {
        name: "broken".to_string(),
        channels: vec![(5, lift)],
    };
    assert_eq!(
        broken.pose_at(&skeleton, 0.0).unwrap_err(),
        AnimationError::UnknownBone(5)
    );
}

#[test]
fn should_generate_reproducible_random_poses() {
    let skeleton = Skeleton::chain(4, 0.5);
    let a = random_pose(&skeleton, 11, RANDOM_MAX_ANGLE, RANDOM_MAX_OFFSET);
    let b = random_pose(&skeleton, 11, RANDOM_MAX_ANGLE, RANDOM_MAX_OFFSET);
    let c = random_pose(&skeleton, 12, RANDOM_MAX_ANGLE, RANDOM_MAX_OFFSET);
    assert_eq!(a, b);
    assert_ne!(a, c);

    for (posed, bone) in a.iter().zip(skeleton.bones()) {
        let shift = posed.position - bone.rest.position;
        assert!(shift.x.abs() <= RANDOM_MAX_OFFSET + 1e-6);
        assert!(shift.y.abs() <= RANDOM_MAX_OFFSET + 1e-6);
        assert!(shift.z.abs() <= RANDOM_MAX_OFFSET + 1e-6);
        assert_abs_diff_eq!(posed.rotation.magnitude(), 1.0, epsilon = 1e-5);
        assert_eq!(posed.scale, bone.rest.scale);
    }

    let still = random_pose(&skeleton, 11, Deg(0.0), 0.0);
    assert_eq!(still, skeleton.rest_pose());
}

#[test]
fn should_build_random_clip_over_all_bones() {
    let skeleton = Skeleton::chain(3, 1.0);
    let animation = random_clip(&skeleton, 5, 2.0, 3);
    assert_eq!(animation.name, "random-3");
    assert_eq!(animation.channels.len(), 6);
    assert_eq!(animation.duration(), 2.0);
    assert_eq!(animation.channels[1].1.name, "bone0.rotation");
    assert_eq!(animation.channels[0].1.timestamps, vec![0.0, 0.5, 1.0, 1.5, 2.0]);

    // the first frame is the pose drawn first from the same seed
    let first = random_pose(&skeleton, 3, RANDOM_MAX_ANGLE, RANDOM_MAX_OFFSET);
    let pose = animation.pose_at(&skeleton, 0.0).unwrap();
    for (sampled, expected) in pose.iter().zip(&first) {
        assert_abs_diff_eq!(sampled.position, expected.position, epsilon = 1e-6);
        assert_abs_diff_eq!(sampled.rotation, expected.rotation, epsilon = 1e-5);
    }
}

#[test]
fn should_move_points_with_their_bones() {
    let skeleton = Skeleton::chain(2, 1.0);
    let points = vec![Vector3::new(0.0, 0.1, 0.0), Vector3::new(0.0, 1.2, 0.0)];
    let skin = SkinnedPoints::bind_nearest(&skeleton, points.clone()).unwrap();
    assert_eq!(skin.bone_of, vec![0, 1]);

    let unchanged = skin.apply(&skeleton, &skeleton.rest_pose()).unwrap();
    for (p, q) in unchanged.iter().zip(&points) {
        assert_abs_diff_eq!(*p, *q, epsilon = 1e-6);
    }

    let mut pose = skeleton.rest_pose();
    pose[1].rotation = Quaternion::from_angle_z(Deg(90.0));
    let moved = skin.apply(&skeleton, &pose).unwrap();
    assert_abs_diff_eq!(moved[0], points[0], epsilon = 1e-6);
    assert_abs_diff_eq!(moved[1], Vector3::new(-0.2, 1.0, 0.0), epsilon = 1e-5);

    let stray = SkinnedPoints {
        points: vec![Vector3::new(0.0, 0.0, 0.0)],
        bone_of: vec![4],
    };
    assert_eq!(
        stray.apply(&skeleton, &pose).unwrap_err(),
        AnimationError::UnknownBone(4)
    );
}
