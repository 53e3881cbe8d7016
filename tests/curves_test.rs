use cgmath::{assert_abs_diff_eq, InnerSpace, Vector3};
use polysketch::curves::{
    basis, polyline_length, BSplineCurve, CatmullRom, CurveError, KnotVector, NurbsCurve,
};

fn arch() -> Vec<Vector3<f32>> {
    vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 2.0, 0.0),
        Vector3::new(3.0, 2.0, 0.0),
        Vector3::new(4.0, 0.0, 0.0),
    ]
}

#[test]
fn should_build_clamped_knot_vectors() {
    let knots = KnotVector::uniform_clamped(5, 2).unwrap();
    let expected = [0.0, 0.0, 0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0, 1.0, 1.0];
    assert_eq!(knots.len(), expected.len());
    for (k, e) in knots.as_slice().iter().zip(expected) {
        assert_abs_diff_eq!(*k, e, epsilon = 1e-6);
    }
    assert_eq!(knots.domain(2), (0.0, 1.0));

    assert_eq!(KnotVector::uniform_clamped(3, 0).unwrap_err(), CurveError::ZeroDegree);
    assert_eq!(
        KnotVector::uniform_clamped(2, 3).unwrap_err(),
        CurveError::TooFewControlPoints {
            degree: 3,
            needed: 4,
            got: 2
        }
    );
    assert_eq!(
        KnotVector::new(vec![0.0, 1.0, 0.5]).unwrap_err(),
        CurveError::DecreasingKnots(2)
    );
}

#[test]
fn should_sum_basis_functions_to_one() {
    let knots = KnotVector::uniform_clamped(6, 3).unwrap();
    for t in [0.0, 0.1, 0.33, 0.5, 0.77, 0.999, 1.0] {
        let sum: f32 = (0..6).map(|i| basis(i, 3, t, knots.as_slice())).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
    }
}

#[test]
fn should_evaluate_clamped_bspline() {
    let curve = BSplineCurve::clamped(3, arch()).unwrap();
    assert_abs_diff_eq!(curve.evaluate(0.0), arch()[0]);
    assert_abs_diff_eq!(curve.evaluate(1.0), arch()[3], epsilon = 1e-6);
    // four points of degree three make a Bézier segment
    assert_abs_diff_eq!(curve.evaluate(0.5), Vector3::new(2.0, 1.5, 0.0), epsilon = 1e-5);
    // out of range parameters are clamped
    assert_abs_diff_eq!(curve.evaluate(2.0), arch()[3], epsilon = 1e-6);

    let samples = curve.sample(11);
    assert_eq!(samples.len(), 11);
    let chord = 4.0;
    let polygon = polyline_length(&arch());
    let length = polyline_length(&samples);
    assert!(length > chord && length < polygon);

    let knots = KnotVector::uniform_clamped(4, 3).unwrap();
    assert_eq!(
        BSplineCurve::new(2, arch(), knots).unwrap_err(),
        CurveError::KnotCount {
            expected: 7,
            got: 8
        }
    );
}

#[test]
fn should_draw_exact_circle_with_nurbs() {
    let points = vec![
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    let weights = vec![1.0, std::f32::consts::FRAC_1_SQRT_2, 1.0];
    let knots = KnotVector::uniform_clamped(3, 2).unwrap();
    let arc = NurbsCurve::new(2, points, weights, knots).unwrap();
    for p in arc.sample(17) {
        assert_abs_diff_eq!(p.magnitude(), 1.0, epsilon = 1e-5);
    }
    assert_abs_diff_eq!(arc.evaluate(1.0), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
}

#[test]
fn should_match_bspline_with_unit_weights() {
    let knots = KnotVector::uniform_clamped(4, 3).unwrap();
    let nurbs = NurbsCurve::new(3, arch(), vec![1.0; 4], knots).unwrap();
    let bspline = BSplineCurve::clamped(3, arch()).unwrap();
    for (a, b) in nurbs.sample(9).into_iter().zip(bspline.sample(9)) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-5);
    }
}

#[test]
fn should_reject_bad_weights() {
    let knots = KnotVector::uniform_clamped(4, 3).unwrap();
    assert_eq!(
        NurbsCurve::new(3, arch(), vec![1.0; 3], knots.clone()).unwrap_err(),
        CurveError::WeightCount {
            expected: 4,
            got: 3
        }
    );
    assert_eq!(
        NurbsCurve::new(3, arch(), vec![1.0, 1.0, -2.0, 1.0], knots.clone()).unwrap_err(),
        CurveError::InvalidWeight(2)
    );
    assert_eq!(
        NurbsCurve::new(3, arch(), vec![1.0, f32::NAN, 1.0, 1.0], knots).unwrap_err(),
        CurveError::InvalidWeight(1)
    );
}

#[test]
fn should_pass_catmull_rom_through_points() {
    let spline = CatmullRom::new(arch(), false).unwrap();
    assert_eq!(spline.segment_count(), 3);
    for (i, p) in arch().into_iter().enumerate() {
        assert_abs_diff_eq!(spline.evaluate(i as f32 / 3.0), p, epsilon = 1e-5);
    }

    let closed = CatmullRom::new(arch(), true).unwrap();
    assert_eq!(closed.segment_count(), 4);
    assert_abs_diff_eq!(closed.evaluate(0.75), arch()[3], epsilon = 1e-5);
    assert_abs_diff_eq!(closed.evaluate(1.0), arch()[0], epsilon = 1e-5);

    // a straight line stays straight
    let line = CatmullRom::new(
        vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)],
        false,
    )
    .unwrap();
    assert_abs_diff_eq!(line.evaluate(0.5), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    assert_abs_diff_eq!(polyline_length(&line.sample(8)), 2.0, epsilon = 1e-5);

    assert!(matches!(
        CatmullRom::new(vec![Vector3::new(0.0, 0.0, 0.0)], false),
        Err(CurveError::TooFewControlPoints { got: 1, .. })
    ));
}
