use cgmath::{assert_abs_diff_eq, Vector3};
use polysketch::{
    data_structures::mesh::Mesh,
    math::Aabb,
    spatial::{
        bsp::{BspConfig, BspTree, Location, Triangle},
        compare::{compare, LinearScan, RadiusQuery},
        octree::{Octree, OctreeConfig},
    },
};

use crate::common::test_utils::{brute_force_radius, lattice, sorted};

mod common;

#[test]
fn should_answer_radius_queries_like_brute_force() {
    let points = lattice(6);
    let tree = Octree::build(&points, OctreeConfig::default());
    assert_eq!(tree.len(), points.len());
    assert!(tree.depth() > 0);
    assert!(tree.check_invariants());

    for (center, radius) in [
        (Vector3::new(2.5, 2.5, 2.5), 1.5),
        (Vector3::new(0.0, 0.0, 0.0), 1.0),
        (Vector3::new(5.0, 1.0, 3.0), 2.2),
        (Vector3::new(10.0, 10.0, 10.0), 1.0),
    ] {
        assert_eq!(
            sorted(tree.query_radius(center, radius)),
            brute_force_radius(&points, center, radius),
            "radius query around {center:?}"
        );
    }
}

#[test]
fn should_answer_box_queries_inclusively() {
    let points = lattice(4);
    let tree = Octree::build(&points, OctreeConfig::default());
    let region = Aabb::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.0, 2.0, 2.0));
    let hits = sorted(tree.query_aabb(&region));
    assert_eq!(hits.len(), 8);
    for id in hits {
        assert!(region.contains(points[id]));
    }
}

#[test]
fn should_find_nearest_point() {
    let points = lattice(4);
    let tree = Octree::build(&points, OctreeConfig::default());
    let (id, distance) = tree.nearest(Vector3::new(1.2, 2.9, 0.1)).unwrap();
    assert_eq!(points[id], Vector3::new(1.0, 3.0, 0.0));
    assert_abs_diff_eq!(distance, 0.06f32.sqrt(), epsilon = 1e-5);

    // far outside the bounds still returns the closest corner
    let (id, _) = tree.nearest(Vector3::new(-5.0, -5.0, -5.0)).unwrap();
    assert_eq!(points[id], Vector3::new(0.0, 0.0, 0.0));

    let empty = Octree::build(&[], OctreeConfig::default());
    assert!(empty.is_empty());
    assert_eq!(empty.nearest(Vector3::new(0.0, 0.0, 0.0)), None);
}

#[test]
fn should_reject_points_outside_bounds() {
    let bounds = Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
    let mut tree = Octree::new(bounds, OctreeConfig::default());
    assert!(tree.insert(Vector3::new(0.5, 0.5, 0.5), 0));
    assert!(tree.insert(Vector3::new(1.0, 1.0, 1.0), 1));
    assert!(!tree.insert(Vector3::new(1.5, 0.5, 0.5), 2));
    assert_eq!(tree.len(), 2);
    assert_eq!(sorted(tree.query_radius(Vector3::new(0.5, 0.5, 0.5), 2.0)), vec![0, 1]);
}

#[test]
fn should_keep_overflowing_points_at_max_depth() {
    let config = OctreeConfig {
        max_depth: 3,
        leaf_capacity: 4,
    };
    let bounds = Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(8.0, 8.0, 8.0));
    let mut tree = Octree::new(bounds, config);
    for id in 0..20 {
        assert!(tree.insert(Vector3::new(1.0, 1.0, 1.0), id));
    }
    assert_eq!(tree.depth(), 3);
    assert!(tree.check_invariants());
    assert_eq!(tree.query_radius(Vector3::new(1.0, 1.0, 1.0), 0.1).len(), 20);
}

fn cube_triangles(size: f32) -> Vec<Triangle> {
    Mesh::cube(size).triangles().collect()
}

#[test]
fn should_locate_points_against_closed_mesh() {
    let tree = BspTree::build(&cube_triangles(2.0), BspConfig::default());
    assert!(!tree.is_empty());
    assert!(tree.triangle_count() >= 12);

    assert_eq!(tree.locate(Vector3::new(0.0, 0.0, 0.0)), Location::Inside);
    assert_eq!(tree.locate(Vector3::new(0.9, -0.9, 0.5)), Location::Inside);
    assert_eq!(tree.locate(Vector3::new(2.0, 0.0, 0.0)), Location::Outside);
    assert_eq!(tree.locate(Vector3::new(0.5, 0.5, -1.5)), Location::Outside);
    // on the surface
    assert_eq!(tree.locate(Vector3::new(1.0, 0.2, 0.2)), Location::Inside);
}

#[test]
fn should_locate_points_around_finely_tessellated_sphere() {
    let triangles: Vec<Triangle> = Mesh::uv_sphere(1.0, 24, 12).triangles().collect();
    let tree = BspTree::build(&triangles, BspConfig::default());
    assert!(tree.depth() > 32);

    assert_eq!(tree.locate(Vector3::new(1.5, 0.0, 0.0)), Location::Outside);
    assert_eq!(tree.locate(Vector3::new(0.0, 0.0, 0.0)), Location::Inside);
    for dir in [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(0.6, -0.48, 0.64),
    ] {
        assert_eq!(tree.locate(dir * 1.05), Location::Outside, "{dir:?}");
        assert_eq!(tree.locate(dir * 0.9), Location::Inside, "{dir:?}");
    }
}

#[test]
fn should_fall_back_to_ray_parity_below_depth_limit() {
    let triangles: Vec<Triangle> = Mesh::uv_sphere(1.0, 24, 12).triangles().collect();
    let config = BspConfig {
        max_depth: 4,
        ..Default::default()
    };
    let tree = BspTree::build(&triangles, config);
    assert_eq!(tree.depth(), 4);
    assert_eq!(tree.triangle_count(), triangles.len());

    assert_eq!(tree.locate(Vector3::new(1.5, 0.0, 0.0)), Location::Outside);
    assert_eq!(tree.locate(Vector3::new(0.0, 1.3, 0.0)), Location::Outside);
    assert_eq!(tree.locate(Vector3::new(0.0, 0.0, 0.0)), Location::Inside);
    assert_eq!(tree.locate(Vector3::new(0.3, 0.2, -0.1)), Location::Inside);
}

#[test]
fn should_treat_everything_as_outside_of_empty_tree() {
    let tree = BspTree::build(&[], BspConfig::default());
    assert!(tree.is_empty());
    assert_eq!(tree.triangle_count(), 0);
    assert_eq!(tree.locate(Vector3::new(0.0, 0.0, 0.0)), Location::Outside);
    assert!(tree.back_to_front(Vector3::new(0.0, 0.0, 0.0)).is_empty());
}

#[test]
fn should_skip_degenerate_triangles() {
    let line = [
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(2.0, 0.0, 0.0),
    ];
    let tree = BspTree::build(&[line], BspConfig::default());
    assert!(tree.is_empty());
}

#[test]
fn should_order_triangles_back_to_front() {
    let mut near = Mesh::quad(1.0, 1.0);
    let far = Mesh::quad(1.0, 1.0);
    near.transform(&cgmath::Matrix4::from_translation(Vector3::new(0.0, 0.0, 1.0)));
    let mut triangles: Vec<Triangle> = near.triangles().collect();
    triangles.extend(far.triangles());

    let tree = BspTree::build(&triangles, BspConfig::default());
    let ordered = tree.back_to_front(Vector3::new(0.0, 0.0, 10.0));
    assert_eq!(ordered.len(), 4);
    assert!(ordered[..2].iter().all(|t| t[0].z == 0.0));
    assert!(ordered[2..].iter().all(|t| t[0].z == 1.0));

    let reversed = tree.back_to_front(Vector3::new(0.0, 0.0, -10.0));
    assert!(reversed[..2].iter().all(|t| t[0].z == 1.0));
}

#[test]
fn should_split_straddling_triangles() {
    // the vertical triangle crosses the plane of the horizontal one
    let floor = [
        Vector3::new(-2.0, 0.0, 2.0),
        Vector3::new(2.0, 0.0, 2.0),
        Vector3::new(0.0, 0.0, -2.0),
    ];
    let wall = [
        Vector3::new(-1.0, -1.0, 0.0),
        Vector3::new(1.0, -1.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    let tree = BspTree::build(&[floor, wall], BspConfig::default());
    assert!(tree.triangle_count() > 2);
    let area: f32 = tree
        .back_to_front(Vector3::new(0.0, 5.0, 5.0))
        .iter()
        .map(|t| {
            use cgmath::InnerSpace;
            (t[1] - t[0]).cross(t[2] - t[0]).magnitude() * 0.5
        })
        .sum();
    // pieces add up to the original areas (8 + 2)
    assert_abs_diff_eq!(area, 10.0, epsilon = 1e-4);
}

#[test]
fn should_agree_between_linear_scan_and_octree() {
    let mesh = Mesh::uv_sphere(1.0, 24, 12);
    let queries = [
        RadiusQuery {
            center: Vector3::new(0.0, 0.0, 0.0),
            radius: 0.5,
        },
        RadiusQuery {
            center: Vector3::new(1.5, 0.0, 0.0),
            radius: 0.7,
        },
        RadiusQuery {
            center: Vector3::new(3.0, 0.0, 0.0),
            radius: 2.5,
        },
    ];
    let report = compare(&mesh, &queries);
    assert_eq!(report.linear.hits, report.octree.hits);
    assert!(report.linear.hits > 0);
    // only the first centre lies inside the sphere
    assert_eq!(report.bsp.hits, 1);
    assert!(report.octree_query_speedup() >= 0.0);

    let points: Vec<_> = mesh.vertices.iter().map(|v| v.pos()).collect();
    let linear = LinearScan::build(&points);
    assert_eq!(
        sorted(linear.query_radius(Vector3::new(0.0, 1.0, 0.0), 0.3)),
        brute_force_radius(&points, Vector3::new(0.0, 1.0, 0.0), 0.3)
    );
}
