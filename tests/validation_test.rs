use cgmath::Vector3;
use polysketch::{
    data_structures::mesh::{Mesh, ModelVertex},
    validation::{
        check_proportions, validate, vertices_outside_radius, Issue, ProportionRule,
        ValidationConfig,
    },
};

use crate::common::test_utils::two_triangles;

mod common;

#[test]
fn should_accept_closed_primitives() {
    for mesh in [Mesh::cube(1.0), Mesh::uv_sphere(1.0, 16, 8)] {
        let report = validate(&mesh, &ValidationConfig::default());
        assert!(report.is_watertight(), "{}: {:?}", mesh.name, report.issues);
        assert!(report.is_valid(), "{}: {:?}", mesh.name, report.issues);
        assert_eq!(report.vertex_count, mesh.vertex_count());
        assert_eq!(report.triangle_count, mesh.triangle_count());
    }
}

#[test]
fn should_report_open_boundary() {
    let report = validate(&two_triangles(), &ValidationConfig::default());
    assert!(!report.is_watertight());
    assert!(report.is_valid());
    assert_eq!(report.count(|i| matches!(i, Issue::BoundaryEdge { .. })), 4);
}

#[test]
fn should_report_flipped_triangle() {
    let mut mesh = two_triangles();
    mesh.indices = vec![0, 1, 2, 0, 3, 2];
    let report = validate(&mesh, &ValidationConfig::default());
    assert!(!report.is_valid());
    assert!(report.issues.contains(&Issue::InconsistentWinding { a: 0, b: 2 }));
}

#[test]
fn should_report_broken_indices_and_degenerate_triangles() {
    let mut mesh = two_triangles();
    // bypass the checked builders
    mesh.indices.extend_from_slice(&[0, 1, 9]);
    mesh.indices.extend_from_slice(&[0, 0, 1]);
    let report = validate(&mesh, &ValidationConfig::default());
    assert!(report.issues.contains(&Issue::IndexOutOfRange { triangle: 2, index: 9 }));
    assert!(report.issues.contains(&Issue::DegenerateTriangle { triangle: 3, area: 0.0 }));
    assert!(!report.is_valid());
    assert!(!report.is_watertight());
}

#[test]
fn should_report_non_manifold_edges() {
    let mut mesh = two_triangles();
    let apex = mesh.add_vertex(ModelVertex::new([0.5, 0.5, 1.0], [0.0, 0.0]));
    mesh.add_triangle(0, 2, apex).unwrap();
    let report = validate(&mesh, &ValidationConfig::default());
    assert!(report.issues.contains(&Issue::NonManifoldEdge { a: 0, b: 2, count: 3 }));
    assert!(!report.is_valid());
}

#[test]
fn should_report_duplicates_and_non_finite_vertices() {
    let mut mesh = two_triangles();
    let copy = mesh.vertices[1];
    mesh.add_vertex(copy);
    mesh.add_vertex(ModelVertex::new([f32::NAN, 0.0, 0.0], [0.0, 0.0]));
    let report = validate(&mesh, &ValidationConfig::default());
    assert!(report.issues.contains(&Issue::DuplicateVertex { first: 1, duplicate: 4 }));
    assert!(report.issues.contains(&Issue::NonFiniteVertex { vertex: 5 }));
    assert!(!report.is_valid());
}

#[test]
fn should_not_count_seams_as_duplicates() {
    // same corner, different uv
    let mut mesh = two_triangles();
    let mut seam = mesh.vertices[2];
    seam.tex_coords = [0.25, 0.25];
    mesh.add_vertex(seam);
    let report = validate(&mesh, &ValidationConfig::default());
    assert_eq!(report.count(|i| matches!(i, Issue::DuplicateVertex { .. })), 0);
}

#[test]
fn should_check_jaw_width() {
    let fits = Mesh::quad(5.2, 1.0);
    let results = check_proportions(&fits, &[ProportionRule::jaw_width(0, 1)]);
    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert_eq!(results[0].name, "jaw width");

    let wide = Mesh::quad(6.0, 1.0);
    let results = check_proportions(
        &wide,
        &[
            ProportionRule::jaw_width(0, 1),
            ProportionRule::new("height", 1, 2, 1.0, 0.01),
            ProportionRule::new("missing", 0, 99, 1.0, 1.0),
        ],
    );
    assert!(!results[0].passed);
    assert!(results[1].passed);
    assert!(!results[2].passed);
    assert_eq!(results[2].measured, None);
}

#[test]
fn should_find_vertices_far_from_center() {
    let cube = Mesh::cube(2.0);
    let center = Vector3::new(0.0, 0.0, 0.0);
    assert_eq!(vertices_outside_radius(&cube, center, 1.5).len(), 24);
    assert!(vertices_outside_radius(&cube, center, 2.0).is_empty());

    let mut stray = Mesh::cube(2.0);
    stray.vertices[5].position = [10.0, 0.0, 0.0];
    assert_eq!(vertices_outside_radius(&stray, center, 2.0), vec![5]);
}
