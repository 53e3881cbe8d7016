use cgmath::Vector3;
use polysketch::{
    data_structures::mesh::Mesh,
    lod::{simplify, LodConfig, LodModel},
};

#[test]
fn should_coarsen_levels_monotonically() {
    let sphere = Mesh::uv_sphere(1.0, 48, 24);
    let model = LodModel::generate(&sphere, &LodConfig::default());
    assert_eq!(model.level_count(), 4);
    assert_eq!(model.mesh(0), &sphere);

    let counts: Vec<usize> = model.levels.iter().map(|l| l.mesh.triangle_count()).collect();
    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "{counts:?}");
    }
    assert!(counts[3] < counts[0]);

    let thresholds: Vec<f32> = model.levels.iter().map(|l| l.max_distance).collect();
    assert_eq!(thresholds, vec![10.0, 20.0, 40.0, 80.0]);
    // out of range levels clamp to the coarsest
    assert_eq!(model.mesh(17), model.mesh(3));
}

#[test]
fn should_select_level_by_distance() {
    let model = LodModel::generate(&Mesh::cube(1.0), &LodConfig::default());
    assert_eq!(model.select(0.0), 0);
    assert_eq!(model.select(9.99), 0);
    assert_eq!(model.select(10.0), 1);
    assert_eq!(model.select(35.0), 2);
    assert_eq!(model.select(79.0), 3);
    assert_eq!(model.select(1000.0), 3);
}

#[test]
fn should_hold_level_inside_hysteresis_band() {
    let model = LodModel::generate(&Mesh::cube(1.0), &LodConfig::default());
    // moving away
    assert_eq!(model.select_with_hysteresis(0, 10.5), 0);
    assert_eq!(model.select_with_hysteresis(0, 12.0), 1);
    // coming closer
    assert_eq!(model.select_with_hysteresis(1, 9.5), 1);
    assert_eq!(model.select_with_hysteresis(1, 8.0), 0);
    // far jumps are not held back
    assert_eq!(model.select_with_hysteresis(0, 100.0), 3);
    assert_eq!(model.select_with_hysteresis(3, 1.0), 0);
}

#[test]
fn should_merge_vertices_in_the_same_cell() {
    let grid = Mesh::grid(1.0, 1.0, 8, 8);
    let coarse = simplify(&grid, 0.5);
    assert!(coarse.vertex_count() < grid.vertex_count());
    assert!(coarse.triangle_count() < grid.triangle_count());
    for vertex in &coarse.vertices {
        assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
    }
    let bounds = coarse.bounds();
    assert!(bounds.min.x >= -0.5 && bounds.max.x <= 0.5);

    assert_eq!(simplify(&grid, 0.0), grid);
    assert_eq!(simplify(&grid, f32::NAN), grid);
}

#[test]
fn should_keep_tiny_meshes_intact_at_fine_cells() {
    let triangle = Mesh::triangle();
    let kept = simplify(&triangle, 0.01);
    assert_eq!(kept.triangle_count(), 1);
    assert_eq!(kept.position(0), Vector3::new(-1.0, -1.0, 0.0));
}
