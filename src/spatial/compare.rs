//! Side by side timing of a linear scan, the octree and the BSP tree.
//!
//! The linear scan and the octree answer the same radius queries and must
//! agree on every hit. The BSP tree answers inside/outside for the query
//! centres instead, which is what it is built for.

use std::time::Duration;

use cgmath::{InnerSpace, Vector3};
use instant::Instant;

use crate::{
    data_structures::mesh::Mesh,
    spatial::{
        bsp::{BspConfig, BspTree, Location},
        octree::{Octree, OctreeConfig},
    },
};

/// Brute force point index: every query looks at every point.
#[derive(Clone, Debug, Default)]
pub struct LinearScan {
    points: Vec<Vector3<f32>>,
}

impl LinearScan {
    pub fn build(points: &[Vector3<f32>]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    pub fn query_radius(&self, center: Vector3<f32>, radius: f32) -> Vec<usize> {
        let r2 = radius * radius;
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| (*p - center).magnitude2() <= r2)
            .map(|(id, _)| id)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusQuery {
    pub center: Vector3<f32>,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timing {
    pub build: Duration,
    pub query: Duration,
    pub hits: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComparisonReport {
    pub linear: Timing,
    pub octree: Timing,
    pub bsp: Timing,
}

impl ComparisonReport {
    /// Speed-up of the octree over the linear scan for queries.
    pub fn octree_query_speedup(&self) -> f64 {
        let octree = self.octree.query.as_secs_f64();
        if octree <= 0.0 {
            return f64::INFINITY;
        }
        self.linear.query.as_secs_f64() / octree
    }
}

/// Index the vertices of `mesh` (linear scan, octree) and its triangles (BSP)
/// and run every query against each.
///
/// `hits` sums the points found for the point structures and counts the
/// query centres inside the mesh for the BSP tree.
pub fn compare(mesh: &Mesh, queries: &[RadiusQuery]) -> ComparisonReport {
    let points: Vec<Vector3<f32>> = mesh.vertices.iter().map(|v| v.pos()).collect();
    let triangles: Vec<[Vector3<f32>; 3]> = mesh.triangles().collect();

    let start = Instant::now();
    let linear = LinearScan::build(&points);
    let linear_build = start.elapsed();
    let start = Instant::now();
    let linear_hits: usize = queries
        .iter()
        .map(|q| linear.query_radius(q.center, q.radius).len())
        .sum();
    let linear_query = start.elapsed();

    let start = Instant::now();
    let octree = Octree::build(&points, OctreeConfig::default());
    let octree_build = start.elapsed();
    let start = Instant::now();
    let octree_hits: usize = queries
        .iter()
        .map(|q| octree.query_radius(q.center, q.radius).len())
        .sum();
    let octree_query = start.elapsed();

    let start = Instant::now();
    let bsp = BspTree::build(&triangles, BspConfig::default());
    let bsp_build = start.elapsed();
    let start = Instant::now();
    let bsp_hits = queries
        .iter()
        .filter(|q| bsp.locate(q.center) == Location::Inside)
        .count();
    let bsp_query = start.elapsed();

    if linear_hits != octree_hits {
        log::error!("Octree found {octree_hits} points but the linear scan found {linear_hits}");
    }

    let report = ComparisonReport {
        linear: Timing {
            build: linear_build,
            query: linear_query,
            hits: linear_hits,
        },
        octree: Timing {
            build: octree_build,
            query: octree_query,
            hits: octree_hits,
        },
        bsp: Timing {
            build: bsp_build,
            query: bsp_query,
            hits: bsp_hits,
        },
    };
    log::info!("{report:?}");
    report
}
