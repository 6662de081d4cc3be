//! End-to-end scenarios on small uniform models: analytic disks, the
//! opaque plateau, tracer cross-validation, and orchestrator properties.

use std::collections::HashMap;
use std::sync::Mutex;

use specline_grid::{
    CellCrossing, ChainWalker, DelaunayMesh, FaceIntercept, Grid, GridPoint, Neighbor,
    PointSpecies, RayChain, WalkError, WALK_EPSILON,
};
use specline_math::{Point3, Vec3};
use specline_mol::consts::HPIP;
use specline_mol::{build_aux, line_refs, MolData};

use crate::config::{ImageParams, RenderConfig};
use crate::error::RenderError;
use crate::ray::RaySpectrum;
use crate::render::{render, resolve_image, Scene};
use crate::tracer::{PiecewiseTracer, RayIntegrator, SmoothTracer, TraceContext, VelocityField};

struct ZeroVelocity;

impl VelocityField for ZeroVelocity {
    fn velocity(&self, _: &Point3) -> Vec3 {
        Vec3::zeros()
    }
}

/// A two-level, single-line species with unit profile normalization.
fn line_mol(freq: f64) -> MolData {
    MolData {
        nlev: 2,
        nline: 1,
        freq: vec![freq],
        aeinst: vec![1.0e-4],
        beinstu: vec![1.0e13],
        beinstl: vec![2.0e13],
        lau: vec![1],
        lal: vec![0],
        local_cmb: vec![0.0],
        norm: 1.0,
        norminv: 1.0,
    }
}

const BINV: f64 = 1.0 / 200.0;

/// Continuum-only fields: zero populations, uniform dust.
fn continuum_species(dust: f64, knu: f64) -> PointSpecies {
    PointSpecies {
        binv: BINV,
        nmol: 0.0,
        pops: vec![0.0, 0.0],
        dust: vec![dust],
        knu: vec![knu],
    }
}

/// Line fields scaled by `scale`; zero dust.
fn line_species(scale: f64) -> PointSpecies {
    PointSpecies {
        binv: BINV,
        nmol: scale * 1.0e12,
        pops: vec![0.75, 0.25],
        dust: vec![0.0],
        knu: vec![0.0],
    }
}

/// Line absorption coefficient per unit `line_species` scale, before the
/// line-shape weight.
fn line_alpha_unit() -> f64 {
    let n_upper = BINV * 1.0e12 * 0.25;
    let n_lower = BINV * 1.0e12 * 0.75;
    HPIP * (n_lower * 2.0e13 - n_upper * 1.0e13)
}

/// Line source function (emissivity over absorption), independent of the
/// density scale.
fn line_source_fn() -> f64 {
    let n_upper = BINV * 1.0e12 * 0.25;
    HPIP * n_upper * 1.0e-4 / line_alpha_unit()
}

const AXES: [(i64, i64, i64); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Cubic-lattice points inside a sphere, with six-neighbor Voronoi
/// relations (the Voronoi cell of a cubic lattice point is a cube, so the
/// axis neighbors are exactly its face neighbors).
fn sphere_lattice(radius: f64, h: f64, species: &dyn Fn(&Point3) -> PointSpecies) -> Grid {
    let n = (radius / h).floor() as i64;
    let mut index = HashMap::new();
    let mut sites = Vec::new();
    for i in -n..=n {
        for j in -n..=n {
            for k in -n..=n {
                let p = Point3::new(i as f64 * h, j as f64 * h, k as f64 * h);
                if p.coords.norm() <= radius + 1.0e-12 {
                    index.insert((i, j, k), sites.len());
                    sites.push((i, j, k, p));
                }
            }
        }
    }

    let points = sites
        .iter()
        .map(|&(i, j, k, p)| {
            let neighbors = AXES
                .iter()
                .filter_map(|&(di, dj, dk)| {
                    index.get(&(i + di, j + dj, k + dk)).map(|&ni| Neighbor {
                        face_dir: Vec3::new(di as f64 * h, dj as f64 * h, dk as f64 * h),
                        point: ni,
                    })
                })
                .collect();
            GridPoint {
                position: p,
                velocity: Vec3::zeros(),
                b_field: Vec3::new(1.0, 0.0, 0.0),
                sink: false,
                species: vec![species(&p)],
                neighbors,
            }
        })
        .collect();
    Grid::new(points).unwrap()
}

/// A full cubic lattice spanning `[-n..n]^3 * h`, plus its Kuhn
/// triangulation: six tetrahedra per lattice cube, all sharing the cube's
/// main diagonal.
fn cube_lattice(n: i64, h: f64, species: &dyn Fn(&Point3) -> PointSpecies) -> (Grid, DelaunayMesh) {
    let side = 2 * n + 1;
    let idx = |i: i64, j: i64, k: i64| -> usize {
        (((i + n) * side + (j + n)) * side + (k + n)) as usize
    };

    let mut points = Vec::new();
    for i in -n..=n {
        for j in -n..=n {
            for k in -n..=n {
                let p = Point3::new(i as f64 * h, j as f64 * h, k as f64 * h);
                let neighbors = AXES
                    .iter()
                    .filter_map(|&(di, dj, dk)| {
                        let (ni, nj, nk) = (i + di, j + dj, k + dk);
                        if ni.abs() <= n && nj.abs() <= n && nk.abs() <= n {
                            Some(Neighbor {
                                face_dir: Vec3::new(di as f64 * h, dj as f64 * h, dk as f64 * h),
                                point: idx(ni, nj, nk),
                            })
                        } else {
                            None
                        }
                    })
                    .collect();
                points.push(GridPoint {
                    position: p,
                    velocity: Vec3::zeros(),
                    b_field: Vec3::new(1.0, 0.0, 0.0),
                    sink: false,
                    species: vec![species(&p)],
                    neighbors,
                });
            }
        }
    }
    let grid = Grid::new(points).unwrap();

    let mut tets = Vec::new();
    for i in -n..n {
        for j in -n..n {
            for k in -n..n {
                let v = |a: i64, b: i64, c: i64| idx(i + a, j + b, k + c);
                let (v000, v111) = (v(0, 0, 0), v(1, 1, 1));
                tets.push([v000, v(1, 0, 0), v(1, 1, 0), v111]);
                tets.push([v000, v(1, 1, 0), v(0, 1, 0), v111]);
                tets.push([v000, v(0, 1, 0), v(0, 1, 1), v111]);
                tets.push([v000, v(0, 1, 1), v(0, 0, 1), v111]);
                tets.push([v000, v(0, 0, 1), v(1, 0, 1), v111]);
                tets.push([v000, v(1, 0, 1), v(1, 0, 0), v111]);
            }
        }
    }
    let mesh = DelaunayMesh::new(tets, &grid).unwrap();
    (grid, mesh)
}

/// A reference chain walker that tests every cell of the mesh against the
/// ray. Quadratic and only suitable for tests, but independent of any
/// adjacency bookkeeping.
struct BruteForceWalker<'a> {
    mesh: &'a DelaunayMesh,
    grid: &'a Grid,
}

impl ChainWalker for BruteForceWalker<'_> {
    fn walk(&self, origin: &Point3, dir: &Vec3) -> Result<RayChain, WalkError> {
        let mut found: Vec<(f64, FaceIntercept, CellCrossing)> = Vec::new();

        for cell in self.mesh.cells() {
            let mut hits: Vec<(usize, f64, [f64; 3])> = Vec::new();
            for face in 0..4 {
                let vids = cell.face_vertices(face);
                let a = self.grid.points()[vids[0]].position;
                let b = self.grid.points()[vids[1]].position;
                let c = self.grid.points()[vids[2]].position;
                let normal = (b - a).cross(&(c - a));
                let denom = dir.dot(&normal);
                if denom.abs() < 1.0e-14 {
                    continue;
                }
                let t = (a - origin).dot(&normal) / denom;
                let p = origin + dir * t;

                let v0 = b - a;
                let v1 = c - a;
                let v2 = p - a;
                let d00 = v0.dot(&v0);
                let d01 = v0.dot(&v1);
                let d11 = v1.dot(&v1);
                let d20 = v2.dot(&v0);
                let d21 = v2.dot(&v1);
                let den = d00 * d11 - d01 * d01;
                if den.abs() < 1.0e-20 {
                    continue;
                }
                let w1 = (d11 * d20 - d01 * d21) / den;
                let w2 = (d00 * d21 - d01 * d20) / den;
                let w0 = 1.0 - w1 - w2;
                if w0 >= -WALK_EPSILON && w1 >= -WALK_EPSILON && w2 >= -WALK_EPSILON {
                    hits.push((face, t, [w0, w1, w2]));
                }
            }

            hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
            if hits.len() >= 2 {
                let (ef, et, eb) = hits[0];
                let (xf, xt, xb) = hits[hits.len() - 1];
                if xt > 0.0 && xt - et > 1.0e-12 {
                    found.push((
                        et,
                        FaceIntercept {
                            face: ef,
                            bary: eb,
                            dist: et,
                        },
                        CellCrossing {
                            cell: cell.id,
                            exit: FaceIntercept {
                                face: xf,
                                bary: xb,
                                dist: xt,
                            },
                        },
                    ));
                }
            }
        }

        if found.is_empty() {
            return Err(WalkError::Miss);
        }
        found.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        Ok(RayChain {
            entry: found[0].1,
            crossings: found.iter().map(|f| f.2).collect(),
        })
    }
}

fn continuum_image() -> ImageParams {
    let mut img = ImageParams::new(8, 0.3, 1.0);
    img.freq = Some(1.0e11);
    img.nchan = Some(2);
    img.velres = Some(1000.0);
    img.do_line = false;
    img
}

fn line_image() -> ImageParams {
    let mut img = ImageParams::new(4, 0.5, 1.0);
    img.trans = Some(0);
    img.nchan = Some(5);
    img.velres = Some(60.0);
    img
}

#[test]
fn test_ray_outside_projected_disk_is_zero() {
    let grid = sphere_lattice(1.0, 0.5, &|_| line_species(1.0));
    let mols = vec![line_mol(1.0e11)];
    let aux = build_aux(&grid, &mols);
    let lines = line_refs(&mols);
    let resolved = resolve_image(&line_image(), &mols, false).unwrap();
    let ctx = TraceContext {
        grid: &grid,
        mols: &mols,
        aux: &aux,
        lines: &lines,
        img: &resolved,
        polarization: false,
        radius_squ: 1.0,
        cutoff: 1.0e-10,
        velocity: Some(&ZeroVelocity),
    };

    let mut ray = RaySpectrum::new(resolved.nchan);
    for (xp, yp) in [(1.2, 0.0), (0.8, 0.8), (0.0, -1.0001)] {
        PiecewiseTracer.integrate(xp, yp, &ctx, &mut ray);
        assert!(ray.intensity.iter().all(|&v| v == 0.0), "({xp},{yp})");
        assert!(ray.tau.iter().all(|&v| v == 0.0), "({xp},{yp})");
    }
}

#[test]
fn test_uniform_sphere_optically_thin_disk() {
    let dust = 2.0;
    let knu = 5.0e-5;
    let grid = sphere_lattice(1.0, 0.25, &|_| continuum_species(dust, knu));
    let mols = vec![line_mol(1.0e11)];
    let scene = Scene {
        grid: &grid,
        mols: &mols,
        velocity: None,
        mesh: None,
        walker: None,
    };
    let cfg = RenderConfig {
        radius: 1.0,
        min_scale: 0.01,
        antialias: 4,
        threads: 2,
        ..Default::default()
    };

    let cube = render(&scene, &cfg, &continuum_image(), None).unwrap();

    // Central pixels: intensity matches the optically thin chord
    // integral at the pixel center.
    for (xi, yi) in [(3, 3), (3, 4), (4, 3), (4, 4)] {
        let px = cube.pixel(xi, yi);
        let rho2 = 2.0 * 0.15f64.powi(2);
        let chord = 2.0 * (1.0 - rho2).sqrt();
        let expected = dust * knu * chord;
        for c in 0..cube.nchan {
            let got = px.intensity[c];
            assert!(
                (got - expected).abs() < 0.12 * expected,
                "pixel ({xi},{yi}) channel {c}: {got} vs {expected}"
            );
            assert!(px.tau[c] >= 0.0 && px.tau[c] < 1.2e-4);
        }
    }

    // Corner pixels lie entirely outside the projected disk.
    for (xi, yi) in [(0, 0), (0, 7), (7, 0), (7, 7)] {
        let px = cube.pixel(xi, yi);
        assert!(px.intensity.iter().all(|&v| v == 0.0));
        assert!(px.tau.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_uniform_sphere_optically_thick_plateau() {
    let dust = 2.0;
    let mols = vec![line_mol(1.0e11)];
    let cfg = RenderConfig {
        radius: 1.0,
        min_scale: 0.01,
        antialias: 4,
        threads: 2,
        ..Default::default()
    };

    let mut center = [0.0f64; 2];
    for (run, knu) in [15.0, 30.0].into_iter().enumerate() {
        let grid = sphere_lattice(1.0, 0.25, &|_| continuum_species(dust, knu));
        let scene = Scene {
            grid: &grid,
            mols: &mols,
            velocity: None,
            mesh: None,
            walker: None,
        };
        let cube = render(&scene, &cfg, &continuum_image(), None).unwrap();
        let px = cube.pixel(4, 4);
        // Saturated to the source function (dust emissivity over opacity).
        assert!(
            (px.intensity[0] - dust).abs() < 0.01 * dust,
            "knu {knu}: {}",
            px.intensity[0]
        );
        center[run] = px.intensity[0];
    }

    // Doubling the opacity must not move the saturated intensity.
    assert!((center[0] - center[1]).abs() < 1.0e-3 * dust);
}

#[test]
fn test_ray_counts_and_progress_are_monotonic() {
    let grid = sphere_lattice(1.0, 0.25, &|_| continuum_species(1.0, 1.0e-6));
    let mols = vec![line_mol(1.0e11)];
    let scene = Scene {
        grid: &grid,
        mols: &mols,
        velocity: None,
        mesh: None,
        walker: None,
    };
    let cfg = RenderConfig {
        radius: 1.0,
        min_scale: 0.01,
        antialias: 3,
        threads: 2,
        ..Default::default()
    };

    let reports = Mutex::new(Vec::<f64>::new());
    let progress = |f: f64| reports.lock().unwrap().push(f);
    let cube = render(&scene, &cfg, &continuum_image(), Some(&progress)).unwrap();

    // Never below the antialiasing minimum; interior points all land in
    // some pixel, so the total exceeds the uniform floor.
    assert!(cube.pixels().iter().all(|px| px.num_rays >= 3));
    let total: u64 = cube.pixels().iter().map(|px| u64::from(px.num_rays)).sum();
    assert!(total >= 64 * 3);
    assert!(total >= grid.n_interior() as u64);

    let reports = reports.into_inner().unwrap();
    assert!(!reports.is_empty());
    for pair in reports.windows(2) {
        assert!(pair[1] >= pair[0], "progress regressed: {pair:?}");
    }
    assert_eq!(*reports.last().unwrap(), 1.0);
}

#[test]
fn test_unknown_algorithm_selector_is_fatal() {
    let grid = sphere_lattice(1.0, 0.5, &|_| continuum_species(1.0, 1.0e-6));
    let mols = vec![line_mol(1.0e11)];
    let scene = Scene {
        grid: &grid,
        mols: &mols,
        velocity: None,
        mesh: None,
        walker: None,
    };
    let cfg = RenderConfig {
        radius: 1.0,
        trace_algorithm: 7,
        ..Default::default()
    };
    assert!(matches!(
        render(&scene, &cfg, &continuum_image(), None),
        Err(RenderError::UnknownAlgorithm(7))
    ));
}

#[test]
fn test_smooth_prerequisites_are_checked() {
    let (grid, mesh) = cube_lattice(1, 0.5, &|_| line_species(1.0));
    let mols = vec![line_mol(1.0e11)];
    let cfg = RenderConfig {
        radius: 2.0,
        trace_algorithm: 1,
        ..Default::default()
    };

    let scene = Scene {
        grid: &grid,
        mols: &mols,
        velocity: Some(&ZeroVelocity),
        mesh: None,
        walker: None,
    };
    assert!(matches!(
        render(&scene, &cfg, &line_image(), None),
        Err(RenderError::MissingTessellation)
    ));

    let walker = BruteForceWalker {
        mesh: &mesh,
        grid: &grid,
    };
    let scene = Scene {
        grid: &grid,
        mols: &mols,
        velocity: None,
        mesh: Some(&mesh),
        walker: Some(&walker),
    };
    assert!(matches!(
        render(&scene, &cfg, &line_image(), None),
        Err(RenderError::MissingVelocityField)
    ));
}

#[test]
fn test_optical_depth_scales_with_density() {
    let mols = vec![line_mol(1.0e11)];
    let resolved = resolve_image(&line_image(), &mols, false).unwrap();
    let mut taus = Vec::new();

    for scale in [1.0, 10.0] {
        let grid = sphere_lattice(1.0, 0.25, &|_| line_species(scale));
        let aux = build_aux(&grid, &mols);
        let lines = line_refs(&mols);
        let ctx = TraceContext {
            grid: &grid,
            mols: &mols,
            aux: &aux,
            lines: &lines,
            img: &resolved,
            polarization: false,
            radius_squ: 1.0,
            cutoff: 1.0e-10,
            velocity: Some(&ZeroVelocity),
        };
        let mut ray = RaySpectrum::new(resolved.nchan);
        PiecewiseTracer.integrate(0.11, -0.06, &ctx, &mut ray);
        assert!(ray.tau.iter().all(|&t| t >= 0.0));
        assert!(ray.intensity.iter().all(|&v| v >= 0.0));
        assert!(ray.tau[2] > 0.0);
        taus.push(ray.tau.clone());
    }

    // Optically thin: the accumulated depth is linear in density.
    for c in 0..taus[0].len() {
        let ratio = taus[1][c] / taus[0][c];
        assert!(
            (ratio - 10.0).abs() < 1.0e-6 * 10.0,
            "channel {c}: ratio {ratio}"
        );
    }
}

#[test]
fn test_tracers_converge_on_uniform_model() {
    // Constant density inside |p|inf <= 1, ramping to zero on the outer
    // lattice shell. Both tracers then see the same column: the piecewise
    // Voronoi cells add half a cell width per side, the smooth ramp
    // integrates to the same.
    let h = 0.5;
    let fill = |p: &Point3| {
        let m = p.x.abs().max(p.y.abs()).max(p.z.abs());
        if m <= 1.0 + 1.0e-9 {
            line_species(1.0)
        } else {
            line_species(0.0)
        }
    };
    let (grid, mesh) = cube_lattice(3, h, &fill);
    let mols = vec![line_mol(1.0e11)];
    let aux = build_aux(&grid, &mols);
    let lines = line_refs(&mols);
    let resolved = resolve_image(&line_image(), &mols, false).unwrap();
    let ctx = TraceContext {
        grid: &grid,
        mols: &mols,
        aux: &aux,
        lines: &lines,
        img: &resolved,
        polarization: false,
        radius_squ: 9.0,
        cutoff: 1.0e-10,
        velocity: Some(&ZeroVelocity),
    };

    let mut piecewise = RaySpectrum::new(resolved.nchan);
    PiecewiseTracer.integrate(0.13, 0.07, &ctx, &mut piecewise);

    let walker = BruteForceWalker {
        mesh: &mesh,
        grid: &grid,
    };
    let smooth_tracer = SmoothTracer::new(&mesh, &walker, &ZeroVelocity);
    let mut smooth = RaySpectrum::new(resolved.nchan);
    smooth_tracer.integrate(0.13, 0.07, &ctx, &mut smooth);

    let column = 2.0 + h; // constant region plus half a cell each side
    for c in 0..resolved.nchan {
        let v_chan = (c as f64 - 2.0) * 60.0;
        let vfac = (-(v_chan * BINV).powi(2)).exp();
        let tau = vfac * line_alpha_unit() * column;
        let expected = line_source_fn() * (1.0 - (-tau).exp());

        assert!(
            (piecewise.intensity[c] - expected).abs() < 2.0e-3 * expected,
            "piecewise channel {c}: {} vs {expected}",
            piecewise.intensity[c]
        );
        assert!(
            (smooth.intensity[c] - piecewise.intensity[c]).abs()
                < 0.01 * piecewise.intensity[c],
            "channel {c}: smooth {} vs piecewise {}",
            smooth.intensity[c],
            piecewise.intensity[c]
        );
        assert!(
            (smooth.tau[c] - piecewise.tau[c]).abs() < 0.01 * piecewise.tau[c],
            "channel {c}: smooth tau {} vs piecewise tau {}",
            smooth.tau[c],
            piecewise.tau[c]
        );
    }
}

#[test]
fn test_polarized_render_has_fixed_stokes_ratios() {
    // Uniform field along x, face-on: Q/I is the fixed geometric ratio
    // p / (1 - p (1 - 2/3)) and U vanishes.
    let grid = sphere_lattice(1.0, 0.25, &|_| line_species(1.0));
    let mols = vec![line_mol(1.0e11)];
    let scene = Scene {
        grid: &grid,
        mols: &mols,
        velocity: None,
        mesh: None,
        walker: None,
    };
    let cfg = RenderConfig {
        radius: 1.0,
        min_scale: 0.01,
        antialias: 4,
        threads: 2,
        polarization: true,
        ..Default::default()
    };
    let mut img = ImageParams::new(8, 0.3, 1.0);
    img.trans = Some(0);
    img.theta = 0.0;

    let cube = render(&scene, &cfg, &img, None).unwrap();
    assert_eq!(cube.nchan, 3);

    let px = cube.pixel(4, 4);
    let p = specline_mol::MAX_POLARIZATION;
    let expected_ratio = p / (1.0 - p / 3.0);
    assert!(px.intensity[0] > 0.0);
    let ratio = px.intensity[1] / px.intensity[0];
    assert!(
        (ratio - expected_ratio).abs() < 1.0e-9,
        "Q/I = {ratio}, expected {expected_ratio}"
    );
    assert!(px.intensity[2].abs() < 1.0e-12 * px.intensity[0]);
}
